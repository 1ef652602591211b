//! CLI Output Tests
//!
//! Runs the compiled binary with piped stdin and checks what lands on stdout,
//! stderr, and the exit code:
//! - Text mode: prompts, then one line per row
//! - Failures: fixed diagnostic on stderr, no rows on stdout
//! - JSON mode: exactly one envelope on stdout
//!
//! Each test runs in its own temp directory with `HOME`/`XDG_CONFIG_HOME` pointed
//! there, so no real connection profiles are picked up.

#![cfg(feature = "sqlite")]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `staff.db` with an empty `employees` table
    fn create_db(&self) -> PathBuf {
        let path = self.path().join("staff.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE employees (
                emp_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                department TEXT,
                salary REAL
            )",
        )
        .unwrap();
        path
    }

    /// Run the binary with `args`, feeding `stdin`
    fn run(&self, args: &[&str], stdin: &str) -> Output {
        self.run_with_env(args, stdin, &[])
    }

    fn run_with_env(&self, args: &[&str], stdin: &str, vars: &[(&str, &str)]) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_employee-entry"))
            .args(args)
            .current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("RUST_LOG")
            .envs(vars.iter().copied())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
        child.wait_with_output().unwrap()
    }

    /// Write a local profile file by hand
    fn write_local_config(&self, json: &serde_json::Value) -> PathBuf {
        let dir = self.path().join(".employee-entry");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, serde_json::to_string_pretty(json).unwrap()).unwrap();
        path
    }

    fn run_sqlite(&self, db: &Path, extra: &[&str], stdin: &str) -> Output {
        let file = db.to_str().unwrap();
        let mut args = vec!["--engine", "sqlite", "--file", file];
        args.extend_from_slice(extra);
        self.run(&args, stdin)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

// ============================================================================
// Text Mode
// ============================================================================

#[test]
fn test_prompts_then_inserted_row() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    let output = sandbox.run_sqlite(&db, &[], "Alice\nEngineering\n75000.5\n");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.starts_with(
        "Enter employee name: Enter employee department: Enter employee salary: "
    ));
    assert!(out.ends_with("ID: 1, Name: Alice, Department: Engineering, Salary: 75000.50\n"));
}

#[test]
fn test_second_run_prints_both_rows() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    sandbox.run_sqlite(&db, &[], "John Doe\nHR\n55000\n");
    let output = sandbox.run_sqlite(&db, &[], "Alice\r\nEngineering\r\n75000.5\r\n");
    assert_eq!(output.status.code(), Some(0));

    let out = stdout(&output);
    assert!(out.contains("ID: 1, Name: John Doe, Department: HR, Salary: 55000.00\n"));
    assert!(out.contains("ID: 2, Name: Alice, Department: Engineering, Salary: 75000.50\n"));
}

#[test]
fn test_flags_skip_prompts() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    let output = sandbox.run_sqlite(
        &db,
        &["add", "--employee-name", "Bob", "--department", "Sales", "--salary", "40000"],
        "",
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "ID: 1, Name: Bob, Department: Sales, Salary: 40000.00\n");
}

#[test]
fn test_list_prints_rows_without_prompting() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();
    sandbox.run_sqlite(&db, &[], "John Doe\nHR\n55000\n");

    let output = sandbox.run_sqlite(&db, &["list"], "");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "ID: 1, Name: John Doe, Department: HR, Salary: 55000.00\n");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unreachable_server_reports_connection_error() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(
        &["--engine", "mysql", "--host", "127.0.0.1", "--port", "1"],
        "Alice\nEngineering\n75000.5\n",
    );
    assert_eq!(output.status.code(), Some(1));

    // Prompts only, no row data
    assert!(!stdout(&output).contains("ID: "));

    let err = stderr(&output);
    assert!(err.contains("Database connection error.\n"), "stderr: {err}");
    assert!(err.contains("STORAGE_OPERATION_FAILED"));
    assert!(!err.contains("panicked"));
}

#[test]
fn test_missing_database_file() {
    let sandbox = Sandbox::new();
    let db = sandbox.path().join("absent.db");

    let output = sandbox.run_sqlite(&db, &[], "Alice\nEngineering\n75000.5\n");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Database connection error.\n"));
    assert!(!db.exists());
}

#[test]
fn test_invalid_salary_exits_before_connecting() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    let output = sandbox.run_sqlite(&db, &[], "Alice\nEngineering\nlots\n");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Invalid employee input.\n"));

    // Nothing was written
    let listed = sandbox.run_sqlite(&db, &["list"], "");
    assert_eq!(stdout(&listed), "");
}

#[test]
fn test_closed_stdin_is_invalid_input() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    let output = sandbox.run_sqlite(&db, &[], "Alice\n");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("INVALID_INPUT"));
}

#[test]
fn test_server_flag_on_sqlite_is_config_error() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    let output = sandbox.run_sqlite(&db, &["list", "--host", "db.internal"], "");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Configuration error.\n"));
    assert!(stderr(&output).contains("'host' does not apply to sqlite connections"));
}

#[test]
fn test_unknown_profile_is_config_error() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["list", "--connection", "nope"], "");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Configuration error.\n"));
}

// ============================================================================
// JSON Mode
// ============================================================================

#[test]
fn test_json_add_envelope() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    let output = sandbox.run_sqlite(&db, &["--format", "json"], "Alice\nEngineering\n75000.5\n");
    assert_eq!(output.status.code(), Some(0));

    // Prompts move to stderr so stdout is a single document
    assert!(stderr(&output).contains("Enter employee name: "));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["engine"], "sqlite");
    assert_eq!(json["command"], "add");
    assert_eq!(json["data"]["inserted_id"], 1);
    assert_eq!(json["data"]["rows"][0]["name"], "Alice");
    assert_eq!(json["data"]["rows"][0]["salary"], 75000.5);
    assert_eq!(json["meta"]["rows_returned"], 1);
}

#[test]
fn test_json_error_envelope() {
    let sandbox = Sandbox::new();
    let db = sandbox.path().join("absent.db");

    let output = sandbox.run_sqlite(&db, &["list", "--format", "json"], "");
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["command"], "list");
    assert_eq!(json["error"]["code"], "STORAGE_OPERATION_FAILED");
    assert_eq!(json["error"]["phase"], "connect");
}

// ============================================================================
// Connection Profiles
// ============================================================================

#[test]
fn test_connect_saves_default_profile() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();

    let output = sandbox.run_sqlite(&db, &["connect", "--save-as", "staff"], "");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Saved connection 'staff'"));
    assert!(sandbox.path().join(".employee-entry").join("config.json").exists());

    // The saved profile is now the default, so no connection flags are needed
    let output =
        sandbox.run(&["add", "--employee-name", "Eve", "--department", "IT", "--salary", "1"], "");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "ID: 1, Name: Eve, Department: IT, Salary: 1.00\n");

    let listed = sandbox.run(&["connect", "--list"], "");
    assert!(stdout(&listed).starts_with("staff\tsqlite:"));
}

#[test]
fn test_file_flag_alone_selects_sqlite() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();
    sandbox.run_sqlite(&db, &[], "John Doe\nHR\n55000\n");

    // No profile and no --engine: the file is enough to pick SQLite
    let output = sandbox.run(&["--file", db.to_str().unwrap(), "list"], "");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "ID: 1, Name: John Doe, Department: HR, Salary: 55000.00\n");
}

#[test]
fn test_resaving_profile_keeps_password_in_environment() {
    let sandbox = Sandbox::new();
    let db = sandbox.create_db();
    let config_path = sandbox.write_local_config(&serde_json::json!({
        "connections": {
            "prod": {
                "engine": "sqlite",
                "file": db,
                "password_env": "EMPLOYEE_ENTRY_CLI_SECRET"
            }
        }
    }));

    let output = sandbox.run_with_env(
        &["connect", "--connection", "prod", "--save-as", "copy"],
        "",
        &[("EMPLOYEE_ENTRY_CLI_SECRET", "hunter2-from-env")],
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Saved connection 'copy'"));

    let saved = std::fs::read_to_string(&config_path).unwrap();
    assert!(!saved.contains("hunter2-from-env"), "config: {saved}");

    let registry: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(registry["connections"]["copy"]["password_env"], "EMPLOYEE_ENTRY_CLI_SECRET");
    assert!(registry["connections"]["copy"].get("password").is_none());
}
