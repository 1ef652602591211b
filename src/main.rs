//! employee-entry CLI Entry Point
//!
//! Subcommands:
//! - `add` (default) - Prompt for an employee, insert it, and print every employee
//! - `list` - Print every employee without inserting
//! - `connect` - Validate a connection, optionally saving it as a named profile
//!
//! In text mode prompts and rows go to stdout and diagnostics to stderr. With
//! `--format json` stdout carries exactly one JSON envelope and prompts move to
//! stderr. Logs always go to stderr.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use employee_entry::config::{self, ConfigLocation, ConnectionOverrides, ResolvedProfile};
use employee_entry::engine::DatabaseType;
use employee_entry::entry::{self, Operation, RunOutcome};
use employee_entry::error::EntryError;
use employee_entry::input::{collect_employee, PresetFields};
use employee_entry::output::{
    self, AddData, ErrorEnvelope, ListData, Metadata, ProfileSummary, ProfilesData,
    SuccessEnvelope,
};

/// employee-entry - Add an employee record and print every stored employee
#[derive(Parser)]
#[command(name = "employee-entry")]
#[command(about = "Add an employee record and print every stored employee")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// More log output on stderr (-v info, -vv debug, -vvv trace); RUST_LOG wins
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Prompt for an employee, insert it, and print every employee (default)
    Add(RecordArgs),

    /// Print every employee without inserting
    List,

    /// Check a connection and optionally save it as a named profile
    Connect {
        /// Save the connection under this profile name
        #[arg(long)]
        save_as: Option<String>,

        /// Save to the global config file instead of the local one
        #[arg(long, requires = "save_as")]
        global: bool,

        /// Store this environment variable name instead of the password
        #[arg(long, requires = "save_as")]
        password_env: Option<String>,

        /// List saved profiles instead of connecting
        #[arg(long, conflicts_with = "save_as")]
        list: bool,
    },
}

#[derive(Args, Default)]
struct RecordArgs {
    /// Employee name (skips the name prompt)
    #[arg(long)]
    employee_name: Option<String>,

    /// Employee department (skips the department prompt)
    #[arg(long)]
    department: Option<String>,

    /// Employee salary (skips the salary prompt)
    #[arg(long, allow_hyphen_values = true)]
    salary: Option<String>,
}

/// Connection selection; explicit fields override the resolved profile
#[derive(Args)]
struct ConnectionArgs {
    /// Named connection profile (default: the configured default profile)
    #[arg(long, global = true)]
    connection: Option<String>,

    /// Database engine: mysql, postgres, or sqlite
    #[arg(long, global = true)]
    engine: Option<DatabaseType>,

    /// Database host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Database port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Database user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Database password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Database name
    #[arg(long, global = true)]
    database: Option<String>,

    /// SQLite database file
    #[arg(long, global = true)]
    file: Option<PathBuf>,
}

impl ConnectionArgs {
    fn resolve(self) -> Result<ResolvedProfile, EntryError> {
        let profile = config::resolve_connection(self.connection.as_deref())?;

        let overrides = ConnectionOverrides {
            engine: self.engine,
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
            database: self.database,
            file: self.file,
        };
        profile.with_overrides(overrides)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = cli.format;
    let code = match cli.command.unwrap_or_else(|| Commands::Add(RecordArgs::default())) {
        Commands::Add(record) => add(cli.connection, record, format).await,
        Commands::List => list(cli.connection, format).await,
        Commands::Connect { list: true, .. } => list_profiles(format),
        Commands::Connect { save_as, global, password_env, list: false } => {
            let location = if global { ConfigLocation::Global } else { ConfigLocation::Local };
            connect(cli.connection, save_as, password_env, location, format).await
        }
    };

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn add(connection: ConnectionArgs, record: RecordArgs, format: OutputFormat) -> i32 {
    let config = match connection.resolve() {
        Ok(profile) => profile.config,
        Err(err) => return report_failure(format, "", "add", &err, &[]),
    };

    let preset = PresetFields {
        name: record.employee_name,
        department: record.department,
        salary: record.salary,
    };

    let collected = {
        let mut input = io::stdin().lock();
        match format {
            OutputFormat::Text => collect_employee(&mut input, &mut io::stdout(), preset),
            OutputFormat::Json => collect_employee(&mut input, &mut io::stderr(), preset),
        }
    };
    let employee = match collected {
        Ok(employee) => employee,
        Err(err) => return report_failure(format, config.engine.as_str(), "add", &err, &[]),
    };

    let operation = Operation::Add(employee);
    let outcome = entry::run_with_config(&config, &operation).await;
    report_outcome(format, &operation, &outcome)
}

async fn list(connection: ConnectionArgs, format: OutputFormat) -> i32 {
    let config = match connection.resolve() {
        Ok(profile) => profile.config,
        Err(err) => return report_failure(format, "", "list", &err, &[]),
    };

    let operation = Operation::List;
    let outcome = entry::run_with_config(&config, &operation).await;
    report_outcome(format, &operation, &outcome)
}

async fn connect(
    connection: ConnectionArgs,
    save_as: Option<String>,
    password_env: Option<String>,
    location: ConfigLocation,
    format: OutputFormat,
) -> i32 {
    let start = Instant::now();

    let profile = match connection.resolve() {
        Ok(profile) => profile,
        Err(err) => return report_failure(format, "", "connect", &err, &[]),
    };
    let engine = profile.config.engine.as_str();

    let (result, cleanup_failures) = entry::describe_with_config(&profile.config).await;
    let info = match result {
        Ok(info) => info,
        Err(err) => return report_failure(format, engine, "connect", &err, &cleanup_failures),
    };

    if let Some(name) = &save_as {
        // A password read from the environment stays there when re-saving
        let password_env = password_env.or(profile.password_env);
        let endpoint = profile.config.endpoint();

        if let Err(err) = config::save_connection(name, profile.config, password_env, location) {
            return report_failure(format, engine, "connect", &err, &cleanup_failures);
        }
        tracing::info!(connection = %name, %endpoint, "saved connection profile");
    }

    let written = match format {
        OutputFormat::Text => {
            report_cleanup_failures(&cleanup_failures);
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "Connected to {engine} {} (database: {}, user: {})",
                info.database_version, info.connected_database, info.user
            )
            .and_then(|()| match &save_as {
                Some(name) => writeln!(out, "Saved connection '{name}'"),
                None => Ok(()),
            })
        }
        OutputFormat::Json => {
            let meta = Metadata::new(elapsed_ms(start)).with_cleanup_failures(&cleanup_failures);
            print_json(&SuccessEnvelope::new(engine, "connect", info, meta))
        }
    };

    finish(written, 0)
}

fn list_profiles(format: OutputFormat) -> i32 {
    let start = Instant::now();

    let profiles = match config::list_connections() {
        Ok(profiles) => profiles,
        Err(err) => return report_failure(format, "", "connect", &err, &[]),
    };

    let written = match format {
        OutputFormat::Text => {
            let mut out = io::stdout().lock();
            profiles
                .iter()
                .try_for_each(|(name, profile)| writeln!(out, "{name}\t{}", profile.endpoint()))
        }
        OutputFormat::Json => {
            let data = ProfilesData {
                profiles: profiles
                    .iter()
                    .map(|(name, profile)| ProfileSummary {
                        name: name.clone(),
                        engine: profile.engine.as_str().to_string(),
                        endpoint: profile.endpoint(),
                    })
                    .collect(),
            };
            let meta = Metadata::with_rows(elapsed_ms(start), data.profiles.len());
            print_json(&SuccessEnvelope::new("", "connect", data, meta))
        }
    };

    finish(written, 0)
}

fn report_outcome(format: OutputFormat, operation: &Operation, outcome: &RunOutcome) -> i32 {
    let engine = outcome.engine.as_str();
    let command = operation.command();

    let report = match &outcome.result {
        Ok(report) => report,
        Err(err) => {
            return report_failure(format, engine, command, err, &outcome.cleanup_failures)
        }
    };

    let written = match format {
        OutputFormat::Text => {
            report_cleanup_failures(&outcome.cleanup_failures);
            output::render_rows(&mut io::stdout().lock(), &report.rows)
        }
        OutputFormat::Json => {
            let meta = Metadata::with_rows(outcome.execution_ms, report.rows.len())
                .with_cleanup_failures(&outcome.cleanup_failures);
            match operation {
                Operation::Add(_) => {
                    let data =
                        AddData { inserted_id: report.inserted_id, rows: report.rows.clone() };
                    print_json(&SuccessEnvelope::new(engine, command, data, meta))
                }
                Operation::List => {
                    let data = ListData { rows: report.rows.clone() };
                    print_json(&SuccessEnvelope::new(engine, command, data, meta))
                }
            }
        }
    };

    finish(written, outcome.exit_code())
}

/// Report a primary error plus any cleanup failures that followed it
fn report_failure(
    format: OutputFormat,
    engine: &str,
    command: &str,
    err: &EntryError,
    cleanup_failures: &[EntryError],
) -> i32 {
    match format {
        OutputFormat::Text => {
            // Nothing useful can be done if stderr itself is gone
            let _ = output::render_error(&mut io::stderr().lock(), err);
            report_cleanup_failures(cleanup_failures);
        }
        OutputFormat::Json => {
            let envelope = ErrorEnvelope::from_error(engine, command, err)
                .with_cleanup_failures(cleanup_failures);
            if let Err(e) = print_json(&envelope) {
                tracing::error!(error = %e, "could not write error envelope");
            }
        }
    }
    err.exit_code()
}

fn report_cleanup_failures(failures: &[EntryError]) {
    let mut err = io::stderr().lock();
    for failure in failures {
        let _ = output::render_error(&mut err, failure);
    }
}

fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, value)?;
    writeln!(out)?;
    out.flush()
}

/// Exit code for a run whose stdout write may have failed
fn finish(written: io::Result<()>, code: i32) -> i32 {
    match written {
        Ok(()) => code,
        Err(e) => {
            tracing::error!(error = %e, "could not write to stdout");
            1
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
