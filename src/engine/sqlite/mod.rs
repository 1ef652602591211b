//! `SQLite` Storage Engine Implementation
//!
//! This module implements `StorageEngine` for `SQLite` database files.
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no async needed)
//! - The database file must already exist; it is opened read-write without `CREATE`
//!   so a wrong path fails at connect instead of silently creating an empty file
//! - Statements are kept in the connection's prepared-statement cache and flushed
//!   from it on `close_statement`
//! - `emp_id` comes from `last_insert_rowid()`

use rusqlite::{params, Connection, OpenFlags, Row};

use crate::engine::{
    BufferedCursor, ConnectionConfig, ConnectionInfo, DatabaseType, EmployeeConnection,
    StorageEngine,
};
use crate::error::{EntryError, Resource, Result};
use crate::record::{Employee, NewEmployee};

const INSERT_SQL: &str = "INSERT INTO employees (name, department, salary) VALUES (?1, ?2, ?3)";
const SELECT_SQL: &str = "SELECT emp_id, name, department, salary FROM employees";

/// `SQLite` storage engine implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteEngine;

/// Open `SQLite` database file
pub struct SqliteConnection {
    conn: Connection,
    file_name: String,
}

/// Prepared statement held in the connection's statement cache
#[derive(Debug)]
pub struct SqliteStatement {
    sql: &'static str,
}

impl StorageEngine for SqliteEngine {
    type Connection = SqliteConnection;

    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<SqliteConnection> {
        // Validate config is for SQLite
        if config.engine != DatabaseType::SQLite {
            return Err(EntryError::config_error(format!(
                "Expected SQLite engine, got {}",
                config.engine
            )));
        }

        let file_path = config
            .file
            .as_ref()
            .ok_or_else(|| EntryError::config_error("SQLite requires 'file' parameter"))?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn =
            Connection::open_with_flags(file_path, flags).map_err(EntryError::connect_failed)?;

        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| file_path.display().to_string(), ToString::to_string);

        tracing::debug!(file = %file_path.display(), "opened SQLite database");

        Ok(SqliteConnection { conn, file_name })
    }
}

impl EmployeeConnection for SqliteConnection {
    type Statement = SqliteStatement;
    type Cursor = BufferedCursor;

    async fn server_info(&mut self) -> Result<ConnectionInfo> {
        let version: String = self
            .conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(EntryError::connect_failed)?;

        Ok(ConnectionInfo {
            database_version: version.clone(),
            server_info: format!("SQLite {version}"),
            connected_database: self.file_name.clone(),
            user: "N/A".to_string(), // SQLite has no user concept
        })
    }

    async fn prepare_insert(&mut self) -> Result<SqliteStatement> {
        // Compile now so a missing table surfaces before any value is bound
        self.conn.prepare_cached(INSERT_SQL).map_err(EntryError::insert_failed)?;
        Ok(SqliteStatement { sql: INSERT_SQL })
    }

    async fn insert(
        &mut self,
        statement: &SqliteStatement,
        record: &NewEmployee,
    ) -> Result<Option<i64>> {
        let mut stmt =
            self.conn.prepare_cached(statement.sql).map_err(EntryError::insert_failed)?;
        stmt.execute(params![record.name, record.department, record.salary])
            .map_err(EntryError::insert_failed)?;

        Ok(Some(self.conn.last_insert_rowid()))
    }

    async fn prepare_select(&mut self) -> Result<SqliteStatement> {
        self.conn.prepare_cached(SELECT_SQL).map_err(EntryError::query_failed)?;
        Ok(SqliteStatement { sql: SELECT_SQL })
    }

    async fn select_all(&mut self, statement: &SqliteStatement) -> Result<BufferedCursor> {
        let mut stmt = self.conn.prepare_cached(statement.sql).map_err(EntryError::query_failed)?;

        let rows = stmt
            .query_map([], employee_from_row)
            .map_err(EntryError::query_failed)?
            .collect::<std::result::Result<Vec<Employee>, _>>()
            .map_err(EntryError::query_failed)?;

        Ok(BufferedCursor::new(rows))
    }

    async fn close_statement(&mut self, statement: SqliteStatement) -> Result<()> {
        tracing::trace!(sql = statement.sql, "releasing cached statement");
        self.conn.flush_prepared_statement_cache();
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_conn, e)| EntryError::cleanup_failed(Resource::Connection, e))
    }
}

/// Decode one `employees` row
///
/// `salary` reads as `f64` whether the column holds an INTEGER or a REAL value.
fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get("emp_id")?,
        name: row.get("name")?,
        department: row.get("department")?,
        salary: row.get("salary")?,
    })
}
