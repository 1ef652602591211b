//! Storage Engine Traits and Core Types
//!
//! This module defines the seam between the run sequence and the database drivers.
//! Each engine (`MySQL`, `PostgreSQL`, `SQLite`) implements `StorageEngine`, hands out an
//! `EmployeeConnection`, and returns rows through a `RowCursor`.
//!
//! # Explicit Release
//! Statements, cursors, and connections are released through explicit calls
//! (`close_statement`, `RowCursor::close`, `EmployeeConnection::close`) rather than only by
//! `Drop`, so that release failures can be reported and so that every release is
//! observable by a stub engine in tests.
//!
//! # Engine Isolation
//! Each engine implementation is completely independent and owns its own SQL.
//! No shared SQL helpers or cross-engine abstractions.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Result;
use crate::record::{Employee, NewEmployee};

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Historical endpoint the tool has always written to
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "mysql";
pub const DEFAULT_DATABASE: &str = "DEMO";

/// Supported database engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// `MySQL` database (includes `MariaDB`)
    MySQL,
    /// `SQLite` database
    SQLite,
}

impl DatabaseType {
    /// Get the engine name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" => Ok(Self::SQLite),
            other => Err(format!("unknown engine '{other}' (expected mysql, postgres, or sqlite)")),
        }
    }
}

/// Connection configuration for database engines
///
/// This struct contains all parameters needed to establish a database connection.
/// Fields are engine-specific (e.g., `file` only applies to `SQLite`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine type
    pub engine: DatabaseType,

    /// Hostname (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port number (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Password (for postgres/mysql)
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database name (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Database file path (for sqlite)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ConnectionConfig {
    /// Create a new `PostgreSQL` connection config
    #[must_use]
    pub const fn postgres(
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self {
            engine: DatabaseType::Postgres,
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            database: Some(database),
            file: None,
        }
    }

    /// Create a new `MySQL` connection config
    #[must_use]
    pub const fn mysql(
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self {
            engine: DatabaseType::MySQL,
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            database: Some(database),
            file: None,
        }
    }

    /// Create a new `SQLite` connection config
    #[must_use]
    pub const fn sqlite(file: PathBuf) -> Self {
        Self {
            engine: DatabaseType::SQLite,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            file: Some(file),
        }
    }

    /// Password-free description of the endpoint, safe for logs and output
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self.engine {
            DatabaseType::SQLite => format!(
                "sqlite:{}",
                self.file.as_ref().map_or_else(|| "?".to_string(), |f| f.display().to_string())
            ),
            engine => format!(
                "{engine}://{}@{}:{}/{}",
                self.user.as_deref().unwrap_or("?"),
                self.host.as_deref().unwrap_or("?"),
                self.port.map_or_else(|| "?".to_string(), |p| p.to_string()),
                self.database.as_deref().unwrap_or("?"),
            ),
        }
    }
}

impl Default for ConnectionConfig {
    /// The `MySQL` endpoint at `localhost:3306/DEMO` as `root`
    fn default() -> Self {
        Self::mysql(
            DEFAULT_HOST.to_string(),
            DEFAULT_MYSQL_PORT,
            DEFAULT_USER.to_string(),
            DEFAULT_PASSWORD.to_string(),
            DEFAULT_DATABASE.to_string(),
        )
    }
}

/// Connection information reported by the `connect` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Database server version string
    pub database_version: String,

    /// Server information (implementation-specific)
    pub server_info: String,

    /// Name of the connected database
    pub connected_database: String,

    /// Connected user name
    pub user: String,
}

/// Database engine trait
///
/// An engine is a factory for connections. `connect` MUST validate that the config
/// targets this engine and that every required parameter is present before it
/// touches the network.
pub trait StorageEngine {
    /// Open connection type handed out by this engine
    type Connection: EmployeeConnection;

    /// Engine this implementation speaks to
    fn database_type(&self) -> DatabaseType;

    /// Open one connection (no pooling, no retry)
    fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// One open connection to the `employees` table
///
/// Every statement returned by a `prepare_*` method must be handed back to
/// `close_statement`, every cursor must be closed, and the connection itself must be
/// closed, on success and failure alike. `entry::run` upholds this.
pub trait EmployeeConnection: Send + Sized {
    /// Prepared statement handle
    type Statement: Send + Sync;

    /// Cursor over the rows of a select
    type Cursor: RowCursor;

    /// Server version, database, and user for this connection
    fn server_info(&mut self) -> impl Future<Output = Result<ConnectionInfo>> + Send;

    /// Prepare `INSERT INTO employees (name, department, salary) VALUES (?, ?, ?)`
    fn prepare_insert(&mut self) -> impl Future<Output = Result<Self::Statement>> + Send;

    /// Execute the insert statement with the record bound positionally
    ///
    /// Returns the storage-assigned `emp_id` when the driver reports one.
    fn insert(
        &mut self,
        statement: &Self::Statement,
        record: &NewEmployee,
    ) -> impl Future<Output = Result<Option<i64>>> + Send;

    /// Prepare `SELECT emp_id, name, department, salary FROM employees`
    fn prepare_select(&mut self) -> impl Future<Output = Result<Self::Statement>> + Send;

    /// Execute the select statement
    ///
    /// Rows are returned in whatever order the storage engine produces.
    fn select_all(
        &mut self,
        statement: &Self::Statement,
    ) -> impl Future<Output = Result<Self::Cursor>> + Send;

    /// Release a prepared statement
    fn close_statement(
        &mut self,
        statement: Self::Statement,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Forward-only cursor over employee rows
pub trait RowCursor: Send + Sized {
    /// Next row, or `None` once the result set is exhausted
    fn next_row(&mut self) -> Result<Option<Employee>>;

    /// Release the cursor
    fn close(self) -> Result<()>;
}

/// Cursor over a result set the driver has already fully received
///
/// All three drivers buffer select results client-side, so each engine decodes its
/// rows up front and walks them with this cursor.
#[derive(Debug)]
pub struct BufferedCursor {
    rows: std::vec::IntoIter<Employee>,
}

impl BufferedCursor {
    #[must_use]
    pub fn new(rows: Vec<Employee>) -> Self {
        Self { rows: rows.into_iter() }
    }
}

impl RowCursor for BufferedCursor {
    fn next_row(&mut self) -> Result<Option<Employee>> {
        Ok(self.rows.next())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
