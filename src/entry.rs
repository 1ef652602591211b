//! Record Entry Run Sequence
//!
//! One run is: connect, insert, query, release. Display is left to the caller,
//! which renders the returned rows as text or JSON.
//!
//! # Release Guarantee
//! Every statement that was prepared is closed, the cursor is closed, and the
//! connection is closed, whether or not an earlier step failed. Release failures are
//! collected in `RunOutcome::cleanup_failures` and never replace the primary error.
//!
//! # No Transaction
//! The insert and the select are independent statements. Rows written by other
//! clients between them will show up in the select.

use std::time::Instant;

use crate::engine::{ConnectionConfig, DatabaseType, EmployeeConnection, RowCursor, StorageEngine};
use crate::error::{EntryError, Result};
use crate::record::{Employee, NewEmployee};

/// What a run should do after connecting
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Insert the record, then read every row back
    Add(NewEmployee),
    /// Read every row without inserting
    List,
}

impl Operation {
    /// Command name used in JSON envelopes
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::List => "list",
        }
    }
}

/// Rows read back by a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Id the storage assigned to the inserted row, when the driver reports it
    pub inserted_id: Option<i64>,

    /// Every row of `employees`, in storage-engine order
    pub rows: Vec<Employee>,
}

/// Full result of one run
#[derive(Debug)]
pub struct RunOutcome {
    /// Engine the run targeted
    pub engine: DatabaseType,

    /// Rows on success, or the first error from connect, insert, or query
    pub result: Result<RunReport>,

    /// Errors raised while releasing resources, in release order
    pub cleanup_failures: Vec<EntryError>,

    /// Wall-clock duration of the run in milliseconds
    pub execution_ms: u64,
}

impl RunOutcome {
    /// Process exit code: the primary error decides, cleanup failures alone do not
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match &self.result {
            Ok(_) => 0,
            Err(err) => err.exit_code(),
        }
    }
}

/// Execute one run against `engine`
pub async fn run<E: StorageEngine>(
    engine: &E,
    config: &ConnectionConfig,
    operation: &Operation,
) -> RunOutcome {
    let start = Instant::now();
    let mut cleanup_failures = Vec::new();

    let result = match engine.connect(config).await {
        Ok(mut conn) => {
            let result = run_connected(&mut conn, operation, &mut cleanup_failures).await;
            release(conn.close().await, &mut cleanup_failures);
            result
        }
        Err(err) => Err(err),
    };

    match &result {
        Ok(report) => tracing::info!(
            endpoint = %config.endpoint(),
            inserted_id = ?report.inserted_id,
            rows = report.rows.len(),
            "run completed"
        ),
        Err(err) => tracing::debug!(endpoint = %config.endpoint(), error = %err, "run failed"),
    }

    RunOutcome {
        engine: engine.database_type(),
        result,
        cleanup_failures,
        execution_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

async fn run_connected<C: EmployeeConnection>(
    conn: &mut C,
    operation: &Operation,
    cleanup_failures: &mut Vec<EntryError>,
) -> Result<RunReport> {
    let inserted_id = match operation {
        Operation::Add(record) => insert_record(conn, record, cleanup_failures).await?,
        Operation::List => None,
    };

    let rows = fetch_all(conn, cleanup_failures).await?;

    Ok(RunReport { inserted_id, rows })
}

async fn insert_record<C: EmployeeConnection>(
    conn: &mut C,
    record: &NewEmployee,
    cleanup_failures: &mut Vec<EntryError>,
) -> Result<Option<i64>> {
    let statement = conn.prepare_insert().await?;
    let result = conn.insert(&statement, record).await;
    release(conn.close_statement(statement).await, cleanup_failures);

    if let Ok(id) = &result {
        tracing::debug!(emp_id = ?id, "inserted employee");
    }
    result
}

async fn fetch_all<C: EmployeeConnection>(
    conn: &mut C,
    cleanup_failures: &mut Vec<EntryError>,
) -> Result<Vec<Employee>> {
    let statement = conn.prepare_select().await?;

    let result = match conn.select_all(&statement).await {
        Ok(mut cursor) => {
            let rows = drain(&mut cursor);
            release(cursor.close(), cleanup_failures);
            rows
        }
        Err(err) => Err(err),
    };

    release(conn.close_statement(statement).await, cleanup_failures);
    result
}

fn drain<R: RowCursor>(cursor: &mut R) -> Result<Vec<Employee>> {
    let mut rows = Vec::new();
    while let Some(row) = cursor.next_row()? {
        rows.push(row);
    }
    Ok(rows)
}

fn release(result: Result<()>, cleanup_failures: &mut Vec<EntryError>) {
    if let Err(err) = result {
        tracing::debug!(error = %err, "resource release failed");
        cleanup_failures.push(err);
    }
}

/// Execute one run, choosing the engine from `config.engine`
///
/// Engines whose driver is not compiled in fail with `ClientUnavailable` before any
/// connection attempt.
pub async fn run_with_config(config: &ConnectionConfig, operation: &Operation) -> RunOutcome {
    match config.engine {
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => run(&crate::engine::mysql::MySqlEngine, config, operation).await,
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => {
            run(&crate::engine::postgres::PostgresEngine, config, operation).await
        }
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => run(&crate::engine::sqlite::SqliteEngine, config, operation).await,
        #[allow(unreachable_patterns)]
        engine => RunOutcome {
            engine,
            result: Err(driver_unavailable(engine)),
            cleanup_failures: Vec::new(),
            execution_ms: 0,
        },
    }
}

/// Open a connection and report server information, releasing it afterwards
pub async fn describe_connection<E: StorageEngine>(
    engine: &E,
    config: &ConnectionConfig,
) -> (Result<crate::engine::ConnectionInfo>, Vec<EntryError>) {
    let mut cleanup_failures = Vec::new();

    let result = match engine.connect(config).await {
        Ok(mut conn) => {
            let info = conn.server_info().await;
            release(conn.close().await, &mut cleanup_failures);
            info
        }
        Err(err) => Err(err),
    };

    (result, cleanup_failures)
}

/// `describe_connection`, choosing the engine from `config.engine`
pub async fn describe_with_config(
    config: &ConnectionConfig,
) -> (Result<crate::engine::ConnectionInfo>, Vec<EntryError>) {
    match config.engine {
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => {
            describe_connection(&crate::engine::mysql::MySqlEngine, config).await
        }
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => {
            describe_connection(&crate::engine::postgres::PostgresEngine, config).await
        }
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            describe_connection(&crate::engine::sqlite::SqliteEngine, config).await
        }
        #[allow(unreachable_patterns)]
        engine => (Err(driver_unavailable(engine)), Vec::new()),
    }
}

fn driver_unavailable(engine: DatabaseType) -> EntryError {
    EntryError::client_unavailable(format!(
        "{engine} support is not compiled into this build (enable the '{engine}' feature)"
    ))
}
