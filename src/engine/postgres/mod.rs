//! `PostgreSQL` Storage Engine Implementation
//!
//! This module implements `StorageEngine` for `PostgreSQL` databases.
//!
//! # Implementation Notes
//! - Uses `tokio-postgres` (async driver, requires tokio runtime)
//! - The driver's connection future runs on a spawned task; `close` drops the client
//!   and then awaits that task so shutdown errors are reported
//! - `emp_id` comes back through `RETURNING`
//! - Columns are cast in SQL (`::bigint`, `::text`, `::float8`) so SERIAL/BIGSERIAL ids,
//!   VARCHAR/TEXT names, and NUMERIC/REAL salaries all decode the same way
//! - Prepared statements are closed by dropping the `Statement` handle

use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls, Row, Statement};

use crate::engine::{
    BufferedCursor, ConnectionConfig, ConnectionInfo, DatabaseType, EmployeeConnection,
    StorageEngine,
};
use crate::error::{EntryError, Resource, Result};
use crate::record::{Employee, NewEmployee};

const INSERT_SQL: &str = "INSERT INTO employees (name, department, salary) \
                          VALUES ($1, $2, $3::float8) RETURNING emp_id::bigint";
const SELECT_SQL: &str = "SELECT emp_id::bigint AS emp_id, name::text AS name, \
                          department::text AS department, salary::float8 AS salary \
                          FROM employees";

/// `PostgreSQL` storage engine implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresEngine;

/// Open `PostgreSQL` connection
pub struct PostgresConnection {
    client: Client,
    connection: JoinHandle<std::result::Result<(), tokio_postgres::Error>>,
}

impl StorageEngine for PostgresEngine {
    type Connection = PostgresConnection;

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<PostgresConnection> {
        // Validate config is for PostgreSQL
        if config.engine != DatabaseType::Postgres {
            return Err(EntryError::config_error(format!(
                "Expected PostgreSQL engine, got {}",
                config.engine
            )));
        }

        let pg_config = build_pg_config(config)?;

        let (client, connection) =
            pg_config.connect(NoTls).await.map_err(EntryError::connect_failed)?;

        // The connection object performs the actual communication with the server
        let connection = tokio::spawn(connection);
        tracing::debug!(endpoint = %config.endpoint(), "connected to PostgreSQL");

        Ok(PostgresConnection { client, connection })
    }
}

impl EmployeeConnection for PostgresConnection {
    type Statement = Statement;
    type Cursor = BufferedCursor;

    async fn server_info(&mut self) -> Result<ConnectionInfo> {
        let row = self
            .client
            .query_one("SELECT version(), current_database()::text, current_user::text", &[])
            .await
            .map_err(EntryError::connect_failed)?;

        let version_string: String = row.try_get(0).map_err(EntryError::connect_failed)?;

        // Extract version number (e.g., "PostgreSQL 15.3 on x86_64..." -> "15.3")
        let database_version =
            version_string.split_whitespace().nth(1).unwrap_or("unknown").to_string();

        Ok(ConnectionInfo {
            database_version,
            server_info: version_string,
            connected_database: row.try_get(1).map_err(EntryError::connect_failed)?,
            user: row.try_get(2).map_err(EntryError::connect_failed)?,
        })
    }

    async fn prepare_insert(&mut self) -> Result<Statement> {
        self.client.prepare(INSERT_SQL).await.map_err(EntryError::insert_failed)
    }

    async fn insert(&mut self, statement: &Statement, record: &NewEmployee) -> Result<Option<i64>> {
        let row = self
            .client
            .query_one(statement, &[&record.name, &record.department, &record.salary])
            .await
            .map_err(EntryError::insert_failed)?;

        let id: i64 = row.try_get(0).map_err(EntryError::insert_failed)?;
        Ok(Some(id))
    }

    async fn prepare_select(&mut self) -> Result<Statement> {
        self.client.prepare(SELECT_SQL).await.map_err(EntryError::query_failed)
    }

    async fn select_all(&mut self, statement: &Statement) -> Result<BufferedCursor> {
        let rows = self.client.query(statement, &[]).await.map_err(EntryError::query_failed)?;

        let employees = rows
            .iter()
            .map(employee_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(EntryError::query_failed)?;

        Ok(BufferedCursor::new(employees))
    }

    async fn close_statement(&mut self, statement: Statement) -> Result<()> {
        // Dropping the last handle sends the Close message for the statement
        drop(statement);
        Ok(())
    }

    async fn close(self) -> Result<()> {
        drop(self.client);

        self.connection
            .await
            .map_err(|e| EntryError::cleanup_failed(Resource::Connection, e))?
            .map_err(|e| EntryError::cleanup_failed(Resource::Connection, e))
    }
}

/// Build `PostgreSQL` connection config from `ConnectionConfig`
fn build_pg_config(config: &ConnectionConfig) -> Result<Config> {
    let host = config
        .host
        .as_ref()
        .ok_or_else(|| EntryError::config_error("PostgreSQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| EntryError::config_error("PostgreSQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| EntryError::config_error("PostgreSQL requires 'user' parameter"))?;

    let password = config
        .password
        .as_ref()
        .ok_or_else(|| EntryError::config_error("PostgreSQL requires 'password' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| EntryError::config_error("PostgreSQL requires 'database' parameter"))?;

    let mut pg_config = Config::new();
    pg_config.host(host).port(port).user(user).password(password).dbname(database);

    Ok(pg_config)
}

fn employee_from_row(row: &Row) -> std::result::Result<Employee, tokio_postgres::Error> {
    Ok(Employee {
        id: row.try_get("emp_id")?,
        name: row.try_get("name")?,
        department: row.try_get("department")?,
        salary: row.try_get("salary")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RowCursor;
    use crate::error::Phase;

    fn live_config() -> Option<ConnectionConfig> {
        let host = std::env::var("EMPLOYEE_ENTRY_PG_HOST").ok()?;
        Some(ConnectionConfig::postgres(
            host,
            5432,
            std::env::var("EMPLOYEE_ENTRY_PG_USER").unwrap_or_else(|_| "postgres".to_string()),
            std::env::var("EMPLOYEE_ENTRY_PG_PASSWORD").unwrap_or_else(|_| "postgres".to_string()),
            std::env::var("EMPLOYEE_ENTRY_PG_DATABASE").unwrap_or_else(|_| "demo".to_string()),
        ))
    }

    #[test]
    fn test_build_pg_config_missing_database() {
        let mut config = ConnectionConfig::postgres(
            "localhost".to_string(),
            5432,
            "user".to_string(),
            "pass".to_string(),
            "db".to_string(),
        );
        config.database = None;

        let err = build_pg_config(&config).unwrap_err();
        assert!(err.message().contains("PostgreSQL requires 'database' parameter"));
    }

    #[tokio::test]
    async fn test_connect_wrong_engine() {
        let config = ConnectionConfig::default();

        let err = PostgresEngine.connect(&config).await.err().unwrap();
        assert!(err.message().contains("Expected PostgreSQL engine"));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_phase_error() {
        let config = ConnectionConfig::postgres(
            "127.0.0.1".to_string(),
            1, // nothing listens on port 1
            "user".to_string(),
            "pass".to_string(),
            "db".to_string(),
        );

        let err = PostgresEngine.connect(&config).await.err().unwrap();
        assert_eq!(err.phase(), Some(Phase::Connect));
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance (set EMPLOYEE_ENTRY_PG_HOST)"]
    async fn test_live_insert_and_select() {
        let Some(config) = live_config() else { return };
        let mut conn = PostgresEngine.connect(&config).await.unwrap();

        let info = conn.server_info().await.unwrap();
        assert!(info.server_info.contains("PostgreSQL"));

        let record = NewEmployee::new("Live Test", "QA", 1234.5);
        let insert = conn.prepare_insert().await.unwrap();
        let id = conn.insert(&insert, &record).await.unwrap().unwrap();
        conn.close_statement(insert).await.unwrap();

        let select = conn.prepare_select().await.unwrap();
        let mut cursor = conn.select_all(&select).await.unwrap();
        let mut found = false;
        while let Some(row) = cursor.next_row().unwrap() {
            found |= row.id == id && row.matches(&record);
        }
        cursor.close().unwrap();
        conn.close_statement(select).await.unwrap();
        conn.close().await.unwrap();

        assert!(found, "inserted row {id} not returned by select");
    }
}
