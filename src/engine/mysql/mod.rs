//! MySQL Storage Engine Implementation
//!
//! This module implements `StorageEngine` for MySQL databases (including MariaDB).
//! MySQL is the engine the tool targets by default (`localhost:3306/DEMO`).
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver, requires tokio runtime)
//! - Statements are server-side prepared statements, released with `COM_STMT_CLOSE`
//! - `emp_id` comes from the OK packet's last insert id
//! - DECIMAL salaries arrive as text and are parsed to `f64`
//! - MySQL and MariaDB version detection for `server_info`

use mysql_async::{prelude::*, Conn, OptsBuilder, Row, Statement, Value};

use crate::engine::{
    BufferedCursor, ConnectionConfig, ConnectionInfo, DatabaseType, EmployeeConnection,
    StorageEngine,
};
use crate::error::{EntryError, Resource, Result};
use crate::record::{Employee, NewEmployee};

const INSERT_SQL: &str = "INSERT INTO employees (name, department, salary) VALUES (?, ?, ?)";
const SELECT_SQL: &str = "SELECT emp_id, name, department, salary FROM employees";

/// MySQL storage engine implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlEngine;

/// Open MySQL connection
pub struct MySqlConnection {
    conn: Conn,
}

impl StorageEngine for MySqlEngine {
    type Connection = MySqlConnection;

    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<MySqlConnection> {
        // Validate config is for MySQL
        if config.engine != DatabaseType::MySQL {
            return Err(EntryError::config_error(format!(
                "Expected MySQL engine, got {}",
                config.engine
            )));
        }

        let opts = build_mysql_opts(config)?;

        let conn = Conn::new(opts).await.map_err(EntryError::connect_failed)?;
        tracing::debug!(endpoint = %config.endpoint(), "connected to MySQL");

        Ok(MySqlConnection { conn })
    }
}

impl EmployeeConnection for MySqlConnection {
    type Statement = Statement;
    type Cursor = BufferedCursor;

    async fn server_info(&mut self) -> Result<ConnectionInfo> {
        let version_string = query_single_string(&mut self.conn, "SELECT VERSION()").await?;
        let (database_version, server_info) = parse_mysql_version(&version_string);

        let connected_database = query_single_string(&mut self.conn, "SELECT DATABASE()").await?;
        let user = query_single_string(&mut self.conn, "SELECT CURRENT_USER()").await?;

        Ok(ConnectionInfo { database_version, server_info, connected_database, user })
    }

    async fn prepare_insert(&mut self) -> Result<Statement> {
        self.conn.prep(INSERT_SQL).await.map_err(EntryError::insert_failed)
    }

    async fn insert(&mut self, statement: &Statement, record: &NewEmployee) -> Result<Option<i64>> {
        self.conn
            .exec_drop(statement, (record.name.as_str(), record.department.as_str(), record.salary))
            .await
            .map_err(EntryError::insert_failed)?;

        Ok(self.conn.last_insert_id().and_then(|id| i64::try_from(id).ok()))
    }

    async fn prepare_select(&mut self) -> Result<Statement> {
        self.conn.prep(SELECT_SQL).await.map_err(EntryError::query_failed)
    }

    async fn select_all(&mut self, statement: &Statement) -> Result<BufferedCursor> {
        let rows: Vec<Row> =
            self.conn.exec(statement, ()).await.map_err(EntryError::query_failed)?;

        let employees = rows.iter().map(employee_from_row).collect::<Result<Vec<_>>>()?;
        Ok(BufferedCursor::new(employees))
    }

    async fn close_statement(&mut self, statement: Statement) -> Result<()> {
        self.conn
            .close(statement)
            .await
            .map_err(|e| EntryError::cleanup_failed(Resource::Statement, e))
    }

    async fn close(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| EntryError::cleanup_failed(Resource::Connection, e))
    }
}

/// Build MySQL connection options from `ConnectionConfig`
fn build_mysql_opts(config: &ConnectionConfig) -> Result<OptsBuilder> {
    let host = config
        .host
        .as_ref()
        .ok_or_else(|| EntryError::config_error("MySQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| EntryError::config_error("MySQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| EntryError::config_error("MySQL requires 'user' parameter"))?;

    let password = config
        .password
        .as_ref()
        .ok_or_else(|| EntryError::config_error("MySQL requires 'password' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| EntryError::config_error("MySQL requires 'database' parameter"))?;

    let opts = OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(port)
        .user(Some(user))
        .pass(Some(password))
        .db_name(Some(database));

    Ok(opts)
}

/// Run a one-row, one-column query and return its value as text
async fn query_single_string(conn: &mut Conn, query: &str) -> Result<String> {
    let row: Row = conn
        .query_first(query)
        .await
        .map_err(EntryError::connect_failed)?
        .ok_or_else(|| EntryError::connect_failed(format!("{query} returned no row")))?;

    Ok(text_from_value(row.as_ref(0).unwrap_or(&Value::NULL), "value")?
        .unwrap_or_else(|| "NULL".to_string()))
}

/// Parse MySQL version string to detect MySQL vs MariaDB
fn parse_mysql_version(version_string: &str) -> (String, String) {
    // Example MySQL: "8.0.35"
    // Example MariaDB: "10.11.2-MariaDB"

    if version_string.to_uppercase().contains("MARIADB") {
        let version = version_string.split('-').next().unwrap_or("unknown").to_string();
        (version.clone(), format!("MariaDB {version}"))
    } else {
        let version =
            version_string.split_whitespace().next().unwrap_or(version_string).to_string();
        (version.clone(), format!("MySQL {version}"))
    }
}

/// Decode one row of `SELECT emp_id, name, department, salary`
fn employee_from_row(row: &Row) -> Result<Employee> {
    let value = |idx: usize| row.as_ref(idx).unwrap_or(&Value::NULL);

    let id = id_from_value(value(0))?;
    let name = text_from_value(value(1), "name")?;
    let department = text_from_value(value(2), "department")?;
    let salary = salary_from_value(value(3))?;

    Ok(Employee { id, name, department, salary })
}

fn id_from_value(value: &Value) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::UInt(u) => i64::try_from(*u)
            .map_err(|_| EntryError::query_failed(format!("emp_id {u} does not fit in i64"))),
        Value::Bytes(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| EntryError::query_failed("emp_id is not an integer")),
        other => Err(EntryError::query_failed(format!("Unexpected emp_id value {other:?}"))),
    }
}

fn text_from_value(value: &Value, column: &str) -> Result<Option<String>> {
    match value {
        Value::NULL => Ok(None),
        Value::Bytes(bytes) => String::from_utf8(bytes.clone())
            .map(Some)
            .map_err(|_| EntryError::query_failed(format!("{column} is not valid UTF-8"))),
        Value::Int(i) => Ok(Some(i.to_string())),
        Value::UInt(u) => Ok(Some(u.to_string())),
        Value::Float(f) => Ok(Some(f.to_string())),
        Value::Double(d) => Ok(Some(d.to_string())),
        other => Err(EntryError::query_failed(format!("Unexpected {column} value {other:?}"))),
    }
}

/// Salary may be DECIMAL (text on the wire), DOUBLE, FLOAT, or an integer type
fn salary_from_value(value: &Value) -> Result<Option<f64>> {
    match value {
        Value::NULL => Ok(None),
        Value::Double(d) => Ok(Some(*d)),
        Value::Float(f) => Ok(Some(f64::from(*f))),
        #[allow(clippy::cast_precision_loss)]
        Value::Int(i) => Ok(Some(*i as f64)),
        #[allow(clippy::cast_precision_loss)]
        Value::UInt(u) => Ok(Some(*u as f64)),
        Value::Bytes(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(Some)
            .ok_or_else(|| EntryError::query_failed("salary is not numeric")),
        other => Err(EntryError::query_failed(format!("Unexpected salary value {other:?}"))),
    }
}
