//! employee-entry - Employee Record Entry Tool
//!
//! Prompts for one employee (name, department, salary), inserts it into the
//! `employees` table, and prints every row of that table.
//!
//! # Core Principles
//! - One run per invocation: connect, insert, query, display, release
//! - Explicit configuration (no credentials baked into the run path)
//! - Every acquired cursor, statement, and connection is released on every exit path
//! - Structured errors with a kind, a failing phase, and a cause chain
//! - No transaction around the insert and the select
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`record`] - Employee types and salary formatting
//! - [`input`] - Prompted input collection
//! - [`engine`] - Storage engine traits and the MySQL, PostgreSQL, and SQLite engines
//! - [`entry`] - The run sequence and its release guarantee
//! - [`config`] - Connection profiles
//! - [`output`] - Text rendering and JSON envelopes

pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod input;
pub mod output;
pub mod record;

// Re-export commonly used types for convenience
pub use config::{
    list_connections, resolve_connection, save_connection, ConfigLocation, ConnectionOverrides,
    ConnectionRegistry, ResolvedProfile, StoredConnection,
};
pub use engine::{
    BufferedCursor, ConnectionConfig, ConnectionInfo, DatabaseType, EmployeeConnection, RowCursor,
    StorageEngine,
};
pub use entry::{run, run_with_config, Operation, RunOutcome, RunReport};
pub use error::{EntryError, Phase, Resource, Result};
pub use input::{collect_employee, PresetFields};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use record::{format_salary, Employee, NewEmployee};
