//! Output Rendering
//!
//! Two output modes share this module:
//! - Text: one `ID: .., Name: .., Department: .., Salary: ..` line per row on stdout,
//!   fixed diagnostics plus cause chain on stderr
//! - JSON: a single envelope on stdout
//!
//! # JSON Contract
//! - Success: `{"ok": true, "engine": "...", "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "engine": "...", "command": "...", "error": {"code": "...", ...}}`

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::error::EntryError;
use crate::record::Employee;

/// Write one line per row, in the order given
pub fn render_rows<W: Write>(out: &mut W, rows: &[Employee]) -> io::Result<()> {
    for row in rows {
        writeln!(out, "{row}")?;
    }
    out.flush()
}

/// Write the fixed diagnostic for `error`, then its message and deeper causes
pub fn render_error<W: Write>(out: &mut W, error: &EntryError) -> io::Result<()> {
    writeln!(out, "{}", error.diagnostic())?;
    writeln!(out, "  error [{}]: {}", error.error_code(), error.message())?;

    // The message already shows the direct source; print only what lies below it.
    // A cause whose text its parent already ends with adds nothing.
    let mut causes = error.causes();
    let mut parent = causes.next().map(ToString::to_string).unwrap_or_default();
    for cause in causes {
        let text = cause.to_string();
        if !parent.ends_with(&text) {
            writeln!(out, "  caused by: {text}")?;
        }
        parent = text;
    }
    Ok(())
}

/// Success envelope for operation results
///
/// Generic over the data type to support different operation return values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Database engine used for this operation (postgres, mysql, sqlite)
    pub engine: String,

    /// Command that was executed (add, list, connect)
    pub command: String,

    /// Operation-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(
        engine: impl Into<String>,
        command: impl Into<String>,
        data: T,
        meta: Metadata,
    ) -> Self {
        Self { ok: true, engine: engine.into(), command: command.into(), data, meta }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Database engine (empty string if the failure happened before an engine was chosen)
    pub engine: String,

    /// Command that was attempted (add, list, connect)
    pub command: String,

    /// Error information
    pub error: ErrorInfo,

    /// Errors raised while releasing resources after the failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_failures: Vec<ErrorInfo>,
}

impl ErrorEnvelope {
    /// Create error envelope from `EntryError`
    pub fn from_error(
        engine: impl Into<String>,
        command: impl Into<String>,
        err: &EntryError,
    ) -> Self {
        Self {
            ok: false,
            engine: engine.into(),
            command: command.into(),
            error: ErrorInfo::from(err),
            cleanup_failures: Vec::new(),
        }
    }

    /// Attach cleanup failures that followed the primary error
    #[must_use]
    pub fn with_cleanup_failures(mut self, failures: &[EntryError]) -> Self {
        self.cleanup_failures = failures.iter().map(ErrorInfo::from).collect();
        self
    }
}

/// Error information structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "STORAGE_OPERATION_FAILED", "INVALID_INPUT")
    pub code: String,

    /// Human-readable error message (no credentials)
    pub message: String,

    /// Step that failed, for storage errors (connect, insert, query)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl From<&EntryError> for ErrorInfo {
    fn from(err: &EntryError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.message(),
            phase: err.phase().map(|p| p.as_str().to_string()),
        }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned (for add/list, None for other commands)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,

    /// Errors raised while releasing resources after a successful run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_failures: Vec<ErrorInfo>,
}

impl Metadata {
    /// Create new metadata with just execution time
    pub fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows_returned: None, cleanup_failures: Vec::new() }
    }

    /// Create new metadata with execution time and row count
    pub fn with_rows(execution_ms: u64, rows_returned: usize) -> Self {
        Self { execution_ms, rows_returned: Some(rows_returned), cleanup_failures: Vec::new() }
    }

    /// Attach cleanup failures
    #[must_use]
    pub fn with_cleanup_failures(mut self, failures: &[EntryError]) -> Self {
        self.cleanup_failures = failures.iter().map(ErrorInfo::from).collect();
        self
    }
}

/// Data for the `add` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddData {
    /// Id assigned to the new row, when the driver reports it
    pub inserted_id: Option<i64>,

    /// Every stored row, in storage-engine order
    pub rows: Vec<Employee>,
}

/// Data for the `list` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListData {
    /// Every stored row, in storage-engine order
    pub rows: Vec<Employee>,
}

/// Data for `connect --list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesData {
    pub profiles: Vec<ProfileSummary>,
}

/// One saved connection profile, without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    pub engine: String,
    pub endpoint: String,
}
