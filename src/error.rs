//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout employee-entry.
//! All errors are structured, carry a stable error code, and keep the driver
//! error that caused them as their `source()`.
//!
//! # Error Categories
//! - `ClientUnavailable`: The database driver for the requested engine is not available
//! - `StorageOperationFailed`: The database rejected a connect, insert, or query
//! - `CleanupFailed`: Closing a cursor, statement, or connection failed
//! - `InvalidInput`: Employee input could not be read or parsed
//! - `ConfigError`: Connection profile or configuration file errors

use std::fmt;

use thiserror::Error;

/// Boxed driver error kept as the cause of a storage failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Step of the run sequence in which a storage error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opening the connection
    Connect,
    /// Preparing or executing the insert
    Insert,
    /// Preparing or executing the select, or reading its rows
    Query,
}

impl Phase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Insert => "insert",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource released during cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Cursor,
    Statement,
    Connection,
}

impl Resource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Statement => "statement",
            Self::Connection => "connection",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for employee-entry operations
#[derive(Error, Debug)]
pub enum EntryError {
    /// The driver for the requested engine is not compiled into this build
    #[error("Database client unavailable: {source}")]
    ClientUnavailable {
        #[source]
        source: BoxError,
    },

    /// The database reported an error during connect, insert, or query
    #[error("Storage operation failed during {phase}: {source}")]
    StorageOperationFailed {
        phase: Phase,
        #[source]
        source: BoxError,
    },

    /// Releasing a resource failed
    #[error("Failed to close {resource}: {source}")]
    CleanupFailed {
        resource: Resource,
        #[source]
        source: BoxError,
    },

    /// Employee input could not be read or parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error (missing parameter, unknown profile, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EntryError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ClientUnavailable { .. } => "CLIENT_UNAVAILABLE",
            Self::StorageOperationFailed { .. } => "STORAGE_OPERATION_FAILED",
            Self::CleanupFailed { .. } => "CLEANUP_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Fixed, one-line diagnostic printed to stderr before the cause chain
    #[must_use]
    pub const fn diagnostic(&self) -> &'static str {
        match self {
            Self::ClientUnavailable { .. } => "Database driver not available.",
            Self::StorageOperationFailed { .. } => "Database connection error.",
            Self::CleanupFailed { .. } => "Failed to release database resources.",
            Self::InvalidInput(_) => "Invalid employee input.",
            Self::ConfigError(_) => "Configuration error.",
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) | Self::ConfigError(_) => 2,
            _ => 1,
        }
    }

    /// Get human-readable error message
    ///
    /// The message never contains the connection password.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Phase of the run sequence, for storage failures
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::StorageOperationFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Iterate over the cause chain, starting with the direct source
    pub fn causes(&self) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
        let mut next = std::error::Error::source(self);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.source();
            Some(current)
        })
    }

    /// Create a client unavailable error
    pub fn client_unavailable(source: impl Into<BoxError>) -> Self {
        Self::ClientUnavailable { source: source.into() }
    }

    /// Create a storage error for the given phase
    pub fn storage(phase: Phase, source: impl Into<BoxError>) -> Self {
        Self::StorageOperationFailed { phase, source: source.into() }
    }

    /// Create a connect-phase storage error
    pub fn connect_failed(source: impl Into<BoxError>) -> Self {
        Self::storage(Phase::Connect, source)
    }

    /// Create an insert-phase storage error
    pub fn insert_failed(source: impl Into<BoxError>) -> Self {
        Self::storage(Phase::Insert, source)
    }

    /// Create a query-phase storage error
    pub fn query_failed(source: impl Into<BoxError>) -> Self {
        Self::storage(Phase::Query, source)
    }

    /// Create a cleanup error for the given resource
    pub fn cleanup_failed(resource: Resource, source: impl Into<BoxError>) -> Self {
        Self::CleanupFailed { resource, source: source.into() }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for employee-entry operations
pub type Result<T> = std::result::Result<T, EntryError>;
