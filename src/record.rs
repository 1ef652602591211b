//! Employee Record Types
//!
//! `NewEmployee` is what the caller supplies; `Employee` is a row read back from
//! storage, including the storage-assigned `emp_id`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EntryError, Result};

/// Employee record collected from the user, before storage assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub department: String,
    pub salary: f64,
}

impl NewEmployee {
    #[must_use]
    pub fn new(name: impl Into<String>, department: impl Into<String>, salary: f64) -> Self {
        Self { name: name.into(), department: department.into(), salary }
    }
}

/// Employee row as stored
///
/// Text and salary columns are nullable in the schema, so they are optional here.
/// A NULL name or department displays as `null`; a NULL salary displays as `0.00`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: Option<String>,
    pub department: Option<String>,
    pub salary: Option<f64>,
}

impl Employee {
    /// Whether this row stores exactly the given input triple
    #[must_use]
    pub fn matches(&self, record: &NewEmployee) -> bool {
        self.name.as_deref() == Some(record.name.as_str())
            && self.department.as_deref() == Some(record.department.as_str())
            && self.salary == Some(record.salary)
    }
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, Name: {}, Department: {}, Salary: {}",
            self.id,
            self.name.as_deref().unwrap_or("null"),
            self.department.as_deref().unwrap_or("null"),
            format_salary(self.salary.unwrap_or(0.0)),
        )
    }
}

/// Format a salary with exactly two decimal places
///
/// Rounds to nearest on the exact binary value of the `f64`, so `50000` becomes
/// `50000.00` and `1234.5678` becomes `1234.57`.
#[must_use]
pub fn format_salary(salary: f64) -> String {
    format!("{salary:.2}")
}

/// Parse a salary typed by the user
///
/// Surrounding whitespace is ignored. Any finite float is accepted, including
/// negative values and values with more than two decimals.
pub fn parse_salary(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let salary: f64 = trimmed.parse().map_err(|_| {
        EntryError::invalid_input(format!("Salary must be a number, got '{trimmed}'"))
    })?;

    if !salary.is_finite() {
        return Err(EntryError::invalid_input(format!(
            "Salary must be a finite number, got '{trimmed}'"
        )));
    }

    Ok(salary)
}
