//! Validation report for a parsed JSON payload.

use serde::{Deserialize, Serialize};

use crate::inference::DateFormat;

/// Outcome of validating one file as time-series data.
///
/// Produced once per load; replaced, never mutated, on re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the payload can be imported.
    pub is_valid: bool,
    /// Blocking problems.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Non-blocking problems.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Date spelling of the first detected date column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_format: Option<DateFormat>,
    /// Columns holding dates.
    #[serde(default)]
    pub date_columns: Vec<String>,
    /// Columns holding numbers.
    #[serde(default)]
    pub numeric_columns: Vec<String>,
}

impl ValidationResult {
    /// A failed result with a single error.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
            detected_format: None,
            date_columns: Vec::new(),
            numeric_columns: Vec::new(),
        }
    }

    /// All errors joined for single-line display.
    pub fn error_summary(&self) -> String {
        self.errors.join(" ")
    }
}
