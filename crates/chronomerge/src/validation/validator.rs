//! Structural and content validation of JSON time-series payloads.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::inference::{
    detect_date_columns, detect_numeric_columns, is_empty_cell, is_valid_date_string,
    parse_date_string_with_format, parse_float,
};
use crate::input::{FlatRecord, flatten_object};

use super::result::ValidationResult;

/// Shown with structural errors so users see what is expected.
const EXPECTED_FORMAT: &str =
    r#"Expected format: [{"date": "2024-01-01T00:00:00Z", "value": 12.5}, {"date": "2024-01-02T00:00:00Z", "value": 13.1}]"#;

/// Object keys inspected when checking for a date-keyed object.
const DATE_KEY_PROBE: usize = 5;

/// Validates parsed JSON documents as arrays of time-series records.
pub struct SchemaValidator {
    config: ValidatorConfig,
}

impl SchemaValidator {
    /// Create a validator with default thresholds.
    pub fn new() -> Self {
        Self {
            config: ValidatorConfig::default(),
        }
    }

    /// Create a validator with custom thresholds.
    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a parsed JSON document.
    ///
    /// Structural problems short-circuit; content problems are collected.
    pub fn validate(&self, document: &Value) -> ValidationResult {
        let items = match document {
            Value::Object(map) if !map.is_empty() => {
                let date_keyed = map
                    .keys()
                    .take(DATE_KEY_PROBE)
                    .all(|k| is_valid_date_string(k));
                if date_keyed {
                    let example = map.keys().next().cloned().unwrap_or_default();
                    return ValidationResult::failure(format!(
                        "The JSON is an object keyed by dates (e.g. \"{}\") instead of an array of records. \
                         Move each date into its own record. {}",
                        example, EXPECTED_FORMAT
                    ));
                }
                return ValidationResult::failure(format!(
                    "The JSON must be an array of records, not a single object. {}",
                    EXPECTED_FORMAT
                ));
            }
            Value::Array(items) if items.is_empty() => {
                return ValidationResult::failure(format!("The JSON array is empty. {}", EXPECTED_FORMAT));
            }
            Value::Array(items) => items,
            _ => {
                return ValidationResult::failure(format!(
                    "The JSON must be a non-empty array of objects. {}",
                    EXPECTED_FORMAT
                ));
            }
        };

        let mut rows: Vec<FlatRecord> = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match item {
                Value::Object(map) => rows.push(flatten_object(map)),
                _ => {
                    return ValidationResult::failure(format!(
                        "Item {} is not an object; every array element must be a record. {}",
                        idx + 1,
                        EXPECTED_FORMAT
                    ));
                }
            }
        }

        self.validate_rows(&rows)
    }

    /// Validate already-flattened records.
    pub fn validate_rows(&self, rows: &[FlatRecord]) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let sample = &rows[..rows.len().min(self.config.column_sample_rows)];
        let columns: Vec<String> = sample
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect::<IndexSet<String>>()
            .into_iter()
            .collect();

        let date_columns = detect_date_columns(rows, &columns, &self.config);
        let numeric_columns = detect_numeric_columns(rows, &columns, &date_columns, &self.config);

        if date_columns.is_empty() {
            errors.push(format!(
                "No date column found. At least {:.0}% of sampled values in a column must be dates \
                 such as 2024-01-15, 2024-01-15T10:30:00Z, 15.01.2024 or 24-01-15.",
                self.config.date_ratio * 100.0
            ));
        }
        if numeric_columns.is_empty() {
            errors.push(format!(
                "No numeric column found. At least {:.0}% of sampled values in a column must be numbers.",
                self.config.numeric_ratio * 100.0
            ));
        }

        let first_len = rows.first().map(|r| r.len()).unwrap_or(0);
        if first_len < 2 {
            errors.push(format!(
                "Records need at least 2 fields (a date and a value); the first record has {}.",
                first_len
            ));
        }

        let min_len = rows.iter().map(|r| r.len()).min().unwrap_or(0);
        let max_len = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if min_len != max_len {
            warnings.push(format!(
                "Records have inconsistent field counts (between {} and {} fields).",
                min_len, max_len
            ));
        }

        if !date_columns.is_empty() && !numeric_columns.is_empty() {
            self.check_rows(rows, &date_columns, &numeric_columns, &mut errors, &mut warnings);
        }

        if date_columns.len() > 1 {
            self.check_date_coverage(rows, &date_columns, &mut warnings);
        }

        let detected_format = date_columns.first().and_then(|column| {
            rows.iter()
                .filter_map(|r| r.get(column)?.as_str())
                .find_map(parse_date_string_with_format)
                .map(|(_, format)| format)
        });

        debug!(
            rows = rows.len(),
            date_columns = ?date_columns,
            numeric_columns = ?numeric_columns,
            errors = errors.len(),
            warnings = warnings.len(),
            "validated records"
        );

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            detected_format,
            date_columns,
            numeric_columns,
        }
    }

    /// Every sampled row needs one valid date and one valid number.
    fn check_rows(
        &self,
        rows: &[FlatRecord],
        date_columns: &[String],
        numeric_columns: &[String],
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let sample = &rows[..rows.len().min(self.config.row_sample_rows)];
        if sample.is_empty() {
            return;
        }

        let bad_dates: Vec<usize> = sample
            .iter()
            .enumerate()
            .filter(|(_, row)| !row_has_date(row, date_columns))
            .map(|(idx, _)| idx + 1)
            .collect();
        let bad_numbers: Vec<usize> = sample
            .iter()
            .enumerate()
            .filter(|(_, row)| !numeric_columns.iter().any(|c| row.get(c).and_then(parse_float).is_some()))
            .map(|(idx, _)| idx + 1)
            .collect();

        self.report_bad_rows("valid date", &bad_dates, sample.len(), errors, warnings);
        self.report_bad_rows("valid number", &bad_numbers, sample.len(), errors, warnings);
    }

    fn report_bad_rows(
        &self,
        what: &str,
        bad: &[usize],
        sampled: usize,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        if bad.is_empty() {
            return;
        }
        let ratio = bad.len() as f64 / sampled as f64;
        let examples = bad
            .iter()
            .take(self.config.max_example_rows)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        if ratio > self.config.bad_row_error_ratio {
            errors.push(format!(
                "{} of {} sampled rows ({:.0}%) have no {} (e.g. rows {}).",
                bad.len(),
                sampled,
                ratio * 100.0,
                what,
                examples
            ));
        } else {
            warnings.push(format!(
                "{:.0}% of sampled rows have no {} (e.g. rows {}); they will be skipped.",
                ratio * 100.0,
                what,
                examples
            ));
        }
    }

    /// Several date columns may each be partly empty; warn about how empty.
    fn check_date_coverage(&self, rows: &[FlatRecord], date_columns: &[String], warnings: &mut Vec<String>) {
        let sample = &rows[..rows.len().min(self.config.row_sample_rows)];
        if sample.is_empty() {
            return;
        }
        for column in date_columns {
            let empty = sample
                .iter()
                .filter(|row| row.get(column).is_none_or(is_empty_cell))
                .count();
            if empty > 0 {
                warnings.push(format!(
                    "Date column '{}' is empty in {:.0}% of sampled rows; each row needs a date in at least one date column.",
                    column,
                    empty as f64 / sample.len() as f64 * 100.0
                ));
            }
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn row_has_date(row: &FlatRecord, date_columns: &[String]) -> bool {
    date_columns
        .iter()
        .any(|c| row.get(c).and_then(Value::as_str).is_some_and(is_valid_date_string))
}
