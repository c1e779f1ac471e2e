//! Column-role heuristics: which columns hold dates, numbers, categories.
//!
//! Everything here returns ranked candidate lists rather than a single guess so
//! callers can pick, override, or assert on membership.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ValidatorConfig;
use crate::input::FlatRecord;

use super::dates::is_valid_date_string;
use super::values::{is_empty_cell, parse_float};

/// Column names that suggest a timestamp, used to relax the date threshold.
static DATE_HINT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)date|time|timestamp|created|updated|log").unwrap());

/// Date-like names for long-format detection.
static LONG_DATE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)date|time").unwrap());

/// Names of columns that identify what a row measures.
static CATEGORY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)name|type|metric|category|sensor").unwrap());

/// Names of columns that hold the measurement itself.
static VALUE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)value|reading|measure|data|^y$").unwrap());

/// Candidate columns per role, judged by column name only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRoles {
    /// Columns named like dates or times.
    pub date: Vec<String>,
    /// Columns named like categories, excluding date candidates.
    pub category: Vec<String>,
    /// Columns named like values, excluding date candidates.
    pub value: Vec<String>,
}

impl NameRoles {
    /// Pick one distinct column per role, if every role has a candidate.
    pub fn pick(&self) -> Option<(String, String, String)> {
        let date = self.date.first()?;
        let category = self.category.iter().find(|c| *c != date)?;
        let value = self
            .value
            .iter()
            .find(|c| *c != date && *c != category)?;
        Some((date.clone(), category.clone(), value.clone()))
    }
}

/// Classify columns by name for long-format detection.
pub fn rank_name_roles(columns: &[String]) -> NameRoles {
    let date: Vec<String> = columns
        .iter()
        .filter(|c| LONG_DATE_NAME.is_match(c))
        .cloned()
        .collect();
    let not_date = |c: &&String| !date.contains(*c);

    let category = columns
        .iter()
        .filter(not_date)
        .filter(|c| CATEGORY_NAME.is_match(c))
        .cloned()
        .collect();
    let value = columns
        .iter()
        .filter(not_date)
        .filter(|c| VALUE_NAME.is_match(c))
        .cloned()
        .collect();

    NameRoles {
        date,
        category,
        value,
    }
}

/// Whether a column name hints at a timestamp.
pub fn is_date_hint_name(name: &str) -> bool {
    DATE_HINT_NAME.is_match(name)
}

/// Columns whose sampled values are mostly dates, in column order.
///
/// Empty cells are ignored rather than counted as failures.
pub fn detect_date_columns(
    rows: &[FlatRecord],
    columns: &[String],
    config: &ValidatorConfig,
) -> Vec<String> {
    let sample = &rows[..rows.len().min(config.column_sample_rows)];

    columns
        .iter()
        .filter(|column| {
            let (hits, total) = count_matches(sample, column, |v| {
                v.as_str().is_some_and(is_valid_date_string)
            });
            if total == 0 {
                return false;
            }
            let ratio = hits as f64 / total as f64;
            ratio >= config.date_ratio
                || (is_date_hint_name(column) && ratio >= config.named_date_ratio)
        })
        .cloned()
        .collect()
}

/// Columns whose sampled values mostly read as numbers, in column order.
///
/// Strings count when they start with a number, so `"12.5 C"` qualifies.
pub fn detect_numeric_columns(
    rows: &[FlatRecord],
    columns: &[String],
    exclude: &[String],
    config: &ValidatorConfig,
) -> Vec<String> {
    let sample = &rows[..rows.len().min(config.column_sample_rows)];

    columns
        .iter()
        .filter(|column| !exclude.contains(column))
        .filter(|column| {
            let (hits, total) = count_matches(sample, column, |v| parse_float(v).is_some());
            total > 0 && hits as f64 / total as f64 >= config.numeric_ratio
        })
        .cloned()
        .collect()
}

/// Best-guess date and value columns for a freshly loaded file.
///
/// Dates prefer detected date columns with a date-like name. Values prefer
/// numeric columns named like measurements over ones named like categories.
pub fn default_columns(
    rows: &[FlatRecord],
    columns: &[String],
    config: &ValidatorConfig,
) -> (String, String) {
    let dates = detect_date_columns(rows, columns, config);
    let date = dates
        .iter()
        .find(|c| is_date_hint_name(c))
        .or_else(|| dates.first())
        .or_else(|| columns.iter().find(|c| is_date_hint_name(c)))
        .or_else(|| columns.first())
        .cloned()
        .unwrap_or_default();

    let numeric = detect_numeric_columns(rows, columns, std::slice::from_ref(&date), config);
    let rank = |c: &String| match (VALUE_NAME.is_match(c), CATEGORY_NAME.is_match(c)) {
        (true, false) => 0,
        (false, false) => 1,
        _ => 2,
    };
    let value = numeric
        .iter()
        .min_by_key(|c| rank(c))
        .or_else(|| columns.iter().find(|c| **c != date))
        .cloned()
        .unwrap_or_default();

    (date, value)
}

fn count_matches(
    sample: &[FlatRecord],
    column: &str,
    matches: impl Fn(&serde_json::Value) -> bool,
) -> (usize, usize) {
    let mut hits = 0;
    let mut total = 0;
    for row in sample {
        let Some(value) = row.get(column) else {
            continue;
        };
        if is_empty_cell(value) {
            continue;
        }
        total += 1;
        if matches(value) {
            hits += 1;
        }
    }
    (hits, total)
}
