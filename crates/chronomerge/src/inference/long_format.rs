//! Long-format detection: one row per (timestamp, metric) pair.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::LongFormatConfig;
use crate::input::FlatRecord;

use super::roles::rank_name_roles;
use super::values::cell_text;

/// Result of checking a file for long layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongFormatReport {
    /// Column whose values repeat per timestamp.
    pub date_column: String,
    /// Column naming the metric of each row.
    pub category_column: String,
    /// Column holding the measurement.
    pub value_column: String,
    /// Example timestamp that carries several metrics.
    pub example_date: String,
    /// Distinct metrics seen at that timestamp.
    pub categories_at_example: usize,
}

impl LongFormatReport {
    /// Suggestion shown to the user.
    pub fn suggestion(&self) -> String {
        format!(
            "This file looks like long format: timestamp '{}' has {} rows with different '{}' values. \
             Consider pivoting with index '{}', columns '{}' and values '{}'.",
            self.example_date,
            self.categories_at_example,
            self.category_column,
            self.date_column,
            self.category_column,
            self.value_column
        )
    }
}

/// Detects long-layout files worth pivoting.
pub struct LongFormatDetector {
    config: LongFormatConfig,
}

impl LongFormatDetector {
    /// Create a detector with default settings.
    pub fn new() -> Self {
        Self {
            config: LongFormatConfig::default(),
        }
    }

    /// Create a detector with custom settings.
    pub fn with_config(config: LongFormatConfig) -> Self {
        Self { config }
    }

    /// Check flattened records for long layout.
    ///
    /// Requires a date-like, a category-like and a value-like column and more
    /// than two rows; then some timestamp must group at least two rows with
    /// at least two distinct categories.
    pub fn detect(&self, rows: &[FlatRecord], columns: &[String]) -> Option<LongFormatReport> {
        if rows.len() <= 2 {
            return None;
        }
        let (date_column, category_column, value_column) = rank_name_roles(columns).pick()?;

        let sample = &rows[..rows.len().min(self.config.sample_rows)];
        let mut by_date: HashMap<String, (usize, HashSet<String>)> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        for row in sample {
            let Some(date) = row.get(&date_column) else {
                continue;
            };
            let key = cell_text(date);
            let entry = by_date.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (0, HashSet::new())
            });
            entry.0 += 1;
            if let Some(category) = row.get(&category_column) {
                entry.1.insert(cell_text(category));
            }
        }

        order.into_iter().find_map(|date| {
            let (count, categories) = &by_date[&date];
            (*count >= 2 && categories.len() >= 2).then(|| LongFormatReport {
                date_column: date_column.clone(),
                category_column: category_column.clone(),
                value_column: value_column.clone(),
                example_date: date.clone(),
                categories_at_example: categories.len(),
            })
        })
    }
}

impl Default for LongFormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::flatten_value;
    use serde_json::json;

    fn rows(values: Vec<serde_json::Value>) -> Vec<FlatRecord> {
        values.iter().map(|v| flatten_value(v).unwrap()).collect()
    }

    fn columns(rows: &[FlatRecord]) -> Vec<String> {
        rows[0].keys().cloned().collect()
    }

    #[test]
    fn test_detects_long_format() {
        let data = rows(vec![
            json!({"log_date": "2025-01-01", "data_type": 30, "value": 1.0}),
            json!({"log_date": "2025-01-01", "data_type": 31, "value": 2.0}),
            json!({"log_date": "2025-01-02", "data_type": 30, "value": 3.0}),
        ]);
        let report = LongFormatDetector::new().detect(&data, &columns(&data)).unwrap();
        assert_eq!(report.date_column, "log_date");
        assert_eq!(report.category_column, "data_type");
        assert_eq!(report.value_column, "value");
        assert_eq!(report.example_date, "2025-01-01");
        assert_eq!(report.categories_at_example, 2);
        assert!(report.suggestion().contains("pivot"));
    }

    #[test]
    fn test_wide_format_is_not_flagged() {
        let data = rows(vec![
            json!({"log_date": "2025-01-01", "data_type_30": 1.0, "data_type_31": 2.0}),
            json!({"log_date": "2025-01-02", "data_type_30": 3.0, "data_type_31": 4.0}),
            json!({"log_date": "2025-01-03", "data_type_30": 5.0, "data_type_31": 6.0}),
        ]);
        assert!(LongFormatDetector::new().detect(&data, &columns(&data)).is_none());
    }

    #[test]
    fn test_repeated_dates_same_category_not_flagged() {
        let data = rows(vec![
            json!({"date": "2025-01-01", "sensor": "a", "reading": 1.0}),
            json!({"date": "2025-01-01", "sensor": "a", "reading": 2.0}),
            json!({"date": "2025-01-02", "sensor": "a", "reading": 3.0}),
        ]);
        assert!(LongFormatDetector::new().detect(&data, &columns(&data)).is_none());
    }

    #[test]
    fn test_two_rows_never_flagged() {
        let data = rows(vec![
            json!({"date": "2025-01-01", "sensor": "a", "reading": 1.0}),
            json!({"date": "2025-01-01", "sensor": "b", "reading": 2.0}),
        ]);
        assert!(LongFormatDetector::new().detect(&data, &columns(&data)).is_none());
    }
}
