//! In-process pivot with the same contract as the remote endpoint.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::{ImportError, Result};
use crate::inference::{cell_text, is_empty_cell, strict_number};
use crate::input::{FlatRecord, Parser, UploadedFile};

use super::provider::{PivotRequest, PivotService};

/// Pivots files locally.
///
/// Duplicate (index, category) pairs are averaged, new columns are named
/// `{columns_col}_{category}`, rows come out ordered by index, and cells with
/// no observation are `null`.
pub struct LocalPivotService {
    parser: Parser,
}

impl LocalPivotService {
    /// Create a local pivot service.
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Pivot already-parsed records.
    pub fn pivot_records(&self, records: &[FlatRecord], request: &PivotRequest) -> Result<Vec<FlatRecord>> {
        let present: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.keys().map(|k| k.as_str()))
            .collect();
        let missing: Vec<&str> = [&request.index_col, &request.columns_col, &request.values_col]
            .into_iter()
            .map(|c| c.as_str())
            .filter(|c| !present.contains(c))
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::Pivot(format!(
                "Missing columns in the data: {}",
                missing.join(", ")
            )));
        }

        // index -> category -> (sum, count)
        let mut cells: IndexMap<String, IndexMap<String, (f64, usize)>> = IndexMap::new();
        let mut categories: BTreeSet<String> = BTreeSet::new();

        for record in records {
            let (Some(index), Some(category), Some(value)) = (
                record.get(&request.index_col),
                record.get(&request.columns_col),
                record.get(&request.values_col),
            ) else {
                continue;
            };
            if is_empty_cell(index) || is_empty_cell(category) {
                continue;
            }
            let Some(value) = strict_number(value) else {
                continue;
            };

            let category = cell_text(category);
            categories.insert(category.clone());
            let slot = cells
                .entry(cell_text(index))
                .or_default()
                .entry(category)
                .or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }

        let mut indexes: Vec<&String> = cells.keys().collect();
        indexes.sort_by(|a, b| compare_index(a, b));

        let rows: Vec<FlatRecord> = indexes
            .into_iter()
            .map(|index| {
                let mut row = FlatRecord::new();
                row.insert(request.index_col.clone(), Value::String(index.clone()));
                let observed = &cells[index];
                for category in &categories {
                    let cell = observed
                        .get(category)
                        .and_then(|(sum, count)| Number::from_f64(sum / *count as f64))
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                    row.insert(format!("{}_{}", request.columns_col, category), cell);
                }
                row
            })
            .collect();

        if rows.is_empty() {
            return Err(ImportError::Pivot("Pivot produced no rows".to_string()));
        }

        debug!(
            rows = rows.len(),
            columns = categories.len(),
            "pivoted records locally"
        );
        Ok(rows)
    }
}

impl Default for LocalPivotService {
    fn default() -> Self {
        Self::new()
    }
}

impl PivotService for LocalPivotService {
    fn pivot(&self, file: &UploadedFile, request: &PivotRequest) -> Result<Vec<FlatRecord>> {
        let parsed = self
            .parser
            .parse_file(file)
            .result
            .map_err(|e| ImportError::Pivot(format!("Error processing file: {}", e)))?;
        self.pivot_records(&parsed.records, request)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Numeric indexes sort numerically, everything else as text.
fn compare_index(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn long_csv() -> UploadedFile {
        UploadedFile::new(
            "long.csv",
            "log_date,data_type,value\n\
             2025-01-02,30,3\n\
             2025-01-01,30,1\n\
             2025-01-01,31,2\n\
             2025-01-01,31,4\n",
        )
    }

    #[test]
    fn test_pivot_averages_and_orders() {
        let rows = LocalPivotService::new()
            .pivot(&long_csv(), &PivotRequest::new("log_date", "data_type", "value"))
            .unwrap();

        assert_eq!(rows.len(), 2);
        let keys: Vec<&str> = rows[0].keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["log_date", "data_type_30", "data_type_31"]);

        assert_eq!(rows[0]["log_date"], json!("2025-01-01"));
        assert_eq!(rows[0]["data_type_30"], json!(1.0));
        assert_eq!(rows[0]["data_type_31"], json!(3.0));
        assert_eq!(rows[1]["log_date"], json!("2025-01-02"));
        assert_eq!(rows[1]["data_type_31"], Value::Null);
    }

    #[test]
    fn test_missing_columns_are_named() {
        let err = LocalPivotService::new()
            .pivot(&long_csv(), &PivotRequest::new("log_date", "sensor", "reading"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Pivot failed: Missing columns in the data: sensor, reading"
        );
    }

    #[test]
    fn test_numeric_index_sorts_numerically() {
        assert_eq!(compare_index("9", "10"), Ordering::Less);
        assert_eq!(compare_index("b", "a"), Ordering::Greater);
    }
}
