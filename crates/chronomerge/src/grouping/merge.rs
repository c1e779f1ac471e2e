//! Mapping validation and the date-keyed merge.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::inference::{cell_text, parse_date_value, parse_float, to_iso_key};
use crate::input::FileConfig;

use super::groups::{Group, GroupSet};
use super::output::GroupedData;

/// Mapping problems keyed by `{groupId}-{fileKey}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingErrors(IndexMap<String, String>);

impl MappingErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key under which a (group, file) problem is stored.
    pub fn key(group_id: &str, file_key: &str) -> String {
        format!("{}-{}", group_id, file_key)
    }

    /// Record a problem for a (group, file) cell.
    pub fn insert(&mut self, group_id: &str, file_key: &str, message: impl Into<String>) {
        self.0.insert(Self::key(group_id, file_key), message.into());
    }

    /// Problem recorded for a (group, file) cell.
    pub fn get(&self, group_id: &str, file_key: &str) -> Option<&str> {
        self.0.get(&Self::key(group_id, file_key)).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate `(key, message)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for MappingErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.values().map(|s| s.as_str()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Check group names, then the first value of every assigned column.
///
/// Names must be non-blank and unique ignoring case; those checks run first
/// and fail fast. For each (group, file) pair with a column, the first
/// non-null cell must read as a date (date group) or a number (other groups).
pub fn validate_data_mappings(
    groups: &GroupSet,
    files: &IndexMap<String, FileConfig>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for group in groups.groups() {
        let name = group.name.trim();
        if name.is_empty() {
            return Err(ImportError::GroupName(format!(
                "Group '{}' must have a name",
                group.id
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ImportError::GroupName(format!(
                "Group name '{}' is used more than once",
                name
            )));
        }
    }

    let mut errors = MappingErrors::new();
    for group in groups.groups() {
        for (file_key, config) in files {
            let Some(column) = group.column_for(file_key) else {
                continue;
            };
            let Some(cell) = first_value(config, column) else {
                continue;
            };

            if group.is_date() {
                if parse_date_value(cell).is_none() {
                    errors.insert(
                        &group.id,
                        file_key,
                        format!(
                            "Column '{}' of '{}' does not hold dates (found '{}')",
                            column,
                            file_key,
                            cell_text(cell)
                        ),
                    );
                }
            } else if parse_float(cell).is_none() {
                errors.insert(
                    &group.id,
                    file_key,
                    format!(
                        "Column '{}' of '{}' does not hold numbers (found '{}')",
                        column,
                        file_key,
                        cell_text(cell)
                    ),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        debug!(count = errors.len(), "mapping validation failed");
        Err(ImportError::Mapping(errors))
    }
}

/// Merge every file into one structure keyed by ISO date, group and file.
///
/// Rows whose date cell is missing or unreadable are skipped. Unmapped or
/// missing value cells and cells that do not read as numbers contribute
/// nothing. A later row with the same (date, group, file) overwrites an
/// earlier one.
pub fn group_and_transform_data(
    groups: &GroupSet,
    files: &IndexMap<String, FileConfig>,
) -> GroupedData {
    let mut merged = GroupedData::new();
    let value_groups: Vec<&Group> = groups.value_groups().collect();
    let Some(date_group) = groups.date_group() else {
        return merged;
    };

    for (file_key, config) in files {
        let Some(date_column) = date_group.column_for(file_key) else {
            debug!(file = %file_key, "no date column mapped, skipping file");
            continue;
        };

        let mut skipped = 0usize;
        for row in &config.raw_data {
            let Some(instant) = row.get(date_column).and_then(parse_date_value) else {
                skipped += 1;
                continue;
            };
            let key = to_iso_key(&instant);

            for group in &value_groups {
                let Some(column) = group.column_for(file_key) else {
                    continue;
                };
                let Some(value) = row.get(column).and_then(parse_float) else {
                    continue;
                };
                merged.insert(&key, &group.name, file_key, value);
            }
        }

        if skipped > 0 {
            debug!(file = %file_key, skipped, "rows without a readable date");
        }
    }

    info!(
        dates = merged.len(),
        files = files.len(),
        groups = value_groups.len(),
        "merged grouped data"
    );
    merged
}

fn first_value<'a>(config: &'a FileConfig, column: &str) -> Option<&'a Value> {
    config
        .raw_data
        .iter()
        .filter_map(|row| row.get(column))
        .find(|v| !v.is_null())
}
