//! The merged, date-keyed result handed to the host.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};
use crate::inference::parse_date_string;

/// group name -> file display key -> value
pub type GroupValues = IndexMap<String, IndexMap<String, f64>>;

/// `{ isoDate: { groupName: { fileKey: number } } }`, ordered by date.
///
/// Keys are canonical `YYYY-MM-DDTHH:mm:ss.sssZ` strings, so lexical order is
/// chronological.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedData(BTreeMap<String, GroupValues>);

/// Selection over grouped data. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesQuery {
    /// Only this instant.
    pub time: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<String>,
    /// Inclusive upper bound.
    pub end: Option<String>,
    /// Only this group.
    pub group: Option<String>,
    /// Only this file.
    pub file: Option<String>,
}

impl TimeSeriesQuery {
    /// Query everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl GroupedData {
    /// Create an empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, overwriting any previous one for the same triple.
    pub fn insert(&mut self, iso_date: &str, group: &str, file_key: &str, value: f64) {
        self.0
            .entry(iso_date.to_string())
            .or_default()
            .entry(group.to_string())
            .or_default()
            .insert(file_key.to_string(), value);
    }

    /// Values recorded at an ISO date key.
    pub fn get(&self, iso_date: &str) -> Option<&GroupValues> {
        self.0.get(iso_date)
    }

    /// Number of distinct dates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate dates in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &GroupValues)> {
        self.0.iter()
    }

    /// Distinct group names in first-seen order.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for groups in self.0.values() {
            for name in groups.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Distinct file keys in first-seen order.
    pub fn file_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for groups in self.0.values() {
            for files in groups.values() {
                for key in files.keys() {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
            }
        }
        keys
    }

    /// Select a subset of the data.
    ///
    /// Dates are compared as instants, so any recognizable spelling works.
    /// Dates left with no values are dropped.
    pub fn filter(&self, query: &TimeSeriesQuery) -> Result<GroupedData> {
        let time = parse_bound(query.time.as_deref(), "time")?;
        let start = parse_bound(query.start.as_deref(), "start")?;
        let end = parse_bound(query.end.as_deref(), "end")?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ImportError::InvalidDate(format!(
                    "Start date {} is after end date {}",
                    query.start.as_deref().unwrap_or_default(),
                    query.end.as_deref().unwrap_or_default()
                )));
            }
        }

        let mut selected = BTreeMap::new();
        for (key, groups) in &self.0 {
            let Some(instant) = parse_date_string(key) else {
                continue;
            };
            if time.is_some_and(|t| t != instant)
                || start.is_some_and(|s| instant < s)
                || end.is_some_and(|e| instant > e)
            {
                continue;
            }

            let mut kept = GroupValues::new();
            for (name, files) in groups {
                if query.group.as_deref().is_some_and(|g| g != name) {
                    continue;
                }
                let files: IndexMap<String, f64> = files
                    .iter()
                    .filter(|(file, _)| query.file.as_deref().is_none_or(|f| f == file.as_str()))
                    .map(|(file, value)| (file.clone(), *value))
                    .collect();
                if !files.is_empty() {
                    kept.insert(name.clone(), files);
                }
            }
            if !kept.is_empty() {
                selected.insert(key.clone(), kept);
            }
        }

        Ok(GroupedData(selected))
    }

    /// Write as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ImportError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file = File::create(path).map_err(|e| ImportError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read data previously written by [`GroupedData::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ImportError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

fn parse_bound(value: Option<&str>, label: &str) -> Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(text) => parse_date_string(text)
            .map(Some)
            .ok_or_else(|| ImportError::InvalidDate(format!("{} '{}' is not a date", label, text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> GroupedData {
        let mut data = GroupedData::new();
        data.insert("2024-01-01T00:00:00.000Z", "Temp", "a", 1.0);
        data.insert("2024-01-01T00:00:00.000Z", "Temp", "b", 2.0);
        data.insert("2024-01-02T00:00:00.000Z", "Temp", "a", 3.0);
        data.insert("2024-01-02T00:00:00.000Z", "Humidity", "b", 40.0);
        data.insert("2024-01-03T00:00:00.000Z", "Humidity", "a", 41.0);
        data
    }

    #[test]
    fn test_filter_by_interval_is_inclusive() {
        let query = TimeSeriesQuery::new()
            .with_start("2024-01-01")
            .with_end("2024-01-02T00:00:00Z");
        let filtered = sample().filter(&query).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.get("2024-01-03T00:00:00.000Z").is_none());
    }

    #[test]
    fn test_filter_by_group_and_file_drops_empty_dates() {
        let filtered = sample()
            .filter(&TimeSeriesQuery::new().with_group("Humidity").with_file("a"))
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get("2024-01-03T00:00:00.000Z").unwrap()["Humidity"]["a"], 41.0);
    }

    #[test]
    fn test_filter_exact_time() {
        let filtered = sample()
            .filter(&TimeSeriesQuery::new().with_time("2024-01-02"))
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.group_names(), vec!["Temp", "Humidity"]);
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let query = TimeSeriesQuery::new().with_start("2024-02-01").with_end("2024-01-01");
        assert!(matches!(sample().filter(&query), Err(ImportError::InvalidDate(_))));
        let query = TimeSeriesQuery::new().with_start("soon");
        assert!(sample().filter(&query).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("grouped.json");
        let data = sample();
        data.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n"));
        assert_eq!(GroupedData::load(&path).unwrap(), data);
    }

    #[test]
    fn test_names_and_keys() {
        let data = sample();
        assert_eq!(data.group_names(), vec!["Temp", "Humidity"]);
        assert_eq!(data.file_keys(), vec!["a", "b"]);
    }
}
