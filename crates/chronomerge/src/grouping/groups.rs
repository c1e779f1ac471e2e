//! Comparison groups and their per-file column assignments.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ImportError, Result};
use crate::input::FileConfig;

/// Id of the mandatory date group.
pub const DATE_GROUP_ID: &str = "date";

/// Id of the first value group.
pub const VALUE_GROUP_ID: &str = "value";

/// Fixed name of the date group.
pub const DATE_GROUP_NAME: &str = "Date";

/// A named series that each file feeds through one chosen column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Immutable identifier.
    pub id: String,
    /// User-facing name; unique case-insensitively.
    pub name: String,
    /// Display key -> assigned column (`None` when unmapped).
    pub file_mappings: IndexMap<String, Option<String>>,
}

impl Group {
    fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_mappings: IndexMap::new(),
        }
    }

    /// Whether this is the date group.
    pub fn is_date(&self) -> bool {
        self.id == DATE_GROUP_ID
    }

    /// Column assigned for a file, if any.
    pub fn column_for(&self, file_key: &str) -> Option<&str> {
        self.file_mappings.get(file_key).and_then(|c| c.as_deref())
    }
}

/// The ordered list of groups in a session.
///
/// The date group is always first and the list is never empty once
/// initialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSet {
    groups: Vec<Group>,
    next_index: usize,
    #[serde(default)]
    name_errors: IndexMap<String, String>,
}

impl GroupSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up groups for the loaded files.
    ///
    /// The first call creates the Date group (fed by each file's date column)
    /// and "Value Group 1" (fed by each file's value column). Later calls keep
    /// user edits, map newly loaded files the same way and forget files that
    /// are no longer loaded.
    pub fn initialize(&mut self, files: &IndexMap<String, FileConfig>) {
        if self.groups.is_empty() {
            self.groups.push(Group::new(DATE_GROUP_ID, DATE_GROUP_NAME));
            self.groups.push(Group::new(VALUE_GROUP_ID, "Value Group 1"));
            self.next_index = 2;
        }

        for group in &mut self.groups {
            group.file_mappings.retain(|key, _| files.contains_key(key));
            for (key, config) in files {
                if group.file_mappings.contains_key(key) {
                    continue;
                }
                let column = match group.id.as_str() {
                    DATE_GROUP_ID => non_empty(&config.date_column),
                    VALUE_GROUP_ID => non_empty(&config.value_column),
                    _ => None,
                };
                group.file_mappings.insert(key.clone(), column);
            }
        }

        debug!(
            groups = self.groups.len(),
            files = files.len(),
            "initialized groups"
        );
    }

    /// All groups, date group first.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Look up a group by id.
    pub fn get(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// The date group, once initialized.
    pub fn date_group(&self) -> Option<&Group> {
        self.get(DATE_GROUP_ID)
    }

    /// Groups other than the date group.
    pub fn value_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| !g.is_date())
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups exist yet.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Append a new value group with every file unmapped.
    ///
    /// Returns the new group's id.
    pub fn add_group(&mut self) -> String {
        let file_keys: Vec<String> = self
            .groups
            .first()
            .map(|g| g.file_mappings.keys().cloned().collect())
            .unwrap_or_default();

        let mut index = self.next_index.max(2);
        let name = loop {
            let candidate = format!("Value Group {}", index);
            if !self.name_taken(&candidate, None) {
                break candidate;
            }
            index += 1;
        };
        let id = format!("group-{}", self.next_index.max(2));
        self.next_index = self.next_index.max(2) + 1;

        let mut group = Group::new(id.clone(), name);
        group.file_mappings = file_keys.into_iter().map(|k| (k, None)).collect();
        self.groups.push(group);
        id
    }

    /// Remove a value group.
    ///
    /// The date group is permanent. The first value group may only go when
    /// `value_group_removable` is set and another value group remains.
    pub fn remove_group(&mut self, id: &str, value_group_removable: bool) -> Result<()> {
        if id == DATE_GROUP_ID {
            return Err(ImportError::Group("The Date group cannot be removed".to_string()));
        }
        if id == VALUE_GROUP_ID {
            let others = self.value_groups().filter(|g| g.id != VALUE_GROUP_ID).count();
            if !value_group_removable || others == 0 {
                return Err(ImportError::Group(
                    "The first value group cannot be removed".to_string(),
                ));
            }
        }

        let position = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| ImportError::Group(format!("Unknown group '{}'", id)))?;
        self.groups.remove(position);
        self.name_errors.shift_remove(id);
        Ok(())
    }

    /// Rename a group.
    ///
    /// Empty names and names already used by another group (ignoring case)
    /// are rejected; the list is left untouched and the error is recorded
    /// against the group.
    pub fn rename_group(&mut self, id: &str, name: &str) -> Result<()> {
        if id == DATE_GROUP_ID {
            return Err(ImportError::Group("The Date group cannot be renamed".to_string()));
        }
        if self.get(id).is_none() {
            return Err(ImportError::Group(format!("Unknown group '{}'", id)));
        }

        let name = name.trim();
        let problem = if name.is_empty() {
            Some("Group name cannot be empty".to_string())
        } else if self.name_taken(name, Some(id)) {
            Some(format!("A group named '{}' already exists", name))
        } else {
            None
        };
        if let Some(message) = problem {
            self.name_errors.insert(id.to_string(), message.clone());
            return Err(ImportError::GroupName(message));
        }

        self.name_errors.shift_remove(id);
        if let Some(group) = self.groups.iter_mut().find(|g| g.id == id) {
            group.name = name.to_string();
        }
        Ok(())
    }

    /// Error recorded by the last failed rename of a group.
    pub fn name_error(&self, id: &str) -> Option<&str> {
        self.name_errors.get(id).map(|s| s.as_str())
    }

    /// Assign a column of a file to a group, or unmap it with `None`.
    ///
    /// A column may feed at most one group per file.
    pub fn set_mapping(&mut self, id: &str, file_key: &str, column: Option<String>) -> Result<()> {
        if self.get(id).is_none() {
            return Err(ImportError::Group(format!("Unknown group '{}'", id)));
        }
        if let Some(column) = column.as_deref() {
            if let Some(owner) = self
                .groups
                .iter()
                .find(|g| g.id != id && g.column_for(file_key) == Some(column))
            {
                return Err(ImportError::Group(format!(
                    "Column '{}' of '{}' is already used by group '{}'",
                    column, file_key, owner.name
                )));
            }
        }

        if let Some(group) = self.groups.iter_mut().find(|g| g.id == id) {
            group.file_mappings.insert(file_key.to_string(), column);
        }
        Ok(())
    }

    /// Columns a group may still pick for a file.
    ///
    /// Excludes columns claimed by other groups for the same file but keeps
    /// the group's own current choice.
    pub fn available_columns(&self, id: &str, file_key: &str, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .filter(|c| {
                !self
                    .groups
                    .iter()
                    .any(|g| g.id != id && g.column_for(file_key) == Some(c.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Move every mapping from one display key to another, in place.
    pub fn rename_file_key(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        for group in &mut self.groups {
            if let Some(index) = group.file_mappings.get_index_of(old) {
                let column = group.file_mappings[index].clone();
                group.file_mappings.insert(new.to_string(), column);
                let last = group.file_mappings.len() - 1;
                group.file_mappings.move_index(last, index);
                group.file_mappings.shift_remove(old);
            }
        }
    }

    /// Forget a file in every group.
    pub fn remove_file(&mut self, file_key: &str) {
        for group in &mut self.groups {
            group.file_mappings.shift_remove(file_key);
        }
    }

    fn name_taken(&self, name: &str, except: Option<&str>) -> bool {
        let lowered = name.to_lowercase();
        self.groups
            .iter()
            .any(|g| Some(g.id.as_str()) != except && g.name.to_lowercase() == lowered)
    }
}

fn non_empty(column: &str) -> Option<String> {
    (!column.is_empty()).then(|| column.to_string())
}
