//! The import wizard: per-file preview, pivoting, renaming, grouping, merge.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::grouping::{
    GroupSet, GroupedData, MappingErrors, group_and_transform_data, validate_data_mappings,
};
use crate::inference::{LongFormatDetector, default_columns, rank_name_roles};
use crate::input::{FileConfig, FlatRecord, Parser, UploadedFile};
use crate::pivot::{PivotRequest, PivotService};
use crate::validation::SchemaValidator;

use super::state::{
    FailureKind, FileEntry, FileFailure, FileStatus, LoadedFile, NextOutcome, PivotState,
    WizardStep,
};

/// Drives one import session over a fixed batch of files.
///
/// Files load one at a time, in order, as the wizard reaches them. Failed
/// files can always be skipped; they simply take no part in grouping.
pub struct ImportWizard {
    config: ImportConfig,
    parser: Parser,
    validator: SchemaValidator,
    detector: LongFormatDetector,
    pivot_service: Option<Arc<dyn PivotService>>,
    files: Vec<FileEntry>,
    step: WizardStep,
    current: usize,
    pivot: HashMap<String, PivotState>,
    selection: PivotRequest,
    rename_error: Option<String>,
    groups: GroupSet,
    mapping_errors: MappingErrors,
}

impl ImportWizard {
    /// Create a wizard with default configuration and no pivot service.
    pub fn new() -> Self {
        Self::with_config(ImportConfig::default())
    }

    /// Create a wizard with custom configuration.
    pub fn with_config(config: ImportConfig) -> Self {
        Self {
            parser: Parser::with_config(config.parser.clone()),
            validator: SchemaValidator::with_config(config.validator.clone()),
            detector: LongFormatDetector::with_config(config.long_format.clone()),
            config,
            pivot_service: None,
            files: Vec::new(),
            step: WizardStep::Closed,
            current: 0,
            pivot: HashMap::new(),
            selection: PivotRequest::default(),
            rename_error: None,
            groups: GroupSet::new(),
            mapping_errors: MappingErrors::new(),
        }
    }

    /// Use a pivot service for long-to-wide reshaping.
    pub fn with_pivot_service(mut self, service: impl PivotService + 'static) -> Self {
        self.pivot_service = Some(Arc::new(service));
        self
    }

    /// Use an already shared pivot service.
    pub fn with_shared_pivot_service(mut self, service: Arc<dyn PivotService>) -> Self {
        self.pivot_service = Some(service);
        self
    }

    /// Start a session: discard all state, then load the first file.
    ///
    /// Opening with no files leaves the wizard closed.
    pub fn open(&mut self, files: Vec<UploadedFile>) {
        self.reset();
        if files.is_empty() {
            return;
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        for file in files {
            let base = file.stable_id();
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let identity = if *count == 1 {
                base
            } else {
                format!("{} ({})", base, count)
            };
            self.files.push(FileEntry::new(file, identity));
        }

        info!(files = self.files.len(), "import wizard opened");
        self.step = WizardStep::FilePreview(0);
        self.load(0);
    }

    /// Close the session without a result.
    pub fn cancel(&mut self) {
        info!("import wizard cancelled");
        self.reset();
    }

    /// Current step.
    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Index of the file being previewed (or last previewed).
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of files in the session.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Load status of a file.
    pub fn status(&self, index: usize) -> Option<&FileStatus> {
        self.files.get(index).map(|e| &e.status)
    }

    /// Stable identity of a file.
    pub fn identity(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(|e| e.identity.as_str())
    }

    /// Display key of a file: its identity or the name it was renamed to.
    pub fn display_key(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(|e| e.display_key())
    }

    /// Pivot bookkeeping for a file.
    pub fn pivot_state(&self, index: usize) -> Option<&PivotState> {
        self.files
            .get(index)
            .and_then(|e| self.pivot.get(&e.identity))
    }

    /// The pivot columns currently chosen.
    pub fn pivot_selection(&self) -> &PivotRequest {
        &self.selection
    }

    /// Pending rename conflict, if any.
    pub fn rename_error(&self) -> Option<&str> {
        self.rename_error.as_deref()
    }

    /// Mapping problems from the last failed finish.
    pub fn mapping_errors(&self) -> &MappingErrors {
        &self.mapping_errors
    }

    pub fn groups(&self) -> &GroupSet {
        &self.groups
    }

    /// Direct access to the groups. Mappings set here are not checked against
    /// the loaded files; prefer [`ImportWizard::set_mapping`].
    pub fn groups_mut(&mut self) -> &mut GroupSet {
        &mut self.groups
    }

    /// Map a column of a loaded file to a group, or unmap it with `None`.
    ///
    /// The file key must name a loaded file and the column must be one of its
    /// columns not already claimed by another group.
    pub fn set_mapping(&mut self, group_id: &str, file_key: &str, column: Option<String>) -> Result<()> {
        let loaded = self
            .files
            .iter()
            .find(|e| e.display_key() == file_key)
            .and_then(|e| e.status.loaded())
            .ok_or_else(|| ImportError::Group(format!("No loaded file named '{}'", file_key)))?;

        if let Some(column) = column.as_deref() {
            if !loaded.columns.iter().any(|c| c == column) {
                return Err(ImportError::Group(format!(
                    "Column '{}' not found in '{}' (columns: {})",
                    column,
                    file_key,
                    loaded.columns.join(", ")
                )));
            }
        }
        self.groups.set_mapping(group_id, file_key, column)
    }

    /// Remove a value group, honoring the removable-first-group setting.
    pub fn remove_group(&mut self, id: &str) -> Result<()> {
        self.groups
            .remove_group(id, self.config.features.value_group_removable)
    }

    /// Columns a group may still choose for a loaded file.
    pub fn available_columns(&self, group_id: &str, file_key: &str) -> Vec<String> {
        self.files
            .iter()
            .find(|e| e.display_key() == file_key)
            .and_then(|e| e.status.loaded())
            .map(|loaded| {
                self.groups
                    .available_columns(group_id, file_key, &loaded.columns)
            })
            .unwrap_or_default()
    }

    /// Loaded files keyed by display key, in file order.
    pub fn file_configs(&self) -> IndexMap<String, FileConfig> {
        self.files
            .iter()
            .filter_map(|e| {
                e.status
                    .loaded()
                    .map(|loaded| (e.display_key().to_string(), loaded.config.clone()))
            })
            .collect()
    }

    /// Whether "Next" is currently allowed.
    ///
    /// Blocked while the file is loading, while a rename conflict is pending,
    /// during a pivot request, and in pivot mode with an unresolved pivot
    /// error. A failed file never blocks.
    pub fn can_advance(&self) -> bool {
        let WizardStep::FilePreview(index) = self.step else {
            return false;
        };
        let Some(entry) = self.files.get(index) else {
            return false;
        };
        if matches!(entry.status, FileStatus::Loading) || self.rename_error.is_some() {
            return false;
        }
        match self.pivot.get(&entry.identity) {
            Some(state) => !state.in_flight && !(state.mode && state.error.is_some()),
            None => true,
        }
    }

    /// Move forward.
    pub fn next(&mut self) -> Result<NextOutcome> {
        let WizardStep::FilePreview(index) = self.step else {
            return Err(ImportError::Wizard("Next is only available while previewing files".to_string()));
        };
        if !self.can_advance() {
            return Err(ImportError::Wizard("Resolve the current file before continuing".to_string()));
        }

        if index + 1 < self.files.len() {
            self.go_to(index + 1);
            return Ok(NextOutcome::Advanced(index + 1));
        }

        let configs = self.file_configs();
        if configs.is_empty() {
            warn!(files = self.files.len(), "no file could be loaded, closing wizard");
            self.reset();
            return Ok(NextOutcome::NoValidFiles);
        }

        self.groups.initialize(&configs);
        self.mapping_errors = MappingErrors::new();
        self.step = WizardStep::ColumnConfig;
        info!(files = configs.len(), "entered column configuration");
        Ok(NextOutcome::EnteredColumnConfig)
    }

    /// Move backward. A no-op on the first file.
    pub fn back(&mut self) {
        match self.step {
            WizardStep::FilePreview(index) if index > 0 => self.go_to(index - 1),
            WizardStep::ColumnConfig => {
                self.step = WizardStep::FilePreview(self.current);
                self.clear_transient();
            }
            _ => {}
        }
    }

    /// Rename a file's display key.
    ///
    /// Renaming to the current name changes nothing. A name taken by another
    /// file is rejected and leaves a pending conflict that blocks "Next" until
    /// a valid rename or [`ImportWizard::cancel_rename`].
    pub fn rename_file(&mut self, index: usize, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        let Some(entry) = self.files.get(index) else {
            return Err(ImportError::Wizard(format!("No file at index {}", index)));
        };
        if new_name.is_empty() {
            return Err(ImportError::Wizard("File name cannot be empty".to_string()));
        }

        let old_key = entry.display_key().to_string();
        if new_name == old_key {
            self.rename_error = None;
            return Ok(());
        }

        let taken = self
            .files
            .iter()
            .enumerate()
            .any(|(i, e)| i != index && e.display_key() == new_name);
        if taken {
            let err = ImportError::RenameConflict(new_name.to_string());
            self.rename_error = Some(err.to_string());
            return Err(err);
        }

        let entry = &mut self.files[index];
        entry.rename = (new_name != entry.identity).then(|| new_name.to_string());
        self.groups.rename_file_key(&old_key, new_name);
        self.mapping_errors = MappingErrors::new();
        self.rename_error = None;
        info!(from = %old_key, to = %new_name, "renamed file");
        Ok(())
    }

    /// Abandon a conflicting rename.
    pub fn cancel_rename(&mut self) {
        self.rename_error = None;
    }

    /// Switch pivot mode for the current file.
    ///
    /// Switching off restores the rows as first loaded and re-derives the
    /// default date and value columns; nothing is re-read.
    pub fn set_pivot_mode(&mut self, on: bool) -> Result<()> {
        if !self.config.features.pivot_enabled {
            return Err(ImportError::Wizard("Pivoting is disabled".to_string()));
        }
        let index = self.preview_index()?;
        let identity = self.files[index].identity.clone();
        if !self.files[index].status.is_loaded() {
            return Err(ImportError::Wizard("The current file is not loaded".to_string()));
        }

        let state = self.pivot.entry(identity.clone()).or_default();
        if state.in_flight {
            return Err(ImportError::Wizard("A pivot request is in progress".to_string()));
        }
        state.error = None;

        if on {
            state.mode = true;
            if !self.selection.is_complete() {
                self.infer_pivot_selection();
            }
            return Ok(());
        }

        state.mode = false;
        let restore = state.applied.then(|| state.original.clone()).flatten();
        state.applied = false;
        self.selection = PivotRequest::default();

        if let Some(rows) = restore {
            self.replace_rows(index, rows, None);
            info!(file = %identity, "reverted pivot");
        }
        Ok(())
    }

    /// Choose the three pivot columns.
    pub fn set_pivot_selection(&mut self, request: PivotRequest) {
        self.selection = request;
    }

    /// Propose pivot columns for the current file and select them.
    ///
    /// Uses the long-format detection when present, otherwise the best
    /// name-based guess.
    pub fn infer_pivot_selection(&mut self) -> Option<PivotRequest> {
        let WizardStep::FilePreview(index) = self.step else {
            return None;
        };
        let loaded = self.files.get(index)?.status.loaded()?;

        let request = match &loaded.long_format {
            Some(report) => PivotRequest::new(
                &report.date_column,
                &report.category_column,
                &report.value_column,
            ),
            None => {
                let (date, category, value) = rank_name_roles(&loaded.columns).pick()?;
                PivotRequest::new(date, category, value)
            }
        };
        self.selection = request.clone();
        Some(request)
    }

    /// Reshape the current file with the chosen columns.
    ///
    /// On success the file's rows are replaced, the index column becomes the
    /// date column and the first other column the value column. On failure
    /// the error is recorded against the file and returned.
    pub fn apply_pivot(&mut self) -> Result<()> {
        if !self.config.features.pivot_enabled {
            return Err(ImportError::Wizard("Pivoting is disabled".to_string()));
        }
        let index = self.preview_index()?;
        let service = self
            .pivot_service
            .clone()
            .ok_or_else(|| ImportError::Config("No pivot service configured".to_string()))?;
        let identity = self.files[index].identity.clone();
        if !self.files[index].status.is_loaded() {
            return Err(ImportError::Wizard("The current file is not loaded".to_string()));
        }

        let request = self.selection.clone();
        if !request.is_complete() {
            return Err(ImportError::Wizard(
                "Choose index, column and value columns first".to_string(),
            ));
        }
        if request.has_duplicate_columns() {
            return Err(ImportError::Wizard(
                "Index, column and value must be different columns".to_string(),
            ));
        }

        let state = self.pivot.entry(identity.clone()).or_default();
        if !state.mode {
            return Err(ImportError::Wizard("Pivot mode is off".to_string()));
        }
        if state.in_flight {
            return Err(ImportError::Wizard("A pivot request is in progress".to_string()));
        }
        state.in_flight = true;

        debug!(file = %identity, service = service.name(), "applying pivot");
        let result = service.pivot(&self.files[index].file, &request);

        let state = self.pivot.entry(identity.clone()).or_default();
        state.in_flight = false;
        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                warn!(file = %identity, error = %e, "pivot failed");
                state.error = Some(e.to_string());
                return Err(e);
            }
        };
        state.error = None;
        state.applied = true;

        let columns: Vec<String> = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        let value = columns
            .iter()
            .find(|c| **c != request.index_col)
            .cloned()
            .unwrap_or_default();
        let rows_len = rows.len();
        self.replace_rows(index, rows, Some((request.index_col.clone(), value)));
        self.selection = PivotRequest::default();

        info!(file = %identity, rows = rows_len, "pivot applied");
        Ok(())
    }

    /// Validate the group mappings and merge every loaded file.
    ///
    /// On failure the wizard stays in column configuration; per-cell
    /// problems are kept in [`ImportWizard::mapping_errors`].
    pub fn finish(&mut self) -> Result<GroupedData> {
        if self.step != WizardStep::ColumnConfig {
            return Err(ImportError::Wizard(
                "Finish is only available during column configuration".to_string(),
            ));
        }

        let configs = self.file_configs();
        if let Err(e) = validate_data_mappings(&self.groups, &configs) {
            if let ImportError::Mapping(errors) = &e {
                self.mapping_errors = errors.clone();
            }
            warn!(error = %e, "group mappings rejected");
            return Err(e);
        }

        let data = group_and_transform_data(&self.groups, &configs);
        info!(dates = data.len(), "import finished");
        self.reset();
        Ok(data)
    }

    fn reset(&mut self) {
        self.files.clear();
        self.step = WizardStep::Closed;
        self.current = 0;
        self.pivot.clear();
        self.selection = PivotRequest::default();
        self.rename_error = None;
        self.groups = GroupSet::new();
        self.mapping_errors = MappingErrors::new();
    }

    fn preview_index(&self) -> Result<usize> {
        match self.step {
            WizardStep::FilePreview(index) if index < self.files.len() => Ok(index),
            _ => Err(ImportError::Wizard("No file is being previewed".to_string())),
        }
    }

    fn clear_transient(&mut self) {
        self.selection = PivotRequest::default();
        self.rename_error = None;
    }

    fn go_to(&mut self, index: usize) {
        self.step = WizardStep::FilePreview(index);
        self.current = index;
        self.clear_transient();
        self.load(index);
    }

    /// Load a file the first time the wizard reaches it.
    fn load(&mut self, index: usize) {
        let Some(entry) = self.files.get_mut(index) else {
            return;
        };
        self.current = index;
        if !matches!(entry.status, FileStatus::Idle) {
            return;
        }
        entry.status = FileStatus::Loading;

        let outcome = self.parser.parse_file(&entry.file);
        let parsed = match outcome.result {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(file = %entry.file.name(), error = %e, "file failed to parse");
                entry.status = FileStatus::Failed(FileFailure {
                    kind: FailureKind::Parse,
                    message: e.to_string(),
                    validation: None,
                    preview: outcome.preview,
                });
                return;
            }
        };

        let validation = parsed.document.as_ref().map(|doc| self.validator.validate(doc));
        if let Some(report) = validation.as_ref().filter(|v| !v.is_valid) {
            warn!(file = %entry.file.name(), errors = report.errors.len(), "file failed validation");
            entry.status = FileStatus::Failed(FileFailure {
                kind: FailureKind::Validation,
                message: report.error_summary(),
                validation,
                preview: outcome.preview,
            });
            return;
        }

        let long_format = if self.config.features.pivot_enabled {
            self.detector.detect(&parsed.records, &parsed.columns)
        } else {
            None
        };
        let (date_column, value_column) =
            default_columns(&parsed.records, &parsed.columns, &self.config.validator);

        let state = self.pivot.entry(entry.identity.clone()).or_default();
        if state.original.is_none() {
            state.original = Some(parsed.records.clone());
        }
        state.warning = long_format.as_ref().map(|r| r.suggestion());

        info!(
            file = %entry.file.name(),
            fingerprint = %entry.file.fingerprint(),
            rows = parsed.records.len(),
            date_column = %date_column,
            value_column = %value_column,
            "file loaded"
        );

        entry.status = FileStatus::Loaded(Box::new(LoadedFile {
            config: FileConfig {
                date_column,
                value_column,
                raw_data: parsed.records,
            },
            columns: parsed.columns,
            validation,
            long_format,
            preview: outcome.preview,
            format: parsed.format,
        }));
    }

    /// Swap a loaded file's rows, re-deriving columns and long-format state.
    ///
    /// `roles` fixes the date and value columns; `None` re-guesses them.
    fn replace_rows(&mut self, index: usize, rows: Vec<FlatRecord>, roles: Option<(String, String)>) {
        let entry = &mut self.files[index];
        let Some(loaded) = entry.status.loaded_mut() else {
            return;
        };

        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        let (date_column, value_column) = roles
            .unwrap_or_else(|| default_columns(&rows, &columns, &self.config.validator));
        let long_format = if self.config.features.pivot_enabled {
            self.detector.detect(&rows, &columns)
        } else {
            None
        };

        if let Some(state) = self.pivot.get_mut(&entry.identity) {
            state.warning = long_format.as_ref().map(|r| r.suggestion());
        }
        loaded.config = FileConfig {
            date_column,
            value_column,
            raw_data: rows,
        };
        loaded.columns = columns;
        loaded.long_format = long_format;

        // re-default this file's mappings next time groups are set up
        self.groups.remove_file(entry.display_key());
    }
}

impl Default for ImportWizard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::VALUE_GROUP_ID;
    use crate::pivot::LocalPivotService;

    const LONG_CSV: &str = "log_date,data_type,value\n\
                            2025-01-01,30,1\n\
                            2025-01-01,31,2\n\
                            2025-01-02,30,3\n\
                            2025-01-02,31,4\n";

    fn csv(name: &str, text: &str) -> UploadedFile {
        UploadedFile::new(name, text)
    }

    fn wizard() -> ImportWizard {
        ImportWizard::new().with_pivot_service(LocalPivotService::new())
    }

    #[test]
    fn test_open_loads_first_file_only() {
        let mut w = wizard();
        w.open(vec![
            csv("a.csv", "date,temp\n2024-01-01,10\n2024-01-02,20"),
            csv("b.csv", "date,temp\n2024-01-01,5"),
        ]);

        assert_eq!(w.step(), WizardStep::FilePreview(0));
        let loaded = w.status(0).unwrap().loaded().unwrap();
        assert_eq!(loaded.config.date_column, "date");
        assert_eq!(loaded.config.value_column, "temp");
        assert!(loaded.validation.is_none());
        assert_eq!(w.status(1), Some(&FileStatus::Idle));
    }

    #[test]
    fn test_failed_files_are_skippable() {
        let mut w = wizard();
        w.open(vec![
            csv("bad.json", "{\"2025-01-01\": {\"value\": 1}}"),
            csv("good.csv", "date,temp\n2024-01-01,10"),
        ]);

        let failure = w.status(0).unwrap().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Validation);
        assert!(w.can_advance());
        assert_eq!(w.next().unwrap(), NextOutcome::Advanced(1));
        assert_eq!(w.next().unwrap(), NextOutcome::EnteredColumnConfig);
        assert_eq!(w.file_configs().len(), 1);
    }

    #[test]
    fn test_all_failed_closes_wizard() {
        let mut w = wizard();
        w.open(vec![csv("notes.txt", "hello")]);
        assert_eq!(w.status(0).unwrap().failure().unwrap().kind, FailureKind::Parse);
        assert_eq!(w.next().unwrap(), NextOutcome::NoValidFiles);
        assert_eq!(w.step(), WizardStep::Closed);
    }

    #[test]
    fn test_back_navigation() {
        let mut w = wizard();
        w.open(vec![
            csv("a.csv", "date,temp\n2024-01-01,10"),
            csv("b.csv", "date,temp\n2024-01-01,5"),
        ]);
        w.back();
        assert_eq!(w.step(), WizardStep::FilePreview(0));

        w.next().unwrap();
        w.next().unwrap();
        assert_eq!(w.step(), WizardStep::ColumnConfig);
        w.back();
        assert_eq!(w.step(), WizardStep::FilePreview(1));
        w.back();
        assert_eq!(w.step(), WizardStep::FilePreview(0));
    }

    #[test]
    fn test_rename_conflict_blocks_next() {
        let mut w = wizard();
        w.open(vec![
            csv("a.csv", "date,temp\n2024-01-01,10"),
            csv("b.csv", "date,temp\n2024-01-01,5"),
        ]);
        w.next().unwrap();

        let err = w.rename_file(1, "a").unwrap_err();
        assert!(matches!(err, ImportError::RenameConflict(_)));
        assert!(!w.can_advance());

        w.rename_file(1, "beta").unwrap();
        assert!(w.can_advance());
        assert_eq!(w.display_key(1), Some("beta"));
        assert_eq!(w.identity(1), Some("b"));
    }

    #[test]
    fn test_rename_after_grouping_moves_mappings() {
        let mut w = wizard();
        w.open(vec![csv("a.csv", "date,temp\n2024-01-01,10")]);
        w.next().unwrap();
        w.back();
        w.rename_file(0, "sensor").unwrap();
        w.next().unwrap();

        let value = w.groups().get(VALUE_GROUP_ID).unwrap();
        assert_eq!(value.column_for("sensor"), Some("temp"));
        assert!(!value.file_mappings.contains_key("a"));
    }

    #[test]
    fn test_duplicate_identities_are_disambiguated() {
        let mut w = wizard();
        w.open(vec![
            csv("data.csv", "date,temp\n2024-01-01,10"),
            csv("data.json", "[{\"date\": \"2024-01-01\", \"temp\": 1}]"),
        ]);
        assert_eq!(w.identity(0), Some("data"));
        assert_eq!(w.identity(1), Some("data (2)"));
    }

    #[test]
    fn test_long_format_pivot_and_revert() {
        let mut w = wizard();
        w.open(vec![csv("long.csv", LONG_CSV)]);
        assert!(w.pivot_state(0).unwrap().warning.is_some());

        w.set_pivot_mode(true).unwrap();
        assert_eq!(
            w.pivot_selection(),
            &PivotRequest::new("log_date", "data_type", "value")
        );
        w.apply_pivot().unwrap();

        let state = w.pivot_state(0).unwrap();
        assert!(state.applied);
        assert!(state.warning.is_none());
        assert!(!w.pivot_selection().is_complete());

        let loaded = w.status(0).unwrap().loaded().unwrap();
        assert_eq!(loaded.config.date_column, "log_date");
        assert_eq!(loaded.config.value_column, "data_type_30");
        assert_eq!(loaded.config.raw_data.len(), 2);

        w.set_pivot_mode(false).unwrap();
        let loaded = w.status(0).unwrap().loaded().unwrap();
        assert_eq!(loaded.config.raw_data.len(), 4);
        assert_eq!(loaded.columns, vec!["log_date", "data_type", "value"]);
        assert!(!w.pivot_state(0).unwrap().applied);
        assert!(w.pivot_state(0).unwrap().warning.is_some());
    }

    #[test]
    fn test_pivot_error_blocks_next_until_mode_off() {
        let mut w = wizard();
        w.open(vec![csv("long.csv", LONG_CSV)]);
        w.set_pivot_mode(true).unwrap();
        w.set_pivot_selection(PivotRequest::new("log_date", "sensor", "value"));

        assert!(w.apply_pivot().is_err());
        assert!(w.pivot_state(0).unwrap().error.is_some());
        assert!(!w.can_advance());

        w.set_pivot_mode(false).unwrap();
        assert!(w.can_advance());
    }

    #[test]
    fn test_pivot_requires_service_and_mode() {
        let mut w = ImportWizard::new();
        w.open(vec![csv("long.csv", LONG_CSV)]);
        w.set_pivot_selection(PivotRequest::new("log_date", "data_type", "value"));
        assert!(matches!(w.apply_pivot(), Err(ImportError::Config(_))));

        let mut w = wizard();
        w.open(vec![csv("long.csv", LONG_CSV)]);
        w.set_pivot_selection(PivotRequest::new("log_date", "data_type", "value"));
        assert!(matches!(w.apply_pivot(), Err(ImportError::Wizard(_))));
    }

    #[test]
    fn test_selection_resets_on_navigation() {
        let mut w = wizard();
        w.open(vec![csv("long.csv", LONG_CSV), csv("b.csv", "date,temp\n2024-01-01,5")]);
        w.set_pivot_mode(true).unwrap();
        assert!(w.pivot_selection().is_complete());

        w.next().unwrap();
        assert!(!w.pivot_selection().is_complete());
        w.back();
        assert!(w.pivot_state(0).unwrap().mode);
    }

    #[test]
    fn test_finish_merges_and_closes() {
        let mut w = wizard();
        w.open(vec![
            csv("a.csv", "date,temp\n2024-01-01,10\n2024-01-02,20"),
            csv("b.csv", "time,reading\n2024-01-01T00:00:00Z,1.5"),
        ]);
        w.next().unwrap();
        w.next().unwrap();

        let data = w.finish().unwrap();
        assert_eq!(data.len(), 2);
        let first = data.get("2024-01-01T00:00:00.000Z").unwrap();
        assert_eq!(first["Value Group 1"]["a"], 10.0);
        assert_eq!(first["Value Group 1"]["b"], 1.5);
        assert_eq!(w.step(), WizardStep::Closed);
    }

    #[test]
    fn test_finish_keeps_mapping_errors() {
        let mut w = wizard();
        w.open(vec![csv("a.csv", "date,temp,label\n2024-01-01,10,high")]);
        w.next().unwrap();
        let id = w.groups_mut().add_group();
        w.groups_mut().set_mapping(&id, "a", Some("label".to_string())).unwrap();

        assert!(w.finish().is_err());
        assert_eq!(w.step(), WizardStep::ColumnConfig);
        assert!(w.mapping_errors().get(&id, "a").is_some());
    }

    #[test]
    fn test_set_mapping_checks_loaded_columns() {
        let mut w = wizard();
        w.open(vec![csv("a.csv", "date,temp,hum
2024-01-01,10,40")]);
        w.next().unwrap();
        let id = w.groups_mut().add_group();

        let err = w.set_mapping(&id, "a", Some("tmep".to_string())).unwrap_err();
        assert!(matches!(err, ImportError::Group(ref m) if m.contains("'tmep'")));
        let err = w.set_mapping(&id, "missing", Some("hum".to_string())).unwrap_err();
        assert!(matches!(err, ImportError::Group(_)));
        assert!(w.groups().get(&id).unwrap().column_for("a").is_none());

        // Claimed by the first value group.
        assert!(w.set_mapping(&id, "a", Some("temp".to_string())).is_err());

        w.set_mapping(&id, "a", Some("hum".to_string())).unwrap();
        let data = w.finish().unwrap();
        let values = data.get("2024-01-01T00:00:00.000Z").unwrap();
        assert_eq!(values["Value Group 2"]["a"], 40.0);
    }

    #[test]
    fn test_finish_reads_slash_dates() {
        let mut w = wizard();
        w.open(vec![csv("a.csv", "date,temp
2024/01/15,10
2024/01/16,11")]);
        w.next().unwrap();

        let data = w.finish().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("2024-01-15T00:00:00.000Z").unwrap()["Value Group 1"]["a"], 10.0);
    }
}
