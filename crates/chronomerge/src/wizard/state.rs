//! Per-file status and the wizard's macro steps.

use serde::{Deserialize, Serialize};

use crate::inference::LongFormatReport;
use crate::input::{FileConfig, FileFormat, FlatRecord, UploadedFile};
use crate::validation::ValidationResult;

/// Where the wizard is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    /// Previewing the file at this index.
    FilePreview(usize),
    /// Assigning columns to groups.
    ColumnConfig,
    /// Not open: never opened, cancelled, finished or aborted.
    Closed,
}

/// What the wizard did on "Next".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// Moved to the preview of this file.
    Advanced(usize),
    /// Left the last preview for group configuration.
    EnteredColumnConfig,
    /// Every file failed; the wizard closed without a result.
    NoValidFiles,
}

/// Why a file could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The bytes could not be read as CSV or JSON.
    Parse,
    /// The JSON parsed but is not usable time-series data.
    Validation,
}

impl FailureKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Parse => "Parse error",
            FailureKind::Validation => "Validation error",
        }
    }
}

/// A file that failed to load. Always skippable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Parse or validation failure.
    pub kind: FailureKind,
    /// What went wrong, for display.
    pub message: String,
    /// Full report when the failure came from the schema validator.
    pub validation: Option<ValidationResult>,
    /// First raw lines of the file.
    pub preview: String,
}

/// A successfully loaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedFile {
    /// Current rows and best-guess columns; replaced by pivot and revert.
    pub config: FileConfig,
    /// Column options for the current rows.
    pub columns: Vec<String>,
    /// Validator report (JSON files only).
    pub validation: Option<ValidationResult>,
    /// Long-layout detection for the current rows.
    pub long_format: Option<LongFormatReport>,
    /// Raw text preview of the upload.
    pub preview: String,
    /// Format chosen from the file name.
    pub format: FileFormat,
}

/// Load status of one file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FileStatus {
    /// Not visited yet.
    #[default]
    Idle,
    /// Being read and parsed.
    Loading,
    /// Parsed, and valid where validation applies.
    Loaded(Box<LoadedFile>),
    /// Could not be used; the wizard skips it.
    Failed(FileFailure),
}

impl FileStatus {
    /// Whether the file loaded successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self, FileStatus::Loaded(_))
    }

    /// The loaded file, if any.
    pub fn loaded(&self) -> Option<&LoadedFile> {
        match self {
            FileStatus::Loaded(file) => Some(file),
            _ => None,
        }
    }

    /// The loaded file, mutably.
    pub fn loaded_mut(&mut self) -> Option<&mut LoadedFile> {
        match self {
            FileStatus::Loaded(file) => Some(file),
            _ => None,
        }
    }

    /// The failure, if loading failed.
    pub fn failure(&self) -> Option<&FileFailure> {
        match self {
            FileStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Pivot bookkeeping for one file, keyed by stable identity so it survives
/// navigation and renames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotState {
    /// Rows as first loaded, restored when pivot mode is switched off.
    pub original: Option<Vec<FlatRecord>>,
    /// Whether pivot mode is on.
    pub mode: bool,
    /// Whether the current rows are pivot output.
    pub applied: bool,
    /// Long-format suggestion for the current rows.
    pub warning: Option<String>,
    /// Last pivot failure while in pivot mode.
    pub error: Option<String>,
    /// Set while a pivot request is outstanding.
    pub in_flight: bool,
}

/// One file of the session.
#[derive(Debug, Clone)]
pub(crate) struct FileEntry {
    pub file: UploadedFile,
    /// Unique within the session; never changes.
    pub identity: String,
    /// User-chosen display key, when different from the identity.
    pub rename: Option<String>,
    pub status: FileStatus,
}

impl FileEntry {
    pub fn new(file: UploadedFile, identity: String) -> Self {
        Self {
            file,
            identity,
            rename: None,
            status: FileStatus::Idle,
        }
    }

    pub fn display_key(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.identity)
    }
}
