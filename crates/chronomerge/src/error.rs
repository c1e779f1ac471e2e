//! Error types for the chronomerge library.

use std::path::PathBuf;
use thiserror::Error;

use crate::grouping::MappingErrors;

/// Main error type for import operations.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON text that does not parse, with the position of the first problem.
    #[error("{message}")]
    MalformedJson {
        line: usize,
        column: usize,
        message: String,
    },

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no records to import.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pivot service could not be reached or answered with garbage.
    #[error("Pivot transport error: {0}")]
    PivotTransport(String),

    /// The pivot service rejected the request.
    #[error("Pivot failed: {0}")]
    Pivot(String),

    /// A rename would collide with another loaded file.
    #[error("A file named '{0}' already exists")]
    RenameConflict(String),

    /// A group name is empty or already taken.
    #[error("Group name error: {0}")]
    GroupName(String),

    /// A group operation is not allowed.
    #[error("Group error: {0}")]
    Group(String),

    /// Assigned columns hold values of the wrong kind.
    #[error("Invalid column mappings: {0}")]
    Mapping(MappingErrors),

    /// The wizard was asked to do something its current step does not allow.
    #[error("Wizard error: {0}")]
    Wizard(String),

    /// A date or interval argument could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
