//! Uploaded files and the flat records parsed out of them.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{ImportError, Result};

/// A single parsed row: dotted column name to scalar (or array) value.
pub type FlatRecord = IndexMap<String, Value>;

/// Supported input formats, chosen by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Detect the format from a file name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Some(FileFormat::Csv)
        } else if lower.ends_with(".json") {
            Some(FileFormat::Json)
        } else {
            None
        }
    }

    /// Lowercase label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

/// An uploaded file: its original name and raw contents.
///
/// Immutable for the lifetime of an import session.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    contents: Vec<u8>,
}

impl UploadedFile {
    /// Wrap in-memory contents.
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| ImportError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, contents))
    }

    /// Original file name, including extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw bytes.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Contents decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }

    /// Format implied by the file suffix.
    pub fn format(&self) -> Option<FileFormat> {
        FileFormat::from_name(&self.name)
    }

    /// Identity that survives renames: the file name without its extension.
    pub fn stable_id(&self) -> String {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => self.name[..idx].to_string(),
            _ => self.name.clone(),
        }
    }

    /// SHA-256 fingerprint of the contents.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.contents);
        format!("sha256:{:x}", hasher.finalize())
    }
}

/// Per-file import state once a file has loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Best guess at the date column.
    pub date_column: String,
    /// Best guess at the numeric value column.
    pub value_column: String,
    /// Parsed rows in file order.
    pub raw_data: Vec<FlatRecord>,
}
