//! Pivot service trait and request type.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::input::{FlatRecord, UploadedFile};

/// The three column choices of a long-to-wide reshape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotRequest {
    /// Column that becomes the row index (and the new date column).
    pub index_col: String,
    /// Column whose distinct values become new columns.
    pub columns_col: String,
    /// Column that fills the new cells.
    pub values_col: String,
}

impl PivotRequest {
    /// Create a request from the three column names.
    pub fn new(
        index_col: impl Into<String>,
        columns_col: impl Into<String>,
        values_col: impl Into<String>,
    ) -> Self {
        Self {
            index_col: index_col.into(),
            columns_col: columns_col.into(),
            values_col: values_col.into(),
        }
    }

    /// Whether all three columns are chosen.
    pub fn is_complete(&self) -> bool {
        !self.index_col.is_empty() && !self.columns_col.is_empty() && !self.values_col.is_empty()
    }

    /// Whether the same column was chosen for two roles.
    pub fn has_duplicate_columns(&self) -> bool {
        self.index_col == self.columns_col
            || self.index_col == self.values_col
            || self.columns_col == self.values_col
    }
}

/// Reshapes a long-format file into wide rows.
///
/// Implementations must be thread-safe (Send + Sync) so a session can share them.
pub trait PivotService: Send + Sync {
    /// Pivot the raw file and return flattened wide rows.
    fn pivot(&self, file: &UploadedFile, request: &PivotRequest) -> Result<Vec<FlatRecord>>;

    /// Name of this service (for logging).
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_completeness() {
        assert!(!PivotRequest::default().is_complete());
        let request = PivotRequest::new("date", "sensor", "value");
        assert!(request.is_complete());
        assert!(!request.has_duplicate_columns());
        assert!(PivotRequest::new("date", "date", "value").has_duplicate_columns());
    }
}
