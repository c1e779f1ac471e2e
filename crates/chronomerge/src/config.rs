//! Configuration for an import session.

use std::time::Duration;

use crate::error::{ImportError, Result};
use crate::input::ParserConfig;

/// Environment variable holding the base URL of the pivot service.
pub const API_URL_ENV: &str = "CHRONOMERGE_API_URL";

/// Base URL used when no pivot service is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Thresholds used by the schema validator.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Rows sampled when classifying columns.
    pub column_sample_rows: usize,
    /// Rows re-sampled when checking each row has a date and a number.
    pub row_sample_rows: usize,
    /// Share of sampled values that must parse as dates.
    pub date_ratio: f64,
    /// Lower date share accepted when the column name hints at a date.
    pub named_date_ratio: f64,
    /// Share of sampled values that must parse as numbers.
    pub numeric_ratio: f64,
    /// Share of bad sampled rows above which validation fails.
    pub bad_row_error_ratio: f64,
    /// Maximum number of example row numbers cited in a diagnostic.
    pub max_example_rows: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            column_sample_rows: 10,
            row_sample_rows: 20,
            date_ratio: 0.8,
            named_date_ratio: 0.2,
            numeric_ratio: 0.8,
            bad_row_error_ratio: 0.5,
            max_example_rows: 5,
        }
    }
}

/// Settings for long-format detection.
#[derive(Debug, Clone)]
pub struct LongFormatConfig {
    /// Rows sampled when grouping by the date column.
    pub sample_rows: usize,
}

impl Default for LongFormatConfig {
    fn default() -> Self {
        Self { sample_rows: 100 }
    }
}

/// Where and how to reach the pivot transform service.
#[derive(Debug, Clone)]
pub struct PivotConfig {
    /// Base URL; the endpoint is `{api_url}/api/transform/pivot`.
    pub api_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl PivotConfig {
    /// Create from the `CHRONOMERGE_API_URL` environment variable.
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_URL_ENV) {
            Ok(url) => Self::default().with_api_url(url),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(ImportError::Config(format!("{}: {}", API_URL_ENV, e))),
        }
    }

    /// Override the base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ImportError::Config(format!(
                "Pivot API URL must start with http:// or https://, got '{}'",
                url
            )));
        }
        self.api_url = trimmed.to_string();
        Ok(self)
    }

    /// Full URL of the pivot endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/api/transform/pivot", self.api_url)
    }
}

/// Optional wizard behaviours.
#[derive(Debug, Clone)]
pub struct WizardFeatures {
    /// Whether files may be pivoted at all.
    pub pivot_enabled: bool,
    /// Whether the first value group may be removed once another value group exists.
    pub value_group_removable: bool,
}

impl Default for WizardFeatures {
    fn default() -> Self {
        Self {
            pivot_enabled: true,
            value_group_removable: true,
        }
    }
}

/// Configuration for an import session.
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    /// Parser configuration.
    pub parser: ParserConfig,
    /// Schema validator thresholds.
    pub validator: ValidatorConfig,
    /// Long-format detection settings.
    pub long_format: LongFormatConfig,
    /// Pivot service location.
    pub pivot: PivotConfig,
    /// Wizard feature flags.
    pub features: WizardFeatures,
}
