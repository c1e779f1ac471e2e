//! HTTP client for the remote pivot transform endpoint.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PivotConfig;
use crate::error::{ImportError, Result};
use crate::input::{FlatRecord, UploadedFile, flatten_value};

use super::provider::{PivotRequest, PivotService};

/// Bare `NaN` tokens emitted by the server's float serialization.
static NAN_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*NaN\b").unwrap());

/// Error body shape of the pivot endpoint.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Pivot service backed by `POST {api_url}/api/transform/pivot`.
pub struct HttpPivotService {
    client: Client,
    config: PivotConfig,
}

impl HttpPivotService {
    /// Create a client for the default local endpoint.
    pub fn new() -> Result<Self> {
        Self::with_config(PivotConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: PivotConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ImportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from the `CHRONOMERGE_API_URL` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::with_config(PivotConfig::from_env()?)
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }
}

impl PivotService for HttpPivotService {
    fn pivot(&self, file: &UploadedFile, request: &PivotRequest) -> Result<Vec<FlatRecord>> {
        let part = Part::bytes(file.contents().to_vec()).file_name(file.name().to_string());
        let form = Form::new()
            .part("file", part)
            .text("index_col", request.index_col.clone())
            .text("columns_col", request.columns_col.clone())
            .text("values_col", request.values_col.clone());

        debug!(endpoint = %self.endpoint(), file = file.name(), "sending pivot request");

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .map_err(|e| ImportError::PivotTransport(format!("Pivot request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ImportError::PivotTransport(format!("Failed to read pivot response: {}", e)))?;

        let result = interpret_response(status.as_u16(), &body);
        if let Err(ref e) = result {
            warn!(status = status.as_u16(), error = %e, "pivot request rejected");
        }
        result
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Rewrite bare `NaN` values to `null` so the body is valid JSON.
pub fn sanitize_nan(body: &str) -> String {
    NAN_TOKEN.replace_all(body, ":null").into_owned()
}

/// Turn a pivot endpoint response into flattened rows.
pub fn interpret_response(status: u16, body: &str) -> Result<Vec<FlatRecord>> {
    if !(200..300).contains(&status) {
        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) if !body.trim().is_empty() => body.trim().to_string(),
            Err(_) => format!("Server error {}", status),
        };
        return Err(ImportError::Pivot(message));
    }

    if body.trim().is_empty() {
        return Err(ImportError::Pivot("Backend returned empty response".to_string()));
    }

    let parsed: Value = serde_json::from_str(&sanitize_nan(body)).map_err(|e| {
        ImportError::PivotTransport(format!("Failed to parse pivot response: {}", e))
    })?;

    let Value::Array(items) = parsed else {
        return Err(ImportError::PivotTransport(
            "Pivot response is not an array of records".to_string(),
        ));
    };

    let rows: Vec<FlatRecord> = items.iter().filter_map(flatten_value).collect();
    if rows.is_empty() {
        return Err(ImportError::Pivot("Pivot produced no rows".to_string()));
    }
    Ok(rows)
}
