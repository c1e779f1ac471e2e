//! Long-to-wide reshaping of uploaded files.
//!
//! A [`PivotService`] takes the raw file plus the index, category and value
//! columns and returns flattened wide rows. Two services are provided:
//!
//! - **HTTP** - posts the file to `{api_url}/api/transform/pivot`
//!   (set `CHRONOMERGE_API_URL` to point elsewhere)
//! - **Local** - the same reshape computed in-process, no server needed
//!
//! # Example
//!
//! ```no_run
//! use chronomerge::UploadedFile;
//! use chronomerge::pivot::{LocalPivotService, PivotRequest, PivotService};
//!
//! let file = UploadedFile::from_path("sensors.csv").unwrap();
//! let rows = LocalPivotService::new()
//!     .pivot(&file, &PivotRequest::new("log_date", "data_type", "value"))
//!     .unwrap();
//! println!("{} wide rows", rows.len());
//! ```

mod http;
mod local;
mod provider;

pub use http::{HttpPivotService, interpret_response, sanitize_nan};
pub use local::LocalPivotService;
pub use provider::{PivotRequest, PivotService};
