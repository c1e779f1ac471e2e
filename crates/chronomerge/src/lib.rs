//! Chronomerge: import normalization for comparing time-series files.
//!
//! Chronomerge turns a batch of heterogeneous CSV and JSON exports into one
//! date-keyed structure that charts and metrics can consume.
//!
//! # Pipeline
//!
//! - **Parse**: CSV or JSON by file suffix, nested objects flattened to dotted keys
//! - **Validate**: JSON payloads are checked for date and numeric columns
//! - **Detect**: long-format files get a pivot suggestion
//! - **Pivot**: optional long-to-wide reshape through a [`pivot::PivotService`]
//! - **Group and merge**: columns are mapped into named groups and merged by ISO date
//!
//! # Example
//!
//! ```no_run
//! use chronomerge::{ImportWizard, NextOutcome, UploadedFile};
//!
//! let mut wizard = ImportWizard::new();
//! wizard.open(vec![
//!     UploadedFile::from_path("indoor.csv").unwrap(),
//!     UploadedFile::from_path("outdoor.json").unwrap(),
//! ]);
//!
//! while let NextOutcome::Advanced(_) = wizard.next().unwrap() {}
//!
//! let grouped = wizard.finish().unwrap();
//! println!("{} timestamps", grouped.len());
//! ```

pub mod config;
pub mod error;
pub mod grouping;
pub mod inference;
pub mod input;
pub mod pivot;
pub mod validation;
pub mod wizard;

pub use config::{ImportConfig, LongFormatConfig, PivotConfig, ValidatorConfig, WizardFeatures};
pub use error::{ImportError, Result};
pub use grouping::{GroupSet, GroupedData, MappingErrors, TimeSeriesQuery};
pub use input::{FileConfig, FlatRecord, UploadedFile};
pub use validation::{SchemaValidator, ValidationResult};
pub use wizard::{FileStatus, ImportWizard, NextOutcome, WizardStep};
