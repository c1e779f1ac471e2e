//! The import wizard state machine.
//!
//! ```text
//! FilePreview(0) -> ... -> FilePreview(n-1) -> ColumnConfig -> finish -> Closed
//! ```
//!
//! Each file loads when the wizard first reaches it and ends up either
//! `Loaded` or `Failed`. Failed files are skipped rather than blocking.

mod session;
mod state;

pub use session::ImportWizard;
pub use state::{
    FailureKind, FileFailure, FileStatus, LoadedFile, NextOutcome, PivotState, WizardStep,
};
