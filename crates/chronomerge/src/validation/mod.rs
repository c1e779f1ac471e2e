//! Schema validation of JSON time-series payloads.

mod result;
mod validator;

pub use result::ValidationResult;
pub use validator::SchemaValidator;
