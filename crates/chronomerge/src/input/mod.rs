//! Input parsing and uploaded-file handling.

mod flatten;
mod parser;
mod source;

pub use flatten::{flatten_object, flatten_record, flatten_value};
pub use parser::{ParseOutcome, ParsedFile, Parser, ParserConfig};
pub use source::{FileConfig, FileFormat, FlatRecord, UploadedFile};
