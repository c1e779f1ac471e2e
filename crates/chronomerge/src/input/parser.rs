//! CSV/JSON parser producing flat records.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::{ImportError, Result};
use super::flatten::flatten_value;
use super::source::{FileFormat, FlatRecord, UploadedFile};

/// Cells that become numbers under dynamic typing.
static NUMERIC_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?\s*$").unwrap());

/// Appended to JSON syntax errors.
const JSON_SYNTAX_HINT: &str =
    "The file contains malformed JSON (check for trailing commas, single quotes or unquoted keys).";

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Raw lines kept for preview of CSV files.
    pub csv_preview_lines: usize,
    /// Raw lines kept for preview of JSON files.
    pub json_preview_lines: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            csv_preview_lines: 30,
            json_preview_lines: 50,
        }
    }
}

/// Records parsed out of one file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Detected format.
    pub format: FileFormat,
    /// Flattened records in file order.
    pub records: Vec<FlatRecord>,
    /// Column names in first-seen order.
    pub columns: Vec<String>,
    /// The parsed JSON document, kept for schema validation.
    pub document: Option<Value>,
}

/// Outcome of parsing a file.
///
/// The preview is kept whether or not parsing succeeded.
#[derive(Debug)]
pub struct ParseOutcome {
    /// First raw lines of the file.
    pub preview: String,
    /// Parsed records or the reason parsing failed.
    pub result: Result<ParsedFile>,
}

/// Parses uploaded files into flat records.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file, dispatching on its suffix.
    pub fn parse_file(&self, file: &UploadedFile) -> ParseOutcome {
        let text = file.text();
        let format = file.format();

        let preview_lines = match format {
            Some(FileFormat::Json) => self.config.json_preview_lines,
            _ => self.config.csv_preview_lines,
        };
        let preview = text.lines().take(preview_lines).collect::<Vec<_>>().join("\n");

        let result = match format {
            Some(FileFormat::Csv) => self.parse_csv(&text),
            Some(FileFormat::Json) => self.parse_json(&text),
            None => Err(ImportError::UnsupportedFormat(format!(
                "'{}' is not a .csv or .json file",
                file.name()
            ))),
        };

        if let Ok(ref parsed) = result {
            debug!(
                file = file.name(),
                format = parsed.format.label(),
                rows = parsed.records.len(),
                columns = parsed.columns.len(),
                "parsed file"
            );
        }

        ParseOutcome { preview, result }
    }

    /// Parse CSV text with a header row.
    fn parse_csv(&self, text: &str) -> Result<ParsedFile> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            if row.iter().all(|cell| cell.is_empty()) && row.len() <= 1 {
                continue;
            }
            let mut record = FlatRecord::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                record.insert(header.clone(), dynamic_cell(cell));
            }
            records.push(record);
        }

        finish(FileFormat::Csv, records, None)
    }

    /// Parse JSON text holding an object or an array of objects.
    fn parse_json(&self, text: &str) -> Result<ParsedFile> {
        let document: Value = serde_json::from_str(text).map_err(|e| {
            if e.is_syntax() || e.is_eof() {
                ImportError::MalformedJson {
                    line: e.line(),
                    column: e.column(),
                    message: format!("{}. {}", e, JSON_SYNTAX_HINT),
                }
            } else {
                ImportError::Json(e)
            }
        })?;

        let records: Vec<FlatRecord> = match &document {
            Value::Array(items) => items.iter().filter_map(flatten_value).collect(),
            Value::Object(_) => flatten_value(&document).into_iter().collect(),
            _ => Vec::new(),
        };

        finish(FileFormat::Json, records, Some(document))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn finish(format: FileFormat, records: Vec<FlatRecord>, document: Option<Value>) -> Result<ParsedFile> {
    if records.is_empty() {
        return Err(ImportError::EmptyData(
            "File is empty or not an array of objects".to_string(),
        ));
    }

    let columns: IndexSet<String> = records.iter().flat_map(|r| r.keys().cloned()).collect();

    Ok(ParsedFile {
        format,
        records,
        columns: columns.into_iter().collect(),
        document,
    })
}

/// Convert a CSV cell the way spreadsheet-style dynamic typing does.
fn dynamic_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match cell {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    if NUMERIC_CELL.is_match(cell) {
        let trimmed = cell.trim();
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(name: &str, text: &str) -> ParseOutcome {
        Parser::new().parse_file(&UploadedFile::new(name, text))
    }

    #[test]
    fn test_parse_csv_with_dynamic_types() {
        let outcome = parse("temps.csv", "date,temp,ok\n2024-01-01,10,true\n2024-01-02,20.5,\n");
        let parsed = outcome.result.unwrap();

        assert_eq!(parsed.format, FileFormat::Csv);
        assert_eq!(parsed.columns, vec!["date", "temp", "ok"]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0]["date"], json!("2024-01-01"));
        assert_eq!(parsed.records[0]["temp"], json!(10));
        assert_eq!(parsed.records[0]["ok"], json!(true));
        assert_eq!(parsed.records[1]["temp"], json!(20.5));
        assert_eq!(parsed.records[1]["ok"], Value::Null);
    }

    #[test]
    fn test_parse_csv_skips_blank_lines() {
        let outcome = parse("a.csv", "date,v\n\n2024-01-01,1\n\n2024-01-02,2\n");
        assert_eq!(outcome.result.unwrap().records.len(), 2);
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let outcome = parse("a.csv", "date,v\n");
        assert!(matches!(outcome.result, Err(ImportError::EmptyData(_))));
    }

    #[test]
    fn test_parse_json_single_object_is_wrapped() {
        let outcome = parse("one.JSON", r#"{"date": "2024-01-01", "v": {"x": 1}}"#);
        let parsed = outcome.result.unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0]["v.x"], json!(1));
        assert!(parsed.document.is_some());
    }

    #[test]
    fn test_parse_json_primitive_has_no_records() {
        let outcome = parse("n.json", "42");
        assert!(matches!(outcome.result, Err(ImportError::EmptyData(_))));
    }

    #[test]
    fn test_json_syntax_error_has_hint() {
        let outcome = parse("bad.json", r#"[{"a": 1,}]"#);
        let message = outcome.result.unwrap_err().to_string();
        assert!(message.contains("malformed JSON"));
    }

    #[test]
    fn test_unsupported_suffix() {
        let outcome = parse("data.xlsx", "whatever");
        assert!(matches!(outcome.result, Err(ImportError::UnsupportedFormat(_))));
        assert_eq!(outcome.preview, "whatever");
    }

    #[test]
    fn test_preview_is_limited() {
        let text: String = (0..100).map(|i| format!("{},{}\n", i, i)).collect();
        let outcome = parse("n.csv", &format!("a,b\n{}", text));
        assert_eq!(outcome.preview.lines().count(), 30);

        let json_text: String = (0..100).map(|_| "\n").collect();
        let outcome = parse("n.json", &format!("[{}]", json_text));
        assert_eq!(outcome.preview.lines().count(), 50);
    }

    #[test]
    fn test_dynamic_cell() {
        assert_eq!(dynamic_cell("1e3"), json!(1000.0));
        assert_eq!(dynamic_cell("-4"), json!(-4));
        assert_eq!(dynamic_cell("12abc"), json!("12abc"));
        assert_eq!(dynamic_cell("2024-01-01"), json!("2024-01-01"));
    }
}
