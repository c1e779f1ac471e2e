//! Inspect command - parse, validate and check the layout of each file.

use std::path::PathBuf;

use chronomerge::inference::{
    LongFormatDetector, default_columns, detect_date_columns, detect_numeric_columns,
};
use chronomerge::input::Parser;
use chronomerge::{SchemaValidator, UploadedFile, ValidatorConfig};
use colored::Colorize;

/// Number of preview lines shown with `--verbose`.
const PREVIEW_LINES: usize = 10;

pub fn run(
    files: Vec<PathBuf>,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let parser = Parser::new();
    let validator = SchemaValidator::new();
    let detector = LongFormatDetector::new();
    let config = ValidatorConfig::default();

    let mut reports = Vec::new();
    for path in &files {
        let file = UploadedFile::from_path(path)?;
        let outcome = parser.parse_file(&file);

        let mut report = serde_json::json!({
            "file": file.name(),
            "identity": file.stable_id(),
            "fingerprint": file.fingerprint(),
            "preview": outcome.preview,
        });

        match outcome.result {
            Err(e) => {
                report["error"] = serde_json::json!(e.to_string());
            }
            Ok(parsed) => {
                let validation = parsed.document.as_ref().map(|doc| validator.validate(doc));
                let (date_columns, numeric_columns) = match &validation {
                    Some(v) => (v.date_columns.clone(), v.numeric_columns.clone()),
                    None => {
                        let dates = detect_date_columns(&parsed.records, &parsed.columns, &config);
                        let numbers =
                            detect_numeric_columns(&parsed.records, &parsed.columns, &dates, &config);
                        (dates, numbers)
                    }
                };
                let (date_column, value_column) =
                    default_columns(&parsed.records, &parsed.columns, &config);
                let long_format = detector.detect(&parsed.records, &parsed.columns);

                report["format"] = serde_json::json!(parsed.format.label());
                report["rows"] = serde_json::json!(parsed.records.len());
                report["columns"] = serde_json::json!(parsed.columns);
                report["date_columns"] = serde_json::json!(date_columns);
                report["numeric_columns"] = serde_json::json!(numeric_columns);
                report["date_column"] = serde_json::json!(date_column);
                report["value_column"] = serde_json::json!(value_column);
                report["validation"] = serde_json::to_value(&validation)?;
                report["long_format"] = serde_json::to_value(&long_format)?;
                report["suggestion"] = serde_json::json!(long_format.map(|r| r.suggestion()));
            }
        }
        reports.push(report);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        print_report(report, verbose);
    }
    Ok(())
}

fn print_report(report: &serde_json::Value, verbose: bool) {
    let text = |key: &str| report[key].as_str().unwrap_or_default().to_string();
    let list = |key: &str| {
        report[key]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
    };

    println!("{} {}", "File".cyan().bold(), text("file").white());
    println!("  Key:         {}", text("identity"));
    println!("  Fingerprint: {}", text("fingerprint").dimmed());

    if let Some(error) = report["error"].as_str() {
        println!("  {} {}", "✗".red(), error.red());
    } else {
        println!(
            "  Format:      {} ({} rows)",
            text("format"),
            report["rows"].as_u64().unwrap_or(0).to_string().white().bold()
        );
        println!("  Columns:     {}", list("columns"));
        println!("  Dates:       {}", list("date_columns"));
        println!("  Numbers:     {}", list("numeric_columns"));
        println!(
            "  Defaults:    date = {}, value = {}",
            text("date_column").green(),
            text("value_column").green()
        );

        let validation = &report["validation"];
        if validation.is_object() {
            if validation["is_valid"].as_bool().unwrap_or(false) {
                println!("  {} Valid time-series data", "✓".green());
            } else {
                println!("  {} Not importable", "✗".red());
            }
            for error in validation["errors"].as_array().into_iter().flatten() {
                println!("    {} {}", "error:".red().bold(), error.as_str().unwrap_or_default());
            }
            for warning in validation["warnings"].as_array().into_iter().flatten() {
                println!(
                    "    {} {}",
                    "warning:".yellow().bold(),
                    warning.as_str().unwrap_or_default()
                );
            }
        }

        if let Some(suggestion) = report["suggestion"].as_str() {
            println!("  {} {}", "Long format:".yellow().bold(), suggestion);
        }
    }

    if verbose {
        println!("  {}", "Preview:".dimmed());
        for line in text("preview").lines().take(PREVIEW_LINES) {
            println!("    {}", line.dimmed());
        }
    }
    println!();
}
