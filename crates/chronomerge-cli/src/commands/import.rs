//! Import command - drive the import wizard end to end.

use std::collections::HashMap;
use std::path::PathBuf;

use chronomerge::grouping::DATE_GROUP_ID;
use chronomerge::pivot::{HttpPivotService, LocalPivotService, PivotRequest};
use chronomerge::{
    FileStatus, ImportConfig, ImportError, ImportWizard, NextOutcome, PivotConfig,
    TimeSeriesQuery, UploadedFile, WizardStep,
};
use colored::Colorize;
use tracing::warn;

/// Arguments of the `import` subcommand.
pub struct ImportArgs {
    pub files: Vec<PathBuf>,
    pub rename: Vec<String>,
    pub pivot: Vec<String>,
    pub group: Vec<String>,
    pub date: Vec<String>,
    pub local_pivot: bool,
    pub api_url: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub output: Option<PathBuf>,
}

/// How to pivot one file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PivotChoice {
    /// Use the inferred columns.
    Auto,
    Columns(PivotRequest),
}

pub fn run(args: ImportArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let renames = parse_pairs(&args.rename, '=')?;
    let pivots = args
        .pivot
        .iter()
        .map(|spec| parse_pivot_spec(spec))
        .collect::<Result<HashMap<_, _>, _>>()?;
    let groups = args
        .group
        .iter()
        .map(|spec| parse_group_spec(spec))
        .collect::<Result<Vec<_>, _>>()?;
    let dates = args
        .date
        .iter()
        .map(|spec| parse_file_column(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let files = args
        .files
        .iter()
        .map(UploadedFile::from_path)
        .collect::<Result<Vec<_>, _>>()?;

    let mut config = ImportConfig::default();
    config.pivot = match &args.api_url {
        Some(url) => PivotConfig::from_env()?.with_api_url(url)?,
        None => PivotConfig::from_env()?,
    };

    let wizard = ImportWizard::with_config(config.clone());
    let mut wizard = if args.local_pivot {
        wizard.with_pivot_service(LocalPivotService::new())
    } else {
        wizard.with_pivot_service(HttpPivotService::with_config(config.pivot.clone())?)
    };

    eprintln!(
        "{} {} file(s)",
        "Importing".cyan().bold(),
        files.len().to_string().white().bold()
    );
    wizard.open(files);

    // File previews
    loop {
        let WizardStep::FilePreview(index) = wizard.step() else {
            break;
        };
        let name = wizard.identity(index).unwrap_or_default().to_string();

        if let Some(new_name) = lookup(&renames, &name) {
            wizard.rename_file(index, new_name)?;
        }
        report_file(&wizard, index, verbose);

        if wizard.status(index).is_some_and(|s| s.is_loaded()) {
            let key = wizard.display_key(index).unwrap_or_default().to_string();
            if let Some(choice) = lookup(&pivots, &name).or_else(|| lookup(&pivots, &key)) {
                pivot_file(&mut wizard, index, choice);
            }
        }

        match wizard.next()? {
            NextOutcome::Advanced(_) => {}
            NextOutcome::EnteredColumnConfig => break,
            NextOutcome::NoValidFiles => {
                return Err("None of the files could be imported".into());
            }
        }
    }

    // Column configuration
    for (file, column) in &dates {
        wizard.set_mapping(DATE_GROUP_ID, file, Some(column.clone()))?;
    }
    for (name, mappings) in &groups {
        let existing = wizard
            .groups()
            .value_groups()
            .find(|g| g.name.eq_ignore_ascii_case(name))
            .map(|g| g.id.clone());
        let id = match existing {
            Some(id) => id,
            None => {
                let id = wizard.groups_mut().add_group();
                wizard.groups_mut().rename_group(&id, name)?;
                id
            }
        };
        for (file, column) in mappings {
            wizard.set_mapping(&id, file, Some(column.clone()))?;
        }
    }

    let grouped = match wizard.finish() {
        Ok(grouped) => grouped,
        Err(ImportError::Mapping(errors)) => {
            for (key, message) in errors.iter() {
                eprintln!("  {} [{}] {}", "✗".red(), key, message);
            }
            return Err(format!("{} invalid column mapping(s)", errors.len()).into());
        }
        Err(e) => return Err(e.into()),
    };

    let grouped = if args.start.is_some() || args.end.is_some() {
        grouped.filter(&TimeSeriesQuery {
            start: args.start.clone(),
            end: args.end.clone(),
            ..Default::default()
        })?
    } else {
        grouped
    };

    eprintln!(
        "{} {} timestamps, groups: {}",
        "Merged".green().bold(),
        grouped.len().to_string().white().bold(),
        grouped.group_names().join(", ")
    );

    match &args.output {
        Some(path) => {
            grouped.save(path)?;
            eprintln!("Wrote {}", path.display().to_string().white());
        }
        None => println!("{}", serde_json::to_string_pretty(&grouped)?),
    }
    Ok(())
}

fn report_file(wizard: &ImportWizard, index: usize, verbose: bool) {
    let key = wizard.display_key(index).unwrap_or_default();
    match wizard.status(index) {
        Some(FileStatus::Loaded(loaded)) => {
            eprintln!(
                "  {} {} ({} rows, date = {}, value = {})",
                "✓".green(),
                key.white(),
                loaded.config.raw_data.len(),
                loaded.config.date_column,
                loaded.config.value_column
            );
            if verbose {
                for warning in loaded.validation.iter().flat_map(|v| v.warnings.iter()) {
                    eprintln!("    {} {}", "warning:".yellow(), warning);
                }
            }
            if let Some(warning) = wizard.pivot_state(index).and_then(|s| s.warning.as_ref()) {
                eprintln!("    {} {}", "hint:".yellow(), warning);
            }
        }
        Some(FileStatus::Failed(failure)) => {
            eprintln!(
                "  {} {} skipped ({}): {}",
                "✗".red(),
                key.white(),
                failure.kind.label(),
                failure.message
            );
        }
        _ => {}
    }
}

/// Pivot the current file; on failure fall back to the raw rows.
fn pivot_file(wizard: &mut ImportWizard, index: usize, choice: &PivotChoice) {
    let key = wizard.display_key(index).unwrap_or_default().to_string();
    let result = wizard.set_pivot_mode(true).and_then(|_| {
        if let PivotChoice::Columns(request) = choice {
            wizard.set_pivot_selection(request.clone());
        } else if wizard.infer_pivot_selection().is_none() {
            return Err(ImportError::Wizard(
                "Could not infer pivot columns; pass INDEX,CATEGORY,VALUE".to_string(),
            ));
        }
        wizard.apply_pivot()
    });

    match result {
        Ok(()) => {
            let rows = wizard
                .status(index)
                .and_then(|s| s.loaded())
                .map(|l| l.config.raw_data.len())
                .unwrap_or(0);
            eprintln!("    {} pivoted {} into {} rows", "↻".cyan(), key, rows);
        }
        Err(e) => {
            eprintln!("    {} pivot of {} failed: {}", "✗".red(), key, e);
            if let Err(e) = wizard.set_pivot_mode(false) {
                warn!(file = %key, error = %e, "could not leave pivot mode");
            }
        }
    }
}

/// Find a value keyed by identity or by original file name.
fn lookup<'a, V>(map: &'a HashMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| UploadedFile::new(k.as_str(), Vec::new()).stable_id() == key)
            .map(|(_, v)| v)
    })
}

fn parse_pairs(specs: &[String], separator: char) -> Result<HashMap<String, String>, String> {
    specs
        .iter()
        .map(|spec| {
            let (left, right) = split_once_trimmed(spec, separator)
                .ok_or_else(|| format!("Expected OLD{}NEW, got '{}'", separator, spec))?;
            Ok((left, right))
        })
        .collect()
}

fn parse_pivot_spec(spec: &str) -> Result<(String, PivotChoice), String> {
    let (file, columns) = split_once_trimmed(spec, '=')
        .ok_or_else(|| format!("Expected FILE=INDEX,CATEGORY,VALUE, got '{}'", spec))?;
    if columns.eq_ignore_ascii_case("auto") {
        return Ok((file, PivotChoice::Auto));
    }
    let parts: Vec<&str> = columns.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [index, category, value] if !index.is_empty() && !category.is_empty() && !value.is_empty() => {
            Ok((file, PivotChoice::Columns(PivotRequest::new(*index, *category, *value))))
        }
        _ => Err(format!("Expected three pivot columns in '{}'", spec)),
    }
}

fn parse_group_spec(spec: &str) -> Result<(String, Vec<(String, String)>), String> {
    let (name, mappings) = split_once_trimmed(spec, '=')
        .ok_or_else(|| format!("Expected NAME=FILE:COLUMN[,FILE:COLUMN], got '{}'", spec))?;
    let mappings = mappings
        .split(',')
        .map(parse_file_column)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name, mappings))
}

fn parse_file_column(spec: &str) -> Result<(String, String), String> {
    split_once_trimmed(spec, ':').ok_or_else(|| format!("Expected FILE:COLUMN, got '{}'", spec))
}

fn split_once_trimmed(spec: &str, separator: char) -> Option<(String, String)> {
    let (left, right) = spec.split_once(separator)?;
    let (left, right) = (left.trim(), right.trim());
    (!left.is_empty() && !right.is_empty()).then(|| (left.to_string(), right.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pivot_spec() {
        let (file, choice) = parse_pivot_spec("plant=log_date, data_type ,value").unwrap();
        assert_eq!(file, "plant");
        assert_eq!(
            choice,
            PivotChoice::Columns(PivotRequest::new("log_date", "data_type", "value"))
        );
        assert_eq!(parse_pivot_spec("plant=AUTO").unwrap().1, PivotChoice::Auto);
        assert!(parse_pivot_spec("plant=a,b").is_err());
        assert!(parse_pivot_spec("plant").is_err());
    }

    #[test]
    fn test_parse_group_spec() {
        let (name, mappings) = parse_group_spec("Humidity=room:hum, cellar:rh").unwrap();
        assert_eq!(name, "Humidity");
        assert_eq!(
            mappings,
            vec![
                ("room".to_string(), "hum".to_string()),
                ("cellar".to_string(), "rh".to_string())
            ]
        );
        assert!(parse_group_spec("Humidity=room").is_err());
    }

    #[test]
    fn test_parse_file_column_keeps_colons_in_column() {
        assert_eq!(
            parse_file_column("a:time:utc").unwrap(),
            ("a".to_string(), "time:utc".to_string())
        );
    }

    #[test]
    fn test_failed_pivot_falls_back_to_raw_rows() {
        let mut wizard = ImportWizard::new().with_pivot_service(LocalPivotService::new());
        wizard.open(vec![UploadedFile::new("a.csv", "date,temp\n2024-01-01,10")]);

        let request = PivotRequest::new("date", "kind", "temp");
        pivot_file(&mut wizard, 0, &PivotChoice::Columns(request));

        let state = wizard.pivot_state(0).unwrap();
        assert!(!state.mode);
        assert!(!state.applied);
        assert!(state.error.is_none());
        assert!(wizard.can_advance());
        assert_eq!(wizard.status(0).unwrap().loaded().unwrap().config.raw_data.len(), 1);
    }

    #[test]
    fn test_lookup_by_file_name() {
        let mut map = HashMap::new();
        map.insert("sensor.csv".to_string(), "kitchen".to_string());
        assert_eq!(lookup(&map, "sensor").map(String::as_str), Some("kitchen"));
        assert!(lookup(&map, "other").is_none());
    }
}
