//! Cell-level value classification.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Longest numeric prefix, as a lenient float parser reads it.
static FLOAT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap());

/// Whether a cell is missing: null or blank text.
pub fn is_empty_cell(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// A finite number, from a JSON number or a string that is entirely numeric.
pub fn strict_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// A finite number read leniently: strings contribute their leading numeric
/// prefix, so `"12.5 °C"` reads as 12.5.
pub fn parse_float(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let prefix = FLOAT_PREFIX.find(s.trim_start())?;
            prefix.as_str().parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Render a cell as text for grouping and display.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
