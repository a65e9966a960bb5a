//! Built-in property preprocessors.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use pipeline::{CapabilityName, CapabilityRegistry, PreprocessError, PropertyMap, PropertyPreprocessor};
use serde_json::Value;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Normalises a date string to `YYYY-MM-DD`.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYYMMDD`, RFC 3339 timestamps, and an
/// optional extra `format` argument (chrono `strftime` syntax).
#[derive(Debug, Default, Clone, Copy)]
pub struct DateStringToIsoDate;

impl PropertyPreprocessor for DateStringToIsoDate {
    fn process(&self, value: &Value, arguments: &PropertyMap) -> Result<Value, PreprocessError> {
        let raw = value
            .as_str()
            .ok_or_else(|| PreprocessError("expected a date string".into()))?
            .trim();

        let custom = arguments.get("format").and_then(Value::as_str);
        let date = custom
            .into_iter()
            .chain(DATE_FORMATS)
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
            .ok_or_else(|| PreprocessError(format!("'{raw}' is not a recognised date")))?;

        Ok(Value::String(date.format("%Y-%m-%d").to_string()))
    }
}

/// Splits a delimited string into a list of trimmed, non-empty strings.
///
/// The delimiter defaults to `,` and may be set with a `separator` argument.
/// Lists pass through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct SplitCommaSeparated;

impl PropertyPreprocessor for SplitCommaSeparated {
    fn process(&self, value: &Value, arguments: &PropertyMap) -> Result<Value, PreprocessError> {
        let separator = arguments
            .get("separator")
            .and_then(Value::as_str)
            .unwrap_or(",");
        if separator.is_empty() {
            return Err(PreprocessError("separator must not be empty".into()));
        }

        match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) => Ok(Value::Array(
                s.split(separator)
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            _ => Err(PreprocessError("expected a string or a list".into())),
        }
    }
}

/// A registry holding every built-in preprocessor under its canonical name.
pub fn builtin_capabilities() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    let builtins: [(&str, Arc<dyn PropertyPreprocessor>); 2] = [
        ("date_string_to_iso_date", Arc::new(DateStringToIsoDate)),
        ("split_comma_separated", Arc::new(SplitCommaSeparated)),
    ];
    for (name, preprocessor) in builtins {
        if let Some(name) = CapabilityName::new(name) {
            registry.register(name, preprocessor);
        }
    }
    registry
}
