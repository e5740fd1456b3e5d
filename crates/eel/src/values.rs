//! Variable values from the command line and from JSON files.

use crate::error::{Error, Result};
use crate::template::{Entry, TemplateValues};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Splits `NAME=VALUE`. The value may be empty or contain `=`.
pub fn parse_assignment(text: &str) -> Result<(String, String)> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::Assignment(text.to_string())),
    }
}

/// Reads a JSON object of values from `path`.
pub fn load_values(path: &Path) -> Result<TemplateValues> {
    let content = fs::read_to_string(path).map_err(|source| Error::ReadValues {
        path: path.to_path_buf(),
        source,
    })?;
    parse_values(&content).map_err(|message| Error::ValuesFormat {
        path: path.to_path_buf(),
        message,
    })
}

/// Parses a JSON object mapping names to values.
///
/// A value is a string, number or boolean, or an object with a `value` and
/// optional `sources` list. `null` leaves the variable unset.
pub fn parse_values(content: &str) -> std::result::Result<TemplateValues, String> {
    let json: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let Value::Object(map) = json else {
        return Err("expected a JSON object".to_string());
    };
    let mut values = TemplateValues::new();
    for (name, value) in map {
        if let Some(entry) = json_to_entry(&value).map_err(|e| format!("'{name}': {e}"))? {
            values.set_value(name, entry);
        }
    }
    Ok(values)
}

fn json_to_entry(json: &Value) -> std::result::Result<Option<Entry>, String> {
    match json {
        Value::Null => Ok(None),
        Value::Object(fields) => {
            let Some(value) = scalar(fields.get("value").unwrap_or(&Value::Null))? else {
                return Ok(None);
            };
            let mut entry = Entry::new(value);
            match fields.get("sources") {
                None | Some(Value::Null) => {}
                Some(Value::Array(sources)) => {
                    for source in sources {
                        match source {
                            Value::String(s) => entry = entry.with_source(s.as_str()),
                            other => return Err(format!("source {other} is not a string")),
                        }
                    }
                }
                Some(other) => return Err(format!("sources {other} is not a list")),
            }
            Ok(Some(entry))
        }
        other => Ok(scalar(other)?.map(Entry::new)),
    }
}

fn scalar(json: &Value) -> std::result::Result<Option<String>, String> {
    match json {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(format!("{other} is not a plain value")),
    }
}
