//! Project config at `.planning/config.json`.
//!
//! The config is a free-form JSON object: workflow keys at the top level
//! plus one section per manifest feature. It is kept as a
//! [`serde_json::Map`] so unknown keys survive every load/save cycle.

use crate::document::{read_optional, write_document_atomic};
use crate::error::{PlanError, Result};
use crate::paths;
use serde_json::{Map, Value};
use std::path::Path;

pub type ConfigMap = Map<String, Value>;

fn parse(text: &str) -> Result<ConfigMap> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(PlanError::InvalidConfig(format!(
            "expected a JSON object at the top level, found {}",
            crate::manifest::json_type_name(&other)
        ))),
    }
}

/// Load the config, or `None` when the file does not exist.
pub fn load(root: &Path) -> Result<Option<ConfigMap>> {
    read_optional(&paths::config_path(root))?
        .map(|text| parse(&text))
        .transpose()
}

/// Load the config, treating a missing file as an empty object.
pub fn load_or_default(root: &Path) -> Result<ConfigMap> {
    Ok(load(root)?.unwrap_or_default())
}

pub fn save(root: &Path, config: &ConfigMap) -> Result<()> {
    let mut text = serde_json::to_string_pretty(config)?;
    text.push('\n');
    write_document_atomic(&paths::config_path(root), &text)
}

// ---------------------------------------------------------------------------
// Dotted key access
// ---------------------------------------------------------------------------

pub fn get_path<'a>(config: &'a ConfigMap, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = config.get(parts.next()?)?;
    parts.try_fold(first, |value, part| value.as_object()?.get(part))
}

/// Set `key` (dotted) to `value`, creating intermediate objects as needed.
/// Returns the previous value.
pub fn set_path(config: &mut ConfigMap, key: &str, value: Value) -> Result<Option<Value>> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(PlanError::InvalidValue(format!("invalid config key '{key}'")));
    }
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| PlanError::InvalidValue("empty config key".to_string()))?;
    let mut current = config;
    for (i, part) in parents.iter().enumerate() {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry.as_object_mut().ok_or_else(|| {
            PlanError::InvalidConfig(format!(
                "'{}' is not an object",
                parts[..=i].join(".")
            ))
        })?;
    }
    Ok(current.insert(last.to_string(), value))
}

/// Interpret a command-line value: JSON literals (`true`, `42`, `[1]`,
/// `"x"`) keep their type, anything else becomes a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
