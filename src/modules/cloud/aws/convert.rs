//! Conversions between AWS response shapes and module results.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static FIRST_CAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").unwrap());
static ALL_CAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

/// Converts an AWS `CamelCase` name to `snake_case`.
///
/// Acronyms stay together: `PolicyARN` becomes `policy_arn` and
/// `DBInstanceIdentifier` becomes `db_instance_identifier`.
pub fn camel_to_snake(name: &str) -> String {
    let spaced = FIRST_CAP.replace_all(name, "${1}_${2}");
    ALL_CAP.replace_all(&spaced, "${1}_${2}").to_lowercase()
}

/// Recursively renames every object key to `snake_case`.
pub fn camel_dict_to_snake(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (camel_to_snake(k), camel_dict_to_snake(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(camel_dict_to_snake).collect()),
        other => other.clone(),
    }
}

/// Turns `[{Key: k, Value: v}, ...]` into `{k: v, ...}`.
///
/// Entries without a string `Key` are skipped.
pub fn tag_list_to_dict(tags: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Array(items) = tags {
        for item in items {
            if let Some(key) = item.get("Key").and_then(Value::as_str) {
                let value = item.get("Value").cloned().unwrap_or(Value::Null);
                out.insert(key.to_string(), value);
            }
        }
    }
    out
}

/// One `Name`/`Values` filter as accepted by AWS describe calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedFilter {
    pub name: String,
    pub values: Vec<String>,
}

/// Turns a `{name: value | [values]}` mapping into AWS filter entries.
pub fn filter_list(filters: &Map<String, Value>) -> Vec<NamedFilter> {
    filters
        .iter()
        .map(|(name, value)| {
            let values = match value {
                Value::Array(items) => items.iter().map(scalar_to_string).collect(),
                Value::Null => Vec::new(),
                other => vec![scalar_to_string(other)],
            };
            NamedFilter {
                name: name.clone(),
                values,
            }
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
