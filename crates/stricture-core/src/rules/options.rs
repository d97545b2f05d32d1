//! Typed readers over a rule's free-form options bag.
//!
//! Malformed values read as absent so a rule falls back to its default.

use serde_json::Value;

use super::RuleConfig;

fn get<'a>(config: &'a RuleConfig, key: &str) -> Option<&'a Value> {
    config.options.get(key).filter(|v| !v.is_null())
}

/// A non-negative integer, given as a number or a numeric string.
pub fn usize_option(config: &RuleConfig, key: &str) -> Option<usize> {
    match get(config, key)? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn bool_option(config: &RuleConfig, key: &str) -> Option<bool> {
    match get(config, key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn str_option<'a>(config: &'a RuleConfig, key: &str) -> Option<&'a str> {
    get(config, key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A list of strings, given as an array or a comma-separated string.
pub fn str_list_option(config: &RuleConfig, key: &str) -> Option<Vec<String>> {
    value_as_str_list(get(config, key)?)
}

pub fn value_as_str_list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        Value::String(s) => s.split(',').map(|s| s.trim().to_string()).collect(),
        _ => return None,
    };
    Some(items.into_iter().filter(|s| !s.is_empty()).collect())
}
