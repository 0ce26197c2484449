//! Conversions between the persisted YAML tree and plain JSON values.
//!
//! YAML mappings may carry non-string keys (season numbers, episode ranges);
//! JSON objects cannot, so keys are stringified on the way out and
//! integer-looking keys are restored on the way back in.

use serde_json::{Map, Number as JsonNumber, Value as JsonValue};
use serde_yaml::{Mapping, Number as YamlNumber, Value as YamlValue};

/// Arbitrary nested configuration object in its plain, transport-safe form.
pub type ConfigMap = Map<String, JsonValue>;

/// Convert a YAML node into a plain JSON value, dropping tags.
pub fn yaml_to_json(value: &YamlValue) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(flag) => JsonValue::Bool(*flag),
        YamlValue::Number(number) => yaml_number_to_json(number),
        YamlValue::String(text) => JsonValue::String(text.clone()),
        YamlValue::Sequence(items) => JsonValue::Array(items.iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => JsonValue::Object(mapping_to_json(mapping)),
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Convert a YAML mapping into a JSON object, preserving iteration order.
pub fn mapping_to_json(mapping: &Mapping) -> ConfigMap {
    mapping
        .iter()
        .map(|(key, value)| (key_to_string(key), yaml_to_json(value)))
        .collect()
}

/// Convert a plain JSON value into a YAML node suitable for persistence.
pub fn json_to_yaml(value: &JsonValue) -> YamlValue {
    match value {
        JsonValue::Null => YamlValue::Null,
        JsonValue::Bool(flag) => YamlValue::Bool(*flag),
        JsonValue::Number(number) => YamlValue::Number(json_number_to_yaml(number)),
        JsonValue::String(text) => YamlValue::String(text.clone()),
        JsonValue::Array(items) => YamlValue::Sequence(items.iter().map(json_to_yaml).collect()),
        JsonValue::Object(object) => YamlValue::Mapping(object_to_mapping(object)),
    }
}

/// Convert a JSON object into a YAML mapping, preserving insertion order.
pub fn object_to_mapping(object: &ConfigMap) -> Mapping {
    object
        .iter()
        .map(|(key, value)| (json_key_to_yaml(key), json_to_yaml(value)))
        .collect()
}

/// Render a YAML mapping key as the string used for it in JSON.
pub fn key_to_string(key: &YamlValue) -> String {
    match key {
        YamlValue::String(text) => text.clone(),
        YamlValue::Number(number) => number.to_string(),
        YamlValue::Bool(flag) => flag.to_string(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Tagged(tagged) => key_to_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn yaml_number_to_json(number: &YamlNumber) -> JsonValue {
    if let Some(value) = number.as_i64() {
        return JsonValue::Number(value.into());
    }
    if let Some(value) = number.as_u64() {
        return JsonValue::Number(value.into());
    }
    number
        .as_f64()
        .and_then(JsonNumber::from_f64)
        .map(JsonValue::Number)
        // .inf / .nan have no JSON representation
        .unwrap_or_else(|| JsonValue::String(number.to_string()))
}

fn json_number_to_yaml(number: &JsonNumber) -> YamlNumber {
    if let Some(value) = number.as_i64() {
        YamlNumber::from(value)
    } else if let Some(value) = number.as_u64() {
        YamlNumber::from(value)
    } else {
        YamlNumber::from(number.as_f64().unwrap_or_default())
    }
}

fn json_key_to_yaml(key: &str) -> YamlValue {
    match key.parse::<i64>() {
        Ok(value) if value.to_string() == key => YamlValue::Number(value.into()),
        _ => YamlValue::String(key.to_string()),
    }
}
