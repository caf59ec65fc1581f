//! Lenient YAML field helpers.
//!
//! Authors write `tables: orders` as often as `tables: [orders]`, and sample
//! values are a mix of strings, numbers, booleans and dates. These helpers
//! accept the loose forms and hand back strings.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Render a scalar YAML value as text. Null, sequences and mappings yield `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// `field: a` or `field: [a, b]`, always as a list.
pub(crate) fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(&other).into_iter().collect(),
    })
}

/// Optional scalar of any type, as text.
pub(crate) fn opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

/// A key list written either as a YAML list or as `"a, b"`.
pub(crate) fn key_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(split_keys(&value))
}

/// One or many key lists: `[a, b]` is a single key, `[[a], [b, c]]` is two.
pub(crate) fn key_lists<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let lists = match &value {
        Value::Sequence(items) if items.iter().any(|i| matches!(i, Value::Sequence(_))) => {
            items.iter().map(split_keys).filter(|k| !k.is_empty()).collect()
        }
        Value::Null => Vec::new(),
        other => {
            let keys = split_keys(other);
            if keys.is_empty() {
                Vec::new()
            } else {
                vec![keys]
            }
        }
    };
    Ok(lists)
}

fn split_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        other => scalar_to_string(other)
            .map(|s| {
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    }
}
