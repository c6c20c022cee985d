use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Render a JSON scalar as text; arrays, objects and null give `None`
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Serde helper for fields the sources send either as strings or numbers
pub fn opt_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Keep only scalar pass-through values; anything nested becomes null
pub fn scalar_or_null(value: Option<Value>) -> Value {
    match value {
        Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::Null,
    }
}
