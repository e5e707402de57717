use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Row id of any hierarchy entity.
pub type EntityId = i64;

/// Decodes an optional ancestor link. Numbers and numeric strings are accepted;
/// `null`, `0`, empty strings and anything non-numeric decode as absent.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

pub fn id_from_value(value: &Value) -> Option<EntityId> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    normalize_id(Some(id))
}

/// Storage uses `0` as a "no link" sentinel in a few legacy rows.
pub fn normalize_id(id: Option<EntityId>) -> Option<EntityId> {
    id.filter(|value| *value != 0)
}
