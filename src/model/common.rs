use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type Id = String;

/// A row as the store returns it: field name to JSON value, nested
/// objects for embedded relations.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocStatus {
    Draft,
    New,
    Exporting,
    Completed,
    Cancelled,
    Counting,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountType {
    Full,
    #[serde(rename = "By Location")]
    ByLocation,
    #[serde(rename = "By Item")]
    ByItem,
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// RFC 3339 timestamp, the format the store uses for `timestamptz` columns
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Build a record from a `serde_json::json!` object literal.
///
/// Anything that is not a JSON object yields an empty record.
pub fn record_from(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// Identifiers are interpolated into URLs and SQL, so only plain
/// `[A-Za-z_][A-Za-z0-9_]*` names are accepted.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Text used for case-insensitive substring matching of a single value.
/// Strings match on their content, numbers and booleans on their JSON
/// rendering, arrays and objects on their serialized form.
pub fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
