//! Schema definitions shared by the engine and backends.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque identifier of one browse session.
///
/// Every backend request and every backend event carries the id of the
/// session it belongs to, so a multi-session engine can route replies and
/// drop the ones addressed to sessions that no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh id (UUIDv7, so ids sort by creation time).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a browsed dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Backend-defined unique key, used for drill-down navigation.
    pub id: String,

    /// Display name (artist name, album title, contact name, ...).
    #[serde(default)]
    pub name: String,

    /// Content type of the record (e.g. "artist", "track").
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Type specific properties.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Record {
    /// Create a record without extra properties.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            data: Map::new(),
        }
    }

    /// Add a property.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Look up a property by name.
    ///
    /// `id`, `name` and `type` resolve to the built-in fields; everything
    /// else is looked up in `data`.
    pub fn field(&self, property: &str) -> Option<Value> {
        match property {
            "id" => Some(Value::String(self.id.clone())),
            "name" => Some(Value::String(self.name.clone())),
            "type" => Some(Value::String(self.kind.clone())),
            other => self.data.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_field_lookup() {
        let record = Record::new("t1", "Uprising", "track").with("year", 2009);
        assert_eq!(record.field("name"), Some(Value::from("Uprising")));
        assert_eq!(record.field("type"), Some(Value::from("track")));
        assert_eq!(record.field("year"), Some(Value::from(2009)));
        assert_eq!(record.field("genre"), None);
    }

    #[test]
    fn test_record_serializes_type_field() {
        let record = Record::new("a1", "Muse", "artist");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "artist");
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
