//! Catalog documents
//!
//! A document is a JSON object with a unique `id` and the mandatory,
//! non-empty fields `type`, `name`, `owner` and `description`. Three
//! bookkeeping timestamps (`created`, `lastUpload`, `lastUpdate`) are owned
//! by the write path, never by the caller.

use crate::error::{Error, Result, ValidationError};
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier field
pub const ID_FIELD: &str = "id";
/// Creation time, preserved across writes
pub const CREATED_FIELD: &str = "created";
/// Time of the most recent submission, changed or not
pub const LAST_UPLOAD_FIELD: &str = "lastUpload";
/// Time of the most recent submission that produced a changeset
pub const LAST_UPDATE_FIELD: &str = "lastUpdate";

/// Fields every submission must carry, checked in this order
pub const MANDATORY_FIELDS: [&str; 5] = [ID_FIELD, "type", "name", "owner", "description"];

/// A catalog document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap a JSON value; anything but an object is rejected
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Document(map)),
            other => Err(Error::InvalidRequest(format!(
                "document must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Document id, if present as a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value as a string
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Set a field
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Set a bookkeeping timestamp
    pub fn set_timestamp(&mut self, field: &str, ts: Timestamp) {
        self.0.insert(field.to_string(), Value::String(ts.to_rfc3339()));
    }

    /// Read a bookkeeping timestamp
    ///
    /// Returns `None` for absent or unparseable values.
    pub fn timestamp(&self, field: &str) -> Option<Timestamp> {
        self.get_str(field).and_then(|raw| Timestamp::parse(raw).ok())
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Check the id and mandatory fields
    ///
    /// A missing or empty id is reported first, together with a freshly
    /// minted replacement id. Otherwise the first absent mandatory field is
    /// reported, then the first empty one. A field is empty when [`sanitize`]
    /// would strip it or leave it blank, so `{"team": null}` is empty.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let id_ok = matches!(self.get_str(ID_FIELD), Some(id) if !id.trim().is_empty());
        if !id_ok {
            return Err(ValidationError::MissingId {
                generated_id: uuid::Uuid::new_v4().to_string(),
            });
        }
        if let Some(field) = MANDATORY_FIELDS.iter().find(|f| !self.0.contains_key(**f)) {
            return Err(ValidationError::MissingField(field.to_string()));
        }
        if let Some(field) = MANDATORY_FIELDS
            .iter()
            .find(|f| self.0.get(**f).map_or(false, is_empty_after_sanitize))
        {
            return Err(ValidationError::EmptyField(field.to_string()));
        }
        Ok(())
    }

    /// Keep only the given top-level fields plus `id`
    pub fn project<S: AsRef<str>>(&self, fields: &[S]) -> Value {
        let mut out = Map::new();
        for (key, value) in &self.0 {
            if key == ID_FIELD || fields.iter().any(|f| f.as_ref() == key) {
                out.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn is_empty_after_sanitize(value: &Value) -> bool {
    match value {
        Value::Object(_) | Value::Array(_) => {
            let mut copy = value.clone();
            sanitize(&mut copy);
            is_empty_value(&copy)
        }
        other => is_empty_value(other),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip `null` members and containers that end up empty
///
/// Applied recursively to the children of `value`; the root container
/// itself is kept even when it becomes empty. Empty strings are data and
/// are kept.
pub fn sanitize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, child| keep_after_sanitize(child));
        }
        Value::Array(items) => {
            items.retain_mut(keep_after_sanitize);
        }
        _ => {}
    }
}

fn keep_after_sanitize(child: &mut Value) -> bool {
    match child {
        Value::Null => false,
        Value::Object(_) | Value::Array(_) => {
            sanitize(child);
            !is_empty_value(child)
        }
        _ => true,
    }
}
