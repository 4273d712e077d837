//! Changesets: immutable audit records of document changes
//!
//! A changeset is written once for every submission whose diff against the
//! stored state is non-empty. `order` starts at 1 and increases by one per
//! document; `timestamp` is the change time.
//!
//! ## Wire format
//!
//! ```json
//! {
//!   "document": "a",
//!   "order": 2,
//!   "timestamp": "2024-03-01T12:00:00.000Z",
//!   "fields": [ { "op": "replace", "path": "/name", "value": "Y" } ]
//! }
//! ```

use crate::error::Result;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Field holding the owning document id
pub const DOCUMENT_FIELD: &str = "document";
/// Field holding the per-document order number
pub const ORDER_FIELD: &str = "order";
/// Field holding the change time
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Patch operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Member or element added
    Add,
    /// Member or element removed
    Remove,
    /// Value replaced in place
    Replace,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Add => "add",
            Op::Remove => "remove",
            Op::Replace => "replace",
        })
    }
}

/// One field-level change inside a changeset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOp {
    /// Operation kind
    pub op: Op,
    /// JSON Pointer of the changed location
    pub path: String,
    /// Rendered new value; absent for removals and blank values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldOp {
    /// Build an op, rendering `value` for add/replace
    pub fn new(op: Op, path: impl Into<String>, value: Option<&Value>) -> Self {
        let value = match op {
            Op::Remove => None,
            Op::Add | Op::Replace => value.and_then(render_value),
        };
        FieldOp {
            op,
            path: path.into(),
            value,
        }
    }
}

/// Render a JSON value for storage in [`FieldOp::value`]
///
/// Strings are stored as their raw text, every other value as compact
/// JSON. Empty or blank renderings yield `None`.
pub fn render_value(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.trim().is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// Immutable audit record of one change to one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Id of the changed document
    pub document: String,
    /// Per-document sequence number, starting at 1
    pub order: u64,
    /// Change time
    pub timestamp: Timestamp,
    /// Field operations in patch order
    #[serde(default)]
    pub fields: Vec<FieldOp>,
}

impl Changeset {
    /// Create a changeset
    pub fn new(
        document: impl Into<String>,
        order: u64,
        timestamp: Timestamp,
        fields: Vec<FieldOp>,
    ) -> Self {
        Changeset {
            document: document.into(),
            order,
            timestamp,
            fields,
        }
    }

    /// True when the changeset records no field operations
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to the stored JSON form
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Deserialize from the stored JSON form
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
