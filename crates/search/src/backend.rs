//! The search backend capability
//!
//! The catalog uses a full-text search engine as both its document store and
//! its query index. Everything it needs from that engine is captured by
//! [`SearchBackend`]; concrete engines translate [`Predicate`] and [`Sort`]
//! into their own query DSL at this boundary.
//!
//! # Failure model
//!
//! Every operation may fail with `Error::BackendUnavailable` (transport) or
//! `Error::Backend` (index, query or snapshot failure). Implementations never
//! retry internally.

use catalog_core::{Predicate, Result, Sort};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Outcome of indexing a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOutcome {
    /// A new record was stored
    Created,
    /// An existing record was overwritten
    Updated,
    /// The backend ignored the write
    NoOp,
    /// The target was not found
    NotFound,
    /// The backend reported a deletion
    Deleted,
}

impl WriteOutcome {
    /// Only `Created` and `Updated` mean the record is stored as sent
    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Created | WriteOutcome::Updated)
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Updated => "updated",
            WriteOutcome::NoOp => "noop",
            WriteOutcome::NotFound => "not_found",
            WriteOutcome::Deleted => "deleted",
        })
    }
}

/// Outcome of deleting a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteOutcome {
    /// The record existed and was removed
    Deleted,
    /// No record with that id
    NotFound,
}

/// Opaque handle to a point-in-time read context on one index
///
/// Owned by a single retrieval call; never persisted or shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotHandle {
    id: String,
    index: String,
}

impl SnapshotHandle {
    /// Wrap a backend-issued snapshot id
    pub fn new(id: impl Into<String>, index: impl Into<String>) -> Self {
        SnapshotHandle {
            id: id.into(),
            index: index.into(),
        }
    }

    /// Backend-issued id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Index the snapshot was opened on
    pub fn index(&self) -> &str {
        &self.index
    }
}

/// Position of a record in a sorted result set
///
/// `value` is the record's value of the sort field (`Null` when missing);
/// `tiebreak` is the record id, which makes the order total.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Sort field value
    pub value: Value,
    /// Record id
    pub tiebreak: String,
}

/// One record returned by a page request
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Record id
    pub id: String,
    /// Stored record
    pub source: Value,
    /// Continuation key of this record
    pub sort_key: SortKey,
}

/// A bounded page of hits in sort order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Hits in sort order
    pub hits: Vec<Hit>,
}

impl Page {
    /// Number of hits
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Check if the page is empty
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Continuation key for the following page
    pub fn next_key(&self) -> Option<&SortKey> {
        self.hits.last().map(|hit| &hit.sort_key)
    }
}

/// Parameters of a single page request
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Target index
    pub index: &'a str,
    /// Filter
    pub predicate: &'a Predicate,
    /// Sort field and direction; ties break on record id ascending
    pub sort: &'a Sort,
    /// Maximum number of hits
    pub size: usize,
    /// Snapshot to read from; the live index when absent
    pub snapshot: Option<&'a SnapshotHandle>,
    /// New time-to-live of the snapshot, applied by this request
    pub keep_alive: Duration,
    /// Return only hits strictly after this key
    pub search_after: Option<&'a SortKey>,
}

/// Capability consumed by the catalog
pub trait SearchBackend: Send + Sync {
    /// Whether the backend answers at all
    fn ping(&self) -> bool;

    /// Fetch a record by id
    fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>>;

    /// Store a record under `id`, replacing any previous version
    fn put_document(&self, index: &str, id: &str, source: &Value) -> Result<WriteOutcome>;

    /// Remove a record
    fn delete_document(&self, index: &str, id: &str) -> Result<DeleteOutcome>;

    /// Open a point-in-time read context on `index`
    fn open_snapshot(&self, index: &str, keep_alive: Duration) -> Result<SnapshotHandle>;

    /// Release a snapshot
    fn close_snapshot(&self, handle: &SnapshotHandle) -> Result<()>;

    /// Fetch one page of a sorted, filtered result set
    fn page(&self, request: &PageRequest<'_>) -> Result<Page>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_created_and_updated_succeed() {
        assert!(WriteOutcome::Created.is_success());
        assert!(WriteOutcome::Updated.is_success());
        assert!(!WriteOutcome::NoOp.is_success());
        assert!(!WriteOutcome::NotFound.is_success());
        assert!(!WriteOutcome::Deleted.is_success());
    }

    #[test]
    fn test_write_outcome_display() {
        assert_eq!(WriteOutcome::NoOp.to_string(), "noop");
        assert_eq!(WriteOutcome::Deleted.to_string(), "deleted");
    }

    #[test]
    fn test_page_next_key_is_last_hit() {
        let hit = |id: &str| Hit {
            id: id.to_string(),
            source: json!({}),
            sort_key: SortKey {
                value: json!(id),
                tiebreak: id.to_string(),
            },
        };
        let page = Page {
            hits: vec![hit("a"), hit("b")],
        };
        assert_eq!(page.next_key().map(|k| k.tiebreak.as_str()), Some("b"));
        assert!(Page::default().next_key().is_none());
    }
}
