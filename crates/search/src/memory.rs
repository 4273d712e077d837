//! In-memory search backend
//!
//! Reference implementation of [`SearchBackend`] used by tests and embedded
//! deployments. Each index is a sorted map of record id to JSON source held
//! behind an `Arc`; writers copy the map only while a snapshot still shares
//! it, so snapshots are cheap and fully isolated from later writes.
//!
//! # Thread Safety
//!
//! Indices sit behind a `parking_lot::RwLock`; open snapshots live in a
//! `DashMap` keyed by snapshot id.

use crate::backend::{
    DeleteOutcome, Hit, Page, PageRequest, SearchBackend, SnapshotHandle, SortKey, WriteOutcome,
};
use catalog_core::changeset::{DOCUMENT_FIELD, TIMESTAMP_FIELD};
use catalog_core::query::tokenize;
use catalog_core::{compare_values, Error, Predicate, QueryTerm, Result, SortDirection, Timestamp};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

type Records = BTreeMap<String, Value>;

struct SnapshotState {
    index: String,
    records: Arc<Records>,
    expires_at: Instant,
}

/// Search backend holding every index in process memory
pub struct InMemoryBackend {
    indices: RwLock<HashMap<String, Arc<Records>>>,
    snapshots: DashMap<String, SnapshotState>,
    available: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create an empty, reachable backend
    pub fn new() -> Self {
        InMemoryBackend {
            indices: RwLock::new(HashMap::new()),
            snapshots: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing or regaining the connection
    ///
    /// While unavailable, `ping` answers `false` and every other operation
    /// fails with `Error::BackendUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    /// Number of snapshots not yet closed or expired
    pub fn open_snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Number of records in an index
    pub fn len(&self, index: &str) -> usize {
        self.indices.read().get(index).map_or(0, |records| records.len())
    }

    /// Check if an index holds no records
    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    fn ensure_available(&self, operation: &'static str) -> Result<()> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(Error::unavailable(operation, "connection refused"))
        }
    }

    fn current(&self, index: &str) -> Arc<Records> {
        self.indices.read().get(index).cloned().unwrap_or_default()
    }

    /// Resolve the record set a page request reads from, refreshing the
    /// snapshot's keep-alive
    fn records_for(&self, request: &PageRequest<'_>) -> Result<Arc<Records>> {
        let handle = match request.snapshot {
            Some(handle) => handle,
            None => return Ok(self.current(request.index)),
        };

        let now = Instant::now();
        let mut state = self.snapshots.get_mut(handle.id()).ok_or_else(|| {
            Error::backend(
                "page",
                request.index,
                format!("snapshot {} does not exist", handle.id()),
            )
        })?;
        if now >= state.expires_at {
            drop(state);
            self.snapshots.remove(handle.id());
            return Err(Error::backend(
                "page",
                request.index,
                format!("snapshot {} has expired", handle.id()),
            ));
        }
        if state.index != request.index {
            return Err(Error::backend(
                "page",
                request.index,
                format!("snapshot {} was opened on '{}'", handle.id(), state.index),
            ));
        }
        state.expires_at = now + request.keep_alive;
        Ok(Arc::clone(&state.records))
    }
}

impl SearchBackend for InMemoryBackend {
    fn ping(&self) -> bool {
        self.available.load(AtomicOrdering::SeqCst)
    }

    fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        self.ensure_available("get")?;
        Ok(self
            .indices
            .read()
            .get(index)
            .and_then(|records| records.get(id).cloned()))
    }

    fn put_document(&self, index: &str, id: &str, source: &Value) -> Result<WriteOutcome> {
        self.ensure_available("index")?;
        let mut indices = self.indices.write();
        let records = Arc::make_mut(indices.entry(index.to_string()).or_default());
        let outcome = match records.insert(id.to_string(), source.clone()) {
            Some(_) => WriteOutcome::Updated,
            None => WriteOutcome::Created,
        };
        Ok(outcome)
    }

    fn delete_document(&self, index: &str, id: &str) -> Result<DeleteOutcome> {
        self.ensure_available("delete")?;
        let mut indices = self.indices.write();
        let removed = match indices.get_mut(index) {
            Some(records) if records.contains_key(id) => {
                Arc::make_mut(records).remove(id);
                true
            }
            _ => false,
        };
        Ok(if removed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    fn open_snapshot(&self, index: &str, keep_alive: Duration) -> Result<SnapshotHandle> {
        self.ensure_available("open_snapshot")?;
        let handle = SnapshotHandle::new(uuid::Uuid::new_v4().to_string(), index);
        let state = SnapshotState {
            index: index.to_string(),
            records: self.current(index),
            expires_at: Instant::now() + keep_alive,
        };
        self.snapshots.insert(handle.id().to_string(), state);
        debug!(target: "catalog::backend", index, snapshot = handle.id(), "Snapshot opened");
        Ok(handle)
    }

    fn close_snapshot(&self, handle: &SnapshotHandle) -> Result<()> {
        self.ensure_available("close_snapshot")?;
        match self.snapshots.remove(handle.id()) {
            Some(_) => Ok(()),
            None => Err(Error::backend(
                "close_snapshot",
                handle.index(),
                format!("snapshot {} does not exist", handle.id()),
            )),
        }
    }

    fn page(&self, request: &PageRequest<'_>) -> Result<Page> {
        self.ensure_available("page")?;
        let records = self.records_for(request)?;
        let direction = request.sort.direction;

        let mut hits: Vec<Hit> = records
            .iter()
            .filter(|(id, source)| matches_predicate(request.predicate, id, source))
            .map(|(id, source)| Hit {
                id: id.clone(),
                source: source.clone(),
                sort_key: SortKey {
                    value: source.get(&request.sort.field).cloned().unwrap_or(Value::Null),
                    tiebreak: id.clone(),
                },
            })
            .filter(|hit| match request.search_after {
                Some(after) => compare_keys(&hit.sort_key, after, direction) == Ordering::Greater,
                None => true,
            })
            .collect();

        hits.sort_by(|a, b| compare_keys(&a.sort_key, &b.sort_key, direction));
        hits.truncate(request.size);
        Ok(Page { hits })
    }
}

fn matches_predicate(predicate: &Predicate, id: &str, source: &Value) -> bool {
    match predicate {
        Predicate::MatchAll => true,
        Predicate::ById(wanted) => match source.get(DOCUMENT_FIELD).and_then(Value::as_str) {
            Some(document) => document == wanted,
            None => id == wanted,
        },
        Predicate::TimeRange { from, to } => source
            .get(TIMESTAMP_FIELD)
            .and_then(Value::as_str)
            .and_then(|raw| Timestamp::parse(raw).ok())
            .map_or(false, |ts| ts >= *from && ts <= *to),
        Predicate::Text(query) => query.terms().iter().all(|term| matches_term(term, source)),
        Predicate::And(left, right) => {
            matches_predicate(left, id, source) && matches_predicate(right, id, source)
        }
    }
}

fn matches_term(term: &QueryTerm, source: &Value) -> bool {
    let target = match &term.field {
        Some(field) => match source.get(field) {
            Some(value) => value,
            None => return false,
        },
        None => source,
    };
    let mut tokens = Vec::new();
    collect_tokens(target, &mut tokens);
    term.tokens.iter().all(|wanted| tokens.contains(wanted))
}

/// Tokens of every scalar leaf below `value`
fn collect_tokens(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.extend(tokenize(s)),
        Value::Bool(_) | Value::Number(_) => out.extend(tokenize(&value.to_string())),
        Value::Array(items) => items.iter().for_each(|item| collect_tokens(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_tokens(item, out)),
    }
}

/// Total order on sort keys: missing values last in both directions, then
/// record id ascending
fn compare_keys(a: &SortKey, b: &SortKey, direction: SortDirection) -> Ordering {
    let primary = match (a.value.is_null(), b.value.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare_values(&a.value, &b.value);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
    };
    primary.then_with(|| a.tiebreak.cmp(&b.tiebreak))
}
