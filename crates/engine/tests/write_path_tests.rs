//! Write Path Tests
//!
//! Validates the submit sequence against misbehaving backends and
//! concurrent writers of the same document.

use catalog_core::{Error, ManualClock, Result, Timestamp};
use catalog_engine::{Catalog, CatalogConfig};
use catalog_search::{
    DeleteOutcome, InMemoryBackend, Page, PageRequest, SearchBackend, SnapshotHandle,
    WriteOutcome,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

// ============================================================================
// Scripted backend
// ============================================================================

/// In-memory backend whose writes to one index can be overridden
#[derive(Default)]
struct ScriptedBackend {
    inner: InMemoryBackend,
    /// Outcome reported (without storing) for puts to this index
    override_put: Mutex<Option<(String, WriteOutcome)>>,
    /// Fail deletes on this index
    fail_delete: Mutex<Option<String>>,
    /// Order of (index, id) puts that reached the store
    writes: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn override_put(&self, index: &str, outcome: WriteOutcome) {
        *self.override_put.lock() = Some((index.to_string(), outcome));
    }
}

impl SearchBackend for ScriptedBackend {
    fn ping(&self) -> bool {
        self.inner.ping()
    }

    fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        self.inner.get_document(index, id)
    }

    fn put_document(&self, index: &str, id: &str, source: &Value) -> Result<WriteOutcome> {
        if let Some((target, outcome)) = self.override_put.lock().clone() {
            if target == index {
                return Ok(outcome);
            }
        }
        self.writes.lock().push(index.to_string());
        self.inner.put_document(index, id, source)
    }

    fn delete_document(&self, index: &str, id: &str) -> Result<DeleteOutcome> {
        if self.fail_delete.lock().as_deref() == Some(index) {
            return Err(Error::backend("delete", index, "injected"));
        }
        self.inner.delete_document(index, id)
    }

    fn open_snapshot(&self, index: &str, keep_alive: Duration) -> Result<SnapshotHandle> {
        self.inner.open_snapshot(index, keep_alive)
    }

    fn close_snapshot(&self, handle: &SnapshotHandle) -> Result<()> {
        self.inner.close_snapshot(handle)
    }

    fn page(&self, request: &PageRequest<'_>) -> Result<Page> {
        self.inner.page(request)
    }
}

fn setup() -> (Arc<ScriptedBackend>, Arc<ManualClock>, Catalog) {
    let backend = Arc::new(ScriptedBackend::default());
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000).unwrap()));
    let catalog =
        Catalog::with_clock(backend.clone(), CatalogConfig::default(), clock.clone()).unwrap();
    (backend, clock, catalog)
}

fn body(name: &str) -> Value {
    json!({"id": "a", "type": "service", "name": name, "owner": "T", "description": "d"})
}

// ============================================================================
// Write outcomes
// ============================================================================

#[test]
fn test_changeset_is_stored_before_document() {
    let (backend, _, catalog) = setup();
    catalog.submit(body("X")).unwrap();
    assert_eq!(*backend.writes.lock(), vec!["changeset", "steckbrief"]);
}

#[test]
fn test_unchanged_submit_writes_only_document() {
    let (backend, _, catalog) = setup();
    catalog.submit(body("X")).unwrap();
    backend.writes.lock().clear();
    catalog.submit(body("X")).unwrap();
    assert_eq!(*backend.writes.lock(), vec!["steckbrief"]);
}

#[test]
fn test_non_success_document_outcomes_are_errors() {
    for outcome in [WriteOutcome::NoOp, WriteOutcome::NotFound, WriteOutcome::Deleted] {
        let (backend, _, catalog) = setup();
        backend.override_put("steckbrief", outcome);
        match catalog.submit(body("X")) {
            Err(Error::WriteRejected { index, id, outcome: reported }) => {
                assert_eq!(index, "steckbrief");
                assert_eq!(id, "a");
                assert_eq!(reported, outcome.to_string());
            }
            other => panic!("{} accepted: {:?}", outcome, other),
        }
    }
}

#[test]
fn test_rejected_changeset_stops_document_write() {
    let (backend, _, catalog) = setup();
    backend.override_put("changeset", WriteOutcome::NoOp);
    assert!(matches!(
        catalog.submit(body("X")),
        Err(Error::WriteRejected { .. })
    ));
    assert!(backend.inner.is_empty("steckbrief"));
}

#[test]
fn test_document_failure_after_changeset_is_recorded_again() {
    let (backend, clock, catalog) = setup();
    backend.override_put("steckbrief", WriteOutcome::NoOp);
    assert!(catalog.submit(body("X")).is_err());
    assert_eq!(backend.inner.len("changeset"), 1);

    // The stored state never moved, so the retry records the change again
    *backend.override_put.lock() = None;
    clock.advance(chrono::Duration::seconds(1));
    let outcome = catalog.submit(body("X")).unwrap();
    assert_eq!(outcome.changeset.map(|c| c.order), Some(2));
}

#[test]
fn test_backend_down_surfaces_unavailable() {
    let (backend, _, catalog) = setup();
    backend.inner.set_available(false);
    let err = catalog.submit(body("X")).unwrap_err();
    assert_eq!(err.kind(), catalog_core::ErrorKind::Unavailable);
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_failed_purge_reports_not_found() {
    let (backend, _, catalog) = setup();
    catalog.submit(body("X")).unwrap();
    *backend.fail_delete.lock() = Some("changeset".to_string());

    assert!(matches!(
        catalog.delete_document("a"),
        Err(Error::DocumentNotFound(_))
    ));
    // The document itself is gone; the history remains
    assert!(catalog.get_document("a").unwrap().is_none());
    assert_eq!(backend.inner.len("changeset"), 1);
    assert_eq!(backend.inner.open_snapshot_count(), 0);
}

#[test]
fn test_delete_keeps_other_documents_history() {
    let (_, _, catalog) = setup();
    catalog.submit(body("X")).unwrap();
    let mut other = body("X");
    other["id"] = json!("b");
    catalog.submit(other).unwrap();

    catalog.delete_document("a").unwrap();
    assert_eq!(catalog.get_changesets(Some("b"), None).unwrap().len(), 1);
    assert_eq!(catalog.get_changesets(None, None).unwrap().len(), 1);
}

// ============================================================================
// Concurrent writers
// ============================================================================

#[test]
fn test_concurrent_writers_get_distinct_orders() {
    const WRITERS: usize = 8;
    const ROUNDS: usize = 10;

    let backend: Arc<dyn SearchBackend> = Arc::new(InMemoryBackend::new());
    let catalog = Arc::new(Catalog::new(backend, CatalogConfig::default()).unwrap());
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let catalog = Arc::clone(&catalog);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for r in 0..ROUNDS {
                    catalog.submit(body(&format!("w{}-r{}", w, r))).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let changesets = catalog.get_changesets(Some("a"), None).unwrap();
    let orders: HashSet<u64> = changesets.iter().map(|c| c.order).collect();
    assert_eq!(orders.len(), changesets.len(), "duplicate order numbers");
    let expected: HashSet<u64> = (1..=changesets.len() as u64).collect();
    assert_eq!(orders, expected);
}
