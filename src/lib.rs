//! Catalog - versioned metadata documents with an append-only change history
//!
//! Documents are flat JSON objects stored in a search backend. Every
//! submission that changes a document records a changeset: the structural
//! diff against the stored state, numbered per document starting at 1.
//!
//! # Quick Start
//!
//! ```
//! use catalog::{Catalog, CatalogConfig, InMemoryBackend};
//! use std::sync::Arc;
//!
//! let catalog = Catalog::new(Arc::new(InMemoryBackend::new()), CatalogConfig::default()).unwrap();
//!
//! let doc = serde_json::json!({
//!     "id": "a", "type": "service", "name": "X", "owner": "T", "description": "d"
//! });
//! catalog.submit(doc.clone()).unwrap();
//! catalog.submit(doc).unwrap();
//!
//! // The unchanged resubmission recorded nothing
//! assert_eq!(catalog.get_changesets(Some("a"), None).unwrap().len(), 1);
//! ```
//!
//! # Architecture
//!
//! - `catalog-core`: documents, changesets, diff engine, time windows, query types
//! - `catalog-search`: the backend capability, an in-memory backend, the cursor pager
//! - `catalog-engine`: the orchestrator, sequencing, configuration

pub use catalog_core::{
    Changeset, Clock, DiffEngine, Document, Error, ErrorKind, FieldOp, ManualClock, Op,
    Predicate, Result, Sort, SortDirection, SystemClock, TextQuery, TimeWindow, Timestamp,
    ValidationError,
};
pub use catalog_engine::{
    wait_until_available, wait_until_available_blocking, Catalog, CatalogConfig,
    ConnectionConfig, DocumentQuery, SubmitOutcome,
};
pub use catalog_search::{
    CursorPager, DeleteOutcome, Hit, InMemoryBackend, Page, PageRequest, SearchBackend,
    SnapshotHandle, SortKey, WriteOutcome,
};
