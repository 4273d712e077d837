//! Search backend access for the catalog
//!
//! This crate provides:
//! - SearchBackend trait: the get/put/delete/snapshot/page capability the
//!   catalog consumes
//! - InMemoryBackend: a complete in-process implementation
//! - CursorPager: drains arbitrarily large result sets through a snapshot
//!   and forward cursor
//! - SnapshotGuard: scoped snapshot ownership with guaranteed release
//!
//! # Usage
//!
//! ```
//! use catalog_core::{Predicate, Sort};
//! use catalog_search::{CursorPager, InMemoryBackend, SearchBackend};
//! use std::time::Duration;
//!
//! let backend = InMemoryBackend::new();
//! backend.put_document("changeset", "r1", &serde_json::json!({"document": "a"})).unwrap();
//!
//! let pager = CursorPager::new(&backend, 100, Duration::from_secs(60));
//! let hits = pager.drain("changeset", &Predicate::ById("a".into()), &Sort::desc("timestamp")).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod memory;
pub mod pager;

// Re-export commonly used types
pub use backend::{
    DeleteOutcome, Hit, Page, PageRequest, SearchBackend, SnapshotHandle, SortKey, WriteOutcome,
};
pub use memory::InMemoryBackend;
pub use pager::{CursorPager, SnapshotGuard};
