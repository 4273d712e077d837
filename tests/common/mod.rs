//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;`.

#![allow(dead_code)]

pub use catalog::{
    Catalog, CatalogConfig, Changeset, Error, InMemoryBackend, ManualClock, Op, SearchBackend,
    Timestamp,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Instant every test clock starts at
pub const START: &str = "2024-03-01T12:00:00.000Z";

/// Catalog over a fresh in-memory backend with a manual clock
pub struct TestCatalog {
    pub backend: Arc<InMemoryBackend>,
    pub clock: Arc<ManualClock>,
    pub catalog: Catalog,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    pub fn with_config(config: CatalogConfig) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let clock = Arc::new(ManualClock::new(Timestamp::parse(START).unwrap()));
        let catalog = Catalog::with_clock(backend.clone(), config, clock.clone()).unwrap();
        TestCatalog {
            backend,
            clock,
            catalog,
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: chrono::Duration) {
        self.clock.advance(duration);
    }

    /// Stored document as JSON
    pub fn stored(&self, id: &str) -> Option<Value> {
        self.catalog
            .get_document(id)
            .unwrap()
            .map(|doc| doc.into_value())
    }
}

/// A valid document body
pub fn document(id: &str) -> Value {
    json!({
        "id": id,
        "type": "service",
        "name": "X",
        "owner": "T",
        "description": "d"
    })
}

/// `(op, path, value)` triples of a changeset, for compact assertions
pub fn ops(changeset: &Changeset) -> Vec<(Op, String, Option<String>)> {
    changeset
        .fields
        .iter()
        .map(|f| (f.op, f.path.clone(), f.value.clone()))
        .collect()
}
