//! Catalog engine
//!
//! This crate orchestrates the core types and the search backend:
//! - Catalog: submit, read, list and delete documents; read changesets
//! - SequenceAssigner: per-document order numbers from durable state
//! - WriteLocks: per-document write serialization
//! - CatalogConfig: `catalog.toml` loading and validation
//! - Availability check with exponential backoff for startup
//!
//! # Usage
//!
//! ```
//! use catalog_engine::{Catalog, CatalogConfig};
//! use catalog_search::InMemoryBackend;
//! use std::sync::Arc;
//!
//! let catalog = Catalog::new(Arc::new(InMemoryBackend::new()), CatalogConfig::default()).unwrap();
//! let outcome = catalog
//!     .submit(serde_json::json!({
//!         "id": "a", "type": "service", "name": "X", "owner": "T", "description": "d"
//!     }))
//!     .unwrap();
//! assert_eq!(outcome.changeset.map(|c| c.order), Some(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod availability;
pub mod catalog;
pub mod config;
pub mod documents;
pub mod locks;
pub mod sequence;

pub use availability::{wait_until_available, wait_until_available_blocking};
pub use catalog::{Catalog, SubmitOutcome};
pub use config::{CatalogConfig, ConnectionConfig, CONFIG_FILE_NAME};
pub use documents::DocumentQuery;
pub use locks::WriteLocks;
pub use sequence::SequenceAssigner;
