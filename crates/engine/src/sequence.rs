//! Per-document changeset order numbers
//!
//! The next order is derived from durable state: the highest `order` among
//! the changesets already stored for the document, plus one. Nothing is
//! counted in memory, so a restart continues the sequence where it left off.
//!
//! The lookup and the later write are not atomic; callers serialize writers
//! per document (see [`crate::locks::WriteLocks`]).

use catalog_core::changeset::ORDER_FIELD;
use catalog_core::{Error, Predicate, Result, Sort};
use catalog_search::{PageRequest, SearchBackend};
use std::time::Duration;
use tracing::warn;

/// Derives the next order number from the changeset index
pub struct SequenceAssigner<'a> {
    backend: &'a dyn SearchBackend,
    changeset_index: &'a str,
}

impl<'a> SequenceAssigner<'a> {
    /// Create an assigner reading `changeset_index`
    pub fn new(backend: &'a dyn SearchBackend, changeset_index: &'a str) -> Self {
        SequenceAssigner {
            backend,
            changeset_index,
        }
    }

    /// Highest persisted order for `document_id`, if any
    pub fn last_order(&self, document_id: &str) -> Result<Option<u64>> {
        let predicate = Predicate::ById(document_id.to_string());
        let sort = Sort::desc(ORDER_FIELD);
        let request = PageRequest {
            index: self.changeset_index,
            predicate: &predicate,
            sort: &sort,
            size: 1,
            snapshot: None,
            keep_alive: Duration::ZERO,
            search_after: None,
        };
        let page = self.backend.page(&request)?;
        let hit = match page.hits.first() {
            Some(hit) => hit,
            None => return Ok(None),
        };
        match hit.source.get(ORDER_FIELD).and_then(|v| v.as_u64()) {
            Some(order) => Ok(Some(order)),
            None => {
                warn!(
                    target: "catalog::write",
                    document_id,
                    record = %hit.id,
                    "Stored changeset has no valid order"
                );
                Err(Error::Serialization(format!(
                    "changeset {} of document {} has no valid order",
                    hit.id, document_id
                )))
            }
        }
    }

    /// Order for the next changeset of `document_id`: last + 1, or 1
    pub fn next_order(&self, document_id: &str) -> Result<u64> {
        Ok(self.last_order(document_id)?.map_or(1, |last| last + 1))
    }
}
