//! The changeset orchestrator
//!
//! [`Catalog`] owns the write path and the changeset read path:
//!
//! - `submit` validates a document, diffs it against the stored state,
//!   records a changeset when anything but bookkeeping changed, and stores
//!   the new state
//! - `get_changesets` drains the changeset index for one or all documents,
//!   optionally bounded by a relative time window
//! - `delete_document` removes a document together with its history
//!
//! # Write sequence
//!
//! ```text
//! validate -> lock(id) -> read stored -> diff
//!     diff empty:     store document (lastUpdate kept)
//!     diff non-empty: next order -> store changeset -> store document
//! ```
//!
//! The changeset is stored before the document so a failure between the two
//! leaves the history ahead of the state, never behind it: the next
//! submission diffs against the old state and records the change again.

use crate::config::CatalogConfig;
use crate::locks::WriteLocks;
use crate::sequence::SequenceAssigner;
use catalog_core::{
    Changeset, Clock, DiffEngine, Document, DocumentDiff, Error, Predicate, Result, Sort,
    SystemClock, TimeWindow, Timestamp, ValidationError, CREATED_FIELD, LAST_UPDATE_FIELD,
    LAST_UPLOAD_FIELD,
};
use catalog_core::changeset::TIMESTAMP_FIELD;
use catalog_search::{CursorPager, DeleteOutcome, SearchBackend};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    /// Id of the stored document
    pub document_id: String,
    /// Changeset recorded by this submission; `None` when nothing changed
    pub changeset: Option<Changeset>,
}

/// Versioned document catalog over a search backend
pub struct Catalog {
    backend: Arc<dyn SearchBackend>,
    config: CatalogConfig,
    clock: Arc<dyn Clock>,
    diff: DiffEngine,
    locks: WriteLocks,
}

impl Catalog {
    /// Create a catalog using the wall clock
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(backend: Arc<dyn SearchBackend>, config: CatalogConfig) -> Result<Self> {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Create a catalog with an explicit clock
    pub fn with_clock(
        backend: Arc<dyn SearchBackend>,
        config: CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Catalog {
            backend,
            config,
            clock,
            diff: DiffEngine::new(),
            locks: WriteLocks::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Underlying backend
    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    pub(crate) fn pager(&self) -> CursorPager<'_> {
        CursorPager::new(
            self.backend.as_ref(),
            self.config.page_size,
            self.config.snapshot_keep_alive(),
        )
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Validate and store a document, recording a changeset if it changed
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRequest` if `body` is not a JSON object
    /// - `Error::Validation` for a missing/empty id or mandatory field;
    ///   nothing is written
    /// - `Error::WriteRejected` if the backend did not create or update a
    ///   record
    /// - backend errors from any read or write
    pub fn submit(&self, body: Value) -> Result<SubmitOutcome> {
        let submitted = Document::from_value(body)?;
        if let Err(e) = submitted.validate() {
            info!(target: "catalog::write", error = %e, "Document rejected");
            return Err(e.into());
        }
        let document_id = match submitted.id() {
            Some(id) => id.to_string(),
            None => {
                return Err(ValidationError::MissingId {
                    generated_id: uuid::Uuid::new_v4().to_string(),
                }
                .into())
            }
        };

        let mutex = self.locks.mutex_for(&document_id);
        let held = mutex.lock();
        let result = self.store(document_id.clone(), submitted);
        drop(held);
        drop(mutex);
        self.locks.forget(&document_id);
        result
    }

    /// Diff and persist a validated submission; the caller holds the id's lock
    fn store(&self, document_id: String, submitted: Document) -> Result<SubmitOutcome> {
        let previous = self
            .backend
            .get_document(&self.config.document_index, &document_id)
            .map_err(|e| {
                warn!(
                    target: "catalog::write",
                    document_id = %document_id,
                    index = %self.config.document_index,
                    error = %e,
                    "Failed to read stored document"
                );
                e
            })?;
        let now = self.now();

        let DocumentDiff { state, fields } = self.diff.compute(previous.as_ref(), submitted.into_value());
        let changed = !fields.is_empty();

        let mut document = Document::from_value(state)?;
        let stored = |field: &str| stored_timestamp(previous.as_ref(), field);
        document.set_timestamp(CREATED_FIELD, stored(CREATED_FIELD).unwrap_or(now));
        document.set_timestamp(LAST_UPLOAD_FIELD, now);
        let last_update = if changed {
            now
        } else {
            stored(LAST_UPDATE_FIELD).unwrap_or(now)
        };
        document.set_timestamp(LAST_UPDATE_FIELD, last_update);

        let changeset = if changed {
            let sequence = SequenceAssigner::new(self.backend.as_ref(), &self.config.changeset_index);
            let order = sequence.next_order(&document_id)?;
            let changeset = Changeset::new(document_id.as_str(), order, now, fields);
            let record_id = uuid::Uuid::new_v4().to_string();
            self.put(&self.config.changeset_index, &record_id, &changeset.to_value()?)?;
            info!(
                target: "catalog::write",
                document_id = %document_id,
                order,
                fields = changeset.fields.len(),
                "Changeset recorded"
            );
            Some(changeset)
        } else {
            debug!(target: "catalog::write", document_id = %document_id, "No changes to record");
            None
        };

        self.put(&self.config.document_index, &document_id, &document.into_value())?;
        info!(target: "catalog::write", document_id = %document_id, changed, "Document stored");

        Ok(SubmitOutcome {
            document_id,
            changeset,
        })
    }

    fn put(&self, index: &str, id: &str, source: &Value) -> Result<()> {
        let outcome = self.backend.put_document(index, id, source).map_err(|e| {
            warn!(target: "catalog::write", index, id, error = %e, "Failed to index record");
            e
        })?;
        if outcome.is_success() {
            return Ok(());
        }
        error!(target: "catalog::write", index, id, outcome = %outcome, "Record not indexed");
        Err(Error::WriteRejected {
            index: index.to_string(),
            id: id.to_string(),
            outcome: outcome.to_string(),
        })
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Current stored state of a document, bookkeeping fields included
    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        match self.backend.get_document(&self.config.document_index, id)? {
            Some(value) => Ok(Some(Document::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Every changeset for `document_id` (or all documents), newest first
    ///
    /// `since` is a relative window such as `5d` or `3w`; only changesets
    /// from that window up to now are returned.
    ///
    /// # Errors
    ///
    /// - `Error::DocumentNotFound` if `document_id` is given but unknown
    ///   (checked before `since`)
    /// - `Error::InvalidTimeWindow` if `since` is malformed
    pub fn get_changesets(
        &self,
        document_id: Option<&str>,
        since: Option<&str>,
    ) -> Result<Vec<Changeset>> {
        if let Some(id) = document_id {
            if self
                .backend
                .get_document(&self.config.document_index, id)?
                .is_none()
            {
                info!(target: "catalog::read", document_id = id, "Changesets requested for unknown document");
                return Err(Error::DocumentNotFound(id.to_string()));
            }
        }

        let now = self.now();
        let lower = TimeWindow::resolve(since, now).map_err(|e| {
            info!(target: "catalog::read", since = since.unwrap_or_default(), "Invalid since parameter");
            e
        })?;
        let predicate = Predicate::for_changesets(document_id, lower, now);

        let hits = self.pager().drain(
            &self.config.changeset_index,
            &predicate,
            &Sort::desc(TIMESTAMP_FIELD),
        )?;
        hits.into_iter()
            .map(|hit| Changeset::from_value(hit.source))
            .collect()
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete a document and its whole changeset history
    ///
    /// # Errors
    ///
    /// `Error::DocumentNotFound` if the document does not exist, and also if
    /// it was deleted but purging its history failed partway.
    pub fn delete_document(&self, id: &str) -> Result<()> {
        let mutex = self.locks.mutex_for(id);
        let held = mutex.lock();

        let outcome = self
            .backend
            .delete_document(&self.config.document_index, id)
            .map_err(|e| {
                warn!(target: "catalog::delete", document_id = id, error = %e, "Failed to delete document");
                e
            })?;
        if outcome == DeleteOutcome::NotFound {
            warn!(target: "catalog::delete", document_id = id, "Could not delete unknown document");
            return Err(Error::DocumentNotFound(id.to_string()));
        }

        let purged = self.purge_changesets(id);

        drop(held);
        drop(mutex);
        self.locks.forget(id);

        match purged {
            Ok(count) => {
                info!(target: "catalog::delete", document_id = id, changesets = count, "Document deleted");
                Ok(())
            }
            Err(e) => {
                warn!(
                    target: "catalog::delete",
                    document_id = id,
                    error = %e,
                    "Document deleted but its changesets could not be purged"
                );
                Err(Error::DocumentNotFound(id.to_string()))
            }
        }
    }

    fn purge_changesets(&self, id: &str) -> Result<usize> {
        let index = &self.config.changeset_index;
        let hits = self.pager().drain(
            index,
            &Predicate::ById(id.to_string()),
            &Sort::desc(TIMESTAMP_FIELD),
        )?;
        for hit in &hits {
            match self.backend.delete_document(index, &hit.id)? {
                DeleteOutcome::Deleted => {}
                DeleteOutcome::NotFound => {
                    return Err(Error::backend(
                        "delete",
                        index.as_str(),
                        format!("changeset {} vanished during purge", hit.id),
                    ))
                }
            }
        }
        Ok(hits.len())
    }
}

fn stored_timestamp(previous: Option<&Value>, field: &str) -> Option<Timestamp> {
    previous
        .and_then(|doc| doc.get(field))
        .and_then(Value::as_str)
        .and_then(|raw| Timestamp::parse(raw).ok())
}
