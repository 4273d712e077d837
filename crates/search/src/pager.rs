//! Snapshot-consistent cursor pagination
//!
//! The backend returns bounded pages only. [`CursorPager::drain`] turns that
//! into the complete result set:
//!
//! 1. open a snapshot on the index
//! 2. request pages under the snapshot, each continuing after the sort key
//!    of the previous page's last hit
//! 3. stop at the first page shorter than the page size (including empty)
//! 4. release the snapshot on every exit path
//!
//! Because every page reads the same snapshot and the sort order is total
//! (sort field, then record id), the concatenated pages contain each
//! matching record exactly once.

use crate::backend::{Hit, PageRequest, SearchBackend, SnapshotHandle, SortKey};
use catalog_core::{Predicate, Result, Sort};
use std::time::Duration;
use tracing::{debug, warn};

/// Scoped ownership of an open snapshot
///
/// Dropping the guard closes the snapshot exactly once. A failed close is
/// logged and otherwise ignored so it never replaces the caller's result.
pub struct SnapshotGuard<'a> {
    backend: &'a dyn SearchBackend,
    handle: Option<SnapshotHandle>,
}

impl<'a> SnapshotGuard<'a> {
    /// Open a snapshot on `index`
    pub fn open(
        backend: &'a dyn SearchBackend,
        index: &str,
        keep_alive: Duration,
    ) -> Result<Self> {
        let handle = backend.open_snapshot(index, keep_alive)?;
        Ok(SnapshotGuard {
            backend,
            handle: Some(handle),
        })
    }

    /// The open snapshot
    pub fn handle(&self) -> Option<&SnapshotHandle> {
        self.handle.as_ref()
    }
}

impl Drop for SnapshotGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.backend.close_snapshot(&handle) {
                warn!(
                    target: "catalog::pager",
                    index = handle.index(),
                    snapshot = handle.id(),
                    error = %e,
                    "Failed to release snapshot"
                );
            }
        }
    }
}

/// Drains a query to completion through a snapshot and forward cursor
pub struct CursorPager<'a> {
    backend: &'a dyn SearchBackend,
    page_size: usize,
    keep_alive: Duration,
}

impl<'a> CursorPager<'a> {
    /// Create a pager; a zero page size is raised to 1
    pub fn new(backend: &'a dyn SearchBackend, page_size: usize, keep_alive: Duration) -> Self {
        CursorPager {
            backend,
            page_size: page_size.max(1),
            keep_alive,
        }
    }

    /// Page size used for every request
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Return every record of `index` matching `predicate`, in `sort` order
    ///
    /// The result reflects the index as of the moment the snapshot opened.
    pub fn drain(&self, index: &str, predicate: &Predicate, sort: &Sort) -> Result<Vec<Hit>> {
        let snapshot = SnapshotGuard::open(self.backend, index, self.keep_alive)?;
        let mut hits: Vec<Hit> = Vec::new();
        let mut after: Option<SortKey> = None;
        let mut pages = 0usize;

        loop {
            let request = PageRequest {
                index,
                predicate,
                sort,
                size: self.page_size,
                snapshot: snapshot.handle(),
                keep_alive: self.keep_alive,
                search_after: after.as_ref(),
            };
            let page = self.backend.page(&request)?;
            pages += 1;

            let fetched = page.len();
            after = page.next_key().cloned();
            hits.extend(page.hits);

            if fetched < self.page_size {
                break;
            }
        }

        debug!(
            target: "catalog::pager",
            index,
            pages,
            records = hits.len(),
            "Result set drained"
        );
        Ok(hits)
    }
}
