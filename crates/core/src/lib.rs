//! Core types for the catalog
//!
//! This crate defines the foundational types used throughout the system:
//! - Error: Error taxonomy (validation, not-found, backend)
//! - Timestamp / Clock: Millisecond UTC instants and their source
//! - TimeWindow: Relative `since` expressions (`5d`, `3w`)
//! - Document: Flat JSON documents with mandatory fields and bookkeeping
//! - Changeset / FieldOp: Immutable audit records of structural changes
//! - DiffEngine: Noise-filtered JSON-Patch diff between document states
//! - Predicate / TextQuery / Sort: Backend-neutral query and ordering types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod changeset;
pub mod diff;
pub mod document;
pub mod error;
pub mod pointer;
pub mod query;
pub mod time_window;
pub mod timestamp;

pub use changeset::{render_value, Changeset, FieldOp, Op};
pub use diff::{apply_patch, diff, DiffEngine, DocumentDiff, PatchOp, EXCLUDED_PATHS};
pub use document::{
    sanitize, Document, CREATED_FIELD, ID_FIELD, LAST_UPDATE_FIELD, LAST_UPLOAD_FIELD,
    MANDATORY_FIELDS,
};
pub use error::{Error, ErrorKind, Result, ValidationError};
pub use query::{
    compare_values, parse_field_list, parse_sort_list, Predicate, QueryTerm, Sort, SortDirection,
    TextQuery,
};
pub use time_window::{TimeWindow, WindowUnit};
pub use timestamp::{Clock, ManualClock, SystemClock, Timestamp};
