//! Backend-neutral query predicates and sort orders
//!
//! Callers build a [`Predicate`] from request parameters and hand it to the
//! backend unmodified; each backend translates it at its own boundary.

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use serde_json::Value;
use std::cmp::Ordering;

/// Query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every record
    MatchAll,
    /// Records belonging to a document id: the `document` field of a
    /// changeset, or the record id itself for documents
    ById(String),
    /// Records whose `timestamp` lies in `[from, to]`
    TimeRange {
        /// Inclusive lower bound
        from: Timestamp,
        /// Inclusive upper bound
        to: Timestamp,
    },
    /// Records matching every term of a free-text query
    Text(TextQuery),
    /// Both predicates hold
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// Logical AND
    pub fn and(left: Predicate, right: Predicate) -> Predicate {
        Predicate::And(Box::new(left), Box::new(right))
    }

    /// Predicate for a changeset listing
    ///
    /// | id | lower bound | result |
    /// |----|-------------|--------|
    /// | yes | no | `ById` |
    /// | no | yes | `TimeRange` up to `now` |
    /// | yes | yes | `And(ById, TimeRange)` |
    /// | no | no | `MatchAll` |
    pub fn for_changesets(
        document_id: Option<&str>,
        since: Option<Timestamp>,
        now: Timestamp,
    ) -> Predicate {
        let by_id = document_id.map(|id| Predicate::ById(id.to_string()));
        let range = since.map(|from| Predicate::TimeRange { from, to: now });
        match (by_id, range) {
            (Some(id), Some(range)) => Predicate::and(id, range),
            (Some(id), None) => id,
            (None, Some(range)) => range,
            (None, None) => Predicate::MatchAll,
        }
    }

    /// Predicate for a document listing; a blank or absent query matches all
    pub fn for_documents(query: Option<&str>) -> Predicate {
        match query.and_then(TextQuery::parse) {
            Some(text) => Predicate::Text(text),
            None => Predicate::MatchAll,
        }
    }
}

// ============================================================================
// Text queries
// ============================================================================

/// Lowercase and split on non-alphanumeric characters
///
/// ```
/// use catalog_core::query::tokenize;
///
/// assert_eq!(tokenize("Order-Service v2"), vec!["order", "service", "v2"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// One whitespace-separated term of a [`TextQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    /// Top-level field the term is restricted to (`owner:team`), any field
    /// when absent
    pub field: Option<String>,
    /// Tokens that must all occur in the matched value
    pub tokens: Vec<String>,
}

/// Free-text document query
///
/// Terms are separated by whitespace and must all match. A term is either
/// bare text, matched against every value of the record, or `field:text`,
/// matched against one top-level field. Matching compares tokens, so it is
/// case-insensitive and ignores punctuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    terms: Vec<QueryTerm>,
}

impl TextQuery {
    /// Parse query text; `None` when it holds no searchable token
    pub fn parse(raw: &str) -> Option<TextQuery> {
        let terms: Vec<QueryTerm> = raw
            .split_whitespace()
            .filter_map(|chunk| {
                let (field, text) = match chunk.split_once(':') {
                    Some((field, text)) if !field.is_empty() => (Some(field.to_string()), text),
                    _ => (None, chunk),
                };
                let tokens = tokenize(text);
                if tokens.is_empty() {
                    None
                } else {
                    Some(QueryTerm { field, tokens })
                }
            })
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(TextQuery { terms })
        }
    }

    /// Parsed terms
    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Sort on a single top-level field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field name
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

impl Sort {
    /// Ascending sort on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Order two JSON values of a sort field
///
/// Numbers, strings and booleans compare naturally; mixed kinds order by
/// kind (null, bool, number, string, array, object), then by JSON text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => kind_rank(a)
            .cmp(&kind_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Parse a `sort` parameter: comma-separated `field:asc|desc` pairs
///
/// Direction is case-insensitive. A blank parameter or any malformed pair
/// rejects the whole request.
pub fn parse_sort_list(raw: &str) -> Result<Vec<Sort>> {
    let invalid = || Error::InvalidRequest(format!("invalid sort parameter '{}'", raw));
    if raw.trim().is_empty() {
        return Err(invalid());
    }
    raw.split(',')
        .map(|pair| {
            let mut parts = pair.split(':');
            let (field, direction) = match (parts.next(), parts.next(), parts.next()) {
                (Some(field), Some(direction), None) => (field.trim(), direction.trim()),
                _ => return Err(invalid()),
            };
            if field.is_empty() {
                return Err(invalid());
            }
            if direction.eq_ignore_ascii_case("asc") {
                Ok(Sort::asc(field))
            } else if direction.eq_ignore_ascii_case("desc") {
                Ok(Sort::desc(field))
            } else {
                Err(invalid())
            }
        })
        .collect()
}

/// Parse a `fields` parameter: comma-separated top-level field names
///
/// A blank parameter is rejected; blank entries inside the list are skipped.
pub fn parse_field_list(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidRequest(format!(
            "invalid fields parameter '{}'",
            raw
        )));
    }
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect())
}
