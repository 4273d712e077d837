//! Document listing with field projection and sorting

use crate::catalog::Catalog;
use catalog_core::{
    compare_values, parse_field_list, parse_sort_list, Document, Predicate, Result, Sort,
    SortDirection, LAST_UPDATE_FIELD,
};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Parameters of a document listing, as received from the request layer
///
/// `query` is free text (see [`catalog_core::TextQuery`]); blank means
/// every document. `fields` and `sort` are comma-separated lists: `fields`
/// names the top-level fields to keep (`id` is always kept), `sort` holds
/// `field:asc|desc` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Filter text, every document when absent or blank
    pub query: Option<String>,
    /// Fields to project, all fields when absent
    pub fields: Option<String>,
    /// Sort pairs, most recently updated first when absent
    pub sort: Option<String>,
}

impl DocumentQuery {
    /// Listing without projection or sort
    pub fn all() -> Self {
        Self::default()
    }

    /// Only documents matching this text
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Restrict to these fields
    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    /// Sort by these pairs
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

impl Catalog {
    /// Stored documents matching the query, projected and sorted as requested
    ///
    /// # Errors
    ///
    /// `Error::InvalidRequest` for a blank `fields` or `sort` parameter or
    /// a malformed sort pair; nothing is read from the backend then.
    pub fn list_documents(&self, query: &DocumentQuery) -> Result<Vec<Value>> {
        let parsed = query
            .fields
            .as_deref()
            .map(parse_field_list)
            .transpose()
            .and_then(|fields| {
                let sorts = query.sort.as_deref().map(parse_sort_list).transpose()?;
                Ok((fields, sorts))
            });
        let (fields, sorts) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                info!(
                    target: "catalog::read",
                    fields = ?query.fields,
                    sort = ?query.sort,
                    "Invalid listing parameters"
                );
                return Err(e);
            }
        };

        let hits = self.pager().drain(
            &self.config().document_index,
            &Predicate::for_documents(query.query.as_deref()),
            &Sort::desc(LAST_UPDATE_FIELD),
        )?;
        let mut documents = hits
            .into_iter()
            .map(|hit| Document::from_value(hit.source))
            .collect::<Result<Vec<_>>>()?;

        if let Some(sorts) = &sorts {
            // Stable: earlier pairs take precedence, ties keep lastUpdate order
            documents.sort_by(|a, b| compare_documents(a, b, sorts));
        }

        debug!(target: "catalog::read", documents = documents.len(), "Documents listed");
        Ok(documents
            .into_iter()
            .map(|doc| match &fields {
                Some(fields) => doc.project(fields.as_slice()),
                None => doc.into_value(),
            })
            .collect())
    }
}

fn compare_documents(a: &Document, b: &Document, sorts: &[Sort]) -> Ordering {
    sorts
        .iter()
        .map(|sort| compare_field(a.get(&sort.field), b.get(&sort.field), sort.direction))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Missing or null values sort last in either direction
fn compare_field(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(a, b);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
    }
}
