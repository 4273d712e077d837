//! End-to-end catalog scenarios
//!
//! Drives the public API the way a request layer would: submit documents,
//! read their history, list and delete them.

mod common;

use catalog::{DocumentQuery, ErrorKind};
use chrono::Duration;
use common::*;
use serde_json::json;
use std::collections::HashSet;

// =============================================================================
// Idempotence and ordering
// =============================================================================

#[test]
fn test_identical_resubmit_records_nothing() {
    let t = TestCatalog::new();
    t.catalog.submit(document("a")).unwrap();
    let first_update = t.stored("a").unwrap()["lastUpdate"].clone();

    t.advance(Duration::minutes(5));
    let outcome = t.catalog.submit(document("a")).unwrap();

    assert!(outcome.changeset.is_none());
    assert_eq!(t.catalog.get_changesets(Some("a"), None).unwrap().len(), 1);
    assert_eq!(t.stored("a").unwrap()["lastUpdate"], first_update);
}

#[test]
fn test_orders_are_one_to_n() {
    let t = TestCatalog::new();
    const N: u64 = 12;
    for n in 0..N {
        let mut body = document("a");
        body["name"] = json!(format!("name-{}", n));
        t.catalog.submit(body).unwrap();
        t.advance(Duration::seconds(1));
    }

    let mut orders: Vec<u64> = t
        .catalog
        .get_changesets(Some("a"), None)
        .unwrap()
        .iter()
        .map(|c| c.order)
        .collect();
    // Newest first
    assert_eq!(orders, (1..=N).rev().collect::<Vec<_>>());
    orders.sort();
    assert_eq!(orders, (1..=N).collect::<Vec<_>>());
}

#[test]
fn test_orders_are_per_document() {
    let t = TestCatalog::new();
    t.catalog.submit(document("a")).unwrap();
    let b = t.catalog.submit(document("b")).unwrap();
    assert_eq!(b.changeset.map(|c| c.order), Some(1));
}

#[test]
fn test_bookkeeping_differences_are_not_changes() {
    let t = TestCatalog::new();
    t.catalog.submit(document("a")).unwrap();

    let mut body = document("a");
    body["created"] = json!("1999-01-01T00:00:00.000Z");
    body["lastUpload"] = json!("1999-01-01T00:00:00.000Z");
    body["lastUpdate"] = json!("nonsense");
    t.advance(Duration::minutes(1));
    let outcome = t.catalog.submit(body).unwrap();

    assert!(outcome.changeset.is_none());
    // Caller-supplied bookkeeping never sticks
    let stored = t.stored("a").unwrap();
    assert_eq!(stored["created"], json!(START));
    assert_eq!(stored["lastUpdate"], json!(START));
    assert_eq!(stored["lastUpload"], json!("2024-03-01T12:01:00.000Z"));
}

// =============================================================================
// Changeset content
// =============================================================================

#[test]
fn test_first_submit_then_rename() {
    let t = TestCatalog::new();
    let first = t.catalog.submit(document("a")).unwrap().changeset.unwrap();
    assert_eq!(first.order, 1);
    assert_eq!(first.document, "a");
    assert_eq!(first.timestamp, Timestamp::parse(START).unwrap());
    let first_ops = ops(&first);
    for (path, value) in [
        ("/type", "service"),
        ("/name", "X"),
        ("/owner", "T"),
        ("/description", "d"),
    ] {
        assert!(
            first_ops.contains(&(Op::Add, path.to_string(), Some(value.to_string()))),
            "missing add of {}",
            path
        );
    }
    assert!(first_ops
        .iter()
        .all(|(_, path, _)| !matches!(path.as_str(), "/created" | "/lastUpload" | "/lastUpdate")));

    assert!(t.catalog.submit(document("a")).unwrap().changeset.is_none());

    let mut renamed = document("a");
    renamed["name"] = json!("Y");
    let second = t.catalog.submit(renamed).unwrap().changeset.unwrap();
    assert_eq!(second.order, 2);
    assert_eq!(
        ops(&second),
        vec![(Op::Replace, "/name".to_string(), Some("Y".to_string()))]
    );
}

#[test]
fn test_nested_changes_and_sanitized_nulls() {
    let t = TestCatalog::new();
    let mut body = document("a");
    body["links"] = json!([{"url": "https://a"}, {"url": "https://b"}]);
    body["contact"] = json!({"mail": null});
    t.catalog.submit(body.clone()).unwrap();
    assert!(t.stored("a").unwrap().get("contact").is_none());

    body["links"][1]["url"] = json!("https://c");
    body["port"] = json!(8080);
    let changeset = t.catalog.submit(body).unwrap().changeset.unwrap();
    assert_eq!(
        ops(&changeset),
        vec![
            (Op::Replace, "/links/1/url".to_string(), Some("https://c".to_string())),
            (Op::Add, "/port".to_string(), Some("8080".to_string())),
        ]
    );
}

#[test]
fn test_removed_field_is_recorded() {
    let t = TestCatalog::new();
    let mut body = document("a");
    body["tags"] = json!(["x"]);
    t.catalog.submit(body).unwrap();
    let changeset = t.catalog.submit(document("a")).unwrap().changeset.unwrap();
    assert_eq!(ops(&changeset), vec![(Op::Remove, "/tags".to_string(), None)]);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_missing_and_empty_owner() {
    let t = TestCatalog::new();

    let mut missing = document("a");
    missing.as_object_mut().unwrap().remove("owner");
    let err = t.catalog.submit(missing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.validation_body(),
        Some(json!({"error": "mandatory field 'owner' is missing"}))
    );

    let mut empty = document("a");
    empty["owner"] = json!("");
    let err = t.catalog.submit(empty).unwrap_err();
    assert_eq!(
        err.validation_body(),
        Some(json!({"error": "mandatory field 'owner' is empty"}))
    );

    assert!(t.stored("a").is_none());
    assert!(t.backend.is_empty("changeset"));
}

#[test]
fn test_owner_that_sanitizes_away_is_rejected() {
    let t = TestCatalog::new();
    for owner in [json!({"team": null}), json!([null])] {
        let mut body = document("a");
        body["owner"] = owner;
        let err = t.catalog.submit(body).unwrap_err();
        assert_eq!(
            err.validation_body(),
            Some(json!({"error": "mandatory field 'owner' is empty"}))
        );
    }
    assert!(t.stored("a").is_none());
    assert!(t.backend.is_empty("changeset"));
}

#[test]
fn test_missing_id_echoes_fresh_id() {
    let t = TestCatalog::new();
    let mut body = document("a");
    body["id"] = json!("");
    let err = t.catalog.submit(body).unwrap_err();
    let payload = err.validation_body().unwrap();
    let generated = payload["id"].as_str().unwrap();
    assert!(!generated.is_empty());
    assert!(t.stored(generated).is_none());
}

// =============================================================================
// Time windows
// =============================================================================

#[test]
fn test_since_bounds_changesets() {
    let t = TestCatalog::new();
    // Changes 30, 10 and 2 days before "now"
    for (n, days_later) in [(0, 0), (1, 20), (2, 8)] {
        t.advance(Duration::days(days_later));
        let mut body = document("a");
        body["name"] = json!(format!("v{}", n));
        t.catalog.submit(body).unwrap();
    }
    t.advance(Duration::days(2));

    let orders = |since: &str| -> Vec<u64> {
        t.catalog
            .get_changesets(Some("a"), Some(since))
            .unwrap()
            .iter()
            .map(|c| c.order)
            .collect()
    };
    assert_eq!(orders("5d"), vec![3]);
    assert_eq!(orders("2w"), vec![3, 2]);
    assert_eq!(orders("5w"), vec![3, 2, 1]);
    assert_eq!(orders("1d"), Vec::<u64>::new());

    // Across all documents too
    assert_eq!(t.catalog.get_changesets(None, Some("5d")).unwrap().len(), 1);
}

#[test]
fn test_invalid_since_values() {
    let t = TestCatalog::new();
    t.catalog.submit(document("a")).unwrap();
    for since in ["0d", "-1d", "5", "5x", "", "d", "05d", " 5d"] {
        let err = t.catalog.get_changesets(Some("a"), Some(since)).unwrap_err();
        assert!(
            matches!(err, Error::InvalidTimeWindow(_)),
            "{:?} accepted",
            since
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

// =============================================================================
// Paging through the catalog
// =============================================================================

fn assert_all_changesets_returned(count: usize) {
    let t = TestCatalog::new();
    for n in 0..count {
        t.catalog.submit(document(&format!("doc-{:04}", n))).unwrap();
    }
    let changesets = t.catalog.get_changesets(None, None).unwrap();
    assert_eq!(changesets.len(), count);
    let documents: HashSet<&str> = changesets.iter().map(|c| c.document.as_str()).collect();
    assert_eq!(documents.len(), count, "duplicate changesets returned");
    assert_eq!(t.backend.open_snapshot_count(), 0);
}

#[test]
fn test_changeset_listing_single() {
    assert_all_changesets_returned(1);
}

#[test]
fn test_changeset_listing_one_page() {
    assert_all_changesets_returned(100);
}

#[test]
fn test_changeset_listing_two_and_a_half_pages() {
    assert_all_changesets_returned(250);
}

#[test]
fn test_document_listing_spans_pages() {
    let t = TestCatalog::with_config(CatalogConfig {
        page_size: 7,
        ..CatalogConfig::default()
    });
    for n in 0..30 {
        t.catalog.submit(document(&format!("doc-{:02}", n))).unwrap();
        t.advance(Duration::seconds(1));
    }
    let docs = t
        .catalog
        .list_documents(&DocumentQuery::all().with_fields("name"))
        .unwrap();
    assert_eq!(docs.len(), 30);
    assert_eq!(docs[0], json!({"id": "doc-29", "name": "X"}));
    assert_eq!(t.backend.open_snapshot_count(), 0);
}

#[test]
fn test_filtered_document_listing_spans_pages() {
    let t = TestCatalog::with_config(CatalogConfig {
        page_size: 3,
        ..CatalogConfig::default()
    });
    for n in 0..20 {
        let mut body = document(&format!("doc-{:02}", n));
        body["owner"] = json!(if n % 2 == 0 { "team-even" } else { "team-odd" });
        t.catalog.submit(body).unwrap();
        t.advance(Duration::seconds(1));
    }

    let docs = t
        .catalog
        .list_documents(&DocumentQuery::all().with_query("owner:team-even"))
        .unwrap();
    let ids: Vec<&str> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
    // Even documents, most recently updated first
    let expected: Vec<String> = (0..20)
        .step_by(2)
        .rev()
        .map(|n| format!("doc-{:02}", n))
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(t.backend.open_snapshot_count(), 0);

    let blank = t
        .catalog
        .list_documents(&DocumentQuery::all().with_query(""))
        .unwrap();
    assert_eq!(blank.len(), 20);
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_removes_state_and_history() {
    let t = TestCatalog::new();
    t.catalog.submit(document("a")).unwrap();
    let mut renamed = document("a");
    renamed["name"] = json!("Y");
    t.catalog.submit(renamed).unwrap();

    t.catalog.delete_document("a").unwrap();

    assert!(t.stored("a").is_none());
    assert!(matches!(
        t.catalog.get_changesets(Some("a"), None),
        Err(Error::DocumentNotFound(_))
    ));
    assert!(t.catalog.get_changesets(None, None).unwrap().is_empty());
}

#[test]
fn test_delete_unknown_reports_not_found() {
    let t = TestCatalog::new();
    let err = t.catalog.delete_document("ghost").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_resubmit_after_delete_starts_at_one() {
    let t = TestCatalog::new();
    t.catalog.submit(document("a")).unwrap();
    t.catalog.delete_document("a").unwrap();
    let outcome = t.catalog.submit(document("a")).unwrap();
    assert_eq!(outcome.changeset.map(|c| c.order), Some(1));
}
