//! Merging several archives into one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::errors::ArchiveError;
use crate::index::UriIndexer;
use crate::models::{ArchiveDocument, ArchiveMeta, ArchiveRecord};

/// Merge named documents into one.
///
/// Records are keyed by id per subset in first-seen order. A later record
/// replaces an earlier one only when its `edited` timestamp is present and
/// strictly newer; otherwise the first-seen record stays. The `uris` index
/// is rebuilt from the merged records.
pub fn merge_documents(
    sources: Vec<(String, ArchiveDocument)>,
    indexer: &UriIndexer,
    merged_at: DateTime<Utc>,
) -> Result<ArchiveDocument, ArchiveError> {
    if sources.is_empty() {
        return Err(ArchiveError::NoDocuments);
    }

    let mut comments = IndexMap::new();
    let mut submissions = IndexMap::new();
    let mut merged_from = BTreeMap::new();
    let mut usernames: Vec<String> = Vec::new();

    for (name, doc) in sources {
        tracing::debug!(
            "Merging {} ({} comments, {} submissions)",
            name,
            doc.comments.len(),
            doc.submissions.len()
        );
        for username in doc.meta.username.split(',').map(str::trim) {
            if !username.is_empty() && !usernames.iter().any(|u| u == username) {
                usernames.push(username.to_string());
            }
        }
        absorb(&mut comments, doc.comments);
        absorb(&mut submissions, doc.submissions);
        merged_from.insert(name, doc.meta);
    }

    let comments = newest_first(comments);
    let submissions = newest_first(submissions);
    let uris = indexer.index_document(&comments, &submissions).sorted();

    Ok(ArchiveDocument {
        meta: ArchiveMeta {
            merged_from: Some(merged_from),
            ..ArchiveMeta::new(&usernames.join(","), merged_at)
        },
        comments,
        submissions,
        uris,
    })
}

fn absorb<R: ArchiveRecord>(records: &mut IndexMap<String, R>, incoming: Vec<R>) {
    for record in incoming {
        match records.get_mut(record.id()) {
            None => {
                records.insert(record.id().to_string(), record);
            }
            Some(existing) => {
                if should_replace(existing.edited(), record.edited()) {
                    *existing = record;
                } else if existing.edited() == record.edited() {
                    tracing::debug!(
                        "Both copies of {} {} have the same edit time; keeping the first",
                        record.kind().subset(),
                        record.id()
                    );
                }
            }
        }
    }
}

/// Collapse records that share an id, keeping first-seen order.
///
/// Collisions resolve the same way as in [`merge_documents`].
pub fn dedupe_by_id<R: ArchiveRecord>(records: Vec<R>) -> Vec<R> {
    let mut unique = IndexMap::with_capacity(records.len());
    absorb(&mut unique, records);
    unique.into_values().collect()
}

/// Whether an incoming record's `edited` beats the existing one's.
pub fn should_replace(existing: Option<f64>, incoming: Option<f64>) -> bool {
    match (existing, incoming) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(old), Some(new)) => new > old,
    }
}

fn newest_first<R: ArchiveRecord>(records: IndexMap<String, R>) -> Vec<R> {
    let mut records: Vec<R> = records.into_values().collect();
    records.sort_by(|a, b| b.created_utc().total_cmp(&a.created_utc()));
    records
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::canonical::{Canonicalizer, HostTables};
    use crate::extract::MarkupAnchorStrategy;

    fn indexer() -> UriIndexer {
        UriIndexer::new(
            Arc::new(MarkupAnchorStrategy),
            Arc::new(Canonicalizer::with_tables(HostTables::default())),
        )
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    fn doc(
        username: &str,
        comments: serde_json::Value,
        submissions: serde_json::Value,
    ) -> ArchiveDocument {
        serde_json::from_value(json!({
            "_meta": {"date_utc": "2020-01-01 00:00:00.000000", "username": username},
            "comments": comments,
            "submissions": submissions,
            "uris": [["stale", 99]]
        }))
        .unwrap()
    }

    #[test]
    fn test_newer_edit_wins() {
        let a = doc("u", json!([{"id": "c1", "edited": 100, "body": "old"}]), json!([]));
        let b = doc("u", json!([{"id": "c1", "edited": 200, "body": "new"}]), json!([]));
        let sources = vec![("a.json".into(), a), ("b.json".into(), b)];
        let merged = merge_documents(sources, &indexer(), at()).unwrap();
        assert_eq!(merged.comments.len(), 1);
        assert_eq!(merged.comments[0].edited, Some(200.0));
        assert_eq!(merged.comments[0].body, "new");
    }

    #[test]
    fn test_older_or_missing_edit_does_not_replace() {
        let a = doc("u", json!([{"id": "c1", "edited": 200, "body": "keep"}]), json!([]));
        let b = doc("u", json!([{"id": "c1", "edited": 100, "body": "older"}]), json!([]));
        let c = doc("u", json!([{"id": "c1", "edited": false, "body": "unedited"}]), json!([]));
        let merged = merge_documents(
            vec![("a".into(), a), ("b".into(), b), ("c".into(), c)],
            &indexer(),
            at(),
        )
        .unwrap();
        assert_eq!(merged.comments[0].body, "keep");
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let a = doc("u", json!([]), json!([{"id": "s1", "title": "first"}]));
        let b = doc("u", json!([]), json!([{"id": "s1", "title": "second"}]));
        let sources = vec![("a".into(), a), ("b".into(), b)];
        let merged = merge_documents(sources, &indexer(), at()).unwrap();
        assert_eq!(merged.submissions[0].title, "first");
    }

    #[test]
    fn test_equal_edit_tie_keeps_first_seen() {
        let a = doc("u", json!([{"id": "c1", "edited": 200, "body": "first"}]), json!([]));
        let b = doc("u", json!([{"id": "c1", "edited": 200, "body": "second"}]), json!([]));
        let sources = vec![("a".into(), a), ("b".into(), b)];
        let merged = merge_documents(sources, &indexer(), at()).unwrap();
        assert_eq!(merged.comments[0].body, "first");
    }

    #[test]
    fn test_dedupe_by_id_keeps_order_and_newest_edit() {
        let d = doc(
            "u",
            json!([
                {"id": "c1", "body": "a"},
                {"id": "c2", "body": "b"},
                {"id": "c1", "body": "a edited", "edited": 50},
                {"id": "c2", "body": "b again"}
            ]),
            json!([]),
        );
        let unique = dedupe_by_id(d.comments);
        let bodies: Vec<&str> = unique.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["a edited", "b"]);
    }

    #[test]
    fn test_sorted_newest_first_and_uris_recomputed() {
        let a = doc(
            "alice",
            json!([{"id": "c1", "created_utc": 10.0, "permalink": "/r/a/c1"}]),
            json!([{
                "id": "s1", "created_utc": 5.0, "permalink": "/r/a/s1", "url": "http://x.example/"
            }]),
        );
        let b = doc(
            "bob",
            json!([{"id": "c2", "created_utc": 30.0, "permalink": "/r/a/c2"}]),
            json!([]),
        );
        let sources = vec![("a.json".into(), a), ("b.json".into(), b)];
        let merged = merge_documents(sources, &indexer(), at()).unwrap();

        let ids: Vec<&str> = merged.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);

        assert!(merged.uris.iter().all(|(uri, _)| uri != "stale"));
        assert_eq!(merged.uris.len(), 4);
        let mut sorted = merged.uris.clone();
        sorted.sort();
        assert_eq!(sorted, merged.uris);

        assert_eq!(merged.meta.username, "alice,bob");
        assert_eq!(merged.meta.date_utc, "2024-01-02 03:04:05.000000");
        let from = merged.meta.merged_from.as_ref().unwrap();
        assert_eq!(from.len(), 2);
        assert_eq!(from["a.json"].username, "alice");
    }

    #[test]
    fn test_merge_is_idempotent_on_records() {
        let a = doc(
            "u",
            json!([{"id": "c1", "created_utc": 1.0}, {"id": "c2", "created_utc": 2.0}]),
            json!([]),
        );
        let once = merge_documents(vec![("a".into(), a.clone())], &indexer(), at()).unwrap();
        let twice = merge_documents(
            vec![("a".into(), a), ("merged".into(), once.clone())],
            &indexer(),
            at(),
        )
        .unwrap();
        assert_eq!(once.comments, twice.comments);
        assert_eq!(once.uris, twice.uris);
    }

    #[test]
    fn test_empty_merge_is_error() {
        assert!(matches!(
            merge_documents(Vec::new(), &indexer(), at()),
            Err(ArchiveError::NoDocuments)
        ));
    }

    #[test]
    fn test_should_replace() {
        assert!(should_replace(None, Some(1.0)));
        assert!(should_replace(Some(1.0), Some(2.0)));
        assert!(!should_replace(Some(2.0), Some(2.0)));
        assert!(!should_replace(Some(2.0), None));
        assert!(!should_replace(None, None));
    }
}
