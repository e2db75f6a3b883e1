//! Archive data models.
//!
//! A persisted archive is a single JSON document:
//!
//! ```text
//! {
//!   "_meta":       { "date_utc", "username", "merged_from"? },
//!   "comments":    [Comment],
//!   "submissions": [Submission],
//!   "uris":        [[canonical_uri, count], ...]
//! }
//! ```
//!
//! Records are flat and carry only whitelisted fields. Fields missing from
//! older or hand-edited archives deserialize to empty values instead of
//! failing the load.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ArchiveError;

/// `type` value stamped on every projected comment.
pub const COMMENT_TYPE: &str = "http://reddit.com/ns/comment";
/// `_type` value stamped on every projected submission.
pub const SUBMISSION_TYPE: &str = "http://reddit.com/ns/submission";

/// Which subset of the archive a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Comment,
    Submission,
}

impl RecordKind {
    pub fn subset(&self) -> &'static str {
        match self {
            RecordKind::Comment => "comments",
            RecordKind::Submission => "submissions",
        }
    }
}

/// Lightweight pointer back to the record a URI was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceRef {
    pub kind: RecordKind,
    pub id: String,
    pub permalink: String,
}

/// Which body representation an extraction strategy consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Html,
    Text,
}

/// Behaviour shared by comments and submissions.
///
/// The URI indexer and the merge engine are written against this trait so
/// they treat both subsets uniformly.
pub trait ArchiveRecord {
    fn kind(&self) -> RecordKind;
    fn id(&self) -> &str;
    fn permalink(&self) -> &str;
    fn created_utc(&self) -> f64;
    /// Edit timestamp, `None` when the record was never edited.
    fn edited(&self) -> Option<f64>;

    /// Link fields emitted ahead of anything found in the body.
    fn leading_uris(&self) -> Vec<&str>;

    /// The body in the requested representation, if the record has one.
    fn body(&self, format: BodyFormat) -> Option<&str>;

    fn source_ref(&self) -> SourceRef {
        SourceRef {
            kind: self.kind(),
            id: self.id().to_string(),
            permalink: self.permalink().to_string(),
        }
    }
}

/// A projected comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_utc: f64,
    #[serde(default, with = "edited")]
    pub edited: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ups: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downs: i64,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subreddit: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permalink: String,
    #[serde(rename = "type", default = "comment_type")]
    pub kind: String,
}

/// A projected submission (post).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_comments: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selftext: String,
    #[serde(default)]
    pub selftext_html: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subreddit_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_utc: f64,
    #[serde(
        default,
        with = "edited",
        skip_serializing_if = "Option::is_none"
    )]
    pub edited: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ups: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downs: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permalink: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subreddit: String,
    #[serde(rename = "_type", default = "submission_type")]
    pub kind: String,
}

fn comment_type() -> String {
    COMMENT_TYPE.to_string()
}

fn submission_type() -> String {
    SUBMISSION_TYPE.to_string()
}

impl ArchiveRecord for Comment {
    fn kind(&self) -> RecordKind {
        RecordKind::Comment
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn permalink(&self) -> &str {
        &self.permalink
    }

    fn created_utc(&self) -> f64 {
        self.created_utc
    }

    fn edited(&self) -> Option<f64> {
        self.edited
    }

    fn leading_uris(&self) -> Vec<&str> {
        non_empty([self.permalink.as_str()])
    }

    fn body(&self, format: BodyFormat) -> Option<&str> {
        match format {
            BodyFormat::Html => self.body_html.as_deref(),
            BodyFormat::Text => Some(self.body.as_str()),
        }
    }
}

impl ArchiveRecord for Submission {
    fn kind(&self) -> RecordKind {
        RecordKind::Submission
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn permalink(&self) -> &str {
        &self.permalink
    }

    fn created_utc(&self) -> f64 {
        self.created_utc
    }

    fn edited(&self) -> Option<f64> {
        self.edited
    }

    fn leading_uris(&self) -> Vec<&str> {
        non_empty([self.permalink.as_str(), self.url.as_deref().unwrap_or("")])
    }

    fn body(&self, format: BodyFormat) -> Option<&str> {
        match format {
            BodyFormat::Html => self.selftext_html.as_deref(),
            BodyFormat::Text => Some(self.selftext.as_str()),
        }
    }
}

fn non_empty<const N: usize>(values: [&str; N]) -> Vec<&str> {
    values.into_iter().filter(|v| !v.is_empty()).collect()
}

/// Provenance block stored under `_meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_utc: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Source filename → that source's own `_meta`, set by merges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<BTreeMap<String, ArchiveMeta>>,
}

impl ArchiveMeta {
    pub fn new(username: &str, at: DateTime<Utc>) -> Self {
        Self {
            date_utc: format_date_utc(at),
            username: username.to_string(),
            merged_from: None,
        }
    }
}

/// Format a timestamp the way `_meta.date_utc` has always been written.
pub fn format_date_utc(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// The whole persisted archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    #[serde(rename = "_meta")]
    pub meta: ArchiveMeta,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    /// `(canonical_uri, count)` sorted by canonical URI ascending.
    #[serde(default)]
    pub uris: Vec<(String, usize)>,
}

impl ArchiveDocument {
    /// Parse and validate a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ArchiveError> {
        let doc: ArchiveDocument = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String, ArchiveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that ids are unique within each subset.
    pub fn validate(&self) -> Result<(), ArchiveError> {
        ensure_unique_ids(&self.comments)?;
        ensure_unique_ids(&self.submissions)
    }
}

fn ensure_unique_ids<R: ArchiveRecord>(records: &[R]) -> Result<(), ArchiveError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id()) {
            return Err(ArchiveError::DuplicateId {
                subset: record.kind().subset(),
                id: record.id().to_string(),
            });
        }
    }
    Ok(())
}

/// Interpret a raw `edited` value.
///
/// The platform reports `false` for never-edited records and an epoch
/// timestamp otherwise. Anything that isn't a positive number is "no value".
pub fn edited_value(value: &Value) -> Option<f64> {
    let ts = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    ts.filter(|t| t.is_finite() && *t > 0.0)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Serde adapter for the `edited` field: reads `false`/`null`/numbers,
/// writes a number or `false`.
mod edited {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_f64(*ts),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(super::edited_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_edited_false_and_missing_are_none() {
        let c: Comment = serde_json::from_value(json!({"id": "a", "edited": false})).unwrap();
        assert_eq!(c.edited, None);
        let c: Comment = serde_json::from_value(json!({"id": "a"})).unwrap();
        assert_eq!(c.edited, None);
        let c: Comment = serde_json::from_value(json!({"id": "a", "edited": 1.5e9})).unwrap();
        assert_eq!(c.edited, Some(1.5e9));
    }

    #[test]
    fn test_comment_serializes_unedited_as_false() {
        let c: Comment = serde_json::from_value(json!({"id": "a"})).unwrap();
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["edited"], json!(false));
        assert_eq!(v["type"], json!(COMMENT_TYPE));
    }

    #[test]
    fn test_submission_omits_missing_edited() {
        let s: Submission = serde_json::from_value(json!({"id": "s"})).unwrap();
        let v = serde_json::to_value(&s).unwrap();
        assert!(v.get("edited").is_none());
        assert_eq!(v["_type"], json!(SUBMISSION_TYPE));
    }

    #[test]
    fn test_nulls_become_defaults() {
        let c: Comment = serde_json::from_value(json!({
            "id": "a", "body": null, "score": null, "body_html": null
        }))
        .unwrap();
        assert_eq!(c.body, "");
        assert_eq!(c.score, 0);
        assert_eq!(c.body_html, None);
    }

    #[test]
    fn test_uris_round_trip_as_pairs() {
        let text = r#"{"_meta": {"date_utc": "d", "username": "u"},
            "comments": [], "submissions": [],
            "uris": [["http://a.example/", 2]]}"#;
        let doc = ArchiveDocument::from_json(text).unwrap();
        assert_eq!(doc.uris, vec![("http://a.example/".to_string(), 2)]);
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["uris"], json!([["http://a.example/", 2]]));
        assert!(v["_meta"].get("merged_from").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let text = r#"{"_meta": {"date_utc": "d", "username": "u"},
            "comments": [{"id": "c1"}, {"id": "c1"}], "submissions": []}"#;
        match ArchiveDocument::from_json(text) {
            Err(ArchiveError::DuplicateId { subset, id }) => {
                assert_eq!(subset, "comments");
                assert_eq!(id, "c1");
            }
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn test_leading_uris_skip_empty_fields() {
        let s: Submission = serde_json::from_value(json!({
            "id": "s", "permalink": "/r/test/1", "url": "http://example.com"
        }))
        .unwrap();
        assert_eq!(s.leading_uris(), vec!["/r/test/1", "http://example.com"]);

        let s: Submission =
            serde_json::from_value(json!({"id": "s", "permalink": "/r/x/"})).unwrap();
        assert_eq!(s.leading_uris(), vec!["/r/x/"]);
    }

    #[test]
    fn test_edited_value_rejects_non_positive() {
        assert_eq!(edited_value(&json!(0)), None);
        assert_eq!(edited_value(&json!(true)), None);
        assert_eq!(edited_value(&json!("200")), Some(200.0));
    }
}
