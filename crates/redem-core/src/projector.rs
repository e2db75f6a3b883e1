//! Projection of raw platform listings into archive records.
//!
//! The platform returns large, loosely-typed objects. The projector copies
//! a fixed set of fields, fills gaps with empty values, and derives the few
//! fields that need context:
//!
//! - `author_name` from `author` (a plain name or an object with `name`);
//! - `subreddit` as the display name, memoized per `subreddit_id`;
//! - a comment's `permalink` from its submission's permalink joined with the
//!   comment id. Submission permalinks are memoized per submission id.
//!
//! Memo tables are first-value-wins, so one projector run sees a stable
//! name for every subreddit and a stable thread link for every comment.
//! A submission keeps its own permalink when it has one.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::models::{edited_value, Comment, Submission, COMMENT_TYPE, SUBMISSION_TYPE};

/// One raw listing child as returned by the platform.
pub type RawRecord = Value;

/// Stateful projector; one per assembly run.
#[derive(Debug, Default)]
pub struct RecordProjector {
    subreddit_names: HashMap<String, String>,
    submission_permalinks: HashMap<String, String>,
}

impl RecordProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a raw comment.
    pub fn project_comment(&mut self, raw: &RawRecord) -> Comment {
        let fields = unwrap_listing(raw);
        let id = str_field(fields, "id");
        let link_id = str_field(fields, "link_id");
        let subreddit = self.subreddit_name(fields);

        let submission_permalink = self.comment_submission_permalink(fields, &link_id, &subreddit);
        let permalink = join_permalink(&submission_permalink, &id);

        Comment {
            link_title: str_field(fields, "link_title"),
            body: str_field(fields, "body"),
            body_html: opt_str_field(fields, "body_html"),
            created: f64_field(fields, "created"),
            created_utc: f64_field(fields, "created_utc"),
            edited: fields.get("edited").and_then(edited_value),
            score: i64_field(fields, "score"),
            ups: i64_field(fields, "ups"),
            downs: i64_field(fields, "downs"),
            author_name: author_name(fields),
            subreddit,
            permalink,
            kind: COMMENT_TYPE.to_string(),
            id,
            link_id,
        }
    }

    /// Project a raw submission.
    pub fn project_submission(&mut self, raw: &RawRecord) -> Submission {
        let fields = unwrap_listing(raw);
        let id = str_field(fields, "id");
        let subreddit = self.subreddit_name(fields);

        let own = str_field(fields, "permalink");
        let memo = self.submission_permalinks.entry(id.clone());
        let permalink = if own.is_empty() {
            memo.or_default().clone()
        } else {
            memo.or_insert(own.clone());
            own
        };

        Submission {
            num_comments: i64_field(fields, "num_comments"),
            selftext: str_field(fields, "selftext"),
            selftext_html: opt_str_field(fields, "selftext_html"),
            subreddit_id: str_field(fields, "subreddit_id"),
            title: str_field(fields, "title"),
            url: opt_str_field(fields, "url"),
            domain: str_field(fields, "domain"),
            created: f64_field(fields, "created"),
            created_utc: f64_field(fields, "created_utc"),
            edited: fields.get("edited").and_then(edited_value),
            ups: i64_field(fields, "ups"),
            downs: i64_field(fields, "downs"),
            score: i64_field(fields, "score"),
            permalink,
            author_name: author_name(fields),
            subreddit,
            kind: SUBMISSION_TYPE.to_string(),
            id,
        }
    }

    fn subreddit_name(&mut self, fields: &Map<String, Value>) -> String {
        let name = match fields.get("subreddit") {
            Some(Value::Object(sub)) => sub
                .get("display_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some(Value::String(name)) => name.clone(),
            _ => String::new(),
        };
        let subreddit_id = str_field(fields, "subreddit_id");
        if subreddit_id.is_empty() {
            return name;
        }
        self.subreddit_names
            .entry(subreddit_id)
            .or_insert(name)
            .clone()
    }

    fn comment_submission_permalink(
        &mut self,
        fields: &Map<String, Value>,
        link_id: &str,
        subreddit: &str,
    ) -> String {
        let submission_id = link_id.strip_prefix("t3_").unwrap_or(link_id);
        if let Some(known) = self.submission_permalinks.get(submission_id) {
            return known.clone();
        }

        let permalink = match fields.get("link_permalink").and_then(Value::as_str) {
            Some(link) if !link.is_empty() => link.to_string(),
            _ if !submission_id.is_empty() => {
                format!("/r/{}/comments/{}/", subreddit, submission_id)
            }
            _ => return String::new(),
        };
        self.submission_permalinks
            .insert(submission_id.to_string(), permalink.clone());
        permalink
    }
}

/// Listing children come wrapped as `{"kind": "t1", "data": {...}}`.
fn unwrap_listing(raw: &Value) -> &Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    let inner = match raw.get("data") {
        Some(data) if raw.get("kind").is_some() => data,
        _ => raw,
    };
    inner
        .as_object()
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}

/// Join a submission permalink and a comment id as a path.
pub fn join_permalink(base: &str, id: &str) -> String {
    if base.is_empty() || id.is_empty() {
        return base.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, id)
    } else {
        format!("{}/{}", base, id)
    }
}

fn author_name(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("author") {
        Some(Value::String(name)) => Some(name.clone()),
        Some(Value::Object(author)) => {
            author.get("name").and_then(Value::as_str).map(str::to_owned)
        }
        _ => fields
            .get("author_name")
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

fn str_field(fields: &Map<String, Value>, key: &str) -> String {
    opt_str_field(fields, key).unwrap_or_default()
}

fn opt_str_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn f64_field(fields: &Map<String, Value>, key: &str) -> f64 {
    fields.get(key).and_then(Value::as_f64).unwrap_or_default()
}

fn i64_field(fields: &Map<String, Value>, key: &str) -> i64 {
    match fields.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comment_projection() {
        let mut projector = RecordProjector::new();
        let raw = json!({
            "kind": "t1",
            "data": {
                "id": "c9",
                "link_id": "t3_abc",
                "link_title": "A thread",
                "link_permalink": "https://www.reddit.com/r/rust/comments/abc/a_thread/",
                "body": "hi",
                "body_html": "<div class=\"md\"><p>hi</p></div>",
                "created_utc": 1700000000.0,
                "edited": false,
                "score": 5,
                "ups": 5,
                "downs": 0,
                "author": "someone",
                "subreddit": "rust",
                "subreddit_id": "t5_2s7lj",
                "gilded": 3
            }
        });
        let c = projector.project_comment(&raw);
        assert_eq!(c.id, "c9");
        assert_eq!(c.permalink, "https://www.reddit.com/r/rust/comments/abc/a_thread/c9");
        assert_eq!(c.author_name.as_deref(), Some("someone"));
        assert_eq!(c.subreddit, "rust");
        assert_eq!(c.edited, None);
        assert_eq!(c.score, 5);
        assert_eq!(c.kind, COMMENT_TYPE);

        let v = serde_json::to_value(&c).unwrap();
        assert!(v.get("gilded").is_none());
    }

    #[test]
    fn test_comment_permalink_fallback() {
        let mut projector = RecordProjector::new();
        let c = projector.project_comment(&json!({
            "id": "c1", "link_id": "t3_xyz", "subreddit": "test"
        }));
        assert_eq!(c.permalink, "/r/test/comments/xyz/c1");
    }

    #[test]
    fn test_submission_permalink_is_reused_for_comments() {
        let mut projector = RecordProjector::new();
        let s = projector.project_submission(&json!({
            "id": "xyz", "permalink": "/r/test/comments/xyz/title/", "subreddit": "test",
            "url": "http://example.com", "edited": 1700000100.0
        }));
        assert_eq!(s.edited, Some(1700000100.0));
        let c = projector.project_comment(&json!({
            "id": "c1", "link_id": "t3_xyz", "subreddit": "test"
        }));
        assert_eq!(c.permalink, "/r/test/comments/xyz/title/c1");
    }

    #[test]
    fn test_subreddit_name_memo_first_wins() {
        let mut projector = RecordProjector::new();
        let a = projector.project_submission(&json!({
            "id": "1", "subreddit": "Rust", "subreddit_id": "t5_1"
        }));
        let b = projector.project_submission(&json!({
            "id": "2", "subreddit": "rust", "subreddit_id": "t5_1"
        }));
        assert_eq!(a.subreddit, "Rust");
        assert_eq!(b.subreddit, "Rust");
    }

    #[test]
    fn test_author_object_and_missing_fields() {
        let mut projector = RecordProjector::new();
        let s = projector.project_submission(&json!({
            "id": "1", "author": {"name": "poster"}, "score": null
        }));
        assert_eq!(s.author_name.as_deref(), Some("poster"));
        assert_eq!(s.score, 0);
        assert_eq!(s.title, "");
        assert_eq!(s.url, None);

        let c = projector.project_comment(&json!("not an object"));
        assert_eq!(c.id, "");
        assert_eq!(c.permalink, "");
    }

    #[test]
    fn test_join_permalink() {
        assert_eq!(join_permalink("/r/a/comments/1/t/", "c"), "/r/a/comments/1/t/c");
        assert_eq!(join_permalink("/r/a/comments/1/t", "c"), "/r/a/comments/1/t/c");
        assert_eq!(join_permalink("", "c"), "");
    }
}
