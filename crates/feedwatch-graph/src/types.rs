//! Read API wire types and their conversion into mirrored records.
//!
//! ## Observed shapes
//!
//! ### Listing envelope
//! ```text
//! {"data": [...], "paging": {"cursors": {"before": "..", "after": ".."}, "next": ".."}}
//! ```
//! `paging` is absent on an empty listing; `cursors.after` is absent on the
//! last page of some listings and repeated on others.
//!
//! ### Timestamps
//! ISO 8601 with a colon-less offset, e.g. `"2016-03-01T08:00:00+0000"`.
//! RFC 3339 (`Z` or `+00:00`) is accepted too.
//!
//! ### Summary counts
//! `likes.summary.total_count` and `comments.summary.total_count` only appear
//! when requested with `.summary(true)` and may be missing on restricted
//! objects. They are modelled as nested `Option`s and flattened once here.
//!
//! ### Shares
//! `shares` is omitted entirely when a post has never been shared.

use chrono::{DateTime, Utc};
use feedwatch_core::{Comment, Post};
use serde::{Deserialize, Deserializer};

/// One page of parsed records plus the continuation cursor, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Top-level listing response. Items stay untyped so one bad record does not
/// sink the page.
#[derive(Debug, Deserialize)]
pub struct ListingResponse {
    pub data: Vec<serde_json::Value>,
    pub paging: Option<Paging>,
}

impl ListingResponse {
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.cursors.as_ref())
            .and_then(|c| c.after.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    pub cursors: Option<Cursors>,
}

#[derive(Debug, Deserialize)]
pub struct Cursors {
    pub after: Option<String>,
}

/// Error envelope: `{"error": {"message": .., "code": .., "is_transient": ..}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: i64,
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub is_transient: bool,
}

#[derive(Debug, Deserialize)]
pub struct SummaryEdge {
    pub summary: Option<Summary>,
}

#[derive(Debug, Deserialize)]
pub struct Summary {
    pub total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Shares {
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Author {
    pub id: Option<String>,
}

/// A feed entry as returned by `/{source}/feed`.
#[derive(Debug, Deserialize)]
pub struct RawPost {
    pub id: String,
    #[serde(deserialize_with = "graph_time")]
    pub created_time: DateTime<Utc>,
    #[serde(deserialize_with = "graph_time")]
    pub updated_time: DateTime<Utc>,
    pub message: Option<String>,
    pub comments: Option<SummaryEdge>,
    pub likes: Option<SummaryEdge>,
    pub shares: Option<Shares>,
}

impl RawPost {
    #[must_use]
    pub fn into_post(self, source_id: &str) -> Post {
        Post {
            source_id: source_id.to_owned(),
            id: self.id,
            created_time: self.created_time,
            updated_time: self.updated_time,
            likes: total_count(self.likes.as_ref()),
            comment_count: total_count(self.comments.as_ref()),
            shares: self.shares.and_then(|s| s.count).unwrap_or(0),
            message: self.message,
        }
    }
}

/// A comment entry as returned by `/{post}/comments`.
#[derive(Debug, Deserialize)]
pub struct RawComment {
    pub id: String,
    #[serde(deserialize_with = "graph_time")]
    pub created_time: DateTime<Utc>,
    pub from: Option<Author>,
    pub likes: Option<SummaryEdge>,
    pub message: Option<String>,
}

impl RawComment {
    #[must_use]
    pub fn into_comment(self, post_id: &str) -> Comment {
        Comment {
            post_id: post_id.to_owned(),
            id: self.id,
            created_time: self.created_time,
            from_id: self.from.and_then(|a| a.id),
            likes: total_count(self.likes.as_ref()),
            message: self.message,
        }
    }
}

fn total_count(edge: Option<&SummaryEdge>) -> Option<u64> {
    edge.and_then(|e| e.summary.as_ref())
        .and_then(|s| s.total_count)
}

/// Parses an API timestamp, accepting both `+0000` and RFC 3339 offsets.
#[must_use]
pub fn parse_graph_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn graph_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_graph_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{raw}'")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_colonless_offset() {
        let dt = parse_graph_time("2016-03-01T08:00:00+0000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 3, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn parses_rfc3339_and_normalises_offset() {
        let dt = parse_graph_time("2016-03-01T10:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 3, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_graph_time("yesterday").is_none());
    }

    #[test]
    fn raw_post_with_full_summaries() {
        let raw: RawPost = serde_json::from_value(json!({
            "id": "5281959998_10150",
            "created_time": "2016-03-01T08:00:00+0000",
            "updated_time": "2016-03-01T09:30:00+0000",
            "message": "Headline",
            "comments": {"data": [], "summary": {"order": "chronological", "total_count": 31}},
            "likes": {"data": [], "summary": {"total_count": 412}},
            "shares": {"count": 9}
        }))
        .unwrap();
        let post = raw.into_post("nytimes");
        assert_eq!(post.source_id, "nytimes");
        assert_eq!(post.comment_count, Some(31));
        assert_eq!(post.likes, Some(412));
        assert_eq!(post.shares, 9);
        assert_eq!(post.message.as_deref(), Some("Headline"));
    }

    #[test]
    fn raw_post_with_missing_nested_fields_yields_absent_values() {
        let raw: RawPost = serde_json::from_value(json!({
            "id": "1_2",
            "created_time": "2016-03-01T08:00:00+0000",
            "updated_time": "2016-03-01T08:00:00+0000",
            "comments": {"data": []},
            "likes": {}
        }))
        .unwrap();
        let post = raw.into_post("some_fb_page");
        assert_eq!(post.comment_count, None);
        assert_eq!(post.likes, None);
        assert_eq!(post.shares, 0);
        assert_eq!(post.message, None);
    }

    #[test]
    fn raw_comment_flattens_author_and_likes() {
        let raw: RawComment = serde_json::from_value(json!({
            "id": "10150_777",
            "created_time": "2016-03-01T08:05:00+0000",
            "from": {"name": "A Reader", "id": "9001"},
            "likes": {"data": [], "summary": {"total_count": 3}},
            "message": "First"
        }))
        .unwrap();
        let comment = raw.into_comment("5281959998_10150");
        assert_eq!(comment.post_id, "5281959998_10150");
        assert_eq!(comment.from_id.as_deref(), Some("9001"));
        assert_eq!(comment.likes, Some(3));
    }

    #[test]
    fn raw_comment_without_author() {
        let raw: RawComment = serde_json::from_value(json!({
            "id": "c1",
            "created_time": "2016-03-01T08:05:00+0000"
        }))
        .unwrap();
        let comment = raw.into_comment("p1");
        assert!(comment.from_id.is_none());
        assert!(comment.likes.is_none());
    }

    #[test]
    fn next_cursor_reads_paging_after() {
        let listing: ListingResponse = serde_json::from_value(json!({
            "data": [],
            "paging": {"cursors": {"before": "b0", "after": "a1"}}
        }))
        .unwrap();
        assert_eq!(listing.next_cursor(), Some("a1"));
    }

    #[test]
    fn next_cursor_absent_without_paging() {
        let listing: ListingResponse = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(listing.next_cursor().is_none());
    }
}
