//! Mirrored entities as they are held in memory, snapshotted, and exported.
//!
//! Field order is significant: it is the column order of the CSV export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post from one of the configured sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub source_id: String,
    pub id: String,
    pub created_time: DateTime<Utc>,
    /// The only field compared across polls to detect change.
    pub updated_time: DateTime<Utc>,
    pub likes: Option<u64>,
    /// Total comment count reported by the feed listing.
    #[serde(rename = "comments")]
    pub comment_count: Option<u64>,
    #[serde(default)]
    pub shares: u64,
    pub message: Option<String>,
}

impl Post {
    /// Returns `true` when `other` carries a different `updated_time`, i.e.
    /// the post may have new comments since it was last seen.
    #[must_use]
    pub fn changed_since(&self, other: &Post) -> bool {
        self.updated_time != other.updated_time
    }
}

/// A comment (or reply) on a mirrored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub post_id: String,
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub from_id: Option<String>,
    pub likes: Option<u64>,
    pub message: Option<String>,
}
