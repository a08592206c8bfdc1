//! Live/dormant classification of tracked posts.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use feedwatch_core::Post;

/// Result of splitting the live set. Every input post lands in exactly one half.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub still_live: BTreeMap<String, Post>,
    pub dormant: Vec<Post>,
}

/// A post is still live iff it was updated less than `alive_age` before `now`.
#[must_use]
pub fn is_still_live(post: &Post, now: DateTime<Utc>, alive_age: Duration) -> bool {
    now - post.updated_time < alive_age
}

#[must_use]
pub fn partition_live(
    live: BTreeMap<String, Post>,
    now: DateTime<Utc>,
    alive_age: Duration,
) -> Partition {
    let mut partition = Partition::default();
    for (id, post) in live {
        if is_still_live(&post, now, alive_age) {
            partition.still_live.insert(id, post);
        } else {
            partition.dormant.push(post);
        }
    }
    partition
}
