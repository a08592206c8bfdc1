//! The mirrored state and its whole-state snapshot file.
//!
//! All four collections live in one [`MirrorState`], guarded by a single
//! mutex in [`SharedState`]. Snapshots are written from a clone taken under
//! the lock, so the file is always a point-in-time copy.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use feedwatch_core::{Comment, Post};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SyncError;
use crate::request_log::RequestLog;

pub type SharedState = Arc<Mutex<MirrorState>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorState {
    pub requests: RequestLog,
    /// Posts whose comment threads are assumed to still be changing.
    pub live_posts: BTreeMap<String, Post>,
    pub posts: BTreeMap<String, Post>,
    pub comments: BTreeMap<String, Comment>,
}

/// How a page of feed posts changed the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostMerge {
    pub seen: usize,
    pub new: usize,
    pub changed: usize,
}

impl PostMerge {
    /// Posts that entered or refreshed the live set.
    #[must_use]
    pub fn marked_live(&self) -> usize {
        self.new + self.changed
    }
}

impl MirrorState {
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Upserts feed posts. A post that is new, or whose `updated_time`
    /// differs from the stored copy, is (re)inserted into the live set.
    /// The stored copy is always replaced.
    pub fn merge_posts(&mut self, posts: Vec<Post>) -> PostMerge {
        let mut merge = PostMerge::default();
        for post in posts {
            merge.seen += 1;
            let maybe_new_comments = match self.posts.get(&post.id) {
                None => {
                    merge.new += 1;
                    true
                }
                Some(stored) if stored.changed_since(&post) => {
                    merge.changed += 1;
                    true
                }
                Some(_) => false,
            };
            if maybe_new_comments {
                self.live_posts.insert(post.id.clone(), post.clone());
            }
            self.posts.insert(post.id.clone(), post);
        }
        merge
    }

    /// Upserts comments keyed by id; the last write for an id wins.
    pub fn merge_comments(&mut self, comments: Vec<Comment>) -> usize {
        let count = comments.len();
        for comment in comments {
            self.comments.insert(comment.id.clone(), comment);
        }
        count
    }

    pub fn record_request(&mut self, at: DateTime<Utc>) {
        self.requests.record(at);
    }
}

/// Serializes `state` to `path`, replacing any earlier snapshot there.
///
/// The document is written to a sibling `.tmp` file first and renamed into
/// place, so a crash mid-write leaves the previous snapshot intact.
///
/// # Errors
///
/// Returns [`SyncError::SnapshotFormat`] if serialization fails or
/// [`SyncError::Persistence`] if the file cannot be written or renamed.
pub async fn write_snapshot(path: &Path, state: &MirrorState) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(state).map_err(|e| SyncError::SnapshotFormat {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| SyncError::Persistence {
            path: tmp.clone(),
            source: e,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| SyncError::Persistence {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Reads a snapshot written by [`write_snapshot`].
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] if the file is missing or unreadable,
/// or [`SyncError::SnapshotFormat`] if it does not decode.
pub async fn read_snapshot(path: &Path) -> Result<MirrorState, SyncError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::Persistence {
            path: path.to_path_buf(),
            source: e,
        })?;
    serde_json::from_str(&raw).map_err(|e| SyncError::SnapshotFormat {
        path: path.to_path_buf(),
        source: e,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
