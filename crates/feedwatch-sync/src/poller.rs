//! One-page poll of a source's feed.

use chrono::Utc;
use feedwatch_graph::{GraphApi, GraphError};

use crate::state::{PostMerge, SharedState};

/// Fetches the latest `limit` posts of `source_id` and merges them.
///
/// Only the first page is read. Posts older than that page are not revisited.
///
/// # Errors
///
/// Returns the [`GraphError`] from the feed request; the store is untouched.
pub async fn poll_source<A>(
    api: &A,
    state: &SharedState,
    source_id: &str,
    limit: u32,
) -> Result<PostMerge, GraphError>
where
    A: GraphApi + ?Sized,
{
    let page = api.fetch_feed(source_id, limit).await?;
    let count = page.items.len();

    let merge = {
        let mut guard = state.lock().await;
        guard.record_request(Utc::now());
        guard.merge_posts(page.items)
    };

    tracing::info!(
        source = source_id,
        posts = count,
        new = merge.new,
        changed = merge.changed,
        "got posts"
    );
    Ok(merge)
}
