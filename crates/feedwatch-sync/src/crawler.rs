//! Exhaustive crawl of one post's comment thread.
//!
//! The crawl starts with no cursor (oldest comments first) and follows
//! `paging.cursors.after` forward. It stops when the API returns no cursor,
//! returns the cursor it was just given, or [`MAX_COMMENT_PAGES`] is reached.
//! Each page is merged into the store as soon as it arrives.

use chrono::Utc;
use feedwatch_graph::{GraphApi, GraphError};

use crate::state::SharedState;

/// Upper bound on pages per crawl. Guards against cursors that cycle over
/// more than one value, which the repeated-cursor check cannot see.
pub const MAX_COMMENT_PAGES: usize = 10_000;

/// Where a crawl stands between page requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    Start,
    HasMore(String),
    Exhausted(CrawlEnd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlEnd {
    /// The last page carried no continuation cursor.
    NoCursor,
    /// The API handed back the cursor that was just used.
    CursorRepeated,
    /// [`MAX_COMMENT_PAGES`] pages were fetched; the thread may be incomplete.
    PageLimit,
}

/// Decides the next state from the cursor just used and the one returned.
#[must_use]
pub fn advance(used: Option<&str>, returned: Option<String>) -> CrawlState {
    match returned {
        Some(next) if used != Some(next.as_str()) => CrawlState::HasMore(next),
        Some(_) => CrawlState::Exhausted(CrawlEnd::CursorRepeated),
        None => CrawlState::Exhausted(CrawlEnd::NoCursor),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub post_id: String,
    pub pages: usize,
    pub comments: usize,
    pub end: CrawlEnd,
}

/// Walks every page of `post_id`'s comments into the shared store.
///
/// # Errors
///
/// Returns the first [`GraphError`] from a page request. Pages merged before
/// the failure stay in the store.
pub async fn crawl_comments<A>(
    api: &A,
    state: &SharedState,
    post_id: &str,
    limit: u32,
) -> Result<CrawlReport, GraphError>
where
    A: GraphApi + ?Sized,
{
    let mut crawl = CrawlState::Start;
    let mut pages = 0usize;
    let mut comments = 0usize;

    let end = loop {
        let cursor = match crawl {
            CrawlState::Start => None,
            CrawlState::HasMore(cursor) => Some(cursor),
            CrawlState::Exhausted(end) => break end,
        };

        if pages >= MAX_COMMENT_PAGES {
            tracing::warn!(
                post_id,
                pages,
                "comment crawl hit page limit; thread may be incomplete"
            );
            break CrawlEnd::PageLimit;
        }

        let page = api.fetch_comments(post_id, limit, cursor.as_deref()).await?;
        pages += 1;
        tracing::debug!(post_id, count = page.items.len(), "got comments");

        {
            let mut guard = state.lock().await;
            guard.record_request(Utc::now());
            comments += guard.merge_comments(page.items);
        }

        crawl = advance(cursor.as_deref(), page.next_cursor);
    };

    tracing::info!(post_id, pages, comments, end = ?end, "got all comments");

    Ok(CrawlReport {
        post_id: post_id.to_owned(),
        pages,
        comments,
        end,
    })
}
