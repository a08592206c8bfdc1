//! The mirror: shared state plus the periodic operations that drive it.
//!
//! Every per-source and per-post failure is isolated. It is logged and the
//! rest of the tick carries on. In strict mode the first failure other than
//! an unavailable object is returned once the tick completes, so the harness
//! can abort the process.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use feedwatch_core::AppConfig;
use feedwatch_graph::{GraphApi, GraphError};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::crawler::{crawl_comments, CrawlReport};
use crate::error::SyncError;
use crate::export::{write_comments_csv, write_posts_csv};
use crate::liveness::partition_live;
use crate::poller::poll_source;
use crate::state::{read_snapshot, write_snapshot, MirrorState, SharedState};

/// Tunables the engine reads on every tick.
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    pub sources: Vec<String>,
    pub post_limit: u32,
    pub comment_limit: u32,
    pub alive_age: Duration,
    pub max_concurrent_fetches: usize,
    pub strict: bool,
}

impl MirrorSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, sources: Vec<String>) -> Self {
        Self {
            sources,
            post_limit: config.post_limit,
            comment_limit: config.comment_limit,
            alive_age: config.alive_age(),
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            strict: config.strict,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub sources_polled: usize,
    pub sources_failed: usize,
    pub posts_seen: usize,
    pub marked_live: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub still_live: usize,
    pub dormant: Vec<String>,
    pub crawled: Vec<CrawlReport>,
    pub crawl_failures: usize,
}

pub struct Mirror<A: ?Sized> {
    api: Arc<A>,
    state: SharedState,
    settings: MirrorSettings,
    /// Sources whose feed object is gone; skipped for the rest of the process.
    retired_sources: Mutex<HashSet<String>>,
    /// Held for the whole of a snapshot write so writes never interleave.
    snapshot_writer: Mutex<()>,
}

impl<A> Mirror<A>
where
    A: GraphApi + ?Sized,
{
    pub fn new(api: Arc<A>, settings: MirrorSettings) -> Self {
        Self::with_state(api, settings, MirrorState::default())
    }

    pub fn with_state(api: Arc<A>, settings: MirrorSettings, state: MirrorState) -> Self {
        Self {
            api,
            state: state.shared(),
            settings,
            retired_sources: Mutex::new(HashSet::new()),
            snapshot_writer: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &MirrorSettings {
        &self.settings
    }

    /// A point-in-time copy of the whole state.
    pub async fn state_copy(&self) -> MirrorState {
        self.state.lock().await.clone()
    }

    /// Polls every active source once, concurrently up to the configured bound.
    ///
    /// # Errors
    ///
    /// Only in strict mode: [`SyncError::Strict`] for the first failed source.
    pub async fn poll_all_sources(&self) -> Result<PollSummary, SyncError> {
        let active: Vec<String> = {
            let retired = self.retired_sources.lock().await;
            self.settings
                .sources
                .iter()
                .filter(|s| !retired.contains(*s))
                .cloned()
                .collect()
        };

        let results: Vec<(String, Result<_, GraphError>)> = stream::iter(active)
            .map(|source| async move {
                let result = poll_source(
                    self.api.as_ref(),
                    &self.state,
                    &source,
                    self.settings.post_limit,
                )
                .await;
                (source, result)
            })
            .buffer_unordered(self.settings.max_concurrent_fetches)
            .collect()
            .await;

        let mut summary = PollSummary::default();
        let mut escalated = None;
        for (source, result) in results {
            summary.sources_polled += 1;
            match result {
                Ok(merge) => {
                    summary.posts_seen += merge.seen;
                    summary.marked_live += merge.marked_live();
                }
                Err(err) => {
                    summary.sources_failed += 1;
                    if err.is_object_unavailable() {
                        tracing::warn!(
                            source = %source,
                            error = %err,
                            "source has likely been removed; it will no longer be polled"
                        );
                        self.retired_sources.lock().await.insert(source);
                    } else {
                        let context = format!("polling source {source}");
                        self.note_failure(&mut escalated, context, err);
                    }
                }
            }
        }

        match escalated {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    /// Splits the live set at `now`, drops dormant posts from it, and runs one
    /// full comment crawl for each dormant post.
    ///
    /// # Errors
    ///
    /// Only in strict mode: [`SyncError::Strict`] for the first failed crawl.
    pub async fn prune_and_crawl(&self, now: DateTime<Utc>) -> Result<PruneSummary, SyncError> {
        let partition = {
            let mut guard = self.state.lock().await;
            let live = std::mem::take(&mut guard.live_posts);
            let partition = partition_live(live, now, self.settings.alive_age);
            guard.live_posts.clone_from(&partition.still_live);
            partition
        };

        let dormant: Vec<String> = partition.dormant.into_iter().map(|p| p.id).collect();
        tracing::info!(
            pruned = dormant.len(),
            alive = partition.still_live.len(),
            "Pruned {} posts. {} posts remain alive.",
            dormant.len(),
            partition.still_live.len()
        );

        let (crawled, crawl_failures, escalated) = self.crawl_all(dormant.clone()).await;

        let summary = PruneSummary {
            still_live: partition.still_live.len(),
            dormant,
            crawled,
            crawl_failures,
        };
        match escalated {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    /// Crawls the comments of every post still in the live set without
    /// removing them from it. Used before an export.
    ///
    /// # Errors
    ///
    /// Only in strict mode: [`SyncError::Strict`] for the first failed crawl.
    pub async fn crawl_live_posts(&self) -> Result<Vec<CrawlReport>, SyncError> {
        let live: Vec<String> = self.state.lock().await.live_posts.keys().cloned().collect();
        let (crawled, _, escalated) = self.crawl_all(live).await;
        match escalated {
            Some(err) => Err(err),
            None => Ok(crawled),
        }
    }

    /// Prunes the request log to the last hour and logs the count.
    pub async fn report_requests(&self, now: DateTime<Utc>) -> usize {
        let count = self.state.lock().await.requests.prune_to_last_hour(now);
        tracing::info!(requests = count, "{count} requests in the last hour.");
        count
    }

    /// Writes a consistent copy of the state to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] or [`SyncError::SnapshotFormat`].
    /// Callers log these; they never stop the scheduler.
    pub async fn save_snapshot(&self, path: &Path) -> Result<(), SyncError> {
        // The copy is taken after the writer lock, so the last write to
        // finish always holds the newest state.
        let _writer = self.snapshot_writer.lock().await;
        let copy = self.state_copy().await;
        write_snapshot(path, &copy).await?;
        tracing::debug!(
            path = %path.display(),
            posts = copy.posts.len(),
            comments = copy.comments.len(),
            "state snapshot written"
        );
        Ok(())
    }

    /// Replaces the in-memory state with the snapshot at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] or [`SyncError::SnapshotFormat`];
    /// the in-memory state is left unchanged on error.
    pub async fn restore_snapshot(&self, path: &Path) -> Result<(), SyncError> {
        let restored = read_snapshot(path).await?;
        tracing::info!(
            path = %path.display(),
            posts = restored.posts.len(),
            live = restored.live_posts.len(),
            comments = restored.comments.len(),
            "loaded state successfully"
        );
        *self.state.lock().await = restored;
        Ok(())
    }

    /// Crawls live posts' comments, then writes posts and comments as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Export`] if either file cannot be written, or
    /// [`SyncError::Strict`] if a crawl fails in strict mode.
    pub async fn export_all(
        &self,
        posts_path: &Path,
        comments_path: &Path,
    ) -> Result<(), SyncError> {
        self.crawl_live_posts().await?;

        let copy = self.state_copy().await;
        let posts_path = posts_path.to_path_buf();
        let comments_path = comments_path.to_path_buf();
        let (posts, comments) = tokio::task::spawn_blocking(move || {
            let posts = write_posts_csv(&posts_path, copy.posts.values())?;
            let comments = write_comments_csv(&comments_path, copy.comments.values())?;
            Ok::<_, SyncError>((posts, comments))
        })
        .await??;

        tracing::info!(posts, comments, "export complete");
        Ok(())
    }

    /// Fetches one feed page per configured source and checks each is non-empty.
    ///
    /// Returns the total number of posts seen.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Graph`] on the first failed request, or
    /// [`SyncError::SourceCheck`] naming a source that returned no posts.
    pub async fn check_sources(&self) -> Result<usize, SyncError> {
        let mut total = 0usize;
        for source in &self.settings.sources {
            let page = self
                .api
                .fetch_feed(source, self.settings.post_limit)
                .await?;
            self.state.lock().await.record_request(Utc::now());
            if page.items.is_empty() {
                return Err(SyncError::SourceCheck(format!(
                    "source {source} returned 0 posts"
                )));
            }
            total += page.items.len();
        }

        let expected = self.settings.sources.len() * self.settings.post_limit as usize;
        tracing::info!(
            posts = total,
            sources = self.settings.sources.len(),
            "successfully got posts from all sources"
        );
        if total != expected {
            tracing::warn!(expected, got = total, "fewer posts than hoped for");
        }
        Ok(total)
    }

    async fn crawl_all(
        &self,
        post_ids: Vec<String>,
    ) -> (Vec<CrawlReport>, usize, Option<SyncError>) {
        let results: Vec<(String, Result<CrawlReport, GraphError>)> = stream::iter(post_ids)
            .map(|post_id| async move {
                let result = crawl_comments(
                    self.api.as_ref(),
                    &self.state,
                    &post_id,
                    self.settings.comment_limit,
                )
                .await;
                (post_id, result)
            })
            .buffer_unordered(self.settings.max_concurrent_fetches)
            .collect()
            .await;

        let mut crawled = Vec::new();
        let mut failures = 0usize;
        let mut escalated = None;
        for (post_id, result) in results {
            match result {
                Ok(report) => crawled.push(report),
                Err(err) => {
                    failures += 1;
                    if err.is_object_unavailable() {
                        tracing::warn!(
                            post_id = %post_id,
                            error = %err,
                            "post has likely been removed; its comments will not be collected"
                        );
                    } else {
                        let context = format!("crawling comments of {post_id}");
                        self.note_failure(&mut escalated, context, err);
                    }
                }
            }
        }
        (crawled, failures, escalated)
    }

    /// Logs a failure and, in strict mode, keeps the first one for escalation.
    fn note_failure(&self, escalated: &mut Option<SyncError>, context: String, err: GraphError) {
        tracing::error!(context = %context, error = %err, "request failed");
        if self.settings.strict && escalated.is_none() {
            *escalated = Some(SyncError::Strict {
                context,
                source: err,
            });
        }
    }
}
