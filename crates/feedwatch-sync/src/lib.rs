//! Incremental mirror of source feeds and their comment threads.
//!
//! Posts are polled from each source on a fixed interval. Posts whose
//! update time moves are held in a live set; once a post has been quiet for
//! the configured age it leaves the set and its full comment thread is
//! crawled. State can be snapshotted to disk and restored on start.

pub mod crawler;
pub mod engine;
pub mod error;
pub mod export;
pub mod liveness;
pub mod poller;
pub mod request_log;
pub mod state;

pub use crawler::{crawl_comments, CrawlEnd, CrawlReport, CrawlState, MAX_COMMENT_PAGES};
pub use engine::{Mirror, MirrorSettings, PollSummary, PruneSummary};
pub use error::SyncError;
pub use export::{write_comments_csv, write_posts_csv, COMMENT_COLUMNS, POST_COLUMNS};
pub use liveness::{is_still_live, partition_live, Partition};
pub use poller::poll_source;
pub use request_log::RequestLog;
pub use state::{read_snapshot, write_snapshot, MirrorState, PostMerge, SharedState};
