//! The read operations the sync engine needs, behind a trait so the engine
//! can be driven by a scripted fake in tests.

use async_trait::async_trait;
use feedwatch_core::{Comment, Post};

use crate::client::GraphClient;
use crate::error::GraphError;
use crate::types::Page;

#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Most recent `limit` posts of a source's feed. Never paginated further.
    async fn fetch_feed(&self, source_id: &str, limit: u32) -> Result<Page<Post>, GraphError>;

    /// One page of a post's comments; `after = None` starts at the oldest end.
    async fn fetch_comments(
        &self,
        post_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Comment>, GraphError>;
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn fetch_feed(&self, source_id: &str, limit: u32) -> Result<Page<Post>, GraphError> {
        GraphClient::fetch_feed(self, source_id, limit).await
    }

    async fn fetch_comments(
        &self,
        post_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Comment>, GraphError> {
        GraphClient::fetch_comments(self, post_id, limit, after).await
    }
}
