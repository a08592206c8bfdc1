//! HTTP client for the Graph-style read API.
//!
//! Issues single listing requests (`/{id}/feed`, `/{id}/comments`), classifies
//! the API's error envelope into [`GraphError`] variants, and retries
//! transient failures. Pagination is left to callers: each call returns one
//! [`Page`] and the cursor for the next.

use std::sync::LazyLock;
use std::time::Duration;

use feedwatch_core::{AppConfig, Comment, Post};
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::GraphError;
use crate::retry::retry_transient;
use crate::types::{ApiErrorBody, ErrorEnvelope, ListingResponse, Page, RawComment, RawPost};

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";

/// Fields requested for each feed entry.
pub const POST_FIELDS: &str = "id,created_time,updated_time,message,comments.summary(true).filter(stream),likes.summary(true),shares";

/// Fields requested for each comment.
pub const COMMENT_FIELDS: &str = "id,created_time,from,likes.summary(true),message";

/// `stream` includes replies alongside top-level comments.
const COMMENT_FILTER: &str = "stream";

static OBJECT_UNAVAILABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Object with ID .+ does not exist, cannot be loaded due to missing permissions, or does not support this operation",
    )
    .expect("valid regex")
});

/// Fixed query parameters of one listing request.
#[derive(Debug, Clone, Copy)]
pub struct ListingParams<'a> {
    pub fields: &'a str,
    pub limit: u32,
    pub filter: Option<&'a str>,
}

/// Client for the read API.
///
/// Use [`GraphClient::from_config`] in the binary or
/// [`GraphClient::with_base_url`] to point at a mock server in tests.
pub struct GraphClient {
    client: Client,
    access_token: String,
    base_url: Url,
    max_transient_retries: Option<u32>,
}

impl GraphClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        access_token: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, GraphError> {
        Self::with_base_url(access_token, api_version, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Http`] if the HTTP client cannot be built, or
    /// [`GraphError::InvalidBaseUrl`] if the configured base URL is unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self, GraphError> {
        let client = Self::with_base_url(
            &config.access_token,
            &config.api_version,
            config.request_timeout_secs,
            &config.api_base_url,
        )?;
        Ok(client.with_max_transient_retries(config.max_transient_retries))
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GraphError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        access_token: &str,
        api_version: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("feedwatch/0.1 (feed-mirror)")
            .build()?;

        let version = api_version.trim_start_matches('v');
        let normalised = format!("{}/v{version}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| GraphError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(GraphError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "URL cannot carry a path".to_owned(),
            });
        }

        Ok(Self {
            client,
            access_token: access_token.to_owned(),
            base_url: parsed,
            max_transient_retries: None,
        })
    }

    /// Caps transient retries; `None` (the default) retries until success.
    #[must_use]
    pub fn with_max_transient_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_transient_retries = max_retries;
        self
    }

    /// Fetches the most recent page of a source's feed.
    ///
    /// # Errors
    ///
    /// See [`GraphClient::get_listing`].
    pub async fn fetch_feed(&self, source_id: &str, limit: u32) -> Result<Page<Post>, GraphError> {
        let params = ListingParams {
            fields: POST_FIELDS,
            limit,
            filter: None,
        };
        let listing = self.get_listing(&[source_id, "feed"], params, None).await?;
        let next_cursor = listing.next_cursor().map(str::to_owned);
        let items = parse_items::<RawPost, _>(source_id, listing.data, |raw| {
            raw.into_post(source_id)
        });
        Ok(Page { items, next_cursor })
    }

    /// Fetches one page of a post's comments, oldest first when `after` is `None`.
    ///
    /// # Errors
    ///
    /// See [`GraphClient::get_listing`].
    pub async fn fetch_comments(
        &self,
        post_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Comment>, GraphError> {
        let params = ListingParams {
            fields: COMMENT_FIELDS,
            limit,
            filter: Some(COMMENT_FILTER),
        };
        let listing = self
            .get_listing(&[post_id, "comments"], params, after)
            .await?;
        let next_cursor = listing.next_cursor().map(str::to_owned);
        let items = parse_items::<RawComment, _>(post_id, listing.data, |raw| {
            raw.into_comment(post_id)
        });
        Ok(Page { items, next_cursor })
    }

    /// Issues one listing request, retrying API-flagged transient errors.
    ///
    /// # Errors
    ///
    /// - [`GraphError::ObjectUnavailable`] if the object behind the path is gone (not retried).
    /// - [`GraphError::Transient`] only when a retry cap is configured and exhausted.
    /// - [`GraphError::Api`] for any other API-reported or non-2xx failure.
    /// - [`GraphError::MalformedResponse`] / [`GraphError::Deserialize`] if the body is unusable.
    /// - [`GraphError::Http`] on network failure.
    pub async fn get_listing(
        &self,
        segments: &[&str],
        params: ListingParams<'_>,
        after: Option<&str>,
    ) -> Result<ListingResponse, GraphError> {
        let url = self.build_url(segments, params, after)?;
        let path = format!("/{}", segments.join("/"));

        retry_transient(&path, self.max_transient_retries, || {
            let url = url.clone();
            let path = path.clone();
            async move {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                let body = response.text().await?;
                classify_response(&path, status, &body)
            }
        })
        .await
    }

    /// Builds the full request URL with percent-encoded path segments and
    /// query parameters.
    fn build_url(
        &self,
        segments: &[&str],
        params: ListingParams<'_>,
        after: Option<&str>,
    ) -> Result<Url, GraphError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GraphError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", &self.access_token);
            pairs.append_pair("fields", params.fields);
            pairs.append_pair("limit", &params.limit.to_string());
            if let Some(filter) = params.filter {
                pairs.append_pair("filter", filter);
            }
            if let Some(cursor) = after {
                pairs.append_pair("after", cursor);
            }
        }
        Ok(url)
    }
}

/// Turns a raw HTTP response into a listing or a classified error.
fn classify_response(
    path: &str,
    status: StatusCode,
    body: &str,
) -> Result<ListingResponse, GraphError> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Err(api_error(path, envelope.error));
    }

    if !status.is_success() {
        return Err(GraphError::Api {
            path: path.to_owned(),
            code: i64::from(status.as_u16()),
            message: format!("HTTP status {status}"),
        });
    }

    if body.trim().is_empty() {
        return Err(GraphError::MalformedResponse {
            context: path.to_owned(),
        });
    }

    serde_json::from_str::<ListingResponse>(body).map_err(|e| GraphError::Deserialize {
        context: path.to_owned(),
        source: e,
    })
}

fn api_error(path: &str, error: ApiErrorBody) -> GraphError {
    if error.is_transient {
        GraphError::Transient {
            path: path.to_owned(),
            message: error.message,
        }
    } else if OBJECT_UNAVAILABLE_RE.is_match(&error.message) {
        GraphError::ObjectUnavailable {
            path: path.to_owned(),
            message: error.message,
        }
    } else {
        GraphError::Api {
            path: path.to_owned(),
            code: error.code,
            message: error.message,
        }
    }
}

/// Decodes each listing entry on its own, skipping any that fail to parse.
fn parse_items<R, T>(
    owner: &str,
    data: Vec<serde_json::Value>,
    convert: impl Fn(R) -> T,
) -> Vec<T>
where
    R: DeserializeOwned,
{
    data.into_iter()
        .filter_map(|value| {
            serde_json::from_value::<R>(value)
                .map_err(|e| {
                    tracing::warn!(owner, error = %e, "skipping malformed listing entry");
                })
                .ok()
        })
        .map(convert)
        .collect()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
