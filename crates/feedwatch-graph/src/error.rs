use thiserror::Error;

/// Errors returned by the Graph read API client.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API flagged the failure as transient (`is_transient: true`).
    #[error("transient API error for {path}: {message}")]
    Transient { path: String, message: String },

    /// The object behind `path` was removed, hidden, or never existed.
    #[error("object at {path} is no longer accessible: {message}")]
    ObjectUnavailable { path: String, message: String },

    /// Any other error reported in the API's `error` envelope or by status.
    #[error("API error {code} for {path}: {message}")]
    Api {
        path: String,
        code: i64,
        message: String,
    },

    /// The response had no body or lacked the listing envelope.
    #[error("malformed response for {context}")]
    MalformedResponse { context: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl GraphError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, GraphError::Transient { .. })
    }

    #[must_use]
    pub fn is_object_unavailable(&self) -> bool {
        matches!(self, GraphError::ObjectUnavailable { .. })
    }

    /// Returns `true` when the response itself was unusable rather than the
    /// request being refused.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            GraphError::MalformedResponse { .. } | GraphError::Deserialize { .. }
        )
    }
}
