//! Immediate retry of API-flagged transient errors.
//!
//! The read API marks short-lived failures with `is_transient: true`; those
//! are re-issued with identical parameters and no delay. Every other error,
//! including network failures and [`GraphError::ObjectUnavailable`], is
//! returned on the first attempt.

use std::future::Future;

use crate::error::GraphError;

/// Runs `operation` until it succeeds or fails with a non-transient error.
///
/// `max_retries = None` retries without limit; `Some(n)` gives up after `n`
/// additional attempts and returns the last transient error.
pub(crate) async fn retry_transient<T, F, Fut>(
    path: &str,
    max_retries: Option<u32>,
    mut operation: F,
) -> Result<T, GraphError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GraphError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || max_retries.is_some_and(|max| attempt >= max) {
                    return Err(err);
                }
                attempt = attempt.saturating_add(1);
                tracing::info!(path, attempt, error = %err, "got a transient error; retrying");
                tokio::task::yield_now().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn transient() -> GraphError {
        GraphError::Transient {
            path: "/nytimes/feed".to_owned(),
            message: "An unexpected error has occurred".to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_transient("/p", None, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, GraphError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unbounded_retry_outlasts_many_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_transient("/p", None, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 50 {
                    Err(transient())
                } else {
                    Ok::<u32, GraphError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 51);
    }

    #[tokio::test]
    async fn bounded_retry_returns_last_transient_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_transient("/p", Some(2), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(transient())
            }
        })
        .await;
        // max_retries=2 -> 3 total attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(GraphError::Transient { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_object_unavailable() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_transient("/p", None, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(GraphError::ObjectUnavailable {
                    path: "/gone/feed".to_owned(),
                    message: "Object with ID 'gone' does not exist".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(GraphError::ObjectUnavailable { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_malformed_response() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_transient("/p", None, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(GraphError::MalformedResponse {
                    context: "/p".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(GraphError::MalformedResponse { .. })));
    }
}
