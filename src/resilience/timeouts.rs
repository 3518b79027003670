//! Timeout enforcement.
//!
//! Every upstream attempt gets its own deadline. There is no deadline for a
//! whole retry sequence; its worst case is the sum of attempt timeouts and
//! backoff delays.

use std::future::Future;
use std::time::Duration;

use crate::upstream::UpstreamError;

/// Bound a single upstream attempt by `limit`.
pub async fn with_attempt_timeout<T, Fut>(limit: Duration, call: Fut) -> Result<T, UpstreamError>
where
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout(limit)),
    }
}
