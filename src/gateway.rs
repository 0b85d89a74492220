//! Fetch gateway contract
//!
//! The refresh scheduler sees the remote API only through [`FetchGateway`]:
//! one asynchronous fetch that completes exactly once with a payload or a
//! reason. Retrying is the scheduler's business, never the gateway's.

use futures::future::BoxFuture;
use thiserror::Error;

/// Errors a fetch can end with
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned HTTP {0}")]
    Status(u16),

    /// Response arrived but is not a usable payload
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Source of fresh payloads for the refresh scheduler
pub trait FetchGateway: Send + Sync {
    /// Fetches one payload
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - the payload bytes to cache and emit
    /// * `Err(FetchError)` - the reason the fetch failed
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<u8>, FetchError>>;

    /// Checks that a payload is well formed
    ///
    /// Applied to fetched payloads before they are cached and to cached
    /// payloads before they are served. Accepts everything by default.
    fn validate(&self, _payload: &[u8]) -> Result<(), FetchError> {
        Ok(())
    }
}
