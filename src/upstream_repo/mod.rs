// Upstream management API access. `Upstream` is the seam between aggregation and transport:
// the binary uses `HttpUpstream`, tests plug in canned responses.

pub mod endpoints;
mod http;

pub use http::HttpUpstream;

use serde_json::Value;
use std::future::Future;

use crate::envelope;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("{path} returned an undecodable body: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Upstream: Send + Sync {
    /// GET `path` (relative to the upstream base URL) and decode the JSON body as-is.
    fn get_json(&self, path: &str) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// GET and strip `data` envelopes.
///
/// The path is taken by value so the returned future owns it; callers build paths
/// inline inside `tokio::join!`.
pub async fn fetch_value<U: Upstream>(upstream: &U, path: String) -> Result<Value, FetchError> {
    upstream.get_json(&path).await.map(envelope::unwrap)
}

/// GET a list-shaped body.
pub async fn fetch_list<U: Upstream>(
    upstream: &U,
    path: String,
) -> Result<Vec<Value>, FetchError> {
    upstream.get_json(&path).await.map(envelope::list_of)
}
