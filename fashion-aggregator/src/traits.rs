use crate::types::Result;
use async_trait::async_trait;

/// Retrieves the raw body of a feed endpoint.
///
/// The aggregation engine only depends on this trait, so a run can be driven
/// by the HTTP [`Fetcher`](crate::Fetcher) or by an in-memory stand-in.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the feed document for `source` from `url`.
    ///
    /// Any error is treated as a transient failure of that one source.
    async fn fetch(&self, source: &str, url: &str) -> Result<String>;
}
