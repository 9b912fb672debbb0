use crate::rss_utils::url::extract_host;
use crate::traits::FeedFetcher;
use crate::types::{AggregatorError, FetchConfig, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// HTTP feed fetcher with a bounded timeout, a small retry budget and
/// per-host request spacing.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    // host -> earliest instant the next request to it may start
    host_slots: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            host_slots: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn fetch_feed(&self, source: &str, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed for {}: {}", source, url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 8),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_seconds)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            self.wait_for_host_slot(url).await;

            match self.attempt(url).await {
                Ok(body) => {
                    info!(
                        "Fetched {} ({} bytes in {} ms)",
                        source,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                // Oversized bodies will not shrink on a retry.
                Err(e @ AggregatorError::FeedTooLarge { .. }) => {
                    last_error = Some(e);
                    break;
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, source, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(AggregatorError::FeedFetch {
            feed: source.to_string(),
            message,
        })
    }

    async fn attempt(&self, url: &str) -> Result<String> {
        let mut response: Response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(AggregatorError::General(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let limit = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit {
                return Err(too_large(content_length as usize));
            }
        }

        // Content-Length may be absent or wrong; enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Reserves the next request slot for the URL's host and sleeps until it
    /// opens. The lock is released before sleeping.
    async fn wait_for_host_slot(&self, url: &str) {
        let Some(host) = extract_host(url) else {
            return;
        };
        let spacing = Duration::from_millis(self.config.per_host_interval_ms);

        let wait = {
            let mut slots = self.host_slots.lock().await;
            let now = Instant::now();
            let start = match slots.get(&host) {
                Some(&next) if next > now => next,
                _ => now,
            };
            slots.insert(host.clone(), start + spacing);
            start.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            debug!("Spacing requests to {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

fn too_large(bytes: usize) -> AggregatorError {
    AggregatorError::FeedTooLarge {
        size_mb: bytes.div_ceil(1024 * 1024),
    }
}

#[async_trait]
impl FeedFetcher for Fetcher {
    async fn fetch(&self, source: &str, url: &str) -> Result<String> {
        self.fetch_feed(source, url).await
    }
}
