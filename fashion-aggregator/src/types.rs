use crate::classifier::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored article, as returned by the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_date: DateTime<Utc>,
    pub source: String,
    pub category: Option<Category>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A normalized, classified feed entry that has not been stored yet.
///
/// `id` and `content_hash` are derived by the store at insert time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_date: DateTime<Utc>,
    pub source: String,
    pub category: Category,
}

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

/// One feed entry after field extraction, before classification.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
    /// Minimum spacing between two request starts against the same host.
    pub per_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Fashion News Aggregator 1.0 (Educational Use)".to_string(),
            timeout_seconds: 30,
            max_retries: 1,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
            per_host_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub total_articles: i64,
    pub recent_articles_24h: i64,
    pub by_category: std::collections::BTreeMap<String, i64>,
    /// At most ten entries, largest count first.
    pub top_sources: Vec<SourceCount>,
}

/// Summary of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    pub entries_seen: usize,
    pub new_articles: usize,
    pub evicted: u64,
}

/// A row of the persisted `sources` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSource {
    pub name: String,
    pub url: String,
    pub category: Option<String>,
    pub tier: String,
    pub active: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to fetch {feed}: {message}")]
    FeedFetch { feed: String, message: String },

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Invalid source definition: {0}")]
    InvalidSource(String),

    #[error("Unknown category: {0}")]
    InvalidCategory(String),

    #[error("Unknown time range: {0}")]
    InvalidTimeRange(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
