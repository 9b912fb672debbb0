use crate::types::{AggregatorError, FetchConfig, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://articles.db";
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// Runtime settings for the aggregation engine and its store.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub database_url: String,
    /// Articles published longer ago than this are evicted after each run.
    pub retention_days: i64,
    /// Upper bound on concurrent fetch-and-parse tasks.
    pub max_workers: usize,
    pub max_entries_per_feed: usize,
    pub max_connections: u32,
    pub fetch: FetchConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            retention_days: 5,
            max_workers: 10,
            max_entries_per_feed: 20,
            max_connections: 5,
            fetch: FetchConfig::default(),
        }
    }
}

impl AggregatorConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults for
    /// unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            config.database_url = url;
        }
        if let Some(days) = parse_var::<i64, _>(&lookup, "RETENTION_DAYS")? {
            if !(1..=MAX_RETENTION_DAYS).contains(&days) {
                return Err(AggregatorError::Config(format!(
                    "RETENTION_DAYS must be between 1 and {}, got {}",
                    MAX_RETENTION_DAYS, days
                )));
            }
            config.retention_days = days;
        }
        if let Some(workers) = parse_var::<usize, _>(&lookup, "FETCH_WORKERS")? {
            if workers == 0 {
                return Err(AggregatorError::Config(
                    "FETCH_WORKERS must be at least 1".to_string(),
                ));
            }
            config.max_workers = workers;
        }
        if let Some(cap) = parse_var(&lookup, "MAX_ENTRIES_PER_FEED")? {
            config.max_entries_per_feed = cap;
        }
        if let Some(secs) = parse_var(&lookup, "FETCH_TIMEOUT_SECS")? {
            config.fetch.timeout_seconds = secs;
        }
        if let Some(retries) = parse_var(&lookup, "FETCH_MAX_RETRIES")? {
            config.fetch.max_retries = retries;
        }
        if let Some(agent) = lookup("FETCH_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.fetch.user_agent = agent;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AggregatorError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}
