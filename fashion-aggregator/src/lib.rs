pub mod types;
pub mod classifier;
pub mod feeds;
pub mod rss_utils;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod store;
pub mod config;
pub mod aggregator;
pub mod query;
pub mod scheduler;

pub use types::*;
pub use classifier::{categories, classify, Category, Classifier};
pub use feeds::{FeedRegistry, Source, Tier};
pub use traits::FeedFetcher;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use store::ArticleStore;
pub use config::AggregatorConfig;
pub use aggregator::{NewsAggregator, RunPhase};
pub use query::{QueryFacade, TimeRange};
pub use scheduler::spawn_refresh_scheduler;
