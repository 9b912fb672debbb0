use crate::classifier::{Category, Classifier};
use crate::config::AggregatorConfig;
use crate::feeds::{FeedRegistry, Source};
use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::store::ArticleStore;
use crate::traits::FeedFetcher;
use crate::types::{AggregatorError, Article, NewArticle, PersistedSource, Result, RunReport, StatsRecord};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Where the engine is within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Dispatching,
    Collecting,
    Evicting,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Idle => "idle",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Collecting => "collecting",
            RunPhase::Evicting => "evicting",
        };
        f.write_str(label)
    }
}

/// Fetches every active source concurrently, classifies and stores the
/// entries, then evicts articles past the retention horizon.
///
/// Construct one per process and share it behind an `Arc`. Runs are
/// serialized: a second caller of [`fetch_all_feeds`](Self::fetch_all_feeds)
/// waits for the run in flight to finish.
pub struct NewsAggregator {
    store: Arc<ArticleStore>,
    registry: FeedRegistry,
    fetcher: Arc<dyn FeedFetcher>,
    parser: FeedParser,
    classifier: Arc<Classifier>,
    config: AggregatorConfig,
    run_lock: Mutex<()>,
    phase: RwLock<RunPhase>,
}

impl NewsAggregator {
    /// Opens the store named by `config.database_url` and wires up the HTTP
    /// fetcher and the builtin registry.
    pub async fn new(config: AggregatorConfig) -> Result<Self> {
        let store = ArticleStore::connect(&config.database_url, config.max_connections).await?;
        let fetcher = Fetcher::new(config.fetch.clone())?;
        let aggregator = Self::with_parts(store, FeedRegistry::builtin(), Arc::new(fetcher), config);

        if let Err(e) = aggregator.store.sync_sources(&aggregator.registry).await {
            warn!("Could not sync source registry: {}", e);
        }
        Ok(aggregator)
    }

    pub fn with_parts(
        store: ArticleStore,
        registry: FeedRegistry,
        fetcher: Arc<dyn FeedFetcher>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            registry,
            fetcher,
            parser: FeedParser::new(config.max_entries_per_feed),
            classifier: Arc::new(Classifier::new()),
            config,
            run_lock: Mutex::new(()),
            phase: RwLock::new(RunPhase::Idle),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub async fn phase(&self) -> RunPhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: RunPhase) {
        *self.phase.write().await = phase;
    }

    /// Runs one full ingestion pass and returns the number of newly stored
    /// articles.
    pub async fn fetch_all_feeds(&self) -> Result<usize> {
        Ok(self.fetch_all_feeds_with_report().await?.new_articles)
    }

    pub async fn fetch_all_feeds_with_report(&self) -> Result<RunReport> {
        let _run = self.run_lock.lock().await;
        let start_time = Instant::now();

        let result = self.run().await;
        self.set_phase(RunPhase::Idle).await;

        match &result {
            Ok(report) => info!(
                "Run finished in {} ms: {} new articles from {}/{} sources, {} evicted",
                start_time.elapsed().as_millis(),
                report.new_articles,
                report.sources_attempted - report.sources_failed,
                report.sources_attempted,
                report.evicted
            ),
            Err(e) => error!("Run aborted: {}", e),
        }
        result
    }

    async fn run(&self) -> Result<RunReport> {
        self.store.health_check().await?;
        if let Err(e) = self.store.sync_sources(&self.registry).await {
            warn!("Could not sync source registry: {}", e);
        }

        self.set_phase(RunPhase::Dispatching).await;
        let sources: Vec<Source> = self.registry.active_sources().cloned().collect();
        let mut report = RunReport {
            sources_attempted: sources.len(),
            ..RunReport::default()
        };
        info!(
            "Fetching {} sources with up to {} workers",
            sources.len(),
            self.config.max_workers
        );

        // Fetching is polled on its own future while completed sources are
        // written.
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let fetch_all = async move {
            let mut completed = stream::iter(sources.into_iter().map(move |source| async move {
                let result = self.collect_source(&source).await;
                (source, result)
            }))
            .buffer_unordered(self.config.max_workers.max(1));

            while let Some(outcome) = completed.next().await {
                if done_tx.send(outcome).is_err() {
                    break;
                }
            }
        };

        self.set_phase(RunPhase::Collecting).await;
        let store_all = async {
            while let Some((source, result)) = done_rx.recv().await {
                self.store_source(&source, result, &mut report).await;
            }
        };
        tokio::join!(fetch_all, store_all);

        self.set_phase(RunPhase::Evicting).await;
        report.evicted = self.store.evict_older_than(self.config.retention_days).await?;

        Ok(report)
    }

    async fn store_source(&self, source: &Source, result: Result<Vec<NewArticle>>, report: &mut RunReport) {
        let articles = match result {
            Ok(articles) => articles,
            Err(e) => {
                warn!("Error fetching {}: {}", source.name, e);
                report.sources_failed += 1;
                return;
            }
        };

        report.entries_seen += articles.len();
        let mut inserted = 0;
        for article in &articles {
            if self.store.insert(article).await {
                inserted += 1;
            }
        }
        report.new_articles += inserted;
        info!("{}: {} new of {} entries", source.name, inserted, articles.len());

        if let Err(e) = self.store.mark_source_updated(&source.name, Utc::now()).await {
            warn!("Could not stamp last_updated for {}: {}", source.name, e);
        }
    }

    /// Fetches, parses and classifies one registered source without storing
    /// anything.
    pub async fn fetch_single_feed(&self, name: &str) -> Result<Vec<NewArticle>> {
        let source = self
            .registry
            .get(name)
            .ok_or_else(|| AggregatorError::InvalidSource(format!("unknown source '{}'", name)))?;
        self.collect_source(source).await
    }

    async fn collect_source(&self, source: &Source) -> Result<Vec<NewArticle>> {
        let body = self.fetcher.fetch(&source.name, &source.url).await?;
        let feed = self.parser.parse_feed(&body, Utc::now())?;
        debug!("{}: parsed {} entries", source.name, feed.entries.len());

        Ok(feed
            .entries
            .into_iter()
            .map(|entry| {
                let category = self
                    .classifier
                    .classify(&entry.title, entry.description.as_deref());
                NewArticle {
                    title: entry.title,
                    url: entry.url,
                    description: entry.description,
                    published_date: entry.published_at,
                    source: source.name.clone(),
                    category,
                }
            })
            .collect())
    }

    pub async fn get_recent_articles(
        &self,
        limit: usize,
        category: Option<Category>,
        source: Option<&str>,
        max_age_hours: Option<f64>,
    ) -> Result<Vec<Article>> {
        self.store.query(limit, category, source, max_age_hours).await
    }

    pub async fn get_stats(&self) -> Result<StatsRecord> {
        self.store.stats().await
    }

    pub async fn persisted_sources(&self) -> Result<Vec<PersistedSource>> {
        self.store.list_sources().await
    }
}
