use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fashion_aggregator::rss_utils::{text, time};
use fashion_aggregator::{spawn_refresh_scheduler, AggregatorConfig, NewsAggregator, QueryFacade, Tier};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "fashion-aggregator")]
#[command(about = "Collects fashion and beauty industry news from RSS feeds")]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    /// Overrides FETCH_WORKERS
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every active feed once
    Fetch,
    /// Fetch on a fixed interval until interrupted
    Watch {
        #[arg(long, default_value = "3600")]
        interval_secs: u64,
    },
    /// Show stored articles, newest first
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// One of: "All time", "1 hour", "12 hours", "1 day", "2 days", "3 days"
        #[arg(long)]
        time_range: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Article counts
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Registered feeds
    Sources {
        #[arg(long)]
        tier: Option<Tier>,
    },
    /// Known categories
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AggregatorConfig::from_env().context("invalid configuration")?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(workers) = cli.workers {
        config.max_workers = workers.max(1);
    }

    // Listing the registry needs no database.
    match &cli.command {
        Command::Sources { tier } => {
            print_sources(*tier);
            return Ok(());
        }
        Command::Categories => {
            for category in fashion_aggregator::categories() {
                println!("{}", category);
            }
            return Ok(());
        }
        _ => {}
    }

    info!("Opening article store at {}", config.database_url);
    let aggregator = Arc::new(
        NewsAggregator::new(config)
            .await
            .context("failed to open the article store")?,
    );
    let facade = QueryFacade::new(aggregator.clone());

    match cli.command {
        Command::Fetch => {
            let report = aggregator.fetch_all_feeds_with_report().await?;
            println!(
                "{} new articles ({} of {} sources failed, {} entries seen, {} evicted)",
                report.new_articles,
                report.sources_failed,
                report.sources_attempted,
                report.entries_seen,
                report.evicted
            );
        }
        Command::Watch { interval_secs } => {
            let handle = spawn_refresh_scheduler(aggregator.clone(), Duration::from_secs(interval_secs.max(1)));
            info!("Refreshing every {}s, press Ctrl-C to stop", interval_secs);
            tokio::signal::ctrl_c().await?;
            handle.abort();
            info!("Stopped");
        }
        Command::List {
            category,
            source,
            time_range,
            limit,
            json,
        } => {
            let articles = facade
                .get_recent_articles(limit, category.as_deref(), source.as_deref(), time_range.as_deref())
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&articles)?);
            } else {
                let now = Utc::now();
                for article in &articles {
                    let category = article.category.map(|c| c.as_str()).unwrap_or("-");
                    println!("[{}] {} | {} | {}", category, article.title, article.source, time::format_time_ago(article.published_date, now));
                    println!("    {}", article.url);
                    if let Some(description) = &article.description {
                        let summary = text::extract_text_from_html(description);
                        if !summary.is_empty() {
                            println!("    {}", text::truncate_words(&summary, 160));
                        }
                    }
                }
                println!("{} articles", articles.len());
            }
        }
        Command::Stats { json } => {
            let stats = facade.get_stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total articles: {}", stats.total_articles);
                println!("Last 24 hours:  {}", stats.recent_articles_24h);
                println!("By category:");
                for (category, count) in &stats.by_category {
                    println!("  {:<18} {}", category, count);
                }
                println!("Top sources:");
                for entry in &stats.top_sources {
                    println!("  {:<32} {}", entry.source, entry.count);
                }
            }
        }
        Command::Sources { .. } | Command::Categories => {}
    }

    aggregator.store().close().await;
    Ok(())
}

fn print_sources(tier: Option<Tier>) {
    let registry = fashion_aggregator::FeedRegistry::builtin();
    for (group, sources) in registry.sources_by_tier() {
        if tier.is_some_and(|t| t != group) {
            continue;
        }
        println!("{}:", group);
        for source in sources {
            println!("  {:<32} {}", source.name, source.url);
        }
    }
}
