use crate::aggregator::NewsAggregator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

/// Runs `fetch_all_feeds` immediately and then every `interval` until the
/// returned handle is aborted. A failed run is logged and the next tick
/// proceeds as usual.
pub fn spawn_refresh_scheduler(aggregator: Arc<NewsAggregator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match aggregator.fetch_all_feeds().await {
                Ok(new_articles) => info!("Scheduled refresh stored {} new articles", new_articles),
                Err(e) => error!("Scheduled refresh failed: {}", e),
            }
        }
    })
}
