use chrono::{Duration, Utc};
use fashion_aggregator::{AggregatorError, ArticleStore, Category, FeedRegistry, NewArticle, Result, Source, Tier};
use tempfile::TempDir;
use tracing::info;

async fn open_store() -> Result<(TempDir, ArticleStore)> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let dir = TempDir::new()?;
    let url = format!("sqlite://{}", dir.path().join("articles.db").display());
    let store = ArticleStore::connect(&url, 2).await?;
    Ok((dir, store))
}

fn article(title: &str, url: &str, category: Category, hours_ago: i64) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        url: url.to_string(),
        description: Some(format!("About {}", title)),
        published_date: Utc::now() - Duration::hours(hours_ago),
        source: "Test Source".to_string(),
        category,
    }
}

#[tokio::test]
async fn inserting_the_same_article_twice_keeps_one_row() -> Result<()> {
    let (_dir, store) = open_store().await?;
    let a = article("Spring runway recap", "https://runway.example/1", Category::FashionTrends, 1);

    assert!(store.insert(&a).await);
    assert!(!store.insert(&a).await);
    assert_eq!(store.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn identical_content_under_another_url_is_deduplicated() -> Result<()> {
    let (_dir, store) = open_store().await?;
    let first = article("Serum season", "https://beauty.example/a", Category::Beauty, 1);
    let mut mirror = first.clone();
    mirror.url = "https://mirror.example/a".to_string();

    assert!(store.insert(&first).await);
    assert!(!store.insert(&mirror).await);
    assert_eq!(store.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn query_filters_by_category_newest_first() -> Result<()> {
    let (_dir, store) = open_store().await?;
    for (i, hours) in [5, 1, 3].iter().enumerate() {
        let a = article(&format!("Beauty story {}", i), &format!("https://b.example/{}", i), Category::Beauty, *hours);
        assert!(store.insert(&a).await);
    }
    for i in 0..2 {
        let a = article(&format!("Earnings {}", i), &format!("https://biz.example/{}", i), Category::FashionBusiness, 2);
        assert!(store.insert(&a).await);
    }

    let beauty = store.query(10, Some(Category::Beauty), None, None).await?;
    info!("Beauty query returned {} articles", beauty.len());
    assert_eq!(beauty.len(), 3);
    assert!(beauty.iter().all(|a| a.category == Some(Category::Beauty)));
    assert!(beauty
        .windows(2)
        .all(|pair| pair[0].published_date >= pair[1].published_date));

    let limited = store.query(2, None, None, None).await?;
    assert_eq!(limited.len(), 2);

    let by_source = store.query(10, None, Some("Nobody"), None).await?;
    assert!(by_source.is_empty());
    Ok(())
}

#[tokio::test]
async fn age_filter_excludes_older_articles() -> Result<()> {
    let (_dir, store) = open_store().await?;
    store.insert(&article("Fresh", "https://x.example/fresh", Category::Retail, 2)).await;
    store.insert(&article("Stale", "https://x.example/stale", Category::Retail, 48)).await;

    let recent = store.query(10, None, None, Some(24.0)).await?;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].title, "Fresh");
    Ok(())
}

#[tokio::test]
async fn eviction_removes_only_articles_past_retention() -> Result<()> {
    let (_dir, store) = open_store().await?;
    store.insert(&article("Six days old", "https://x.example/6", Category::Luxury, 6 * 24)).await;
    store.insert(&article("Four days old", "https://x.example/4", Category::Luxury, 4 * 24)).await;

    assert_eq!(store.evict_older_than(5).await?, 1);

    let remaining = store.query(usize::MAX, None, None, None).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Four days old");
    Ok(())
}

#[tokio::test]
async fn eviction_rejects_negative_and_unrepresentable_horizons() -> Result<()> {
    let (_dir, store) = open_store().await?;
    store.insert(&article("Fresh drop", "https://x.example/fresh", Category::Beauty, 1)).await;

    let err = store.evict_older_than(-1).await.unwrap_err();
    assert!(matches!(err, AggregatorError::Config(_)));

    let err = store.evict_older_than(200_000_000).await.unwrap_err();
    assert!(matches!(err, AggregatorError::Config(_)));

    assert_eq!(store.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn invalid_age_filters_are_rejected_and_huge_ages_are_unbounded() -> Result<()> {
    let (_dir, store) = open_store().await?;
    store.insert(&article("Fresh", "https://x.example/fresh", Category::Retail, 2)).await;
    store.insert(&article("Stale", "https://x.example/stale", Category::Retail, 48)).await;

    for hours in [f64::NAN, f64::INFINITY, -1.0] {
        let err = store.query(10, None, None, Some(hours)).await.unwrap_err();
        assert!(matches!(err, AggregatorError::InvalidTimeRange(_)), "{hours} accepted");
    }

    let everything = store.query(10, None, None, Some(1e10)).await?;
    assert_eq!(everything.len(), 2);
    Ok(())
}

#[tokio::test]
async fn stats_agree_with_query() -> Result<()> {
    let (_dir, store) = open_store().await?;
    let mut beauty = article("Lipstick drop", "https://b.example/1", Category::Beauty, 1);
    beauty.source = "Glossy".to_string();
    store.insert(&beauty).await;

    let mut beauty_two = article("Fragrance notes", "https://b.example/2", Category::Beauty, 30);
    beauty_two.source = "Glossy".to_string();
    store.insert(&beauty_two).await;

    store.insert(&article("Mall traffic", "https://r.example/1", Category::Retail, 2)).await;

    let stats = store.stats().await?;
    let all = store.query(usize::MAX, None, None, None).await?;
    assert_eq!(stats.total_articles, all.len() as i64);
    assert_eq!(stats.recent_articles_24h, 2);
    assert_eq!(stats.by_category.get("Beauty"), Some(&2));
    assert_eq!(stats.by_category.get("Retail"), Some(&1));
    assert_eq!(stats.top_sources[0].source, "Glossy");
    assert_eq!(stats.top_sources[0].count, 2);
    Ok(())
}

#[tokio::test]
async fn sources_table_mirrors_registry() -> Result<()> {
    let (_dir, store) = open_store().await?;
    let registry = FeedRegistry::from_sources(vec![
        Source::new("Runway Daily", "https://runway.example/feed").with_tier(Tier::Major),
        Source::new("Glossy Beauty", "https://glossy.example/feed").with_category(Category::Beauty),
        Source::new("Retired", "https://retired.example/feed").inactive(),
    ])?;

    assert_eq!(store.sync_sources(&registry).await?, 3);
    // Syncing twice updates in place.
    store.sync_sources(&registry).await?;

    let stamped = Utc::now();
    store.mark_source_updated("Runway Daily", stamped).await?;

    let sources = store.list_sources().await?;
    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Glossy Beauty", "Runway Daily"]);

    let runway = &sources[1];
    assert_eq!(runway.tier, "major");
    assert_eq!(runway.last_updated.map(|t| t.timestamp()), Some(stamped.timestamp()));
    assert_eq!(sources[0].category.as_deref(), Some("Beauty"));
    Ok(())
}
