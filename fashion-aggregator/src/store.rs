use crate::classifier::Category;
use crate::feeds::FeedRegistry;
use crate::types::{AggregatorError, Article, NewArticle, PersistedSource, Result, SourceCount, StatsRecord};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

const ARTICLE_COLUMNS: &str =
    "id, title, url, description, published_date, source, category, content_hash, created_at";

/// Stable identifier of an article: SHA-256 of `title|url`, hex encoded.
pub fn article_id(title: &str, url: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{}|{}", title, url).as_bytes()))
}

/// Secondary dedup key: SHA-256 of `title|description`, hex encoded.
pub fn content_hash(title: &str, description: Option<&str>) -> String {
    format!(
        "{:x}",
        Sha256::digest(format!("{}|{}", title, description.unwrap_or("")).as_bytes())
    )
}

/// `now - age`, or `None` when that lies before the earliest representable
/// timestamp.
fn cutoff(age: Option<Duration>) -> Option<DateTime<Utc>> {
    age.and_then(|age| Utc::now().checked_sub_signed(age))
}

fn from_unix(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

/// SQLite backed article store.
///
/// Every call checks a connection out of the pool for the duration of that
/// call only; there is no connection held across calls.
#[derive(Clone)]
pub struct ArticleStore {
    db: SqlitePool,
}

impl ArticleStore {
    /// Opens (creating if needed) the database at `database_url` and makes
    /// sure the tables and indexes exist.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let db = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { db };
        store.init_schema().await?;
        info!("Opened article store at {}", database_url);
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                description TEXT,
                published_date INTEGER NOT NULL,
                source TEXT NOT NULL,
                category TEXT,
                content_hash TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                url TEXT NOT NULL,
                category TEXT,
                tier TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                last_updated INTEGER,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_articles_published ON articles (published_date)",
            "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles (source)",
            "CREATE INDEX IF NOT EXISTS idx_articles_category ON articles (category)",
        ] {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    /// Stores an article unless its id, url or content hash is already
    /// present. Returns whether a row was added; storage errors are logged
    /// and reported as `false`.
    pub async fn insert(&self, article: &NewArticle) -> bool {
        match self.try_insert(article).await {
            Ok(inserted) => inserted,
            Err(e) => {
                error!("Error inserting article {} from {}: {}", article.url, article.source, e);
                false
            }
        }
    }

    async fn try_insert(&self, article: &NewArticle) -> Result<bool> {
        let id = article_id(&article.title, &article.url);
        let hash = content_hash(&article.title, article.description.as_deref());

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO articles
                (id, title, url, description, published_date, source, category, content_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.description)
        .bind(article.published_date.timestamp())
        .bind(&article.source)
        .bind(article.category.as_str())
        .bind(&hash)
        .bind(Utc::now().timestamp())
        .execute(&self.db)
        .await?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!("Duplicate article skipped: {}", article.url);
        }
        Ok(inserted)
    }

    /// Articles newest first. All given filters must match.
    ///
    /// `max_age_hours` must be finite and non-negative. An age reaching past
    /// the earliest representable date does not filter anything.
    pub async fn query(
        &self,
        limit: usize,
        category: Option<Category>,
        source: Option<&str>,
        max_age_hours: Option<f64>,
    ) -> Result<Vec<Article>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles WHERE 1=1", ARTICLE_COLUMNS));

        if let Some(category) = category {
            builder.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(source) = source {
            builder.push(" AND source = ").push_bind(source.to_string());
        }
        if let Some(hours) = max_age_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(AggregatorError::InvalidTimeRange(format!(
                    "{} hours is not a valid age",
                    hours
                )));
            }
            // The cast saturates; out-of-range seconds become no limit.
            match cutoff(Duration::try_seconds((hours * 3600.0) as i64)) {
                Some(cutoff) => {
                    builder.push(" AND published_date >= ").push_bind(cutoff.timestamp());
                }
                None => debug!("Age filter of {} hours reaches past any stored date", hours),
            }
        }
        builder
            .push(" ORDER BY published_date DESC, created_at DESC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.db).await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Deletes every article published more than `days` days ago. Negative
    /// or unrepresentable horizons are rejected without touching any row.
    pub async fn evict_older_than(&self, days: i64) -> Result<u64> {
        if days < 0 {
            return Err(AggregatorError::Config(format!(
                "retention must not be negative, got {} days",
                days
            )));
        }
        let cutoff = cutoff(Duration::try_days(days)).ok_or_else(|| {
            AggregatorError::Config(format!("retention of {} days is out of range", days))
        })?;

        let result = sqlx::query("DELETE FROM articles WHERE published_date < ?")
            .bind(cutoff.timestamp())
            .execute(&self.db)
            .await?;

        let deleted = result.rows_affected();
        info!("Cleaned up {} articles older than {} days", deleted, days);
        Ok(deleted)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn stats(&self) -> Result<StatsRecord> {
        let total_articles = self.count().await?;

        let cutoff = Utc::now() - Duration::hours(24);
        let recent_articles_24h: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE published_date >= ?")
                .bind(cutoff.timestamp())
                .fetch_one(&self.db)
                .await?;

        let by_category: BTreeMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT category, COUNT(*)
            FROM articles
            WHERE category IS NOT NULL
            GROUP BY category
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let top_sources = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT source, COUNT(*) AS n
            FROM articles
            GROUP BY source
            ORDER BY n DESC, source ASC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(source, count)| SourceCount { source, count })
        .collect();

        Ok(StatsRecord {
            total_articles,
            recent_articles_24h,
            by_category,
            top_sources,
        })
    }

    /// Mirrors the registry into the `sources` table in one transaction.
    pub async fn sync_sources(&self, registry: &FeedRegistry) -> Result<usize> {
        let now = Utc::now().timestamp();
        let mut tx = self.db.begin().await?;

        for source in registry.sources() {
            sqlx::query(
                r#"
                INSERT INTO sources (name, url, category, tier, active, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (name) DO UPDATE SET
                    url = excluded.url,
                    category = excluded.category,
                    tier = excluded.tier,
                    active = excluded.active
                "#,
            )
            .bind(&source.name)
            .bind(&source.url)
            .bind(source.category.map(|c| c.as_str()))
            .bind(source.tier.as_str())
            .bind(source.active)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Synced {} sources", registry.len());
        Ok(registry.len())
    }

    pub async fn mark_source_updated(&self, name: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sources SET last_updated = ? WHERE name = ?")
            .bind(at.timestamp())
            .bind(name)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Active rows of the `sources` table, by name.
    pub async fn list_sources(&self) -> Result<Vec<PersistedSource>> {
        let rows = sqlx::query(
            "SELECT name, url, category, tier, active, last_updated FROM sources WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        let mut sources = Vec::with_capacity(rows.len());
        for row in rows {
            sources.push(PersistedSource {
                name: row.try_get("name")?,
                url: row.try_get("url")?,
                category: row.try_get("category")?,
                tier: row.try_get("tier")?,
                active: row.try_get("active")?,
                last_updated: row.try_get::<Option<i64>, _>("last_updated")?.map(from_unix),
            });
        }
        Ok(sources)
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let category = row
        .try_get::<Option<String>, _>("category")?
        .and_then(|label| match Category::from_str(&label) {
            Ok(category) => Some(category),
            Err(_) => {
                warn!("Ignoring unknown stored category '{}'", label);
                None
            }
        });

    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        description: row.try_get("description")?,
        published_date: from_unix(row.try_get("published_date")?),
        source: row.try_get("source")?,
        category,
        content_hash: row.try_get("content_hash")?,
        created_at: from_unix(row.try_get("created_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_deterministic() {
        let a = article_id("Title", "https://a.example/1");
        assert_eq!(a, article_id("Title", "https://a.example/1"));
        assert_ne!(a, article_id("Title", "https://a.example/2"));
        assert_eq!(a.len(), 64);

        assert_eq!(content_hash("Title", None), content_hash("Title", Some("")));
        assert_ne!(content_hash("Title", None), content_hash("Title", Some("body")));
    }
}
