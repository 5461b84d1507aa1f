use crate::{
    models::{AnalyticsSummary, Click, CountByLabel, ShortLink},
    store::{LinkStore, StoreError},
};
use async_trait::async_trait;
use sqlx::SqlitePool;

// ── Links ──────────────────────────────────────────────────────────────────

/// SQLite-backed [`LinkStore`]. Cloning is cheap (the pool is an Arc inside).
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn insert(
        &self,
        short_code: &str,
        destination_url: &str,
    ) -> Result<ShortLink, StoreError> {
        let result = sqlx::query("INSERT INTO links (short_code, destination_url) VALUES (?1, ?2)")
            .bind(short_code)
            .bind(destination_url)
            .execute(&self.pool)
            .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) => return Err(classify_insert_error(e)),
        };

        let link: ShortLink = sqlx::query_as(
            "SELECT id, short_code, destination_url, created_at FROM links WHERE id = ?1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(link)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortLink>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, short_code, destination_url, created_at FROM links WHERE short_code = ?1",
        )
        .bind(short_code)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Map a failed INSERT to the store error taxonomy. `short_code` carries the
/// only UNIQUE constraint on the table, so any uniqueness violation here is a
/// code collision.
fn classify_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(e)
}

// ── Clicks ─────────────────────────────────────────────────────────────────

/// Record a click event. Designed to be called from a spawned background task
/// so that the HTTP redirect is never blocked by the analytics write.
pub async fn log_click(
    pool: &SqlitePool,
    link_id: i64,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    referer: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO clicks (link_id, ip_address, user_agent, referer) VALUES (?1, ?2, ?3, ?4)")
        .bind(link_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(referer)
        .execute(pool)
        .await?;

    Ok(())
}

/// Fetch full analytics for one link: aggregate counts, the 10 most-recent
/// clicks, a per-day timeline, and the top referrers.
pub async fn get_analytics(
    pool: &SqlitePool,
    link: &ShortLink,
) -> Result<AnalyticsSummary, sqlx::Error> {
    let total_clicks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE link_id = ?1")
        .bind(link.id)
        .fetch_one(pool)
        .await?;

    let unique_visitors: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT ip_address) FROM clicks
         WHERE link_id = ?1 AND ip_address IS NOT NULL",
    )
    .bind(link.id)
    .fetch_one(pool)
    .await?;

    let recent_clicks: Vec<Click> = sqlx::query_as(
        "SELECT id, link_id, clicked_at, ip_address, user_agent, referer
         FROM clicks
         WHERE link_id = ?1
         ORDER BY clicked_at DESC
         LIMIT 10",
    )
    .bind(link.id)
    .fetch_all(pool)
    .await?;

    let clicks_by_date: Vec<(String, i64)> = sqlx::query_as(
        "SELECT DATE(clicked_at) as day, COUNT(*) as n
         FROM clicks
         WHERE link_id = ?1
         GROUP BY day
         ORDER BY day",
    )
    .bind(link.id)
    .fetch_all(pool)
    .await?;

    let top_referrers: Vec<(String, i64)> = sqlx::query_as(
        "SELECT referer, COUNT(*) as n
         FROM clicks
         WHERE link_id = ?1 AND referer IS NOT NULL
         GROUP BY referer
         ORDER BY n DESC
         LIMIT 10",
    )
    .bind(link.id)
    .fetch_all(pool)
    .await?;

    Ok(AnalyticsSummary {
        short_code: link.short_code.clone(),
        destination_url: link.destination_url.clone(),
        total_clicks,
        unique_visitors,
        recent_clicks,
        clicks_by_date: into_labeled(clicks_by_date),
        top_referrers: into_labeled(top_referrers),
    })
}

fn into_labeled(rows: Vec<(String, i64)>) -> Vec<CountByLabel> {
    rows.into_iter()
        .map(|(label, count)| CountByLabel { label, count })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────
