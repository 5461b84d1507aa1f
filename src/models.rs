use chrono::NaiveDateTime;
use serde::Serialize;

/// A shortened link record from the `links` table.
///
/// Immutable once created: the core never updates or deletes rows, so every
/// field is write-once. `short_code` is the lookup key for all reads and
/// carries a UNIQUE constraint in the schema.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShortLink {
    pub id: i64,
    pub short_code: String,
    pub destination_url: String,
    pub created_at: NaiveDateTime,
}

/// A single click event from the `clicks` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Click {
    pub id: i64,
    pub link_id: i64,
    pub clicked_at: NaiveDateTime,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// A (label, count) aggregation row, e.g. clicks grouped by date or referer.
#[derive(Debug, Clone, Serialize)]
pub struct CountByLabel {
    pub label: String,
    pub count: i64,
}

/// Full analytics payload for one link, as returned by GET /analytics/:code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub short_code: String,
    pub destination_url: String,
    pub total_clicks: i64,
    pub unique_visitors: i64,
    pub recent_clicks: Vec<Click>,
    pub clicks_by_date: Vec<CountByLabel>,
    pub top_referrers: Vec<CountByLabel>,
}
