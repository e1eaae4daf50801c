//! Database operations for the `post_metrics` time series.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

/// One engagement snapshot, as parsed out of a rendered timeline item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricCounts {
    pub replies: i64,
    pub reposts: i64,
    pub likes: i64,
    pub views: i64,
    pub bookmarks: i64,
}

/// A row from the `post_metrics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricRow {
    pub id: i64,
    pub post_id: String,
    pub observed_at: DateTime<Utc>,
    pub replies: i64,
    pub reposts: i64,
    pub likes: i64,
    pub views: i64,
    pub bookmarks: i64,
}

/// Append one metric observation for a post. Always inserts: every capture
/// of a post produces a new row, which is what makes engagement a time
/// series.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_metric_observation(
    pool: &SqlitePool,
    post_id: &str,
    observed_at: DateTime<Utc>,
    counts: &MetricCounts,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO post_metrics (post_id, observed_at, replies, reposts, likes, views, bookmarks) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(post_id)
    .bind(observed_at)
    .bind(counts.replies)
    .bind(counts.reposts)
    .bind(counts.likes)
    .bind(counts.views)
    .bind(counts.bookmarks)
    .execute(pool)
    .await?;

    Ok(())
}

/// List all metric observations for one post, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_metric_observations(
    pool: &SqlitePool,
    post_id: &str,
) -> Result<Vec<MetricRow>, DbError> {
    let rows = sqlx::query_as::<_, MetricRow>(
        "SELECT id, post_id, observed_at, replies, reposts, likes, views, bookmarks \
         FROM post_metrics \
         WHERE post_id = ? \
         ORDER BY observed_at, id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
