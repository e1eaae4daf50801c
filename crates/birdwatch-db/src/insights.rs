//! Database operations for the `trends` and `follow_recommendations`
//! tables.
//!
//! Both families are append-only snapshots: the screenshot analyzer treats
//! what the page showed at a point in time as the record, not an entity
//! with continuity, so there is no dedup key.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

/// A trend extracted from one timeline screenshot.
#[derive(Debug, Clone)]
pub struct NewTrend {
    pub topic: String,
    pub category: Option<String>,
    pub tweet_volume: Option<i64>,
    pub observed_at: DateTime<Utc>,
    pub screenshot_ref: String,
}

/// A row from the `trends` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendRow {
    pub id: i64,
    pub topic: String,
    pub category: Option<String>,
    pub tweet_volume: Option<i64>,
    pub observed_at: DateTime<Utc>,
    pub screenshot_ref: String,
}

/// A follow recommendation extracted from one timeline screenshot.
#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub username: String,
    pub display_name: String,
    pub description: String,
    pub observed_at: DateTime<Utc>,
    pub screenshot_ref: String,
}

/// A row from the `follow_recommendations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecommendationRow {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub description: String,
    pub observed_at: DateTime<Utc>,
    pub screenshot_ref: String,
}

/// Insert a trend row and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_trend(pool: &SqlitePool, trend: &NewTrend) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO trends (topic, category, tweet_volume, observed_at, screenshot_ref) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(&trend.topic)
    .bind(&trend.category)
    .bind(trend.tweet_volume)
    .bind(trend.observed_at)
    .bind(&trend.screenshot_ref)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Insert a follow-recommendation row and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_recommendation(
    pool: &SqlitePool,
    rec: &NewRecommendation,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO follow_recommendations \
             (username, display_name, description, observed_at, screenshot_ref) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(&rec.username)
    .bind(&rec.display_name)
    .bind(&rec.description)
    .bind(rec.observed_at)
    .bind(&rec.screenshot_ref)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Persist one screenshot's worth of trends and recommendations in a
/// single transaction, so a crash mid-write never leaves half a snapshot
/// behind.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert or the commit fails; nothing is
/// written in that case.
pub async fn insert_visual_snapshot(
    pool: &SqlitePool,
    trends: &[NewTrend],
    recommendations: &[NewRecommendation],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for trend in trends {
        sqlx::query(
            "INSERT INTO trends (topic, category, tweet_volume, observed_at, screenshot_ref) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&trend.topic)
        .bind(&trend.category)
        .bind(trend.tweet_volume)
        .bind(trend.observed_at)
        .bind(&trend.screenshot_ref)
        .execute(&mut *tx)
        .await?;
    }

    for rec in recommendations {
        sqlx::query(
            "INSERT INTO follow_recommendations \
                 (username, display_name, description, observed_at, screenshot_ref) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&rec.username)
        .bind(&rec.display_name)
        .bind(&rec.description)
        .bind(rec.observed_at)
        .bind(&rec.screenshot_ref)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// List the most recently observed trends.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_trends(pool: &SqlitePool, limit: i64) -> Result<Vec<TrendRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendRow>(
        "SELECT id, topic, category, tweet_volume, observed_at, screenshot_ref \
         FROM trends \
         ORDER BY observed_at DESC, id DESC \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// List the most recently observed follow recommendations.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_recommendations(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<RecommendationRow>, DbError> {
    let rows = sqlx::query_as::<_, RecommendationRow>(
        "SELECT id, username, display_name, description, observed_at, screenshot_ref \
         FROM follow_recommendations \
         ORDER BY observed_at DESC, id DESC \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
