//! Database operations for the `posts` table.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub post_id: String,
    pub author: String,
    pub author_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub url: String,
    pub media_links: Option<String>,
    pub is_original: bool,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub category: Option<String>,
}

/// Capture-time fields of a post. Enrichment fields start out NULL.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub post_id: String,
    pub author: String,
    pub author_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub url: String,
    /// JSON-encoded array of media URLs, if the post carried any.
    pub media_links: Option<String>,
    pub is_original: bool,
}

/// A recent post joined with its latest metric observation, for reporting.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecentPostRow {
    pub post_id: String,
    pub author: String,
    pub author_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub url: String,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub category: Option<String>,
    pub replies: Option<i64>,
    pub reposts: Option<i64>,
    pub likes: Option<i64>,
    pub views: Option<i64>,
    pub bookmarks: Option<i64>,
}

/// Processed-vs-total post counts.
#[derive(Debug, Clone, Copy)]
pub struct PostCounts {
    pub total: i64,
    pub processed: i64,
}

/// One sentiment label with the number of processed posts carrying it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SentimentCount {
    pub sentiment: String,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a post if no row with its `post_id` exists yet.
///
/// Returns `true` when a new row was created. An existing row is left
/// untouched; re-observation must never overwrite the original capture.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_post_if_absent(pool: &SqlitePool, post: &NewPost) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO posts \
             (post_id, author, author_handle, created_at, text, url, media_links, is_original) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&post.post_id)
    .bind(&post.author)
    .bind(&post.author_handle)
    .bind(post.created_at)
    .bind(&post.text)
    .bind(&post.url)
    .bind(&post.media_links)
    .bind(post.is_original)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetch up to `limit` posts that have not been enriched yet, in storage
/// (`rowid`) order.
///
/// Rows marked processed are never returned, so callers looping over
/// batches always make progress.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn next_unprocessed_batch(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT post_id, author, author_handle, created_at, text, url, media_links, \
                is_original, processed, processed_at, summary, sentiment, category \
         FROM posts \
         WHERE processed = 0 \
         ORDER BY rowid \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Write the enrichment fields and flip the processed flag for one post,
/// in a single statement.
///
/// Returns `false` when `post_id` matched no row. The caller decides
/// whether that is worth a log line; it is never fatal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_processed(
    pool: &SqlitePool,
    post_id: &str,
    processed_at: DateTime<Utc>,
    summary: &str,
    sentiment: &str,
    category: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE posts \
         SET processed = 1, processed_at = ?, summary = ?, sentiment = ?, category = ? \
         WHERE post_id = ?",
    )
    .bind(processed_at)
    .bind(summary)
    .bind(sentiment)
    .bind(category)
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Total and processed post counts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a count query fails.
pub async fn post_counts(pool: &SqlitePool) -> Result<PostCounts, DbError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    let processed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE processed = 1")
        .fetch_one(pool)
        .await?;
    Ok(PostCounts { total, processed })
}

/// List the most recently created posts, each joined with its latest
/// metric observation (NULL metric columns when none exists yet).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recent_posts_with_metrics(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<RecentPostRow>, DbError> {
    let rows = sqlx::query_as::<_, RecentPostRow>(
        "SELECT p.post_id, p.author, p.author_handle, p.created_at, p.text, p.url, \
                p.summary, p.sentiment, p.category, \
                m.replies, m.reposts, m.likes, m.views, m.bookmarks \
         FROM posts p \
         LEFT JOIN post_metrics m ON m.id = ( \
             SELECT id FROM post_metrics \
             WHERE post_id = p.post_id \
             ORDER BY observed_at DESC, id DESC \
             LIMIT 1) \
         ORDER BY p.created_at DESC \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count processed posts per sentiment label, most common first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sentiment_breakdown(pool: &SqlitePool) -> Result<Vec<SentimentCount>, DbError> {
    let rows = sqlx::query_as::<_, SentimentCount>(
        "SELECT sentiment, COUNT(*) AS count \
         FROM posts \
         WHERE processed = 1 AND sentiment IS NOT NULL \
         GROUP BY sentiment \
         ORDER BY count DESC, sentiment",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
