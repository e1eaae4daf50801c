//! Database operations for the `post_links` table.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

/// Record an outbound link for a post if the `(post_id, url)` pair has not
/// been seen before.
///
/// Returns `true` when a new row was created; re-observing a known link is
/// a no-op rather than a duplicate row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_link_if_absent(
    pool: &SqlitePool,
    post_id: &str,
    url: &str,
    first_seen: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO post_links (post_id, url, first_seen) VALUES (?, ?, ?)",
    )
    .bind(post_id)
    .bind(url)
    .bind(first_seen)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
