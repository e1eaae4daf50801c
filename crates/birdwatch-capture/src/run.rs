//! Capture stage driver: screenshot the timeline, collect and normalize
//! items, persist posts with their metric observations and outbound links.

use chrono::Utc;
use sqlx::SqlitePool;

use birdwatch_core::AppConfig;
use birdwatch_db::NewPost;

use crate::browser::BrowserClient;
use crate::extract::extract_posts;
use crate::CaptureError;

/// Row-level outcome counts for one capture run.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptureStats {
    pub total: usize,
    pub new_posts: usize,
    pub known_posts: usize,
    pub metric_rows: usize,
    pub new_links: usize,
    pub known_links: usize,
    pub row_errors: usize,
}

/// Runs one capture pass against the configured timeline.
///
/// The screenshot is taken first, while the timeline is fresh; a screenshot
/// failure is logged and only costs the visual stage its next input. Item
/// collection failure aborts the run. Persistence is per-row: a storage
/// error on one post/link is counted and its siblings proceed.
///
/// # Errors
///
/// Returns [`CaptureError`] when the browser service cannot deliver the
/// item list at all.
pub async fn run_capture(
    config: &AppConfig,
    pool: &SqlitePool,
) -> Result<CaptureStats, CaptureError> {
    let browser = BrowserClient::new(
        &config.browser_url,
        config.browser_token.as_deref(),
        config.browser_timeout_secs,
    )?;

    std::fs::create_dir_all(&config.screenshots_dir)?;

    match browser.screenshot(&config.timeline_url).await {
        Ok(bytes) => {
            let filename = format!("timeline_{}.png", Utc::now().format("%Y%m%d_%H%M%S"));
            let path = config.screenshots_dir.join(&filename);
            match tokio::fs::write(&path, &bytes).await {
                Ok(()) => tracing::info!(path = %path.display(), "screenshot saved"),
                Err(e) => tracing::warn!(error = %e, "failed to write screenshot"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "screenshot capture failed; continuing with item capture");
        }
    }

    let items = browser
        .collect_timeline(&config.timeline_url, config.capture_target)
        .await?;
    let posts = extract_posts(items);

    let mut stats = CaptureStats {
        total: posts.len(),
        ..CaptureStats::default()
    };
    let observed_at = Utc::now();

    for post in &posts {
        let media_links = if post.media_links.is_empty() {
            None
        } else {
            serde_json::to_string(&post.media_links).ok()
        };
        let new_post = NewPost {
            post_id: post.post_id.clone(),
            author: post.author.clone(),
            author_handle: post.author_handle.clone(),
            created_at: post.created_at,
            text: post.text.clone(),
            url: post.url.clone(),
            media_links,
            is_original: post.is_original,
        };

        match birdwatch_db::insert_post_if_absent(pool, &new_post).await {
            Ok(true) => {
                stats.new_posts += 1;
                tracing::info!(post_id = %post.post_id, author = %post.author, "new post saved");
            }
            Ok(false) => {
                stats.known_posts += 1;
                tracing::debug!(post_id = %post.post_id, "post already known");
            }
            Err(e) => {
                stats.row_errors += 1;
                tracing::warn!(post_id = %post.post_id, error = %e, "failed to save post");
                continue;
            }
        }

        // Metrics append on every observation, known post or not.
        match birdwatch_db::insert_metric_observation(pool, &post.post_id, observed_at, &post.metrics)
            .await
        {
            Ok(()) => stats.metric_rows += 1,
            Err(e) => {
                stats.row_errors += 1;
                tracing::warn!(post_id = %post.post_id, error = %e, "failed to save metrics");
            }
        }

        for link in &post.external_links {
            match birdwatch_db::insert_link_if_absent(pool, &post.post_id, link, observed_at).await
            {
                Ok(true) => stats.new_links += 1,
                Ok(false) => stats.known_links += 1,
                Err(e) => {
                    stats.row_errors += 1;
                    tracing::warn!(post_id = %post.post_id, url = %link, error = %e, "failed to save link");
                }
            }
        }
    }

    tracing::info!(
        total = stats.total,
        new_posts = stats.new_posts,
        known_posts = stats.known_posts,
        metric_rows = stats.metric_rows,
        new_links = stats.new_links,
        known_links = stats.known_links,
        row_errors = stats.row_errors,
        "capture run complete"
    );

    Ok(stats)
}
