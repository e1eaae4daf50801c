//! Normalization from raw timeline items to [`CapturedPost`] records.
//!
//! The snapshot comes from scraping live, frequently-changing third-party
//! markup, so extraction is maximally permissive: an item missing a
//! required field is dropped on its own and never aborts its siblings.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use birdwatch_db::MetricCounts;

use crate::parse::parse_metric_count;
use crate::types::{CapturedPost, RawTimelineItem};

const PLATFORM_URL: &str = "https://twitter.com";

/// Hosts that count as platform-internal; links to them never enter the
/// external-link set.
const PLATFORM_DOMAINS: [&str; 3] = ["twitter.com", "x.com", "t.co"];

/// Normalizes a snapshot's raw items into an ordered list of posts.
///
/// Items missing any of text/author/timestamp/permalink are skipped
/// individually. The timeline re-renders items while scrolling, so
/// duplicate post ids collapse to their first occurrence.
#[must_use]
pub fn extract_posts(items: Vec<RawTimelineItem>) -> Vec<CapturedPost> {
    let total = items.len();
    let mut seen: HashSet<String> = HashSet::new();
    let mut posts = Vec::new();
    let mut skipped = 0usize;

    for item in items {
        match extract_item(item) {
            Some(post) => {
                if seen.insert(post.post_id.clone()) {
                    posts.push(post);
                }
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(total, skipped, "dropped items missing required fields");
    }

    posts
}

fn extract_item(item: RawTimelineItem) -> Option<CapturedPost> {
    let text = item.text?;
    let author = item.author?;
    let timestamp = item.timestamp?;
    let permalink = item.permalink?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(timestamp.trim())
        .ok()?
        .with_timezone(&Utc);

    let url = canonical_url(&permalink);
    let post_id = post_id_from_url(&url)?;

    let metric = |raw: &Option<String>| parse_metric_count(raw.as_deref().unwrap_or(""));
    let metrics = MetricCounts {
        replies: metric(&item.metrics.replies),
        reposts: metric(&item.metrics.reposts),
        likes: metric(&item.metrics.likes),
        views: metric(&item.metrics.views),
        bookmarks: metric(&item.metrics.bookmarks),
    };

    let external_links = item
        .external_links
        .into_iter()
        .filter(|link| is_external_link(link))
        .collect();

    let author_handle = item
        .author_handle
        .map(|handle| handle.trim().to_string())
        .filter(|handle| !handle.is_empty());

    Some(CapturedPost {
        post_id,
        author,
        author_handle,
        created_at,
        text,
        url,
        media_links: item.media_links,
        is_original: !item.repost,
        metrics,
        external_links,
    })
}

/// Absolutizes a permalink against the platform origin.
fn canonical_url(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{PLATFORM_URL}{permalink}")
    }
}

/// Extracts the platform-assigned identifier: the path segment after the
/// last `/status/`.
fn post_id_from_url(url: &str) -> Option<String> {
    let start = url.rfind("/status/")? + "/status/".len();
    let tail = &url[start..];
    let id: &str = tail
        .split(['/', '?'])
        .next()
        .filter(|segment| !segment.is_empty())?;
    Some(id.to_string())
}

/// `true` for absolute http(s) links whose host is not a platform domain.
fn is_external_link(link: &str) -> bool {
    let rest = if let Some(rest) = link.strip_prefix("https://") {
        rest
    } else if let Some(rest) = link.strip_prefix("http://") {
        rest
    } else {
        return false;
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = host.split('@').next_back().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);

    !PLATFORM_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}
