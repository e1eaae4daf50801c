//! Raw and canonical shapes for timeline extraction.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use birdwatch_db::MetricCounts;

/// One timeline item exactly as the browser collaborator saw it: every
/// field optional, metric counts still in their rendered string form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTimelineItem {
    pub text: Option<String>,
    pub author: Option<String>,
    pub author_handle: Option<String>,
    /// ISO 8601 value of the item's `<time datetime>` attribute.
    pub timestamp: Option<String>,
    /// Permalink href, usually relative (`/user/status/123`).
    pub permalink: Option<String>,
    /// Whether the item carried the platform's repost indicator.
    #[serde(default)]
    pub repost: bool,
    #[serde(default)]
    pub media_links: Vec<String>,
    /// Every absolute link found on the item; platform-internal ones are
    /// filtered out during extraction.
    #[serde(default)]
    pub external_links: Vec<String>,
    #[serde(default)]
    pub metrics: RawMetrics,
}

/// Rendered metric texts per engagement category. `None` when the counter
/// was not present on the item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetrics {
    pub replies: Option<String>,
    pub reposts: Option<String>,
    pub likes: Option<String>,
    pub views: Option<String>,
    pub bookmarks: Option<String>,
}

/// A fully normalized timeline post, carrying its engagement observation
/// inline. Not yet persisted.
#[derive(Debug, Clone)]
pub struct CapturedPost {
    pub post_id: String,
    pub author: String,
    pub author_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub url: String,
    pub media_links: Vec<String>,
    pub is_original: bool,
    pub metrics: MetricCounts,
    pub external_links: Vec<String>,
}
