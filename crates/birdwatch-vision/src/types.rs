//! Vision response validation and normalization.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use birdwatch_db::{NewRecommendation, NewTrend};

/// The strict top-level shape demanded from the vision model. Both arrays
/// are required; a payload missing either fails deserialization and the
/// stage with it.
#[derive(Debug, Deserialize)]
pub(crate) struct VisionPayload {
    pub trends: Vec<RawTrend>,
    pub recommendations: Vec<RawRecommendation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrend {
    pub topic: Option<String>,
    pub category: Option<String>,
    /// The model sometimes returns a number, sometimes a string, sometimes
    /// prose; only integers and pure digit strings survive.
    pub tweet_volume: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRecommendation {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

impl RawTrend {
    /// Normalizes one trend element; `None` drops it individually.
    pub(crate) fn normalize(
        self,
        observed_at: DateTime<Utc>,
        screenshot_ref: &str,
    ) -> Option<NewTrend> {
        let topic = self.topic.map(|t| t.trim().to_string())?;
        if topic.is_empty() {
            return None;
        }

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Some(NewTrend {
            topic,
            category,
            tweet_volume: self.tweet_volume.as_ref().and_then(coerce_volume),
            observed_at,
            screenshot_ref: screenshot_ref.to_string(),
        })
    }
}

impl RawRecommendation {
    /// Normalizes one recommendation element; dropped only when both the
    /// handle and the display name are missing.
    pub(crate) fn normalize(
        self,
        observed_at: DateTime<Utc>,
        screenshot_ref: &str,
    ) -> Option<NewRecommendation> {
        let username = self
            .username
            .map(|u| u.trim().trim_start_matches('@').to_string())
            .unwrap_or_default();
        let display_name = self
            .display_name
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        if username.is_empty() && display_name.is_empty() {
            return None;
        }

        Some(NewRecommendation {
            username,
            display_name,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            observed_at,
            screenshot_ref: screenshot_ref.to_string(),
        })
    }
}

/// Coerces a reported tweet volume to an integer: accepts JSON integers
/// and pure digit strings, rejects everything else as "not shown".
fn coerce_volume(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}
