//! Visual-insight pipeline orchestration.
//!
//! Takes the most recent timeline screenshot, crops it to the panel
//! region, sends it to the vision model, validates the returned structure,
//! persists the trend/recommendation rows, and deletes the consumed
//! artifact. Any failure leaves the source screenshot in place so the same
//! artifact is retried on the next cycle.

use base64::Engine as _;
use chrono::Utc;
use sqlx::SqlitePool;

use birdwatch_core::AppConfig;
use birdwatch_model::{credentials, ContentPart, MessageContent, ModelClient, ModelError};

use crate::screenshots::{crop_screenshot, find_latest_screenshot, timestamp_from_filename};
use crate::types::VisionPayload;
use crate::VisionError;

const MAX_VISION_TOKENS: u32 = 1000;

const SYSTEM_PROMPT: &str = "You are a JSON-only response bot. You must only return valid JSON \
     without any additional text, markdown, or formatting.";

const VISION_PROMPT: &str = r#"Analyze this timeline screenshot and extract two types of information:
1. Trending topics from the "Trends for you" section on the right
2. "Who to follow" recommendations on the right

Return ONLY the following JSON structure without any additional text or explanation:
{
    "trends": [
        {
            "topic": "topic name",
            "category": "category if shown (e.g., Trending in Tech)",
            "tweet_volume": number of posts (null if not shown)
        }
    ],
    "recommendations": [
        {
            "username": "@handle",
            "display_name": "Display Name",
            "description": "brief description shown"
        }
    ]
}"#;

/// Outcome counts for one visual-insight run.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisionStats {
    pub trends: usize,
    pub recommendations: usize,
    /// Elements dropped during normalization.
    pub dropped_elements: usize,
}

/// Runs the visual-insight stage once.
///
/// No matching screenshot is a no-op success. A rejected credential
/// triggers one re-prompt and a single retry of the same request.
///
/// # Errors
///
/// Returns [`VisionError`] on transport, decoding, validation, or storage
/// failure; in every such case the source screenshot survives for the
/// next cycle.
pub async fn run_visual_insight(
    config: &AppConfig,
    pool: &SqlitePool,
) -> Result<VisionStats, VisionError> {
    let Some(source) = find_latest_screenshot(&config.screenshots_dir)? else {
        tracing::info!("no screenshots to process");
        return Ok(VisionStats::default());
    };
    tracing::info!(path = %source.display(), "processing screenshot");

    let file_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let observed_at = timestamp_from_filename(&file_name).unwrap_or_else(|| {
        tracing::warn!(file = %file_name, "filename carries no timestamp; using current time");
        Utc::now()
    });

    let processed_dir = config.screenshots_dir.join("processed");
    std::fs::create_dir_all(&processed_dir)?;
    let cropped = crop_screenshot(&source, &processed_dir)?;
    let screenshot_ref = cropped
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("processed.png")
        .to_string();

    let encoded = base64::engine::general_purpose::STANDARD.encode(std::fs::read(&cropped)?);
    let data_url = format!("data:image/png;base64,{encoded}");

    let api_key = credentials::load_or_prompt(&config.api_key_file)?;
    let mut client = ModelClient::new(
        &config.model_url,
        &config.model_name,
        &api_key,
        config.model_timeout_secs,
    )?;

    let user = || {
        MessageContent::Parts(vec![
            ContentPart::text(VISION_PROMPT),
            ContentPart::image_url(data_url.clone()),
        ])
    };

    let content = match client.chat_json(SYSTEM_PROMPT, user(), MAX_VISION_TOKENS).await {
        Ok(content) => content,
        Err(ModelError::InvalidKey) => {
            tracing::warn!("model service rejected the API key; prompting for a replacement");
            credentials::invalidate(&config.api_key_file);
            let fresh = credentials::prompt_and_store(&config.api_key_file)?;
            client.set_api_key(fresh);
            client.chat_json(SYSTEM_PROMPT, user(), MAX_VISION_TOKENS).await?
        }
        Err(e) => return Err(e.into()),
    };

    let payload: VisionPayload =
        serde_json::from_str(&content).map_err(|e| VisionError::Deserialize {
            context: "vision payload".to_string(),
            source: e,
        })?;

    let raw_total = payload.trends.len() + payload.recommendations.len();
    let trends: Vec<_> = payload
        .trends
        .into_iter()
        .filter_map(|trend| trend.normalize(observed_at, &screenshot_ref))
        .collect();
    let recommendations: Vec<_> = payload
        .recommendations
        .into_iter()
        .filter_map(|rec| rec.normalize(observed_at, &screenshot_ref))
        .collect();

    let stats = VisionStats {
        trends: trends.len(),
        recommendations: recommendations.len(),
        dropped_elements: raw_total - trends.len() - recommendations.len(),
    };

    birdwatch_db::insert_visual_snapshot(pool, &trends, &recommendations).await?;

    // Consume the source only once its data is safely persisted; the
    // cropped derivative is retained.
    match std::fs::remove_file(&source) {
        Ok(()) => tracing::info!(path = %source.display(), "deleted source screenshot"),
        Err(e) => {
            tracing::warn!(path = %source.display(), error = %e, "failed to delete source screenshot");
        }
    }

    tracing::info!(
        trends = stats.trends,
        recommendations = stats.recommendations,
        dropped_elements = stats.dropped_elements,
        "visual insight run complete"
    );

    Ok(stats)
}
