//! Enrichment pipeline orchestration.
//!
//! Works through unprocessed posts in bounded batches:
//!
//! 1. Fetch up to [`BATCH_SIZE`] unprocessed posts; none means the run is
//!    done.
//! 2. Send one analysis request covering the whole batch.
//! 3. Strict-parse the `{"analyses": [...]}` payload; a malformed or
//!    missing payload fails the entire batch and ends the run; the posts
//!    stay unprocessed and the next cycle retries them.
//! 4. Write back each complete analysis element addressed to the batch;
//!    partial or stray elements are skipped individually.
//! 5. Sleep briefly and repeat.
//!
//! A batch that yields no newly processed post ends the run: the store
//! would hand the same rows straight back, so looping in-process would
//! spin on a model that keeps under-answering.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;

use birdwatch_core::AppConfig;
use birdwatch_model::{credentials, MessageContent, ModelClient, ModelError};

use crate::prompt::{build_analysis_prompt, SENTIMENT_LABELS, SYSTEM_PROMPT};
use crate::types::AnalysisPayload;
use crate::EnrichError;

/// Posts per analysis request.
pub const BATCH_SIZE: i64 = 25;

const MAX_ANALYSIS_TOKENS: u32 = 2000;

/// Delay between batches, bounding the request rate against the service.
const INTER_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Outcome counts for one enrichment run.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichStats {
    pub batches: usize,
    pub processed: usize,
    /// Elements dropped for missing fields or failed writes.
    pub skipped_elements: usize,
    /// Elements whose id was not part of the requested batch.
    pub stray_ids: usize,
}

/// Runs enrichment until no unprocessed posts remain or a batch fails.
///
/// A batch-level failure (transport, non-2xx, unparsable payload) is
/// logged and ends the run cleanly rather than erroring; the next
/// scheduled cycle retries the affected posts. A rejected credential
/// triggers one re-prompt and a single retry of the same batch request.
///
/// # Errors
///
/// Returns [`EnrichError::Db`] when the store itself fails, or
/// [`EnrichError::Model`] when no usable credential can be obtained.
pub async fn run_enrichment(
    config: &AppConfig,
    pool: &SqlitePool,
) -> Result<EnrichStats, EnrichError> {
    let api_key = credentials::load_or_prompt(&config.api_key_file)?;
    let mut client = ModelClient::new(
        &config.model_url,
        &config.model_name,
        &api_key,
        config.model_timeout_secs,
    )?;

    let mut stats = EnrichStats::default();

    loop {
        let batch = birdwatch_db::next_unprocessed_batch(pool, BATCH_SIZE).await?;
        if batch.is_empty() {
            break;
        }

        tracing::info!(batch_size = batch.len(), "analyzing batch");
        let prompt = build_analysis_prompt(&batch);

        let content = match request_batch(config, &mut client, &prompt).await? {
            Some(content) => content,
            None => break,
        };

        let payload: AnalysisPayload = match serde_json::from_str(&content) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "unparsable analysis payload; posts retry next cycle");
                break;
            }
        };

        stats.batches += 1;
        let batch_ids: HashSet<&str> = batch.iter().map(|post| post.post_id.as_str()).collect();

        let processed_before = stats.processed;
        write_batch(pool, &batch_ids, payload, &mut stats).await;
        if stats.processed == processed_before {
            tracing::warn!("batch made no progress; remaining posts retry next cycle");
            break;
        }

        tokio::time::sleep(INTER_BATCH_DELAY).await;
    }

    tracing::info!(
        batches = stats.batches,
        processed = stats.processed,
        skipped_elements = stats.skipped_elements,
        stray_ids = stats.stray_ids,
        "enrichment run complete"
    );

    Ok(stats)
}

/// Sends one batch request. `Ok(None)` means the batch failed softly and
/// the run should end; a rejected credential is re-prompted once and the
/// request retried before giving up.
///
/// # Errors
///
/// Returns [`EnrichError::Model`] only when re-prompting yields no usable
/// key.
async fn request_batch(
    config: &AppConfig,
    client: &mut ModelClient,
    prompt: &str,
) -> Result<Option<String>, EnrichError> {
    match client
        .chat_json(
            SYSTEM_PROMPT,
            MessageContent::Text(prompt.to_string()),
            MAX_ANALYSIS_TOKENS,
        )
        .await
    {
        Ok(content) => Ok(Some(content)),
        Err(ModelError::InvalidKey) => {
            tracing::warn!("model service rejected the API key; prompting for a replacement");
            credentials::invalidate(&config.api_key_file);
            let fresh = credentials::prompt_and_store(&config.api_key_file)?;
            client.set_api_key(fresh);

            match client
                .chat_json(
                    SYSTEM_PROMPT,
                    MessageContent::Text(prompt.to_string()),
                    MAX_ANALYSIS_TOKENS,
                )
                .await
            {
                Ok(content) => Ok(Some(content)),
                Err(e) => {
                    tracing::error!(error = %e, "batch analysis failed after key replacement");
                    Ok(None)
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "batch analysis failed; posts retry next cycle");
            Ok(None)
        }
    }
}

/// Writes one parsed payload back to the store, element by element.
async fn write_batch(
    pool: &SqlitePool,
    batch_ids: &HashSet<&str>,
    payload: AnalysisPayload,
    stats: &mut EnrichStats,
) {
    let processed_at = Utc::now();

    for analysis in payload.analyses {
        let Some(complete) = analysis.into_complete() else {
            stats.skipped_elements += 1;
            tracing::warn!("skipping analysis element with missing fields");
            continue;
        };

        if !batch_ids.contains(complete.id.as_str()) {
            stats.stray_ids += 1;
            tracing::warn!(post_id = %complete.id, "analysis id was not in the requested batch");
            continue;
        }

        if !SENTIMENT_LABELS.contains(&complete.sentiment.as_str()) {
            tracing::debug!(
                post_id = %complete.id,
                sentiment = %complete.sentiment,
                "sentiment label outside the instructed vocabulary"
            );
        }

        match birdwatch_db::mark_processed(
            pool,
            &complete.id,
            processed_at,
            &complete.summary,
            &complete.sentiment,
            &complete.category,
        )
        .await
        {
            Ok(true) => stats.processed += 1,
            Ok(false) => {
                stats.skipped_elements += 1;
                tracing::warn!(post_id = %complete.id, "analysis referenced an unknown post id");
            }
            Err(e) => {
                stats.skipped_elements += 1;
                tracing::warn!(post_id = %complete.id, error = %e, "failed to write analysis");
            }
        }
    }
}
