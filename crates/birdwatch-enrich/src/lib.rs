//! Post enrichment: batched analysis of unprocessed posts through the
//! model service.

mod pipeline;
mod prompt;
mod types;

use thiserror::Error;

pub use pipeline::{run_enrichment, EnrichStats, BATCH_SIZE};
pub use prompt::SENTIMENT_LABELS;

/// Errors that end an enrichment run. Batch-level model failures are not
/// errors; they end the run cleanly and the affected posts are retried on
/// the next cycle.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The store itself is unusable.
    #[error(transparent)]
    Db(#[from] birdwatch_db::DbError),

    /// No usable credential or client at startup.
    #[error(transparent)]
    Model(#[from] birdwatch_model::ModelError),
}
