//! Visual insight: trend and follow-recommendation extraction from
//! timeline screenshots via a vision-capable model.

mod pipeline;
mod screenshots;
mod types;

use thiserror::Error;

pub use pipeline::{run_visual_insight, VisionStats};
pub use screenshots::{find_latest_screenshot, timestamp_from_filename};

/// Errors that fail the visual-insight stage. The stage never deletes the
/// source screenshot on failure, so the same artifact is retried on the
/// next cycle.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("screenshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Model(#[from] birdwatch_model::ModelError),

    #[error(transparent)]
    Db(#[from] birdwatch_db::DbError),

    /// The model's content was not the demanded two-array JSON object.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
