//! Timeline capture: browser-automation client, item extraction, and the
//! capture stage driver.

mod browser;
mod extract;
mod parse;
mod run;
mod types;

use thiserror::Error;

pub use browser::BrowserClient;
pub use extract::extract_posts;
pub use parse::parse_metric_count;
pub use run::{run_capture, CaptureStats};
pub use types::{CapturedPost, RawMetrics, RawTimelineItem};

/// Errors surfaced by the capture stage.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The browser-automation service answered with a non-2xx status.
    #[error("browser service error (status {status}): {message}")]
    Browser { status: u16, message: String },

    /// The service response could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Db(#[from] birdwatch_db::DbError),

    /// Screenshot file or directory I/O failure.
    #[error("screenshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}
