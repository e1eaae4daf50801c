//! Client for the external OpenAI-compatible model service, plus the
//! credential-file handling both analysis pipelines share.

mod client;
pub mod credentials;
mod types;

use thiserror::Error;

pub use client::ModelClient;
pub use types::{ContentPart, ImageUrl, MessageContent};

/// Errors returned by the model service client.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the API credential (HTTP 401).
    #[error("model service rejected the API credential")]
    InvalidKey,

    /// Any other non-2xx response.
    #[error("model service error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response envelope carried no message content.
    #[error("model response contained no content")]
    MissingContent,

    /// The response envelope could not be deserialized.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Credential file I/O failure.
    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),

    /// No usable key could be obtained, even after prompting.
    #[error("no usable API key was provided")]
    MissingKey,
}
