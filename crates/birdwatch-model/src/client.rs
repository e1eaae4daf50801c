//! HTTP client for the chat-completions endpoint.

use std::time::Duration;

use crate::types::{ChatRequest, ChatResponse, Message, MessageContent, ResponseFormat};
use crate::ModelError;

/// Client for an OpenAI-compatible chat-completions service.
///
/// Use [`ModelClient::new`] with the configured service URL; tests point
/// `base_url` at a mock server. Requests always demand a JSON object
/// response, since every caller strict-parses the content.
pub struct ModelClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ModelClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Replaces the credential after a re-prompt. The single controlled
    /// mutation point for the key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = api_key;
    }

    /// Sends one system+user exchange and returns the first choice's
    /// message content.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Http`] on network failure.
    /// - [`ModelError::InvalidKey`] when the service answers 401.
    /// - [`ModelError::Api`] on any other non-2xx status.
    /// - [`ModelError::Deserialize`] if the envelope does not match the
    ///   expected shape.
    /// - [`ModelError::MissingContent`] when the envelope has no content.
    pub async fn chat_json(
        &self,
        system: &str,
        user: MessageContent,
        max_tokens: u32,
    ) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: MessageContent::Text(system.to_string()),
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        tracing::debug!(model = %self.model, max_tokens, "model chat request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ModelError::InvalidKey);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response.text().await?;
        let envelope: ChatResponse =
            serde_json::from_str(&raw).map_err(|e| ModelError::Deserialize {
                context: "chat completion envelope".to_string(),
                source: e,
            })?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ModelError::MissingContent)
    }
}
