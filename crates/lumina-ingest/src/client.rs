//! HTTP client for the hosted chat-completion gateway.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::segments::Segment;

/// Connection and sampling parameters for [`ModelClient::new`].
#[derive(Debug, Clone)]
pub struct ModelClientConfig {
    /// Gateway base URL without the `/chat/completions` path.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Completion token ceiling per call.
    pub max_tokens: u32,
    /// Low by default; structured extraction wants determinism.
    pub temperature: f64,
    /// Hard per-call deadline. Elapsing it maps to [`IngestError::Timeout`].
    pub call_timeout_secs: u64,
}

/// Client for a chat-completion endpoint speaking the OpenAI wire shape.
///
/// Constructed once at startup and shared across subject runs; each call
/// carries independent request/response state, so concurrent use is safe.
/// Construction fails loudly instead of deferring a bad TLS or proxy setup
/// to the first call.
pub struct ModelClient {
    client: Client,
    config: ModelClientConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ModelClient {
    /// Creates a `ModelClient` with the configured call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Transport`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(config: ModelClientConfig) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.call_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| IngestError::Transport {
                segment: Segment::Synthesis,
                source,
            })?;
        Ok(Self { client, config })
    }

    /// Sends one system+user instruction pair and returns the raw completion
    /// text. The response is expected to be a single structured-data literal
    /// with no surrounding prose, but that expectation is the repair
    /// parser's problem, not this layer's.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Timeout`] — the call deadline elapsed.
    /// - [`IngestError::Transport`] — network or TLS failure.
    /// - [`IngestError::ModelStatus`] — non-2xx from the gateway.
    /// - [`IngestError::EmptyCompletion`] — 2xx with no content.
    pub async fn complete(
        &self,
        segment: Segment,
        system: &str,
        user: &str,
    ) -> Result<String, IngestError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport(segment, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::ModelStatus {
                segment,
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport(segment, e))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty());

        content.ok_or(IngestError::EmptyCompletion { segment })
    }

    fn map_transport(&self, segment: Segment, error: reqwest::Error) -> IngestError {
        if error.is_timeout() {
            IngestError::Timeout {
                segment,
                secs: self.config.call_timeout_secs,
            }
        } else {
            IngestError::Transport {
                segment,
                source: error,
            }
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
