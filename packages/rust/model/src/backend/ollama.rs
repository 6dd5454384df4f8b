//! Ollama native chat API (`POST /api/chat`).

use std::time::Duration;

use async_trait::async_trait;
use parlance_shared::{ParlanceError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{ChatBackend, WireMessage, build_client, check_status, endpoint, transport_error};
use crate::shape::OutputShape;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    /// JSON schema the reply must follow (Ollama structured outputs).
    format: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Backend talking to a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    url: Url,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: &Url, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: endpoint(base_url, "api/chat")?,
            model: model.into(),
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    #[instrument(skip_all, fields(model = %self.model, %shape))]
    async fn complete(&self, prompt: &str, shape: OutputShape) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![WireMessage::user(prompt)],
            stream: false,
            format: shape.json_schema(),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&self.url, e))?;

        let response = check_status(&self.url, response).await?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ParlanceError::unavailable(format!("{}: invalid chat response: {e}", self.url))
            } else {
                transport_error(&self.url, e)
            }
        })?;

        Ok(body.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
