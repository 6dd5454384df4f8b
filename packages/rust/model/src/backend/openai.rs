//! OpenAI-compatible chat completions (`POST /chat/completions`).

use std::time::Duration;

use async_trait::async_trait;
use parlance_shared::{ParlanceError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;

use super::{ChatBackend, WireMessage, build_client, check_status, endpoint, transport_error};
use crate::shape::OutputShape;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Backend for any service exposing the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    url: Url,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(
        base_url: &Url,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: endpoint(base_url, "chat/completions")?,
            model: model.into(),
            api_key,
        })
    }
}

fn response_format(shape: OutputShape) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": shape.as_str(),
            "strict": true,
            "schema": shape.json_schema(),
        },
    })
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    #[instrument(skip_all, fields(model = %self.model, %shape))]
    async fn complete(&self, prompt: &str, shape: OutputShape) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![WireMessage::user(prompt)],
            response_format: response_format(shape),
        };

        let mut builder = self.client.post(self.url.clone()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
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

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ParlanceError::output_parse(shape.as_str(), "reply has no content"))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer, api_key: Option<&str>) -> OpenAiBackend {
        let base = Url::parse(&format!("{}/v1", server.uri())).unwrap();
        OpenAiBackend::new(
            &base,
            "gpt-4o-mini",
            api_key.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_json_schema_with_bearer_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": {
                    "type": "json_schema",
                    "json_schema": { "name": "LanguageName", "strict": true },
                },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "{\"language\":\"japanese\"}" },
                    "finish_reason": "stop",
                }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend_for(&server, Some("sk-test"))
            .complete("Traduis bonjour en japonais", OutputShape::LanguageName)
            .await
            .unwrap();
        assert_eq!(reply, r#"{"language":"japanese"}"#);
    }

    #[tokio::test]
    async fn missing_content_is_output_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": null } }],
            })))
            .mount(&server)
            .await;

        let err = backend_for(&server, None)
            .complete("hi", OutputShape::TranslationText)
            .await
            .unwrap_err();
        assert!(err.is_output_parse());
    }

    #[tokio::test]
    async fn unauthorized_is_model_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = backend_for(&server, Some("sk-wrong"))
            .complete("hi", OutputShape::TranslationText)
            .await
            .unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let base = Url::parse("https://api.example.com/v1").unwrap();
        let backend = OpenAiBackend::new(
            &base,
            "m",
            Some("sk-secret".into()),
            Duration::from_secs(1),
        )
        .unwrap();
        let debug = format!("{backend:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
