//! Chat backends that turn a rendered prompt into a raw reply string.

mod ollama;
mod openai;
mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parlance_shared::{ModelConfig, ParlanceError, Provider, Result, validate_api_key};
use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

use crate::shape::OutputShape;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use scripted::{RecordedCall, ScriptedBackend};

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("Parlance/", env!("CARGO_PKG_VERSION"));

/// Longest error body quoted back from a failed HTTP call.
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A language model that answers a single-turn prompt.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `prompt` and return the model's raw reply text.
    ///
    /// `shape` lets the backend constrain the reply format; the reply is
    /// parsed by the caller, not here.
    async fn complete(&self, prompt: &str, shape: OutputShape) -> Result<String>;

    /// Human-readable backend name for tracing.
    fn name(&self) -> &str;

    /// Model identifier used for every call.
    fn model(&self) -> &str;
}

/// Build the backend selected by `config.provider`.
pub fn from_config(config: &ModelConfig) -> Result<Arc<dyn ChatBackend>> {
    let base_url = config.parsed_base_url()?;
    let timeout = Duration::from_secs(config.timeout_secs);

    let backend: Arc<dyn ChatBackend> = match config.provider {
        Provider::Ollama => Arc::new(OllamaBackend::new(&base_url, &config.model, timeout)?),
        Provider::OpenAi => {
            let api_key = validate_api_key(config)?;
            Arc::new(OpenAiBackend::new(
                &base_url,
                &config.model,
                api_key,
                timeout,
            )?)
        }
    };

    tracing::debug!(
        backend = backend.name(),
        model = backend.model(),
        %base_url,
        "model backend configured"
    );
    Ok(backend)
}

// ---------------------------------------------------------------------------
// Shared wire types and helpers
// ---------------------------------------------------------------------------

/// One chat message on the wire (both protocols share this layout).
#[derive(Debug, Clone, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> WireMessage<'a> {
    fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ParlanceError::config(format!("failed to build HTTP client: {e}")))
}

/// Resolve `path` under `base`, keeping any path prefix `base` already has.
fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| ParlanceError::config(format!("invalid endpoint {base}{path}: {e}")))
}

/// Turn a non-success HTTP response into a `ModelUnavailable` error.
async fn check_status(url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(ParlanceError::unavailable(format!(
        "{url}: HTTP {status}: {}",
        body.trim()
    )))
}

/// Map a transport failure (connect, timeout, body read) to `ModelUnavailable`.
fn transport_error(url: &Url, e: reqwest::Error) -> ParlanceError {
    if e.is_timeout() {
        ParlanceError::unavailable(format!("{url}: request timed out"))
    } else {
        ParlanceError::unavailable(format!("{url}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_to_root() {
        let base = Url::parse("http://localhost:11434").unwrap();
        assert_eq!(
            endpoint(&base, "api/chat").unwrap().as_str(),
            "http://localhost:11434/api/chat"
        );
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let base = Url::parse("https://api.example.com/v1").unwrap();
        assert_eq!(
            endpoint(&base, "chat/completions").unwrap().as_str(),
            "https://api.example.com/v1/chat/completions"
        );

        let base = Url::parse("https://api.example.com/v1/").unwrap();
        assert_eq!(
            endpoint(&base, "chat/completions").unwrap().as_str(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn from_config_builds_ollama_by_default() {
        let backend = from_config(&ModelConfig::default()).unwrap();
        assert_eq!(backend.name(), "ollama");
        assert_eq!(backend.model(), "llama3.1");
    }

    #[test]
    fn from_config_rejects_bad_base_url() {
        let config = ModelConfig {
            base_url: "localhost".into(),
            ..ModelConfig::default()
        };
        assert!(from_config(&config).is_err());
    }

    #[test]
    fn from_config_requires_api_key_for_openai() {
        let config = ModelConfig {
            provider: Provider::OpenAi,
            api_key_env: "PARLANCE_TEST_MISSING_OPENAI_KEY".into(),
            ..ModelConfig::default()
        };
        let err = from_config(&config).err().expect("missing key must fail");
        assert!(err.to_string().contains("PARLANCE_TEST_MISSING_OPENAI_KEY"));
    }
}
