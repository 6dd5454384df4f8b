//! Application configuration for Parlance.
//!
//! User config lives at `~/.parlance/parlance.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ParlanceError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "parlance.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".parlance";

// ---------------------------------------------------------------------------
// Config structs (matching parlance.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which wire protocol the model backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Ollama native chat API (`/api/chat`).
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions (`/chat/completions`).
    #[serde(rename = "openai")]
    OpenAi,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => f.write_str("ollama"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend protocol.
    #[serde(default)]
    pub provider: Provider,

    /// Base URL of the backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fixed model identifier used for every step.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout enforced by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the env var holding the API key (never store the key itself).
    /// Only read for the `openai` provider.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl ModelConfig {
    /// Parse `base_url`, rejecting anything that is not an absolute http(s) URL.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ParlanceError::config(format!("invalid model base_url {:?}: {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ParlanceError::config(format!(
                "model base_url must be http or https, got {other}"
            ))),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3.1".into()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5001
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.parlance/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ParlanceError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.parlance/parlance.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ParlanceError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ParlanceError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ParlanceError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ParlanceError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ParlanceError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env var is set and non-empty when the provider needs one.
///
/// Returns the key for the `openai` provider and `None` for `ollama`.
pub fn validate_api_key(config: &ModelConfig) -> Result<Option<String>> {
    if config.provider == Provider::Ollama {
        return Ok(None);
    }

    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => Err(ParlanceError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
