//! Shared error model, configuration, and prompt templates for Parlance.
//!
//! This crate is the foundation depended on by all other Parlance crates.
//! It provides:
//! - [`ParlanceError`]: the unified error type
//! - Configuration ([`AppConfig`], [`ModelConfig`], config loading)
//! - [`PromptTemplate`] and the built-in pipeline prompts

pub mod config;
pub mod error;
pub mod prompt;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ModelConfig, Provider, ServerConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_api_key,
};
pub use error::{ParlanceError, Result};
pub use prompt::PromptTemplate;
