//! Error types for Parlance.
//!
//! Library crates use [`ParlanceError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics; the HTTP
//! server maps each kind onto a status code.

use std::path::PathBuf;

/// Top-level error type for all Parlance operations.
#[derive(Debug, thiserror::Error)]
pub enum ParlanceError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The model backend could not be reached, timed out, or refused the request.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model replied, but the reply does not fit the requested output shape.
    #[error("model output does not fit {shape}: {message}")]
    ModelOutputParse { shape: String, message: String },

    /// The caller passed an empty or blank message.
    #[error("empty input: no text provided")]
    EmptyInput,

    /// Data validation error (missing template variable, bad URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Broken pipeline invariant. Never caused by user input.
    #[error("internal error: {0}")]
    Internal(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ParlanceError>;

impl ParlanceError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a model-unavailable error from any displayable message.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create an output-parse error for the named shape.
    pub fn output_parse(shape: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ModelOutputParse {
            shape: shape.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the failure came from reaching the backend, not from its reply.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_))
    }

    /// True when the backend answered with something that could not be parsed.
    pub fn is_output_parse(&self) -> bool {
        matches!(self, Self::ModelOutputParse { .. })
    }
}
