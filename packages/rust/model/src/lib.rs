//! Structured Model Caller for Parlance.
//!
//! Sends a rendered instruction to a language model and coerces the reply
//! into one of a few fixed single-field output shapes. Backends sit behind
//! the [`ChatBackend`] trait so the pipeline can run against Ollama, an
//! OpenAI-compatible service, or a deterministic [`ScriptedBackend`] in tests.

pub mod backend;
mod caller;
mod parse;
pub mod shape;

pub use backend::{ChatBackend, OllamaBackend, OpenAiBackend, RecordedCall, ScriptedBackend};
pub use caller::StructuredModel;
pub use parse::parse_reply;
pub use shape::{
    IsTranslateMsg, LanguageChosen, MsgToTranslate, OutputShape, StructuredOutput, Translation,
};
