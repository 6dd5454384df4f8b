//! Translation-or-answer routing pipeline for Parlance.
//!
//! A message enters at intent detection and follows exactly one of two
//! paths through a small fixed graph: language extraction, phrase
//! extraction and translation, or a direct general-knowledge answer. Each
//! step is one structured model call that returns a fresh [`PipelineState`].

pub mod graph;
pub mod pipeline;
pub mod state;
pub mod steps;

pub use graph::{ENTRY, Node, Transition};
pub use pipeline::{Pipeline, SilentObserver, StepObserver};
pub use state::{FinalState, Outcome, PipelineState, TranslateResponse};
