//! Pipeline state, the terminal outcome, and the flat response record.

use parlance_shared::{ParlanceError, Result};
use serde::{Deserialize, Serialize};

use crate::graph::Node;

/// Snapshot threaded through the graph. Steps never mutate a snapshot; each
/// returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Original user input. Never changes after entry.
    pub message: String,
    pub is_translate_msg: bool,
    /// Lower-case English name of the target language.
    pub language: Option<String>,
    /// Phrase to translate.
    pub extracted_msg: Option<String>,
    /// The translation, or the direct answer on the non-translation path.
    pub translation: Option<String>,
}

impl PipelineState {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// True when every field set in `prev` is still set, unchanged, here.
    pub fn carries_forward(&self, prev: &PipelineState) -> bool {
        fn kept(now: &Option<String>, before: &Option<String>) -> bool {
            before.is_none() || now == before
        }

        self.message == prev.message
            && (!prev.is_translate_msg || self.is_translate_msg)
            && kept(&self.language, &prev.language)
            && kept(&self.extracted_msg, &prev.extracted_msg)
            && kept(&self.translation, &prev.translation)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Translated {
        language: String,
        extracted_msg: String,
        translation: String,
    },
    Answered {
        answer: String,
    },
}

/// Terminal snapshot of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalState {
    pub message: String,
    pub outcome: Outcome,
    /// Nodes visited, in order.
    pub path: Vec<Node>,
}

impl FinalState {
    /// Convert the last pipeline snapshot into an outcome.
    ///
    /// Fails if the snapshot is a half-finished translation path, or an
    /// answer path that carries translation-only fields.
    pub fn from_terminal(state: PipelineState, path: Vec<Node>) -> Result<Self> {
        let PipelineState {
            message,
            is_translate_msg,
            language,
            extracted_msg,
            translation,
        } = state;

        let outcome = match (is_translate_msg, language, extracted_msg, translation) {
            (true, Some(language), Some(extracted_msg), Some(translation)) => {
                Outcome::Translated {
                    language,
                    extracted_msg,
                    translation,
                }
            }
            (false, None, None, Some(answer)) => Outcome::Answered { answer },
            (is_translate_msg, language, extracted_msg, translation) => {
                return Err(ParlanceError::Internal(format!(
                    "pipeline ended in an incomplete state after {path:?}: \
                     is_translate_msg={is_translate_msg} language={language:?} \
                     extracted_msg={extracted_msg:?} translation_set={}",
                    translation.is_some()
                )));
            }
        };

        Ok(Self {
            message,
            outcome,
            path,
        })
    }

    pub fn is_translate_msg(&self) -> bool {
        matches!(self.outcome, Outcome::Translated { .. })
    }

    /// The translation, or the direct answer.
    pub fn text(&self) -> &str {
        match &self.outcome {
            Outcome::Translated { translation, .. } => translation,
            Outcome::Answered { answer } => answer,
        }
    }
}

/// Flat response record handed to callers outside the crate.
///
/// Unset optional fields serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub message: String,
    pub is_translate_msg: bool,
    pub language: Option<String>,
    pub extracted_msg: Option<String>,
    pub translation: Option<String>,
}

impl From<FinalState> for TranslateResponse {
    fn from(state: FinalState) -> Self {
        match state.outcome {
            Outcome::Translated {
                language,
                extracted_msg,
                translation,
            } => Self {
                message: state.message,
                is_translate_msg: true,
                language: Some(language),
                extracted_msg: Some(extracted_msg),
                translation: Some(translation),
            },
            Outcome::Answered { answer } => Self {
                message: state.message,
                is_translate_msg: false,
                language: None,
                extracted_msg: None,
                translation: Some(answer),
            },
        }
    }
}
