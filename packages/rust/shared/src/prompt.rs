//! Prompt templates with `{name}` placeholders.
//!
//! The built-in templates below drive the five pipeline steps. Each asks the
//! model for a single JSON field, whose name must match the output shape the
//! step requests.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{ParlanceError, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// An instruction template with named `{placeholder}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: Cow<'static, str>,
}

impl PromptTemplate {
    /// Wrap a static template string.
    pub const fn from_static(source: &'static str) -> Self {
        Self {
            source: Cow::Borrowed(source),
        }
    }

    /// Wrap an owned template string.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Cow::Owned(source.into()),
        }
    }

    /// Raw template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names, sorted.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        PLACEHOLDER
            .captures_iter(&self.source)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Substitute every placeholder from `vars`.
    ///
    /// Fails if any placeholder has no value. Extra variables are ignored.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        let missing: Vec<&str> = self
            .placeholders()
            .into_iter()
            .filter(|name| !vars.iter().any(|(k, _)| k == name))
            .collect();

        if !missing.is_empty() {
            return Err(ParlanceError::validation(format!(
                "prompt is missing variables: {}",
                missing.join(", ")
            )));
        }

        let rendered = PLACEHOLDER.replace_all(&self.source, |caps: &Captures<'_>| {
            let name = &caps[1];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }
}

// ---------------------------------------------------------------------------
// Built-in pipeline prompts
// ---------------------------------------------------------------------------

/// Classifies whether the message asks for a translation.
pub const DETECT_TRANSLATE_MSG: PromptTemplate = PromptTemplate::from_static(
    "You are a specialist in detecting what a person wants. Decide whether the user's \
input is a request to translate something.
Answer with a single boolean field `is_translate_msg`:
- `true` if the input is a translation request
- `false` otherwise

User input:
{message}
",
);

/// Extracts the target language as a lower-case English name.
pub const EXTRACT_LANGUAGE: PromptTemplate = PromptTemplate::from_static(
    "You are a specialist in detecting the language a user wants a translation into.
Answer with a single field `language`: the target language, as its lower-case \
English name, whatever language the request itself is written in.
Examples:
- \"Traduis-moi bonjour en japonais\" --> \"japanese\"
- \"Comment dit-on comment vas-tu en anglais ?\" --> \"english\"
- \"Quel est le mot portugais pour dire voiture\" --> \"portuguese\"

User input:
{message}
",
);

/// Extracts exactly the phrase to translate.
pub const EXTRACT_MSG: PromptTemplate = PromptTemplate::from_static(
    "Extract the text the user wants translated from their input. Leave out the \
language mention and any framing words.
Answer with a single field `extracted_msg`.
Examples:
- \"Traduis-moi bonjour en japonais\" --> \"bonjour\"
- \"Comment dit-on comment vas-tu en anglais ?\" --> \"comment vas-tu\"
- \"Quel est le mot portugais pour dire voiture\" --> \"voiture\"

User input:
{message}
",
);

/// Renders the extracted phrase in the target language.
pub const TRANSLATE: PromptTemplate = PromptTemplate::from_static(
    "Translate the user's message into the language they asked for.
Answer with a single field `translation`.

User input:
Message to translate: {extracted_msg}
Target language: {language}
",
);

/// Answers a non-translation message from general knowledge.
pub const RESPONSE_TO_USER: PromptTemplate = PromptTemplate::from_static(
    "Answer the user using your general knowledge.
Answer in the language the question is written in: a question in French gets an answer in French.
Answer with a single field `translation` holding your answer.
Question: {message}
",
);
