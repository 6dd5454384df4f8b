//! The five step functions. Each makes one structured model call and maps
//! its result onto a new [`PipelineState`].

use parlance_model::{IsTranslateMsg, LanguageChosen, MsgToTranslate, StructuredModel, Translation};
use parlance_shared::prompt::{
    DETECT_TRANSLATE_MSG, EXTRACT_LANGUAGE, EXTRACT_MSG, RESPONSE_TO_USER, TRANSLATE,
};
use parlance_shared::{ParlanceError, Result};
use tracing::{debug, instrument};

use crate::graph::Node;
use crate::state::PipelineState;

/// Run the step behind `node`.
pub async fn run_step(
    node: Node,
    model: &StructuredModel,
    state: &PipelineState,
) -> Result<PipelineState> {
    match node {
        Node::DetectTranslateMsg => detect_translate_msg(model, state).await,
        Node::ExtractLanguage => extract_language(model, state).await,
        Node::ExtractMsg => extract_msg(model, state).await,
        Node::Translate => translate(model, state).await,
        Node::ResponseToUser => response_to_user(model, state).await,
    }
}

/// Classify the message. Resets every downstream field.
#[instrument(skip_all)]
pub async fn detect_translate_msg(
    model: &StructuredModel,
    state: &PipelineState,
) -> Result<PipelineState> {
    let result: IsTranslateMsg = model
        .call(&DETECT_TRANSLATE_MSG, &[("message", state.message.as_str())])
        .await?;

    debug!(is_translate_msg = result.is_translate_msg, "intent detected");

    Ok(PipelineState {
        message: state.message.clone(),
        is_translate_msg: result.is_translate_msg,
        ..PipelineState::default()
    })
}

/// Extract the target language, normalized to a lower-case name.
#[instrument(skip_all)]
pub async fn extract_language(
    model: &StructuredModel,
    state: &PipelineState,
) -> Result<PipelineState> {
    let result: LanguageChosen = model
        .call(&EXTRACT_LANGUAGE, &[("message", state.message.as_str())])
        .await?;

    let language = non_blank(result.language, "LanguageName")?.to_lowercase();
    debug!(%language, "language extracted");

    Ok(PipelineState {
        language: Some(language),
        ..state.clone()
    })
}

/// Extract the phrase to translate.
#[instrument(skip_all)]
pub async fn extract_msg(model: &StructuredModel, state: &PipelineState) -> Result<PipelineState> {
    let result: MsgToTranslate = model
        .call(&EXTRACT_MSG, &[("message", state.message.as_str())])
        .await?;

    let extracted_msg = non_blank(result.extracted_msg, "ExtractedPhrase")?;
    debug!(%extracted_msg, "phrase extracted");

    Ok(PipelineState {
        extracted_msg: Some(extracted_msg),
        ..state.clone()
    })
}

/// Translate the extracted phrase into the extracted language.
#[instrument(skip_all)]
pub async fn translate(model: &StructuredModel, state: &PipelineState) -> Result<PipelineState> {
    let (Some(extracted_msg), Some(language)) = (&state.extracted_msg, &state.language) else {
        return Err(ParlanceError::Internal(
            "translate reached without a language and a phrase".into(),
        ));
    };

    let result: Translation = model
        .call(
            &TRANSLATE,
            &[
                ("extracted_msg", extracted_msg.as_str()),
                ("language", language.as_str()),
            ],
        )
        .await?;

    let translation = non_blank(result.translation, "TranslationText")?;

    Ok(PipelineState {
        translation: Some(translation),
        ..state.clone()
    })
}

/// Answer the message directly. The answer lands in `translation`.
#[instrument(skip_all)]
pub async fn response_to_user(
    model: &StructuredModel,
    state: &PipelineState,
) -> Result<PipelineState> {
    let result: Translation = model
        .call(&RESPONSE_TO_USER, &[("message", state.message.as_str())])
        .await?;

    let answer = non_blank(result.translation, "TranslationText")?;

    Ok(PipelineState {
        message: state.message.clone(),
        is_translate_msg: false,
        translation: Some(answer),
        ..PipelineState::default()
    })
}

/// Trim `value`, rejecting it if nothing is left.
fn non_blank(value: String, shape: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParlanceError::output_parse(shape, "model returned an empty value"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parlance_model::{OutputShape, ScriptedBackend};

    use super::*;

    fn model(replies: &[&str]) -> (StructuredModel, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new());
        for reply in replies {
            backend.push_reply(*reply);
        }
        (StructuredModel::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn detect_resets_downstream_fields() {
        let (model, backend) = model(&[r#"{"is_translate_msg": false}"#]);
        let stale = PipelineState {
            is_translate_msg: true,
            language: Some("english".into()),
            extracted_msg: Some("x".into()),
            translation: Some("y".into()),
            ..PipelineState::new("Quelle heure est-il ?")
        };

        let next = detect_translate_msg(&model, &stale).await.unwrap();
        assert_eq!(next, PipelineState::new("Quelle heure est-il ?"));

        let calls = backend.calls();
        assert_eq!(calls[0].shape, OutputShape::BooleanFlag);
        assert!(calls[0].prompt.contains("Quelle heure est-il ?"));
    }

    #[tokio::test]
    async fn extract_language_normalizes_and_preserves() {
        let (model, backend) = model(&[r#"{"language": "  Japanese "}"#]);
        let state = PipelineState {
            is_translate_msg: true,
            ..PipelineState::new("Traduis bonjour en japonais")
        };

        let next = extract_language(&model, &state).await.unwrap();
        assert_eq!(next.language.as_deref(), Some("japanese"));
        assert!(next.is_translate_msg);
        assert!(next.carries_forward(&state));
        assert_eq!(backend.calls()[0].shape, OutputShape::LanguageName);
    }

    #[tokio::test]
    async fn extract_language_rejects_blank_value() {
        let (model, _) = model(&[r#"{"language": "   "}"#]);
        let state = PipelineState::new("Traduis bonjour");
        let err = extract_language(&model, &state).await.unwrap_err();
        assert!(err.is_output_parse());
    }

    #[tokio::test]
    async fn extract_msg_preserves_language() {
        let (model, backend) = model(&[r#"{"extracted_msg": "comment vas-tu"}"#]);
        let state = PipelineState {
            is_translate_msg: true,
            language: Some("english".into()),
            ..PipelineState::new("Comment dit-on comment vas-tu en anglais ?")
        };

        let next = extract_msg(&model, &state).await.unwrap();
        assert_eq!(next.extracted_msg.as_deref(), Some("comment vas-tu"));
        assert_eq!(next.language.as_deref(), Some("english"));
        assert!(next.carries_forward(&state));
        assert_eq!(backend.calls()[0].shape, OutputShape::ExtractedPhrase);
    }

    #[tokio::test]
    async fn extract_msg_rejects_empty_phrase() {
        let (model, _) = model(&[r#"{"extracted_msg": ""}"#]);
        let err = extract_msg(&model, &PipelineState::new("Traduis en anglais"))
            .await
            .unwrap_err();
        assert!(err.is_output_parse());
    }

    #[tokio::test]
    async fn translate_uses_phrase_and_language_only() {
        let (model, backend) = model(&[r#"{"translation": "carro"}"#]);
        let state = PipelineState {
            is_translate_msg: true,
            language: Some("portuguese".into()),
            extracted_msg: Some("voiture".into()),
            ..PipelineState::new("Quel est le mot portugais pour dire voiture")
        };

        let next = translate(&model, &state).await.unwrap();
        assert_eq!(next.translation.as_deref(), Some("carro"));
        assert!(next.carries_forward(&state));

        let prompt = &backend.calls()[0].prompt;
        assert!(prompt.contains("Message to translate: voiture"));
        assert!(prompt.contains("Target language: portuguese"));
        assert!(!prompt.contains("Quel est le mot"));
    }

    #[tokio::test]
    async fn translate_rejects_blank_translation() {
        let (model, _) = model(&[r#"{"translation": "  "}"#]);
        let state = PipelineState {
            is_translate_msg: true,
            language: Some("japanese".into()),
            extracted_msg: Some("bonjour".into()),
            ..PipelineState::new("Traduis bonjour en japonais")
        };

        let err = translate(&model, &state).await.unwrap_err();
        assert!(err.is_output_parse());
    }

    #[tokio::test]
    async fn translate_without_inputs_is_internal_error() {
        let (model, backend) = model(&[]);
        let err = translate(&model, &PipelineState::new("m")).await.unwrap_err();
        assert!(matches!(err, ParlanceError::Internal(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn response_to_user_forces_answer_shape() {
        let (model, backend) = model(&[r#"{"translation": "Paris est la capitale de la France."}"#]);
        let state = PipelineState::new("Quelle est la capitale de la France ?");

        let next = response_to_user(&model, &state).await.unwrap();
        assert!(!next.is_translate_msg);
        assert!(next.language.is_none());
        assert!(next.extracted_msg.is_none());
        assert_eq!(
            next.translation.as_deref(),
            Some("Paris est la capitale de la France.")
        );
        assert_eq!(next.message, state.message);
        assert_eq!(backend.calls()[0].shape, OutputShape::TranslationText);
    }

    #[tokio::test]
    async fn response_to_user_rejects_blank_answer() {
        let (model, _) = model(&[r#"{"translation": "\n  "}"#]);
        let err = response_to_user(&model, &PipelineState::new("Quelle heure est-il ?"))
            .await
            .unwrap_err();
        assert!(err.is_output_parse());
    }

    #[tokio::test]
    async fn run_step_dispatches_by_node() {
        let (model, backend) = model(&[r#"{"language": "german"}"#]);
        let next = run_step(Node::ExtractLanguage, &model, &PipelineState::new("m"))
            .await
            .unwrap();
        assert_eq!(next.language.as_deref(), Some("german"));
        assert_eq!(backend.calls()[0].shape, OutputShape::LanguageName);
    }
}
