//! Coercion of raw model replies into output shapes.

use parlance_shared::{ParlanceError, Result};
use serde_json::{Map, Value};

use crate::shape::{FieldKind, OutputShape, StructuredOutput};

/// Longest reply excerpt quoted in error messages.
const EXCERPT_CHARS: usize = 200;

/// Parse a raw reply into `T`.
///
/// Accepts a JSON object carrying the shape's field (extra fields ignored),
/// optionally wrapped in a Markdown code fence. A bare JSON scalar of the
/// right type is accepted too. For `BooleanFlag`, `true`/`false` text in any
/// case counts as a boolean, whether bare, quoted, or inside the object. Everything else fails with `ModelOutputParse`.
pub fn parse_reply<T: StructuredOutput>(raw: &str) -> Result<T> {
    let shape = T::SHAPE;
    let text = strip_code_fence(raw.trim());

    if text.is_empty() {
        return Err(ParlanceError::output_parse(shape.as_str(), "empty reply"));
    }

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(e) => match bare_word(shape, text) {
            Some(value) => value,
            None => {
                return Err(ParlanceError::output_parse(
                    shape.as_str(),
                    format!("reply is not JSON ({e}): {}", excerpt(text)),
                ));
            }
        },
    };

    let object = into_object(shape, value)?;
    serde_json::from_value(Value::Object(object)).map_err(|e| {
        ParlanceError::output_parse(
            shape.as_str(),
            format!("field `{}` has the wrong type: {e}", shape.field()),
        )
    })
}

/// Normalize a parsed reply into an object holding the shape's field.
fn into_object(shape: OutputShape, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(mut map) => {
            let Some(field) = map.remove(shape.field()) else {
                return Err(ParlanceError::output_parse(
                    shape.as_str(),
                    format!("reply has no `{}` field", shape.field()),
                ));
            };
            map.insert(shape.field().to_string(), coerce_boolean_text(shape, field));
            Ok(map)
        }
        scalar => {
            let scalar = coerce_boolean_text(shape, scalar);
            if !scalar_fits(shape, &scalar) {
                return Err(ParlanceError::output_parse(
                    shape.as_str(),
                    format!("unexpected reply: {}", excerpt(&scalar.to_string())),
                ));
            }
            let mut map = Map::new();
            map.insert(shape.field().to_string(), scalar);
            Ok(map)
        }
    }
}

fn scalar_fits(shape: OutputShape, value: &Value) -> bool {
    match shape.field_kind() {
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::String => value.is_string(),
    }
}

/// Turn `"true"` / `" False "` into a JSON boolean for boolean shapes.
fn coerce_boolean_text(shape: OutputShape, value: Value) -> Value {
    match value {
        Value::String(text) if shape.field_kind() == FieldKind::Boolean => {
            match bare_word(shape, text.trim()) {
                Some(flag) => flag,
                None => Value::String(text),
            }
        }
        other => other,
    }
}

fn bare_word(shape: OutputShape, text: &str) -> Option<Value> {
    if shape.field_kind() != FieldKind::Boolean {
        return None;
    }
    match text.to_ascii_lowercase().as_str() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Strip a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{IsTranslateMsg, LanguageChosen, MsgToTranslate, Translation};

    #[test]
    fn parses_plain_object() {
        let flag: IsTranslateMsg = parse_reply(r#"{"is_translate_msg": true}"#).unwrap();
        assert!(flag.is_translate_msg);

        let lang: LanguageChosen = parse_reply(r#" {"language":"japanese"} "#).unwrap();
        assert_eq!(lang.language, "japanese");
    }

    #[test]
    fn ignores_extra_fields() {
        let phrase: MsgToTranslate =
            parse_reply(r#"{"extracted_msg": "bonjour", "confidence": 0.9}"#).unwrap();
        assert_eq!(phrase.extracted_msg, "bonjour");
    }

    #[test]
    fn strips_markdown_fence() {
        let raw = "```json\n{\"translation\": \"こんにちは\"}\n```";
        let t: Translation = parse_reply(raw).unwrap();
        assert_eq!(t.translation, "こんにちは");

        let raw = "```\n{\"is_translate_msg\": false}\n```\n";
        let flag: IsTranslateMsg = parse_reply(raw).unwrap();
        assert!(!flag.is_translate_msg);
    }

    #[test]
    fn accepts_bare_scalars_of_the_right_type() {
        let flag: IsTranslateMsg = parse_reply("false").unwrap();
        assert!(!flag.is_translate_msg);

        let flag: IsTranslateMsg = parse_reply("True").unwrap();
        assert!(flag.is_translate_msg);

        let lang: LanguageChosen = parse_reply(r#""portuguese""#).unwrap();
        assert_eq!(lang.language, "portuguese");
    }

    #[test]
    fn rejects_non_boolean_text_for_flag() {
        let err = parse_reply::<IsTranslateMsg>("Yes, the user wants a translation.").unwrap_err();
        assert!(err.is_output_parse());
        assert!(err.to_string().contains("BooleanFlag"));
    }

    #[test]
    fn rejects_wrong_field_type() {
        let err = parse_reply::<IsTranslateMsg>(r#"{"is_translate_msg": "maybe"}"#).unwrap_err();
        assert!(err.to_string().contains("wrong type"));
    }

    #[test]
    fn rejects_missing_field() {
        let err = parse_reply::<LanguageChosen>(r#"{"lang": "english"}"#).unwrap_err();
        assert!(err.to_string().contains("no `language` field"));
    }

    #[test]
    fn rejects_scalar_of_wrong_type() {
        assert!(parse_reply::<LanguageChosen>("42").is_err());
        assert!(parse_reply::<IsTranslateMsg>(r#""maybe""#).is_err());
        assert!(parse_reply::<IsTranslateMsg>("1").is_err());
    }

    #[test]
    fn accepts_quoted_boolean_text_for_flag() {
        let flag: IsTranslateMsg = parse_reply(r#"{"is_translate_msg": "true"}"#).unwrap();
        assert!(flag.is_translate_msg);

        let flag: IsTranslateMsg = parse_reply(r#"{"is_translate_msg": " False "}"#).unwrap();
        assert!(!flag.is_translate_msg);

        let flag: IsTranslateMsg = parse_reply(r#""TRUE""#).unwrap();
        assert!(flag.is_translate_msg);
    }

    #[test]
    fn boolean_text_stays_a_string_for_text_shapes() {
        let t: Translation = parse_reply(r#"{"translation": "true"}"#).unwrap();
        assert_eq!(t.translation, "true");
    }

    #[test]
    fn rejects_empty_reply() {
        let err = parse_reply::<Translation>("   \n").unwrap_err();
        assert!(err.to_string().contains("empty reply"));
    }

    #[test]
    fn long_replies_are_truncated_in_errors() {
        let raw = "x".repeat(1_000);
        let err = parse_reply::<Translation>(&raw).unwrap_err();
        assert!(err.to_string().len() < 400);
        assert!(err.to_string().ends_with("..."));
    }
}
