//! The fixed output shapes a model reply can be coerced into.
//!
//! Every shape has exactly one field. The JSON schema of that field is sent
//! to the backend so it can constrain its reply.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifies one of the result shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputShape {
    BooleanFlag,
    LanguageName,
    ExtractedPhrase,
    TranslationText,
}

/// JSON type of a shape's single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    String,
}

impl OutputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BooleanFlag => "BooleanFlag",
            Self::LanguageName => "LanguageName",
            Self::ExtractedPhrase => "ExtractedPhrase",
            Self::TranslationText => "TranslationText",
        }
    }

    /// Name of the single field the reply must carry.
    pub fn field(&self) -> &'static str {
        match self {
            Self::BooleanFlag => "is_translate_msg",
            Self::LanguageName => "language",
            Self::ExtractedPhrase => "extracted_msg",
            Self::TranslationText => "translation",
        }
    }

    pub fn field_kind(&self) -> FieldKind {
        match self {
            Self::BooleanFlag => FieldKind::Boolean,
            _ => FieldKind::String,
        }
    }

    /// JSON schema for an object with the shape's single required field.
    pub fn json_schema(&self) -> Value {
        let ty = match self.field_kind() {
            FieldKind::Boolean => "boolean",
            FieldKind::String => "string",
        };
        json!({
            "type": "object",
            "properties": { self.field(): { "type": ty } },
            "required": [self.field()],
            "additionalProperties": false,
        })
    }
}

impl std::fmt::Display for OutputShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed result that a reply can be parsed into.
pub trait StructuredOutput: DeserializeOwned + Send + 'static {
    const SHAPE: OutputShape;
}

/// `BooleanFlag`: whether the message asks for a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsTranslateMsg {
    pub is_translate_msg: bool,
}

/// `LanguageName`: the requested target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageChosen {
    pub language: String,
}

/// `ExtractedPhrase`: the text the user wants translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgToTranslate {
    pub extracted_msg: String,
}

/// `TranslationText`: a translation, or a general-knowledge answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub translation: String,
}

impl StructuredOutput for IsTranslateMsg {
    const SHAPE: OutputShape = OutputShape::BooleanFlag;
}

impl StructuredOutput for LanguageChosen {
    const SHAPE: OutputShape = OutputShape::LanguageName;
}

impl StructuredOutput for MsgToTranslate {
    const SHAPE: OutputShape = OutputShape::ExtractedPhrase;
}

impl StructuredOutput for Translation {
    const SHAPE: OutputShape = OutputShape::TranslationText;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_single_required_field() {
        let schema = OutputShape::LanguageName.json_schema();
        assert_eq!(schema["required"], json!(["language"]));
        assert_eq!(schema["properties"]["language"]["type"], "string");
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn boolean_flag_schema_is_boolean() {
        let schema = OutputShape::BooleanFlag.json_schema();
        assert_eq!(schema["properties"]["is_translate_msg"]["type"], "boolean");
    }

    #[test]
    fn struct_field_names_match_shape_fields() {
        let cases = [
            (
                serde_json::to_value(IsTranslateMsg { is_translate_msg: true }).unwrap(),
                IsTranslateMsg::SHAPE,
            ),
            (
                serde_json::to_value(LanguageChosen { language: "x".into() }).unwrap(),
                LanguageChosen::SHAPE,
            ),
            (
                serde_json::to_value(MsgToTranslate { extracted_msg: "x".into() }).unwrap(),
                MsgToTranslate::SHAPE,
            ),
            (
                serde_json::to_value(Translation { translation: "x".into() }).unwrap(),
                Translation::SHAPE,
            ),
        ];
        for (value, shape) in cases {
            assert!(value.get(shape.field()).is_some(), "{shape} field mismatch");
        }
    }
}
