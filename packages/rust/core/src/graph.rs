//! Pipeline graph: nodes and the edges between them.
//!
//! ```text
//! detect_translate_msg ──true──► extract_language ─► extract_msg ─► translate ─► end
//!          │
//!          └──false──► response_to_user ─► end
//! ```

use serde::{Deserialize, Serialize};

use crate::state::PipelineState;

/// A named step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    DetectTranslateMsg,
    ExtractLanguage,
    ExtractMsg,
    Translate,
    ResponseToUser,
}

/// Where every run starts.
pub const ENTRY: Node = Node::DetectTranslateMsg;

impl Node {
    #[cfg(test)]
    const ALL: [Node; 5] = [
        Node::DetectTranslateMsg,
        Node::ExtractLanguage,
        Node::ExtractMsg,
        Node::Translate,
        Node::ResponseToUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DetectTranslateMsg => "detect_translate_msg",
            Self::ExtractLanguage => "extract_language",
            Self::ExtractMsg => "extract_msg",
            Self::Translate => "translate",
            Self::ResponseToUser => "response_to_user",
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What follows a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(Node),
    End,
}

/// The edge leaving `node`, given the state that node just produced.
///
/// Only `detect_translate_msg` looks at the state; every other edge is fixed.
pub fn next(node: Node, state: &PipelineState) -> Transition {
    match node {
        Node::DetectTranslateMsg if state.is_translate_msg => {
            Transition::Next(Node::ExtractLanguage)
        }
        Node::DetectTranslateMsg => Transition::Next(Node::ResponseToUser),
        Node::ExtractLanguage => Transition::Next(Node::ExtractMsg),
        Node::ExtractMsg => Transition::Next(Node::Translate),
        Node::Translate | Node::ResponseToUser => Transition::End,
    }
}
