//! Deterministic in-memory backend for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use parlance_shared::{ParlanceError, Result};

use super::ChatBackend;
use crate::shape::OutputShape;

#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Unavailable(String),
}

/// One call the backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub shape: OutputShape,
    pub prompt: String,
}

/// Replays queued replies in order and records every prompt it receives.
///
/// A call with nothing queued fails with `ModelUnavailable`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply text.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push_reply(reply);
        self
    }

    /// Queue a backend failure.
    pub fn with_unavailable(self, message: impl Into<String>) -> Self {
        lock(&self.replies).push_back(ScriptedReply::Unavailable(message.into()));
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(ScriptedReply::Text(reply.into()));
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str, shape: OutputShape) -> Result<String> {
        lock(&self.calls).push(RecordedCall {
            shape,
            prompt: prompt.to_string(),
        });

        match lock(&self.replies).pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Unavailable(message)) => Err(ParlanceError::unavailable(message)),
            None => Err(ParlanceError::unavailable("scripted backend has no reply queued")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
