//! The structured caller: render a prompt, call the backend, parse the reply.

use std::sync::Arc;
use std::time::Instant;

use parlance_shared::{ModelConfig, PromptTemplate, Result};
use tracing::{debug, instrument, warn};

use crate::backend::{self, ChatBackend};
use crate::parse::parse_reply;
use crate::shape::StructuredOutput;

/// Shared handle to a model backend that returns typed, single-field results.
///
/// Cheap to clone; safe to use from many concurrent requests.
#[derive(Clone)]
pub struct StructuredModel {
    backend: Arc<dyn ChatBackend>,
}

impl std::fmt::Debug for StructuredModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredModel")
            .field("backend", &self.backend.name())
            .field("model", &self.backend.model())
            .finish()
    }
}

impl StructuredModel {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Build the backend described by `config`.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Ok(Self::new(backend::from_config(config)?))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Render `template` with `vars`, send it, and parse the reply as `T`.
    ///
    /// No retry: a backend failure or an unparseable reply is returned as is.
    #[instrument(skip_all, fields(shape = %T::SHAPE, backend = self.backend.name()))]
    pub async fn call<T: StructuredOutput>(
        &self,
        template: &PromptTemplate,
        vars: &[(&str, &str)],
    ) -> Result<T> {
        let prompt = template.render(vars)?;
        let start = Instant::now();

        let raw = self.backend.complete(&prompt, T::SHAPE).await?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            reply_chars = raw.chars().count(),
            "model replied"
        );

        parse_reply::<T>(&raw).inspect_err(|e| warn!(error = %e, "unparseable model reply"))
    }
}
