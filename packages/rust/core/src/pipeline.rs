//! Pipeline driver: threads a [`PipelineState`] from the entry node to the end.

use std::time::Instant;

use parlance_model::StructuredModel;
use parlance_shared::{ParlanceError, Result};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::graph::{self, ENTRY, Node, Transition};
use crate::state::{FinalState, PipelineState};
use crate::steps;

/// Progress callback for reporting which step is running.
pub trait StepObserver: Send + Sync {
    /// Called right before a step's model call is issued.
    fn step_started(&self, node: Node);
    /// Called after a step produced its new state.
    fn step_finished(&self, _node: Node, _state: &PipelineState) {}
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl StepObserver for SilentObserver {
    fn step_started(&self, _node: Node) {}
}

/// The translate-or-answer pipeline.
///
/// Holds only the shared model handle; every run owns its own state, so one
/// `Pipeline` can serve many concurrent requests.
#[derive(Debug, Clone)]
pub struct Pipeline {
    model: StructuredModel,
}

impl Pipeline {
    pub fn new(model: StructuredModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &StructuredModel {
        &self.model
    }

    /// Run one message through the graph.
    ///
    /// The message is not validated here; callers reject blank input first.
    pub async fn run(&self, message: &str) -> Result<FinalState> {
        self.run_with_observer(message, &SilentObserver).await
    }

    /// Run one message, reporting each step to `observer`.
    ///
    /// Any step failure aborts the run; no partial state is returned.
    #[instrument(skip_all, fields(run_id = %Uuid::now_v7()))]
    pub async fn run_with_observer(
        &self,
        message: &str,
        observer: &dyn StepObserver,
    ) -> Result<FinalState> {
        let start = Instant::now();
        debug!(%message, "pipeline run started");

        let mut state = PipelineState::new(message);
        let mut path: Vec<Node> = Vec::with_capacity(4);
        let mut node = ENTRY;

        loop {
            if path.contains(&node) {
                return Err(ParlanceError::Internal(format!(
                    "node {node} reached twice in one run"
                )));
            }

            observer.step_started(node);
            let step_start = Instant::now();

            let next = steps::run_step(node, &self.model, &state)
                .await
                .inspect_err(|e| warn!(step = %node, error = %e, "pipeline step failed"))?;

            // The entry step may reset fields; every later step only adds.
            if node != ENTRY && !next.carries_forward(&state) {
                return Err(ParlanceError::Internal(format!(
                    "step {node} dropped or changed a field set earlier"
                )));
            }

            debug!(
                step = %node,
                elapsed_ms = step_start.elapsed().as_millis() as u64,
                "step complete"
            );
            observer.step_finished(node, &next);

            path.push(node);
            state = next;

            match graph::next(node, &state) {
                Transition::Next(following) => node = following,
                Transition::End => break,
            }
        }

        let final_state = FinalState::from_terminal(state, path)?;

        info!(
            is_translate_msg = final_state.is_translate_msg(),
            steps = final_state.path.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline run complete"
        );

        Ok(final_state)
    }
}
