//! [`Engine`] – composition root for one guidance decision.
//!
//! The engine owns no session data. Each call takes the caller's stored
//! [`ProgressState`] and the frame's [`DetectionSet`], delegates to the
//! [`ProgressStateMachine`], and hands back the [`Decision`]. Persisting the
//! next state and forwarding the record to a client is the caller's job (see
//! [`Session`][crate::session::Session]).
//!
//! Because nothing is retained between calls, one `Engine` may serve any
//! number of independent sessions concurrently.
//!
//! # Example
//!
//! ```
//! use stepwise_runtime::Engine;
//! use stepwise_types::{DetectionSet, InstructionId, ProgressState};
//!
//! let engine = Engine::new();
//! let decision = engine.decide(ProgressState::Start, &DetectionSet::new());
//! assert_eq!(decision.record.instruction, Some(InstructionId::Bread));
//!
//! // A corrupted stored state is rejected instead of guessed at.
//! assert!(engine.decide_stored(99, &DetectionSet::new()).is_err());
//! ```

use stepwise_kernel::{Decision, ProgressStateMachine};
use stepwise_types::{DetectionSet, GuideError, ProgressState};
use tracing::{info, warn};

/// Stateless decision entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    machine: ProgressStateMachine,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to do for `state` given this frame's `detections`.
    pub fn decide(&self, state: ProgressState, detections: &DetectionSet) -> Decision {
        let decision = self.machine.evaluate(state, detections);
        if decision.next_state != state {
            info!(from = %state, to = %decision.next_state, "progress state advanced");
        }
        decision
    }

    /// Like [`decide`][Engine::decide], but starting from a stored numeric
    /// state code.
    ///
    /// # Errors
    ///
    /// [`GuideError::InvalidState`] when `code` does not name a
    /// [`ProgressState`]. The request is aborted; no recovery state is
    /// guessed.
    pub fn decide_stored(
        &self,
        code: u32,
        detections: &DetectionSet,
    ) -> Result<Decision, GuideError> {
        let state = ProgressState::try_from(code).inspect_err(|e| {
            warn!(code, error = %e, "rejecting stored progress state");
        })?;
        Ok(self.decide(state, detections))
    }
}
