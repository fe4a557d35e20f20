//! [`Session`] – caller-side guidance state.
//!
//! The [`Engine`] is stateless; a `Session` is where one user's progress
//! lives between frames. It stores the [`ProgressState`], the last hologram
//! position and the client update counter, and is the only place any of
//! them is mutated.
//!
//! # Update counter
//!
//! The client re-renders when it sees the counter move, so
//! [`Session::apply`] bumps it exactly once for every decision whose record
//! is `changed`, and never otherwise.
//!
//! A session is single-writer: callers sharing one across threads must
//! serialise access themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepwise_kernel::Decision;
use stepwise_types::{
    DetectionSet, GuideError, InstructionId, OverlayUpdate, ProgressState,
};
use tracing::debug;
use uuid::Uuid;

use crate::content::ContentTable;
use crate::engine::Engine;

// ─────────────────────────────────────────────────────────────────────────────
// Persisted layout
// ─────────────────────────────────────────────────────────────────────────────

/// Flat, storable form of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identity. Records written without one get a fresh id when
    /// restored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// [`ProgressState::code`] of the stored state.
    pub state: u32,
    pub holo_x: f32,
    pub holo_y: f32,
    pub holo_depth: f32,
    pub update_count: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Feedback
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a delivery layer needs to push one decision to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    /// Counter value after this decision was applied.
    pub update_count: u64,
    pub state: ProgressState,
    pub instruction: Option<InstructionId>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub overlay: Option<OverlayUpdate>,
    pub changed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// One user's progress through the assembly.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    state: ProgressState,
    overlay: OverlayUpdate,
    update_count: u64,
    last_update: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session at [`ProgressState::Start`].
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ProgressState::Start,
            overlay: OverlayUpdate::default(),
            update_count: 0,
            last_update: None,
        }
    }

    /// Restore a session from its stored form.
    ///
    /// # Errors
    ///
    /// [`GuideError::InvalidState`] when the stored state code is out of
    /// range.
    pub fn from_record(record: SessionRecord) -> Result<Self, GuideError> {
        Ok(Self {
            id: record.id.unwrap_or_else(Uuid::new_v4),
            state: ProgressState::try_from(record.state)?,
            overlay: OverlayUpdate {
                x: record.holo_x,
                y: record.holo_y,
                depth: record.holo_depth,
            },
            update_count: record.update_count,
            last_update: None,
        })
    }

    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            id: Some(self.id),
            state: self.state.code(),
            holo_x: self.overlay.x,
            holo_y: self.overlay.y,
            holo_depth: self.overlay.depth,
            update_count: self.update_count,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Last hologram position written by a decision.
    pub fn overlay(&self) -> OverlayUpdate {
        self.overlay
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Wall-clock time of the last counter bump.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Write `decision` back into the session.
    ///
    /// Returns `true` when the update counter was bumped.
    pub fn apply(&mut self, decision: &Decision) -> bool {
        self.state = decision.next_state;
        if let Some(overlay) = decision.record.overlay {
            self.overlay = overlay;
        }
        if !decision.record.changed {
            return false;
        }
        self.update_count += 1;
        self.last_update = Some(Utc::now());
        debug!(session = %self.id, update_count = self.update_count, "client update due");
        true
    }

    /// Run one frame through `engine`, apply the decision and build the
    /// [`Feedback`] for the delivery layer.
    pub fn step(
        &mut self,
        engine: &Engine,
        detections: &DetectionSet,
        content: &ContentTable,
    ) -> Feedback {
        let decision = engine.decide(self.state, detections);
        self.apply(&decision);

        let instruction = decision.record.instruction;
        let lookup = instruction.and_then(|id| content.get(id));
        Feedback {
            update_count: self.update_count,
            state: self.state,
            instruction,
            text: lookup.map(|c| c.text.clone()),
            image: lookup.map(|c| c.image.clone()),
            overlay: decision.record.overlay,
            changed: decision.record.changed,
        }
    }

    /// Start over from [`ProgressState::Start`], keeping the id and counter.
    pub fn reset(&mut self) {
        self.state = ProgressState::Start;
        self.overlay = OverlayUpdate::default();
    }
}
