//! [`ProgressStateMachine`] – per-state guidance rules.
//!
//! Each [`ProgressState`] owns one rule. A rule inspects the frame's
//! [`DetectionSet`] in a fixed priority order and the first matching branch
//! decides the instruction, the hologram target and the next state.
//!
//! | State | Checks, in order |
//! |-----------|-------------------------------------------------------------------|
//! | START | unconditional → BREAD instruction |
//! | NOTHING | bread |
//! | BREAD | ham, then bread (silent refresh) |
//! | HAM | lettuce, cucumber, bread without ham (→ NOTHING rule), ham (refresh) |
//! | LETTUCE | half, ham without lettuce (→ BREAD rule), lettuce (refresh) |
//! | CUCUMBER | lettuce, ham without lettuce (→ BREAD rule) |
//! | HALF | tomato, too much ham, lettuce without half, half (refresh) |
//! | TOMATO | full, half without tomato, tomato (refresh) |
//! | HAM_WRONG | tomato, half |
//! | FULL | nothing ever changes |
//!
//! An empty detection set short-circuits every state except START into a
//! no-change decision, so a transient empty frame never causes flicker.
//!
//! Rules that "fall back" to a sibling rule call it directly; the machine
//! itself holds no mutable state and every evaluation is a pure function of
//! `(state, detections)`.
//!
//! # Example
//!
//! ```
//! use stepwise_kernel::ProgressStateMachine;
//! use stepwise_types::{DetectionBox, DetectionSet, InstructionId, ObjectClass, ProgressState};
//!
//! let machine = ProgressStateMachine::new();
//!
//! let first = machine.evaluate(ProgressState::Start, &DetectionSet::new());
//! assert_eq!(first.record.instruction, Some(InstructionId::Bread));
//! assert_eq!(first.next_state, ProgressState::Nothing);
//!
//! let mut frame = DetectionSet::new();
//! frame.insert(ObjectClass::Bread, DetectionBox::new(0.2, 0.2, 0.4, 0.4));
//! let second = machine.evaluate(first.next_state, &frame);
//! assert_eq!(second.record.instruction, Some(InstructionId::Ham));
//! assert_eq!(second.next_state, ProgressState::Bread);
//! ```

use stepwise_perception::compute_anchor;
use stepwise_types::{
    DecisionRecord, DetectionBox, DetectionSet, InstructionId, ObjectClass, Placement,
    ProgressState,
};
use tracing::{debug, warn};

// ────────────────────────────────────────────────────────────────────────────
// Decision
// ────────────────────────────────────────────────────────────────────────────

/// The outcome of one rule evaluation: the caller-facing record paired with
/// the state the caller should store.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub record: DecisionRecord,
    pub next_state: ProgressState,
}

impl Decision {
    /// Keep `state` and ask the caller to do nothing.
    pub fn stay(state: ProgressState) -> Self {
        Self {
            record: DecisionRecord::unchanged(),
            next_state: state,
        }
    }
}

/// Whether a silent hologram refresh must bump the client's update counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refresh {
    Notify,
    Quiet,
}

// ────────────────────────────────────────────────────────────────────────────
// ProgressStateMachine
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic rule table over [`ProgressState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressStateMachine;

impl ProgressStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate the rule for `state` against this frame's `detections`.
    pub fn evaluate(&self, state: ProgressState, detections: &DetectionSet) -> Decision {
        let decision = match state {
            ProgressState::Start => start_rule(),
            _ if detections.is_empty() => Decision::stay(state),
            ProgressState::Nothing => nothing_rule(detections),
            ProgressState::Bread => bread_rule(detections),
            ProgressState::Ham => ham_rule(detections),
            ProgressState::Lettuce => lettuce_rule(detections),
            ProgressState::Cucumber => cucumber_rule(detections),
            ProgressState::Half => half_rule(detections),
            ProgressState::Tomato => tomato_rule(detections),
            ProgressState::HamWrong => ham_wrong_rule(detections),
            ProgressState::Full => Decision::stay(ProgressState::Full),
        };

        debug!(
            from = %state,
            to = %decision.next_state,
            instruction = ?decision.record.instruction,
            changed = decision.record.changed,
            "progress rule evaluated"
        );
        decision
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-state rules
// ────────────────────────────────────────────────────────────────────────────

fn start_rule() -> Decision {
    advance(ProgressState::Nothing, InstructionId::Bread, None)
}

fn nothing_rule(d: &DetectionSet) -> Decision {
    match d.get(ObjectClass::Bread) {
        Some(bread) => advance(
            ProgressState::Bread,
            InstructionId::Ham,
            Some((Placement::Ham, bread)),
        ),
        None => Decision::stay(ProgressState::Nothing),
    }
}

fn bread_rule(d: &DetectionSet) -> Decision {
    if let Some(ham) = d.get(ObjectClass::Ham) {
        advance(
            ProgressState::Ham,
            InstructionId::Lettuce,
            Some((Placement::Lettuce, ham)),
        )
    } else if let Some(bread) = d.get(ObjectClass::Bread) {
        refresh(ProgressState::Bread, Placement::Ham, bread, Refresh::Notify)
    } else {
        Decision::stay(ProgressState::Bread)
    }
}

fn ham_rule(d: &DetectionSet) -> Decision {
    if let Some(lettuce) = d.get(ObjectClass::Lettuce) {
        lettuce_placed(lettuce)
    } else if d.contains(ObjectClass::Cucumber) {
        advance(ProgressState::Cucumber, InstructionId::Cucumber, None)
    } else if !d.contains(ObjectClass::Ham) && d.contains(ObjectClass::Bread) {
        // The ham came off again: back to waiting for it on the bread.
        nothing_rule(d)
    } else if let Some(ham) = d.get(ObjectClass::Ham) {
        refresh(ProgressState::Ham, Placement::Lettuce, ham, Refresh::Notify)
    } else {
        Decision::stay(ProgressState::Ham)
    }
}

fn lettuce_rule(d: &DetectionSet) -> Decision {
    if let Some(half) = d.get(ObjectClass::Half) {
        half_placed(half)
    } else if d.contains(ObjectClass::Ham) && !d.contains(ObjectClass::Lettuce) {
        bread_rule(d)
    } else if let Some(lettuce) = d.get(ObjectClass::Lettuce) {
        refresh(
            ProgressState::Lettuce,
            Placement::Bread,
            lettuce,
            Refresh::Quiet,
        )
    } else {
        Decision::stay(ProgressState::Lettuce)
    }
}

fn cucumber_rule(d: &DetectionSet) -> Decision {
    if let Some(lettuce) = d.get(ObjectClass::Lettuce) {
        lettuce_placed(lettuce)
    } else if d.contains(ObjectClass::Ham) {
        // Cucumber removed but no lettuce yet.
        bread_rule(d)
    } else {
        Decision::stay(ProgressState::Cucumber)
    }
}

fn half_rule(d: &DetectionSet) -> Decision {
    if let Some(tomato) = d.get(ObjectClass::Tomato) {
        tomato_placed(tomato)
    } else if d.contains(ObjectClass::HamWrong) {
        advance(ProgressState::HamWrong, InstructionId::HamWrong, None)
    } else if let (Some(lettuce), false) =
        (d.get(ObjectClass::Lettuce), d.contains(ObjectClass::Half))
    {
        lettuce_placed(lettuce)
    } else if let Some(half) = d.get(ObjectClass::Half) {
        refresh(ProgressState::Half, Placement::Tomato, half, Refresh::Notify)
    } else {
        Decision::stay(ProgressState::Half)
    }
}

fn tomato_rule(d: &DetectionSet) -> Decision {
    if d.contains(ObjectClass::Full) {
        advance(ProgressState::Full, InstructionId::Done, None)
    } else if let (Some(half), false) =
        (d.get(ObjectClass::Half), d.contains(ObjectClass::Tomato))
    {
        half_placed(half)
    } else if let Some(tomato) = d.get(ObjectClass::Tomato) {
        refresh(
            ProgressState::Tomato,
            Placement::TopBread,
            tomato,
            Refresh::Notify,
        )
    } else {
        Decision::stay(ProgressState::Tomato)
    }
}

fn ham_wrong_rule(d: &DetectionSet) -> Decision {
    if let Some(tomato) = d.get(ObjectClass::Tomato) {
        tomato_placed(tomato)
    } else if let Some(half) = d.get(ObjectClass::Half) {
        half_placed(half)
    } else {
        Decision::stay(ProgressState::HamWrong)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared hand-offs
// ────────────────────────────────────────────────────────────────────────────

/// Lettuce is on: ask for the bread that closes the first half.
fn lettuce_placed(lettuce: &DetectionBox) -> Decision {
    advance(
        ProgressState::Lettuce,
        InstructionId::Half,
        Some((Placement::Bread, lettuce)),
    )
}

/// First half is done: ask for the tomato.
fn half_placed(half: &DetectionBox) -> Decision {
    advance(
        ProgressState::Half,
        InstructionId::Tomato,
        Some((Placement::Tomato, half)),
    )
}

/// Tomato is on: ask for the top slice.
fn tomato_placed(tomato: &DetectionBox) -> Decision {
    advance(
        ProgressState::Tomato,
        InstructionId::Full,
        Some((Placement::TopBread, tomato)),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Record builders
// ────────────────────────────────────────────────────────────────────────────

/// Move to `next_state` with a new instruction, optionally re-anchoring the
/// hologram on `target`. A declined overlay does not hold back the
/// instruction.
fn advance(
    next_state: ProgressState,
    instruction: InstructionId,
    target: Option<(Placement, &DetectionBox)>,
) -> Decision {
    let mut record = DecisionRecord {
        instruction: Some(instruction),
        changed: true,
        ..DecisionRecord::default()
    };

    if let Some((placement, bbox)) = target {
        match compute_anchor(bbox, &placement.anchor()) {
            Ok(update) => record.overlay = Some(update),
            Err(e) => {
                warn!(?placement, error = %e, "overlay update declined");
                record.declined_overlay = Some(e);
            }
        }
    }

    Decision { record, next_state }
}

/// Stay in `state`, re-anchoring the hologram on the still-visible `target`.
fn refresh(
    state: ProgressState,
    placement: Placement,
    target: &DetectionBox,
    mode: Refresh,
) -> Decision {
    let mut record = DecisionRecord::unchanged();

    match compute_anchor(target, &placement.anchor()) {
        Ok(update) => {
            record.overlay = Some(update);
            record.changed = mode == Refresh::Notify;
        }
        Err(e) => {
            warn!(?placement, error = %e, "hologram refresh declined");
            record.declined_overlay = Some(e);
        }
    }

    Decision {
        record,
        next_state: state,
    }
}
