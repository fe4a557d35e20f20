//! `stepwise-kernel` – Guidance rules
//!
//! The decision core of Stepwise. It does not see cameras or clients; it
//! takes the current [`ProgressState`][stepwise_types::ProgressState] and one
//! frame's [`DetectionSet`][stepwise_types::DetectionSet] and decides what
//! the user should do next.
//!
//! # Modules
//!
//! - [`progress`] – [`ProgressStateMachine`][progress::ProgressStateMachine]:
//!   the per-state rule table. Every evaluation returns a
//!   [`Decision`][progress::Decision] pairing the caller-facing
//!   [`DecisionRecord`][stepwise_types::DecisionRecord] with the next state
//!   to store. Hologram placement is delegated to
//!   [`stepwise_perception::geometry`].

pub mod progress;

pub use progress::{Decision, ProgressStateMachine};
