//! `stepwise-runtime` – decision entry point and session plumbing
//!
//! Wires the guidance rules to the caller: one stateless [`Engine`] per
//! process, one [`Session`] per user.
//!
//! # Modules
//!
//! - [`engine`] – [`Engine`][engine::Engine]: the composition root. Takes a
//!   stored [`ProgressState`][stepwise_types::ProgressState] and a frame's
//!   [`DetectionSet`][stepwise_types::DetectionSet] and returns the
//!   [`Decision`][stepwise_kernel::Decision]. Adds no logic of its own.
//! - [`session`] – [`Session`][session::Session]: owns one user's progress
//!   state, hologram position and client update counter, and turns each
//!   decision into a [`Feedback`][session::Feedback] for the delivery layer.
//! - [`content`] – [`ContentTable`][content::ContentTable]: editable mapping
//!   from [`InstructionId`][stepwise_types::InstructionId] to instruction
//!   text and image, loadable from TOML.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter. Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export.

pub mod content;
pub mod engine;
pub mod session;
pub mod telemetry;

pub use content::{Content, ContentTable};
pub use engine::Engine;
pub use session::{Feedback, Session, SessionRecord};
pub use telemetry::{init_tracing, LogFormat, TracerProviderGuard};

// Re-exported so callers can match on decisions without a direct
// dependency on stepwise-kernel.
pub use stepwise_kernel::Decision;
