//! `stepwise-perception` – turns raw detector output into the geometry the
//! guidance rules reason about.
//!
//! # Modules
//!
//! - [`detections`] – [`collect`][detections::collect]: collapses one frame
//!   of raw [`Detection`][stepwise_types::Detection]s into a
//!   [`DetectionSet`][stepwise_types::DetectionSet] holding one box per
//!   class, under an explicit [`DedupPolicy`][detections::DedupPolicy].
//! - [`geometry`] – [`compute_anchor`][geometry::compute_anchor]: maps a
//!   detected box and an [`OverlayAnchor`][stepwise_types::OverlayAnchor] to
//!   the hologram's screen position and apparent depth.

pub mod detections;
pub mod geometry;

pub use detections::{collect, DedupPolicy};
pub use geometry::compute_anchor;
