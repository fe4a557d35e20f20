//! Overlay anchor geometry.
//!
//! Maps a detected [`DetectionBox`] and a target [`OverlayAnchor`] to the
//! screen position and apparent depth of the guidance hologram.
//!
//! The anchor point is a linear interpolation across the box:
//! ```text
//! x     = x1 * (1 − anchor.x) + x2 * anchor.x
//! y     = y1 * (1 − anchor.y) + y2 * anchor.y
//! depth = sqrt(anchor.dist / ((y2 − y1) * (x2 − x1)))
//! ```
//! A larger box means the object is closer, so the hologram is drawn
//! shallower.
//!
//! # Example
//!
//! ```rust
//! use stepwise_perception::geometry::compute_anchor;
//! use stepwise_types::{DetectionBox, Placement};
//!
//! let bread = DetectionBox::new(0.2, 0.2, 0.4, 0.4);
//! let update = compute_anchor(&bread, &Placement::Ham.anchor()).unwrap();
//!
//! assert!((update.x - 0.3).abs() < 1e-5);
//! assert!((update.y - 0.272).abs() < 1e-5);
//! assert!((update.depth - 403.11).abs() < 1e-2);
//! ```

use stepwise_types::{DetectionBox, GuideError, OverlayAnchor, OverlayUpdate};

/// Compute the hologram position for `anchor` relative to `bbox`.
///
/// Pure and side-effect free.
///
/// # Errors
///
/// [`GuideError::DegenerateGeometry`] when the box area is zero, negative or
/// not finite. No division or square root is attempted in that case.
pub fn compute_anchor(
    bbox: &DetectionBox,
    anchor: &OverlayAnchor,
) -> Result<OverlayUpdate, GuideError> {
    let area = bbox.area();
    if !(area.is_finite() && area > 0.0) {
        return Err(GuideError::DegenerateGeometry { area });
    }

    Ok(OverlayUpdate {
        x: lerp(bbox.x1, bbox.x2, anchor.x),
        y: lerp(bbox.y1, bbox.y2, anchor.y),
        depth: (anchor.dist / area).sqrt(),
    })
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from * (1.0 - t) + to * t
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_types::Placement;

    fn anchor(dist: f32, x: f32, y: f32) -> OverlayAnchor {
        OverlayAnchor { dist, x, y }
    }

    #[test]
    fn ham_anchor_on_reference_box() {
        let bbox = DetectionBox::new(0.2, 0.2, 0.4, 0.4);
        let update = compute_anchor(&bbox, &anchor(6500.0, 0.5, 0.36)).unwrap();

        assert!((update.x - 0.3).abs() < 1e-5);
        // 0.2 * 0.64 + 0.4 * 0.36
        assert!((update.y - 0.272).abs() < 1e-5);
        // sqrt(6500 / 0.04) = sqrt(162500)
        assert!((update.depth - 403.1129).abs() < 1e-2);
    }

    #[test]
    fn zero_ratio_pins_to_top_left_corner() {
        let bbox = DetectionBox::new(0.1, 0.3, 0.5, 0.9);
        let update = compute_anchor(&bbox, &anchor(1.0, 0.0, 0.0)).unwrap();
        assert!((update.x - 0.1).abs() < 1e-6);
        assert!((update.y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn unit_ratio_pins_to_bottom_right_corner() {
        let bbox = DetectionBox::new(0.1, 0.3, 0.5, 0.9);
        let update = compute_anchor(&bbox, &anchor(1.0, 1.0, 1.0)).unwrap();
        assert!((update.x - 0.5).abs() < 1e-6);
        assert!((update.y - 0.9).abs() < 1e-6);
    }

    #[test]
    fn larger_box_is_shallower() {
        let a = Placement::Tomato.anchor();
        let near = compute_anchor(&DetectionBox::new(0.0, 0.0, 0.8, 0.8), &a).unwrap();
        let far = compute_anchor(&DetectionBox::new(0.0, 0.0, 0.2, 0.2), &a).unwrap();
        assert!(near.depth < far.depth);
    }

    #[test]
    fn zero_area_box_is_degenerate() {
        let flat = DetectionBox::new(0.2, 0.5, 0.6, 0.5);
        assert!(matches!(
            compute_anchor(&flat, &Placement::Ham.anchor()),
            Err(GuideError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn inverted_box_is_degenerate() {
        // x2 < x1 gives a negative area; sqrt must not be taken.
        let inverted = DetectionBox::new(0.6, 0.2, 0.2, 0.4);
        let err = compute_anchor(&inverted, &Placement::Ham.anchor()).unwrap_err();
        match err {
            GuideError::DegenerateGeometry { area } => assert!(area < 0.0),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn nan_coordinates_are_degenerate() {
        let bad = DetectionBox::new(f32::NAN, 0.0, 0.5, 0.5);
        assert!(compute_anchor(&bad, &Placement::Bread.anchor()).is_err());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let bbox = DetectionBox::new(0.3, 0.1, 0.7, 0.6);
        let a = Placement::Lettuce.anchor();
        assert_eq!(compute_anchor(&bbox, &a), compute_anchor(&bbox, &a));
    }
}
