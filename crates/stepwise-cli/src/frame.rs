//! Text input → [`DetectionSet`].
//!
//! A frame is either a JSON [`DetectionFrame`] or a whitespace-separated
//! list of class labels:
//!
//! ```text
//! {"detections":[{"class":"bread","bbox":[0.2,0.2,0.4,0.4],"score":0.9}]}
//! bread ham
//! {}
//! ```
//!
//! Bare labels get a box covering the whole image. `{}` is an empty frame.

use stepwise_perception::{collect, DedupPolicy};
use stepwise_types::{DetectionBox, DetectionFrame, DetectionSet, GuideError, ObjectClass};

/// Parse one line of input into a detection set.
pub fn parse(line: &str, policy: DedupPolicy) -> Result<DetectionSet, GuideError> {
    let line = line.trim();
    if line.starts_with('{') {
        let frame: DetectionFrame = serde_json::from_str(line)
            .map_err(|e| GuideError::Config(format!("Invalid frame: {e}")))?;
        return Ok(collect(&frame.detections, policy));
    }

    let full = DetectionBox::new(0.0, 0.0, 1.0, 1.0);
    line.split_whitespace()
        .map(|label| label.parse::<ObjectClass>().map(|class| (class, full)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_become_full_image_boxes() {
        let set = parse("bread  ham", DedupPolicy::default()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(ObjectClass::Ham),
            Some(&DetectionBox::new(0.0, 0.0, 1.0, 1.0))
        );
    }

    #[test]
    fn unknown_label_rejected() {
        assert_eq!(
            parse("bread pickle", DedupPolicy::default()),
            Err(GuideError::UnknownObjectClass("pickle".into()))
        );
    }

    #[test]
    fn json_frame_applies_dedup_policy() {
        let line = r#"{"detections":[
            {"class":"bread","bbox":[0.0,0.0,0.1,0.1],"score":0.4},
            {"class":"bread","bbox":[0.5,0.5,0.9,0.9],"score":0.8}
        ]}"#
        .replace('\n', "");

        let best = parse(&line, DedupPolicy::HighestConfidence).unwrap();
        assert_eq!(
            best.get(ObjectClass::Bread),
            Some(&DetectionBox::new(0.5, 0.5, 0.9, 0.9))
        );

        let first = parse(&line, DedupPolicy::FirstSeen).unwrap();
        assert_eq!(
            first.get(ObjectClass::Bread),
            Some(&DetectionBox::new(0.0, 0.0, 0.1, 0.1))
        );
    }

    #[test]
    fn empty_json_object_is_empty_frame() {
        assert!(parse("{}", DedupPolicy::default()).unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            parse("{\"detections\": 3}", DedupPolicy::default()),
            Err(GuideError::Config(_))
        ));
    }
}
