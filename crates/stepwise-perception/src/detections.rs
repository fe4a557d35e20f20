//! Detection-set construction.
//!
//! The detector may report several instances of the same class in one
//! frame. The guidance rules only look at one box per class, so raw
//! [`Detection`]s are collapsed into a [`DetectionSet`] under an explicit
//! [`DedupPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_types::{Detection, DetectionSet, GuideError};
use tracing::debug;

/// How to pick the representative box when a class is detected more than
/// once in a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Keep the highest-scoring instance. Ties keep the earlier one.
    #[default]
    HighestConfidence,
    /// Keep whichever instance the detector listed first.
    FirstSeen,
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::HighestConfidence => write!(f, "highest_confidence"),
            DedupPolicy::FirstSeen => write!(f, "first_seen"),
        }
    }
}

impl FromStr for DedupPolicy {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "highest_confidence" => Ok(DedupPolicy::HighestConfidence),
            "first_seen" => Ok(DedupPolicy::FirstSeen),
            other => Err(GuideError::Config(format!("unknown dedup policy {other:?}"))),
        }
    }
}

/// Collapse `detections` into one box per class according to `policy`.
pub fn collect<'a, I>(detections: I, policy: DedupPolicy) -> DetectionSet
where
    I: IntoIterator<Item = &'a Detection>,
{
    let mut set = DetectionSet::new();
    // Scores of the boxes currently held in `set`, indexed by class.
    let mut kept_scores: HashMap<_, f32> = HashMap::new();

    for detection in detections {
        let replace = match kept_scores.get(&detection.class) {
            None => true,
            Some(&kept) => match policy {
                DedupPolicy::HighestConfidence => detection.score > kept,
                DedupPolicy::FirstSeen => false,
            },
        };

        if replace {
            if kept_scores.insert(detection.class, detection.score).is_some() {
                debug!(class = %detection.class, score = detection.score, "replacing duplicate detection");
            }
            set.insert(detection.class, detection.bbox);
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_types::{DetectionBox, ObjectClass};

    fn det(class: ObjectClass, x2: f32, score: f32) -> Detection {
        Detection {
            class,
            bbox: DetectionBox::new(0.0, 0.0, x2, 0.5),
            score,
        }
    }

    #[test]
    fn distinct_classes_are_all_kept() {
        let raw = [
            det(ObjectClass::Bread, 0.5, 0.9),
            det(ObjectClass::Ham, 0.4, 0.8),
        ];
        let set = collect(&raw, DedupPolicy::default());
        assert_eq!(set.len(), 2);
        assert!(set.contains(ObjectClass::Bread));
        assert!(set.contains(ObjectClass::Ham));
    }

    #[test]
    fn highest_confidence_keeps_best_score() {
        let raw = [
            det(ObjectClass::Ham, 0.1, 0.4),
            det(ObjectClass::Ham, 0.2, 0.95),
            det(ObjectClass::Ham, 0.3, 0.6),
        ];
        let set = collect(&raw, DedupPolicy::HighestConfidence);
        assert_eq!(set.get(ObjectClass::Ham).unwrap().x2, 0.2);
    }

    #[test]
    fn highest_confidence_tie_keeps_first() {
        let raw = [
            det(ObjectClass::Tomato, 0.1, 0.7),
            det(ObjectClass::Tomato, 0.2, 0.7),
        ];
        let set = collect(&raw, DedupPolicy::HighestConfidence);
        assert_eq!(set.get(ObjectClass::Tomato).unwrap().x2, 0.1);
    }

    #[test]
    fn first_seen_ignores_score() {
        let raw = [
            det(ObjectClass::Lettuce, 0.1, 0.2),
            det(ObjectClass::Lettuce, 0.2, 0.99),
        ];
        let set = collect(&raw, DedupPolicy::FirstSeen);
        assert_eq!(set.get(ObjectClass::Lettuce).unwrap().x2, 0.1);
    }

    #[test]
    fn empty_input_gives_empty_set() {
        let raw: [Detection; 0] = [];
        let set = collect(&raw, DedupPolicy::FirstSeen);
        assert!(set.is_empty());
    }

    #[test]
    fn policy_names_parse_back() {
        for policy in [DedupPolicy::HighestConfidence, DedupPolicy::FirstSeen] {
            assert_eq!(policy.to_string().parse::<DedupPolicy>().unwrap(), policy);
        }
        assert!(matches!(
            "random".parse::<DedupPolicy>(),
            Err(GuideError::Config(_))
        ));
    }
}
