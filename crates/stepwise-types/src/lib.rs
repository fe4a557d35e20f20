use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A physical item the upstream detector can recognise.
///
/// The set is closed: the detector model is trained on exactly these labels.
/// There is no "done" class; DONE exists only as an [`InstructionId`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Bread,
    Ham,
    Cucumber,
    Lettuce,
    Cheese,
    /// Bread, ham and lettuce stacked: the first half of the sandwich.
    Half,
    /// A half sandwich carrying a second slice of ham.
    HamWrong,
    Tomato,
    /// The finished sandwich with its top slice.
    Full,
}

impl ObjectClass {
    /// Every class in detector label order.
    pub const ALL: [ObjectClass; 9] = [
        ObjectClass::Bread,
        ObjectClass::Ham,
        ObjectClass::Cucumber,
        ObjectClass::Lettuce,
        ObjectClass::Cheese,
        ObjectClass::Half,
        ObjectClass::HamWrong,
        ObjectClass::Tomato,
        ObjectClass::Full,
    ];

    /// The detector label for this class, e.g. `"hamwrong"`.
    pub fn label(self) -> &'static str {
        match self {
            ObjectClass::Bread => "bread",
            ObjectClass::Ham => "ham",
            ObjectClass::Cucumber => "cucumber",
            ObjectClass::Lettuce => "lettuce",
            ObjectClass::Cheese => "cheese",
            ObjectClass::Half => "half",
            ObjectClass::HamWrong => "hamwrong",
            ObjectClass::Tomato => "tomato",
            ObjectClass::Full => "full",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ObjectClass {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ObjectClass::ALL
            .into_iter()
            .find(|class| class.label() == needle)
            .ok_or_else(|| GuideError::UnknownObjectClass(s.to_string()))
    }
}

/// Axis-aligned bounding box in normalised `[0, 1]` client-frame space.
///
/// On the wire a box is a plain `[x1, y1, x2, y2]` array. `x1 <= x2` and
/// `y1 <= y2` are expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct DetectionBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl DetectionBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Signed area; non-positive for degenerate or inverted boxes.
    pub fn area(&self) -> f32 {
        self.height() * self.width()
    }
}

impl From<[f32; 4]> for DetectionBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<DetectionBox> for [f32; 4] {
    fn from(b: DetectionBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A single raw detector output before per-class deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    pub class: ObjectClass,
    /// `[x1, y1, x2, y2]`, normalised.
    #[schemars(with = "[f32; 4]")]
    pub bbox: DetectionBox,
    /// Detector confidence. Only consulted when choosing between duplicates.
    #[serde(default = "default_score")]
    pub score: f32,
}

fn default_score() -> f32 {
    1.0
}

/// One frame's worth of detector output, as received from the vision model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionFrame {
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// At most one representative [`DetectionBox`] per [`ObjectClass`].
///
/// Built fresh for every decision and never retained. Use
/// `stepwise_perception::detections::collect` to build one from raw
/// detections under an explicit deduplication policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    boxes: BTreeMap<ObjectClass, DetectionBox>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the representative box for `class`, returning the one it replaced.
    pub fn insert(&mut self, class: ObjectClass, bbox: DetectionBox) -> Option<DetectionBox> {
        self.boxes.insert(class, bbox)
    }

    pub fn get(&self, class: ObjectClass) -> Option<&DetectionBox> {
        self.boxes.get(&class)
    }

    pub fn contains(&self, class: ObjectClass) -> bool {
        self.boxes.contains_key(&class)
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Classes present in this set, in label order.
    pub fn classes(&self) -> impl Iterator<Item = ObjectClass> + '_ {
        self.boxes.keys().copied()
    }
}

impl FromIterator<(ObjectClass, DetectionBox)> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = (ObjectClass, DetectionBox)>>(iter: I) -> Self {
        let mut set = DetectionSet::new();
        for (class, bbox) in iter {
            set.insert(class, bbox);
        }
        set
    }
}

/// The assembly step the user is currently believed to be at.
///
/// Discriminants are the stable stored codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ProgressState {
    #[default]
    Start = 0,
    Nothing = 1,
    Bread = 2,
    Ham = 3,
    Lettuce = 4,
    Cucumber = 5,
    Half = 6,
    Tomato = 7,
    HamWrong = 8,
    Full = 9,
}

impl ProgressState {
    /// Stored numeric code for this state.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// `true` for the error-recovery branches that do not advance assembly.
    pub fn is_recovery(self) -> bool {
        matches!(self, ProgressState::Cucumber | ProgressState::HamWrong)
    }
}

impl TryFrom<u32> for ProgressState {
    type Error = GuideError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => ProgressState::Start,
            1 => ProgressState::Nothing,
            2 => ProgressState::Bread,
            3 => ProgressState::Ham,
            4 => ProgressState::Lettuce,
            5 => ProgressState::Cucumber,
            6 => ProgressState::Half,
            7 => ProgressState::Tomato,
            8 => ProgressState::HamWrong,
            9 => ProgressState::Full,
            other => return Err(GuideError::InvalidState(other)),
        })
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgressState::Start => "START",
            ProgressState::Nothing => "NOTHING",
            ProgressState::Bread => "BREAD",
            ProgressState::Ham => "HAM",
            ProgressState::Lettuce => "LETTUCE",
            ProgressState::Cucumber => "CUCUMBER",
            ProgressState::Half => "HALF",
            ProgressState::Tomato => "TOMATO",
            ProgressState::HamWrong => "HAM_WRONG",
            ProgressState::Full => "FULL",
        };
        f.write_str(name)
    }
}

/// Key of an instruction shown to the user. The text and image for each key
/// live in an external content table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionId {
    Bread,
    Ham,
    Lettuce,
    Half,
    Cucumber,
    HamWrong,
    Tomato,
    Full,
    Done,
}

impl InstructionId {
    pub const ALL: [InstructionId; 9] = [
        InstructionId::Bread,
        InstructionId::Ham,
        InstructionId::Lettuce,
        InstructionId::Half,
        InstructionId::Cucumber,
        InstructionId::HamWrong,
        InstructionId::Tomato,
        InstructionId::Full,
        InstructionId::Done,
    ];

    pub fn key(self) -> &'static str {
        match self {
            InstructionId::Bread => "bread",
            InstructionId::Ham => "ham",
            InstructionId::Lettuce => "lettuce",
            InstructionId::Half => "half",
            InstructionId::Cucumber => "cucumber",
            InstructionId::HamWrong => "ham_wrong",
            InstructionId::Tomato => "tomato",
            InstructionId::Full => "full",
            InstructionId::Done => "done",
        }
    }
}

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for InstructionId {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstructionId::ALL
            .into_iter()
            .find(|id| id.key() == s.trim())
            .ok_or_else(|| GuideError::UnknownInstruction(s.to_string()))
    }
}

/// Where, relative to a detected box, the next expected object should appear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayAnchor {
    /// Reference scale constant; divided by the box area to get depth.
    pub dist: f32,
    /// Fractional horizontal offset across the box width.
    pub x: f32,
    /// Fractional vertical offset across the box height.
    pub y: f32,
}

/// The five hand-off points of the assembly sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Ham goes on the bread.
    Ham,
    /// Lettuce goes on the ham.
    Lettuce,
    /// Bread goes on the lettuce.
    Bread,
    /// Tomato goes on the half sandwich.
    Tomato,
    /// Top slice goes on the tomato.
    TopBread,
}

impl Placement {
    pub fn anchor(self) -> OverlayAnchor {
        let (dist, x, y) = match self {
            Placement::Ham => (6500.0, 0.5, 0.36),
            Placement::Lettuce => (6800.0, 0.5, 0.32),
            Placement::Bread => (7100.0, 0.5, 0.3),
            Placement::Tomato => (7500.0, 0.5, 0.26),
            Placement::TopBread => (7800.0, 0.5, 0.22),
        };
        OverlayAnchor { dist, x, y }
    }
}

/// Hologram position computed from one box and one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayUpdate {
    /// Normalised horizontal screen position.
    pub x: f32,
    /// Normalised vertical screen position.
    pub y: f32,
    /// Apparent depth of the hologram.
    pub depth: f32,
}

/// What one decision tells the caller to do.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Instruction to show, if a new one is due.
    pub instruction: Option<InstructionId>,
    /// New hologram position, if one was computed.
    pub overlay: Option<OverlayUpdate>,
    /// `true` when the client must re-render. Always set with an instruction.
    pub changed: bool,
    /// The geometry error that prevented an overlay update, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declined_overlay: Option<GuideError>,
}

impl DecisionRecord {
    /// A record that asks the caller to do nothing.
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Errors raised anywhere in the guidance stack.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuideError {
    #[error("Degenerate Geometry: box area {area} is not positive")]
    DegenerateGeometry { area: f32 },

    #[error("Invalid Progress State: code {0} is out of range")]
    InvalidState(u32),

    #[error("Unknown Object Class: {0:?}")]
    UnknownObjectClass(String),

    #[error("Unknown Instruction: {0:?}")]
    UnknownInstruction(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_class_labels_parse_back() {
        for class in ObjectClass::ALL {
            assert_eq!(class.label().parse::<ObjectClass>().unwrap(), class);
        }
        assert_eq!(" Bread ".parse::<ObjectClass>().unwrap(), ObjectClass::Bread);
    }

    #[test]
    fn unknown_object_class_rejected() {
        let err = "pickle".parse::<ObjectClass>().unwrap_err();
        assert_eq!(err, GuideError::UnknownObjectClass("pickle".into()));
    }

    #[test]
    fn object_class_serializes_as_detector_label() {
        let json = serde_json::to_string(&ObjectClass::HamWrong).unwrap();
        assert_eq!(json, "\"hamwrong\"");
    }

    #[test]
    fn detection_box_is_a_plain_array_on_the_wire() {
        let bbox = DetectionBox::new(0.1, 0.2, 0.3, 0.4);
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[0.1,0.2,0.3,0.4]");
        let back: DetectionBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bbox);
    }

    #[test]
    fn detection_score_defaults_to_one() {
        let d: Detection =
            serde_json::from_str(r#"{"class":"tomato","bbox":[0.0,0.0,0.5,0.5]}"#).unwrap();
        assert_eq!(d.class, ObjectClass::Tomato);
        assert!((d.score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn frame_without_detections_is_empty() {
        let frame: DetectionFrame = serde_json::from_str("{}").unwrap();
        assert!(frame.detections.is_empty());
    }

    #[test]
    fn detection_box_area() {
        let bbox = DetectionBox::new(0.2, 0.2, 0.4, 0.4);
        assert!((bbox.area() - 0.04).abs() < 1e-6);
        assert!(DetectionBox::new(0.4, 0.2, 0.2, 0.4).area() < 0.0);
    }

    #[test]
    fn detection_set_keeps_one_box_per_class() {
        let mut set = DetectionSet::new();
        assert!(set.is_empty());
        set.insert(ObjectClass::Ham, DetectionBox::new(0.0, 0.0, 0.1, 0.1));
        let replaced = set.insert(ObjectClass::Ham, DetectionBox::new(0.0, 0.0, 0.2, 0.2));
        assert!(replaced.is_some());
        assert_eq!(set.len(), 1);
        assert!(set.contains(ObjectClass::Ham));
        assert!(!set.contains(ObjectClass::Bread));
        assert_eq!(set.get(ObjectClass::Ham).unwrap().x2, 0.2);
    }

    #[test]
    fn progress_state_codes_round_trip() {
        for code in 0..=9u32 {
            let state = ProgressState::try_from(code).unwrap();
            assert_eq!(state.code(), code);
        }
    }

    #[test]
    fn out_of_range_state_code_rejected() {
        assert_eq!(
            ProgressState::try_from(10u32),
            Err(GuideError::InvalidState(10))
        );
        assert!(ProgressState::try_from(u32::MAX).is_err());
    }

    #[test]
    fn recovery_states() {
        assert!(ProgressState::Cucumber.is_recovery());
        assert!(ProgressState::HamWrong.is_recovery());
        assert!(!ProgressState::Half.is_recovery());
    }

    #[test]
    fn instruction_keys_parse_back() {
        for id in InstructionId::ALL {
            assert_eq!(id.key().parse::<InstructionId>().unwrap(), id);
        }
        assert!("sandwich".parse::<InstructionId>().is_err());
    }

    #[test]
    fn placement_anchors_match_table() {
        let ham = Placement::Ham.anchor();
        assert_eq!(ham.dist, 6500.0);
        assert_eq!(ham.y, 0.36);
        assert_eq!(Placement::TopBread.anchor().dist, 7800.0);
    }

    #[test]
    fn guide_error_display() {
        let err = GuideError::DegenerateGeometry { area: 0.0 };
        assert!(err.to_string().contains("Degenerate Geometry"));
        assert!(GuideError::InvalidState(42).to_string().contains("42"));
    }

    #[test]
    fn decision_record_omits_absent_decline() {
        let json = serde_json::to_string(&DecisionRecord::unchanged()).unwrap();
        assert!(!json.contains("declined_overlay"));
        assert!(json.contains("\"changed\":false"));
    }
}
