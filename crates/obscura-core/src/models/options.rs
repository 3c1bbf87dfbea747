use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Blur effect applied by the processing pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    #[default]
    Gaussian,
    Motion,
    Pixelate,
}

impl Display for EffectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EffectKind::Gaussian => write!(f, "gaussian"),
            EffectKind::Motion => write!(f, "motion"),
            EffectKind::Pixelate => write!(f, "pixelate"),
        }
    }
}

impl FromStr for EffectKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gaussian" => Ok(EffectKind::Gaussian),
            "motion" => Ok(EffectKind::Motion),
            "pixelate" => Ok(EffectKind::Pixelate),
            _ => Err(anyhow::anyhow!(
                "Invalid effect type: {} (allowed: gaussian, motion, pixelate)",
                s
            )),
        }
    }
}

/// Per-upload processing configuration. Validation happens in the upload
/// validator before any work is dispatched; values are never clamped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingOptions {
    pub effect: EffectKind,
    /// Effect intensity, valid range [1, 10].
    pub intensity: i32,
    /// Object labels to blur, each from [`OBJECT_LABELS`].
    pub objects: Vec<String>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            effect: EffectKind::Gaussian,
            intensity: 5,
            objects: Vec::new(),
        }
    }
}

pub const INTENSITY_MIN: i32 = 1;
pub const INTENSITY_MAX: i32 = 10;

/// Closed vocabulary of detectable objects: the COCO label set plus "face".
pub const OBJECT_LABELS: &[&str] = &[
    "face",
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
];

pub fn is_allowed_object(label: &str) -> bool {
    OBJECT_LABELS.contains(&label)
}
