//! Engine-agnostic inference results

use crate::labels::ClassNames;

/// One localized object
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    /// Class index
    pub class_id: usize,
    /// Detection confidence (0.0 to 1.0)
    pub confidence: f32,
    /// Bounding box [x1, y1, x2, y2] in source image pixels
    pub bbox: [f32; 4],
}

/// Single top-class prediction
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    pub class_id: usize,
    /// Probability of `class_id` (0.0 to 1.0)
    pub confidence: f32,
    pub names: Option<ClassNames>,
}

/// Objects in the order the engine returned them
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    pub objects: Vec<DetectedObject>,
    pub names: Option<ClassNames>,
}

/// Result of one inference call; exactly one shape holds
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceResult {
    Classification(ClassificationOutcome),
    Detection(DetectionOutcome),
    /// The engine answered but with neither probabilities nor boxes
    Empty,
}

impl InferenceResult {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceResult::Classification(_) => "classification",
            InferenceResult::Detection(_) => "detection",
            InferenceResult::Empty => "empty",
        }
    }
}
