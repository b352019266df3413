//! Model configuration

use serde::{Deserialize, Serialize};

/// What the loaded network predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTask {
    /// One probability distribution over classes
    Classify,
    /// Localized bounding boxes
    Detect,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX export
    pub path: String,

    /// Optional class-name table (text, one per line, or JSON)
    pub labels_path: Option<String>,

    /// Square network input size in pixels
    pub input_size: u32,

    /// Forced task; inferred from the output rank when unset
    pub task: Option<ModelTask>,

    /// Minimum detection confidence
    pub confidence_threshold: f32,

    /// IoU above which overlapping boxes of one class are suppressed
    pub iou_threshold: f32,

    /// Maximum detections kept per image
    pub max_detections: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "model/best.onnx".to_string(),
            labels_path: None,
            input_size: 640,
            task: None,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}
