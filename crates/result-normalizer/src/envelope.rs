//! Public response shapes

use serde::{Deserialize, Serialize};

/// Metadata of the uploaded file, echoed verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: Option<String>,
    /// Upload size in bytes
    pub size: usize,
}

/// Top-class prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: usize,
    pub class_name: String,
    /// Rounded to 4 decimal places
    pub confidence: f64,
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    /// Rounded to 4 decimal places
    pub confidence: f64,
    /// [x1, y1, x2, y2] in source image pixels
    pub bbox: [f64; 4],
}

/// Success response body of `/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Classification {
        success: bool,
        prediction: Prediction,
        file_info: FileInfo,
    },
    Detection {
        success: bool,
        detections: Vec<Detection>,
        total_objects: usize,
        file_info: FileInfo,
    },
}

impl ResponseEnvelope {
    pub fn file_info(&self) -> &FileInfo {
        match self {
            ResponseEnvelope::Classification { file_info, .. } => file_info,
            ResponseEnvelope::Detection { file_info, .. } => file_info,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseEnvelope::Classification { .. } => "classification",
            ResponseEnvelope::Detection { .. } => "detection",
        }
    }
}
