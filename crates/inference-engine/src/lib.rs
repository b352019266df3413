//! Vision Inference Engine
//!
//! Wraps a pre-loaded vision model behind [`VisionModel`] and turns its raw
//! output into an engine-agnostic [`InferenceResult`].

mod config;
mod engine;
mod labels;
mod mock;
mod postprocess;
mod preprocess;
mod result;
mod tract;

pub use config::{ModelConfig, ModelTask};
pub use engine::{infer, BoxError, ModelHandle, ModelOutput, VisionModel};
pub use labels::ClassNames;
pub use mock::StaticModel;
pub use result::{ClassificationOutcome, DetectedObject, DetectionOutcome, InferenceResult};
pub use tract::TractModel;

use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Model returned no result")]
    EmptyResult,
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Unsupported model output: {0}")]
    UnsupportedOutput(String),
    #[error("Invalid class labels: {0}")]
    Labels(String),
}
