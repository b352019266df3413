//! Result Normalization
//!
//! Turns an [`inference_engine::InferenceResult`] into one of the two stable
//! response envelopes served by the API.

mod envelope;
mod normalizer;

pub use envelope::{Detection, FileInfo, Prediction, ResponseEnvelope};
pub use normalizer::{normalize, resolve_class_name, round_confidence};

use thiserror::Error;

/// Errors during result normalization
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    /// The result carries neither a class distribution nor detections
    #[error("Model output has neither classification nor detection data")]
    UnrecognizedShape,
}
