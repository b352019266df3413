//! Inference adapter and process-wide model handle

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use image_decoder::CanonicalImage;
use tracing::{debug, error, info, warn};

use crate::config::ModelConfig;
use crate::labels::ClassNames;
use crate::result::{ClassificationOutcome, DetectedObject, DetectionOutcome, InferenceResult};
use crate::tract::TractModel;
use crate::InferenceError;

/// Error type raised by model backends
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw result object as produced by a model backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
    /// Class probability distribution, for classifiers
    pub probs: Option<Vec<f32>>,
    /// Localized detections, for detectors
    pub boxes: Option<Vec<DetectedObject>>,
    /// Class-index to name table
    pub names: Option<ClassNames>,
}

impl ModelOutput {
    pub fn classification(probs: Vec<f32>, names: Option<ClassNames>) -> Self {
        Self {
            probs: Some(probs),
            boxes: None,
            names,
        }
    }

    pub fn detection(boxes: Vec<DetectedObject>, names: Option<ClassNames>) -> Self {
        Self {
            probs: None,
            boxes: Some(boxes),
            names,
        }
    }
}

/// A loaded vision model.
///
/// Implementations are invoked concurrently from many requests through a
/// shared reference, so any internal mutable state must be synchronized by
/// the implementation itself.
pub trait VisionModel: Send + Sync {
    /// Run the model once on one image
    fn run(&self, image: &CanonicalImage) -> Result<Vec<ModelOutput>, BoxError>;
}

/// Invoke the model exactly once and resolve the shape of its first result.
///
/// An engine that answers with no result objects at all is an error. A
/// detector that answers with zero boxes is a valid, empty detection.
pub fn infer(
    model: &dyn VisionModel,
    image: &CanonicalImage,
) -> Result<InferenceResult, InferenceError> {
    let outputs = catch_unwind(AssertUnwindSafe(|| model.run(image)))
        .map_err(|panic| InferenceError::InferenceFailed(panic_message(panic.as_ref())))?
        .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

    debug!("Model returned {} result object(s)", outputs.len());

    let first = outputs
        .into_iter()
        .next()
        .ok_or(InferenceError::EmptyResult)?;

    Ok(resolve(first))
}

fn resolve(output: ModelOutput) -> InferenceResult {
    let ModelOutput {
        probs,
        boxes,
        names,
    } = output;

    if let Some(probs) = probs.filter(|p| !p.is_empty()) {
        let class_id = top1(&probs);
        let confidence = probs[class_id];
        if !confidence.is_finite() {
            warn!("Top class score is {}, discarding classification", confidence);
            return InferenceResult::Empty;
        }
        return InferenceResult::Classification(ClassificationOutcome {
            class_id,
            confidence,
            names,
        });
    }

    match boxes {
        Some(mut objects) => {
            let before = objects.len();
            objects.retain(|o| o.confidence.is_finite() && o.bbox.iter().all(|v| v.is_finite()));
            let dropped = before - objects.len();
            if dropped > 0 {
                warn!("Dropped {} detection(s) with non-finite values", dropped);
            }
            InferenceResult::Detection(DetectionOutcome { objects, names })
        }
        None => InferenceResult::Empty,
    }
}

/// Index of the highest score; the first one wins on ties and NaN never wins
fn top1(probs: &[f32]) -> usize {
    let mut best = 0;
    for (idx, &p) in probs.iter().enumerate().skip(1) {
        if p > probs[best] || (probs[best].is_nan() && !p.is_nan()) {
            best = idx;
        }
    }
    best
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("model panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("model panicked: {}", msg)
    } else {
        "model panicked".to_string()
    }
}

/// Process-wide model handle, loaded once before serving
#[derive(Clone)]
pub enum ModelHandle {
    Ready(Arc<dyn VisionModel>),
    Unavailable { reason: String },
}

impl ModelHandle {
    /// Load the configured ONNX model; a failure degrades to `Unavailable`
    pub fn load(config: &ModelConfig) -> Self {
        match TractModel::load(config) {
            Ok(model) => {
                info!("Model loaded successfully");
                Self::Ready(Arc::new(model))
            }
            Err(e) => {
                error!("Failed to load model: {}", e);
                Self::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Wrap an already constructed model
    pub fn ready(model: impl VisionModel + 'static) -> Self {
        Self::Ready(Arc::new(model))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Shared model, if it loaded
    pub fn get(&self) -> Option<&Arc<dyn VisionModel>> {
        match self {
            Self::Ready(model) => Some(model),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("ModelHandle::Ready"),
            Self::Unavailable { reason } => f
                .debug_struct("ModelHandle::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}
