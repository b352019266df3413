//! Canned model for tests and local development

use std::sync::atomic::{AtomicUsize, Ordering};

use image_decoder::CanonicalImage;
use tracing::debug;

use crate::engine::{BoxError, ModelOutput, VisionModel};
use crate::labels::ClassNames;
use crate::result::DetectedObject;

/// Model that answers every call with the same outputs (or the same error)
#[derive(Debug)]
pub struct StaticModel {
    response: Result<Vec<ModelOutput>, String>,
    calls: AtomicUsize,
}

impl StaticModel {
    /// Answer with the given result objects
    pub fn new(outputs: Vec<ModelOutput>) -> Self {
        Self {
            response: Ok(outputs),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer with one probability distribution
    pub fn classifier(probs: Vec<f32>, names: Option<ClassNames>) -> Self {
        Self::new(vec![ModelOutput::classification(probs, names)])
    }

    /// Answer with one list of boxes
    pub fn detector(boxes: Vec<DetectedObject>, names: Option<ClassNames>) -> Self {
        Self::new(vec![ModelOutput::detection(boxes, names)])
    }

    /// Fail every call with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times the model has been invoked
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl VisionModel for StaticModel {
    fn run(&self, image: &CanonicalImage) -> Result<Vec<ModelOutput>, BoxError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        debug!("Static model invoked on {}x{} image", image.width(), image.height());
        self.response.clone().map_err(Into::into)
    }
}
