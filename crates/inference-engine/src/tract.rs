//! ONNX backend using tract

use image_decoder::CanonicalImage;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::config::{ModelConfig, ModelTask};
use crate::engine::{BoxError, ModelOutput, VisionModel};
use crate::labels::ClassNames;
use crate::postprocess::{class_probabilities, decode_detections, DetectionParams};
use crate::preprocess::{center_crop, letterbox, to_tensor};
use crate::InferenceError;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Optimized tract plan for a YOLO-style ONNX export.
///
/// The plan is immutable after loading and `run` only borrows it, so one
/// instance serves concurrent requests without locking.
pub struct TractModel {
    plan: Plan,
    task: ModelTask,
    input_size: u32,
    names: Option<ClassNames>,
    detection: DetectionParams,
}

impl TractModel {
    /// Load and optimize the configured model
    pub fn load(config: &ModelConfig) -> Result<Self, InferenceError> {
        info!("Loading ONNX model from {}", config.path);

        if config.input_size == 0 {
            return Err(InferenceError::InvalidInputShape {
                expected: "input_size > 0".to_string(),
                actual: "0".to_string(),
            });
        }

        let model = optimize(&config.path, config.input_size as usize)
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", config.path, e)))?;

        Self::from_model(model, config)
    }

    /// Wrap an already built graph taking one `[1, 3, S, S]` input
    fn from_model(model: TypedModel, config: &ModelConfig) -> Result<Self, InferenceError> {
        let task = match config.task {
            Some(task) => task,
            None => detect_task(&model)?,
        };

        let plan = model
            .into_runnable()
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

        let names = config
            .labels_path
            .as_deref()
            .map(ClassNames::load)
            .transpose()?;

        info!(
            "ONNX model ready: task={:?}, input={}x{}, classes={}",
            task,
            config.input_size,
            config.input_size,
            names.as_ref().map_or(0, ClassNames::len)
        );

        Ok(Self {
            plan,
            task,
            input_size: config.input_size,
            names,
            detection: DetectionParams {
                confidence_threshold: config.confidence_threshold,
                iou_threshold: config.iou_threshold,
                max_detections: config.max_detections,
            },
        })
    }

    pub fn task(&self) -> ModelTask {
        self.task
    }

    fn classify(&self, image: &CanonicalImage) -> Result<ModelOutput, BoxError> {
        let input = to_tensor(&center_crop(image.as_rgb(), self.input_size));
        let outputs = self.plan.run(tvec!(input.into_tvalue()))?;
        let output = outputs.first().ok_or("model produced no output tensor")?;

        let scores: Vec<f32> = output.to_array_view::<f32>()?.iter().copied().collect();
        Ok(ModelOutput::classification(
            class_probabilities(scores),
            self.names.clone(),
        ))
    }

    fn detect(&self, image: &CanonicalImage) -> Result<ModelOutput, BoxError> {
        let (padded, geometry) = letterbox(image.as_rgb(), self.input_size);
        let input = to_tensor(&padded);
        let outputs = self.plan.run(tvec!(input.into_tvalue()))?;
        let output = outputs.first().ok_or("model produced no output tensor")?;

        let boxes = decode_detections(output.to_array_view::<f32>()?, &self.detection, &geometry)?;
        Ok(ModelOutput::detection(boxes, self.names.clone()))
    }
}

impl VisionModel for TractModel {
    fn run(&self, image: &CanonicalImage) -> Result<Vec<ModelOutput>, BoxError> {
        let start = std::time::Instant::now();

        let output = match self.task {
            ModelTask::Classify => self.classify(image)?,
            ModelTask::Detect => self.detect(image)?,
        };

        debug!("Inference completed in {}ms", start.elapsed().as_millis());
        Ok(vec![output])
    }
}

fn optimize(path: &str, size: usize) -> TractResult<TypedModel> {
    tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(0, f32::fact([1, 3, size, size]).into())?
        .into_optimized()
}

/// Rank 2 outputs are class scores, rank 3 outputs are detection heads
fn detect_task(model: &TypedModel) -> Result<ModelTask, InferenceError> {
    let fact = model
        .output_fact(0)
        .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

    match fact.rank() {
        2 => Ok(ModelTask::Classify),
        3 => Ok(ModelTask::Detect),
        rank => Err(InferenceError::UnsupportedOutput(format!(
            "output rank {} (shape {:?})",
            rank, fact.shape
        ))),
    }
}
