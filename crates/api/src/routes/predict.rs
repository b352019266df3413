//! `POST /predict`: upload -> decode -> infer -> normalize

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inference_engine::VisionModel;
use result_normalizer::{normalize, FileInfo, ResponseEnvelope};
use tracing::{info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::error::PredictError;
use crate::AppState;

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

/// One uploaded file, alive for the duration of the request
#[derive(Debug)]
pub struct UploadedPayload {
    pub bytes: Bytes,
    pub filename: Option<String>,
}

impl UploadedPayload {
    fn file_info(&self) -> FileInfo {
        FileInfo {
            filename: self.filename.clone(),
            size: self.bytes.len(),
        }
    }
}

/// Classify or detect objects in one uploaded image
pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let span = info_span!("predict", request_id = %Uuid::new_v4());

    let outcome = process(&state, multipart).instrument(span.clone()).await;

    span.in_scope(|| match outcome {
        Ok(envelope) => {
            metrics::counter!("predict_requests_total", "outcome" => "success").increment(1);
            (StatusCode::OK, Json(envelope)).into_response()
        }
        Err(err) => {
            metrics::counter!("predict_requests_total", "outcome" => err.kind()).increment(1);
            err.log();
            err.into_response()
        }
    })
}

async fn process(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ResponseEnvelope, PredictError> {
    let model = state
        .model
        .get()
        .cloned()
        .ok_or(PredictError::ServiceUnavailable)?;

    let upload = read_upload(multipart?).await?;
    if upload.bytes.is_empty() {
        return Err(PredictError::EmptyPayload);
    }

    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| run_pipeline(model.as_ref(), &upload)))
        .await?
}

/// Find the `file` field and validate its declared type before reading the body
async fn read_upload(mut multipart: Multipart) -> Result<UploadedPayload, PredictError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        if !is_image_type(content_type.as_deref()) {
            return Err(PredictError::InvalidContentType { content_type });
        }

        let filename = field.file_name().map(str::to_string);
        info!(
            "Processing file: {:?} ({})",
            filename,
            content_type.as_deref().unwrap_or_default()
        );

        let bytes = field.bytes().await?;
        return Ok(UploadedPayload { bytes, filename });
    }

    Err(PredictError::MissingFile)
}

fn is_image_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("image/"))
}

/// Decode, infer and normalize on the blocking pool
fn run_pipeline(
    model: &dyn VisionModel,
    upload: &UploadedPayload,
) -> Result<ResponseEnvelope, PredictError> {
    let image = image_decoder::decode(&upload.bytes)?;

    let start = Instant::now();
    let result = inference_engine::infer(model, &image)?;
    metrics::histogram!("predict_inference_seconds").record(start.elapsed().as_secs_f64());
    info!("Prediction completed");

    let envelope = normalize(result, upload.file_info())?;
    match &envelope {
        ResponseEnvelope::Classification { prediction, .. } => {
            info!("Prediction successful: {:?}", prediction)
        }
        ResponseEnvelope::Detection { total_objects, .. } => {
            info!("Detection successful: {} objects detected", total_objects)
        }
    }

    Ok(envelope)
}
