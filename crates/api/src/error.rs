//! Request error taxonomy and its JSON rendering

use std::any::Any;

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use image_decoder::DecodeError;
use inference_engine::InferenceError;
use result_normalizer::NormalizeError;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

/// Every way a `/predict` request can fail.
///
/// `Display` is the client-facing `detail`; the underlying cause stays in the
/// server log.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model not available. Please check server logs.")]
    ServiceUnavailable,

    #[error("File harus berupa gambar (jpg, png, etc.)")]
    InvalidContentType { content_type: Option<String> },

    #[error("File gambar kosong")]
    EmptyPayload,

    #[error("Format gambar tidak valid atau rusak")]
    Decode(#[source] DecodeError),

    #[error("Gagal melakukan prediksi")]
    Inference(#[source] InferenceError),

    #[error("Tidak ada hasil prediksi")]
    EmptyInferenceResult,

    #[error("Model tidak menghasilkan hasil yang diharapkan")]
    UnrecognizedResultShape,

    #[error("Field 'file' is required")]
    MissingFile,

    #[error("{detail}")]
    Multipart { status: StatusCode, detail: String },

    #[error("Internal server error: {0}")]
    Unclassified(String),
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::InvalidContentType { .. }
            | PredictError::EmptyPayload
            | PredictError::Decode(_) => StatusCode::BAD_REQUEST,
            PredictError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::Multipart { status, .. } => *status,
            PredictError::Inference(_)
            | PredictError::EmptyInferenceResult
            | PredictError::UnrecognizedResultShape
            | PredictError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::ServiceUnavailable => "service_unavailable",
            PredictError::InvalidContentType { .. } => "invalid_content_type",
            PredictError::EmptyPayload => "empty_payload",
            PredictError::Decode(_) => "decode_error",
            PredictError::Inference(_) => "inference_error",
            PredictError::EmptyInferenceResult => "empty_inference_result",
            PredictError::UnrecognizedResultShape => "unrecognized_result_shape",
            PredictError::MissingFile => "missing_file",
            PredictError::Multipart { .. } => "invalid_multipart",
            PredictError::Unclassified(_) => "unclassified",
        }
    }

    /// Write the server-side log entry for this failure
    pub fn log(&self) {
        match self {
            PredictError::Inference(cause) => error!("Prediction error: {}", cause),
            PredictError::Unclassified(cause) => error!("Unexpected error: {}", cause),
            PredictError::Decode(cause) => warn!("Image processing error: {}", cause),
            PredictError::InvalidContentType { content_type } => {
                warn!("Rejected upload with content type {:?}", content_type)
            }
            PredictError::ServiceUnavailable
            | PredictError::EmptyInferenceResult
            | PredictError::UnrecognizedResultShape => error!("{}", self),
            other => warn!("Rejected request: {}", other),
        }
    }
}

impl From<DecodeError> for PredictError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Empty => PredictError::EmptyPayload,
            other => PredictError::Decode(other),
        }
    }
}

impl From<InferenceError> for PredictError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::EmptyResult => PredictError::EmptyInferenceResult,
            other => PredictError::Inference(other),
        }
    }
}

impl From<NormalizeError> for PredictError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::UnrecognizedShape => PredictError::UnrecognizedResultShape,
        }
    }
}

impl From<MultipartError> for PredictError {
    fn from(err: MultipartError) -> Self {
        PredictError::Multipart {
            status: err.status(),
            detail: err.body_text(),
        }
    }
}

impl From<MultipartRejection> for PredictError {
    fn from(rejection: MultipartRejection) -> Self {
        PredictError::Multipart {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<JoinError> for PredictError {
    fn from(err: JoinError) -> Self {
        if err.is_panic() {
            PredictError::Unclassified(panic_message(err.into_panic().as_ref()))
        } else {
            PredictError::Unclassified(err.to_string())
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// JSON `{detail}` response for transport-level errors
pub fn detail_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

/// Last-resort handler for panics escaping a route
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_message(panic.as_ref());
    error!("Global exception handler: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": "Internal server error",
            "detail": detail,
        })),
    )
        .into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
