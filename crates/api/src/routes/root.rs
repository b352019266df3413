//! Service banner

use axum::Json;
use serde::Serialize;

/// Response for `GET /`
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub endpoint: &'static str,
}

/// Liveness banner; answers even when the model failed to load
pub async fn index() -> Json<RootResponse> {
    Json(RootResponse {
        message: "YOLO Classification API is running",
        status: "active",
        endpoint: "/predict (POST)",
    })
}
