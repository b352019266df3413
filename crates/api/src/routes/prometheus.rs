//! Prometheus exposition

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::detail_response;
use crate::AppState;

/// Render collected metrics in the Prometheus text format
pub async fn render(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => detail_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}
