//! Route handlers

pub mod predict;
pub mod prometheus;
pub mod root;

use axum::{http::StatusCode, response::Response};

use crate::error::detail_response;

/// Fallback for unknown paths
pub async fn not_found() -> Response {
    detail_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Fallback for known paths hit with the wrong method
pub async fn method_not_allowed() -> Response {
    detail_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}
