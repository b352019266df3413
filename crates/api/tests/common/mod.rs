//! Shared fixtures for API tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use api::{create_router, AppState};
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use inference_engine::{ModelHandle, StaticModel, VisionModel};

pub const BOUNDARY: &str = "vision-test-boundary";

/// Encoded solid-red PNG
pub fn red_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([255u8, 0, 0]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// One multipart part; `None` leaves the header out
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(filename: &'a str, content_type: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some(filename),
            content_type: Some(content_type),
            bytes,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn predict_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn router_with(model: Arc<dyn VisionModel>) -> Router {
    create_router(Arc::new(AppState::new(ModelHandle::Ready(model))))
}

pub fn router_without_model() -> Router {
    create_router(Arc::new(AppState::new(ModelHandle::unavailable(
        "model/best.onnx: No such file or directory",
    ))))
}

pub fn shared(model: StaticModel) -> Arc<StaticModel> {
    Arc::new(model)
}
