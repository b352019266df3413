//! Image to tensor conversion

use image::{imageops, Rgb, RgbImage};
use tract_onnx::prelude::*;

/// Padding colour used by YOLO letterboxing
const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

/// Geometry of a letterboxed input, used to map boxes back to the source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Compute the letterbox fitting `width`x`height` into a `size` square
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let (new_w, new_h) = scaled_dims(width, height, scale);
        Self {
            scale,
            pad_x: (size.saturating_sub(new_w) / 2) as f32,
            pad_y: (size.saturating_sub(new_h) / 2) as f32,
            source_width: width,
            source_height: height,
        }
    }

    /// Map an [x1, y1, x2, y2] box from network space to source pixels, clamped to the image
    pub fn to_source(&self, bbox: [f32; 4]) -> [f32; 4] {
        let w = self.source_width as f32;
        let h = self.source_height as f32;
        [
            ((bbox[0] - self.pad_x) / self.scale).clamp(0.0, w),
            ((bbox[1] - self.pad_y) / self.scale).clamp(0.0, h),
            ((bbox[2] - self.pad_x) / self.scale).clamp(0.0, w),
            ((bbox[3] - self.pad_y) / self.scale).clamp(0.0, h),
        ]
    }
}

fn scaled_dims(width: u32, height: u32, scale: f32) -> (u32, u32) {
    (
        ((width as f32 * scale).round() as u32).max(1),
        ((height as f32 * scale).round() as u32).max(1),
    )
}

/// Resize keeping aspect ratio and pad to a `size` square
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let geometry = Letterbox::fit(image.width(), image.height(), size);
    let (new_w, new_h) = scaled_dims(image.width(), image.height(), geometry.scale);

    let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, LETTERBOX_FILL);
    imageops::overlay(
        &mut canvas,
        &resized,
        geometry.pad_x as i64,
        geometry.pad_y as i64,
    );

    (canvas, geometry)
}

/// Crop the centre square of the source and resize it to `size`.
///
/// Same framing as resizing the shorter side first; memory stays bounded by
/// the source and one `side` square regardless of aspect ratio.
pub fn center_crop(image: &RgbImage, size: u32) -> RgbImage {
    let side = image.width().min(image.height());
    let x = (image.width() - side) / 2;
    let y = (image.height() - side) / 2;

    let square = imageops::crop_imm(image, x, y, side, side).to_image();
    imageops::resize(&square, size, size, imageops::FilterType::Triangle)
}

/// NCHW float tensor scaled to [0, 1]
pub fn to_tensor(image: &RgbImage) -> Tensor {
    let (w, h) = (image.width() as usize, image.height() as usize);
    tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
        image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
    .into_tensor()
}
