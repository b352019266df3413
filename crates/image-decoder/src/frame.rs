//! Canonical image type shared by the decoder and the inference engine

use image::{ColorType, ImageFormat, RgbImage};

/// Decoded 8-bit RGB image
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    /// RGB pixel data (width * height * 3)
    rgb: RgbImage,
    /// Colour model of the encoded source
    source_color: ColorType,
    /// Container format detected from the bytes
    source_format: Option<ImageFormat>,
}

impl CanonicalImage {
    /// Wrap an RGB buffer that did not come from an encoded upload
    pub fn from_rgb(rgb: RgbImage) -> Self {
        Self {
            rgb,
            source_color: ColorType::Rgb8,
            source_format: None,
        }
    }

    pub(crate) fn from_decoded(
        rgb: RgbImage,
        source_color: ColorType,
        source_format: Option<ImageFormat>,
    ) -> Self {
        Self {
            rgb,
            source_color,
            source_format,
        }
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Borrow the RGB buffer
    pub fn as_rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// Take ownership of the RGB buffer
    pub fn into_rgb(self) -> RgbImage {
        self.rgb
    }

    /// Colour model the upload was encoded with, before conversion
    pub fn source_color(&self) -> ColorType {
        self.source_color
    }

    /// Whether decoding had to convert the colour model
    pub fn was_converted(&self) -> bool {
        self.source_color != ColorType::Rgb8
    }

    pub fn source_format(&self) -> Option<ImageFormat> {
        self.source_format
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.rgb.get_pixel(x, y).0)
    }
}
