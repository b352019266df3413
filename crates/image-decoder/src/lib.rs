//! Image Decoder
//!
//! Turns uploaded bytes into a [`CanonicalImage`]:
//! - container format is sniffed from the bytes, never from the declared MIME type
//! - any raster format enabled in the `image` crate is accepted
//! - alpha, greyscale and high bit-depth sources are converted to 8-bit RGB

pub mod frame;

pub use frame::CanonicalImage;

use std::io::Cursor;

use image::{DynamicImage, ImageError, ImageReader};
use thiserror::Error;
use tracing::debug;

/// Decoder error types
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Image payload is empty")]
    Empty,

    #[error("Image could not be decoded: {0}")]
    Malformed(#[from] ImageError),

    #[error("Failed to read image header: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode raw bytes into a canonical RGB image
pub fn decode(bytes: &[u8]) -> Result<CanonicalImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let source_format = reader.format();
    let decoded = reader.decode()?;
    let source_color = decoded.color();

    let rgb = match decoded {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            debug!("Converting {:?} image to RGB8", source_color);
            other.to_rgb8()
        }
    };

    debug!(
        "Decoded {:?} image {}x{}",
        source_format,
        rgb.width(),
        rgb.height()
    );

    Ok(CanonicalImage::from_decoded(rgb, source_color, source_format))
}
