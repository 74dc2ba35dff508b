//! Image encoding: rendered surface → PNG bytes, data URL, or VLM `ImageData`.
//!
//! PNG is lossless, so "maximum quality" only affects size and speed; we
//! still ask for the best compression since the output is stored, not
//! streamed.

use crate::error::ReviewError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::debug;

/// Encode an RGBA surface as PNG.
///
/// Fails with [`ReviewError::EncodingFailed`] if the encoder errors or
/// produces no bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ReviewError> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| ReviewError::EncodingFailed {
            detail: e.to_string(),
        })?;

    if buf.is_empty() {
        return Err(ReviewError::EncodingFailed {
            detail: "encoder produced no data".into(),
        });
    }

    debug!("Encoded {}x{} surface → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// `data:<mime>;base64,<payload>` for immediate display.
pub fn data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Wrap PNG bytes as a base64 image attachment for the VLM.
///
/// `detail: "high"` keeps small print legible to GPT-4-class models.
pub fn to_image_data(png: &[u8]) -> ImageData {
    ImageData::new(STANDARD.encode(png), "image/png").with_detail("high")
}
