//! Crop and re-encode: `DynamicImage` + validated region → base64 PNG data URI.
//!
//! Vision APIs accept images as base64 data URIs embedded in the JSON request
//! body. PNG is chosen over JPEG because it is lossless — the cropped region
//! is usually dense text, and compression artefacts on rendered text degrade
//! what the model can read. The exact `data:image/png;base64,` prefix is
//! preserved so any downstream consumer expecting to re-decode the URI gets
//! the MIME type it was promised.

use crate::error::SubmitError;
use crate::pipeline::geometry::Region;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Crop `img` to `region` and encode the result as a PNG data URI.
///
/// `region` must come from [`crate::pipeline::geometry::clamp`] against this
/// image's dimensions; the crop itself then cannot go out of bounds.
pub fn crop_to_data_uri(img: &DynamicImage, region: Region) -> Result<String, SubmitError> {
    let cropped = img.crop_imm(region.x, region.y, region.width, region.height);

    let mut buf = Vec::new();
    cropped
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| SubmitError::InvalidImage {
            detail: format!("PNG encoding failed: {e}"),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "cropped to {}x{} at ({}, {}) → {} bytes base64",
        region.width, region.height, region.x, region.y, b64.len()
    );

    Ok(format!("data:image/png;base64,{b64}"))
}
