//! Input normalisation: raw upload bytes or a base64 data URI → one decoded
//! bitmap representation.
//!
//! Clients deliver screenshots two ways — a binary multipart upload, or a
//! `data:image/png;base64,…` string captured from a canvas. Both converge on
//! the same [`DynamicImage`] here, so everything downstream (clamp, crop,
//! encode) sees exactly one representation. Malformed payloads are rejected
//! before the job slot is touched: a bad upload must not disturb the
//! snapshot of the previous run.

use crate::error::SubmitError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use tracing::debug;

/// An image payload as received from the client.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Raw binary upload (PNG, JPEG, …; format is sniffed from the bytes).
    Bytes(Vec<u8>),
    /// A `data:<mime>;base64,<payload>` string.
    DataUri(String),
}

/// Decode a client payload into a bitmap.
///
/// Any failure — unparseable data URI, invalid base64, bytes that no decoder
/// recognises — is reported as [`SubmitError::InvalidImage`].
pub fn decode(input: ImageInput) -> Result<DynamicImage, SubmitError> {
    let bytes = match input {
        ImageInput::Bytes(b) => b,
        ImageInput::DataUri(uri) => data_uri_payload(&uri)?,
    };

    let img = image::load_from_memory(&bytes).map_err(|e| SubmitError::InvalidImage {
        detail: e.to_string(),
    })?;

    debug!("decoded {}x{} image ({} bytes)", img.width(), img.height(), bytes.len());
    Ok(img)
}

/// Strip the `data:<mime>;base64,` prefix and decode the remainder.
fn data_uri_payload(uri: &str) -> Result<Vec<u8>, SubmitError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| SubmitError::InvalidImage {
            detail: "data URI missing `data:` scheme".into(),
        })?;

    let (header, payload) = rest.split_once(',').ok_or_else(|| SubmitError::InvalidImage {
        detail: "data URI missing `,` separator".into(),
    })?;

    if !header.ends_with(";base64") {
        return Err(SubmitError::InvalidImage {
            detail: format!("unsupported data URI encoding: {header}"),
        });
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| SubmitError::InvalidImage {
            detail: format!("invalid base64 payload: {e}"),
        })
}
