//! Crop-rectangle normalisation against the decoded image bounds.
//!
//! Client-supplied rectangles come from a browser selection UI: fractional
//! coordinates, negative origins, and sizes that overhang the image are all
//! routine. Rather than reject them, [`clamp`] always produces a valid
//! region — the pipeline must always have *something* to send downstream.
//!
//! Order matters: the origin is pinned inside the image first, then the size
//! is bounded against the space that remains, and rounding happens before
//! bounding so a rounded value cannot re-escape the bound.

use tracing::warn;

/// A raw, untrusted crop rectangle in image pixel space (top-left origin).
///
/// Fields are `f64` because clients send fractional CSS-pixel coordinates.
/// Consumed once per run; only [`clamp`] ever interprets it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A validated crop region, guaranteed to lie inside the image it was
/// clamped against: `x + width <= image_width`, `y + height <= image_height`,
/// `width >= 1`, `height >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Pixel area of the region.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Reconcile a raw rectangle with the actual image dimensions.
///
/// Pure and total: degenerate input (rectangle entirely outside the image,
/// zero or negative size, NaN coordinates) degrades to a 1×1 region at the
/// nearest valid corner instead of failing. A near-zero result is a signal
/// the client's selection was badly out of sync with the upload, so it is
/// logged at `warn` — but the run proceeds.
pub fn clamp(rect: CropRect, image_width: u32, image_height: u32) -> Region {
    let w = i64::from(image_width);
    let h = i64::from(image_height);

    // NaN rounds through `as` to 0, which lands on the nearest-corner policy.
    let mut x = (rect.x.round() as i64).clamp(0, w);
    let mut y = (rect.y.round() as i64).clamp(0, h);

    // Shrink the requested size to the space remaining past the origin.
    let mut width = rect.width;
    if x as f64 + width > w as f64 {
        width = (w - x) as f64;
    }
    let mut height = rect.height;
    if y as f64 + height > h as f64 {
        height = (h - y) as f64;
    }

    let width = (width.round() as i64).clamp(1, (w - x).max(1));
    let height = (height.round() as i64).clamp(1, (h - y).max(1));

    // The 1 px floor can overhang when the origin sat on the far edge;
    // pull the origin back so the invariant holds.
    if x + width > w {
        x = w - width;
    }
    if y + height > h {
        y = h - height;
    }

    let region = Region {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    };

    if region.area() <= 1 && rect.width * rect.height > 1.0 {
        warn!(
            "crop selection {:?} collapsed to {}x{} at ({}, {}) within {}x{} image",
            rect, region.width, region.height, region.x, region.y, image_width, image_height
        );
    }

    region
}
