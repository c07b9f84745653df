//! Decoding uploaded bytes into RGB rasters.

use image::RgbImage;

use crate::error::{VisionError, VisionResult};

/// Decode uploaded bytes into an RGB raster.
///
/// Accepts any still-image format the `image` crate can sniff (JPEG and PNG
/// in practice). Unreadable bytes yield a `Decode` error, which the batch
/// pipeline treats as a per-file failure.
pub fn decode_image(bytes: &[u8]) -> VisionResult<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|e| VisionError::decode(e.to_string()))?;
    Ok(img.to_rgb8())
}
