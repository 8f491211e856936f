//! Image preparation: functional core.
//!
//! Pixel data in, upload-ready bytes out. No OS dependencies beyond reading
//! a file the caller names.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use super::{CaptureError, CapturedImage};

/// Upload payload limit before downscaling kicks in.
pub const MAX_UPLOAD_BYTES: usize = 4_000_000;

/// Long-edge size vision models handle without internal resampling.
pub const MAX_LONG_EDGE: u32 = 1568;

/// Turns a decoded frame into an upload-ready PNG.
///
/// The PNG is downscaled to [`MAX_LONG_EDGE`] only when it exceeds
/// [`MAX_UPLOAD_BYTES`].
pub fn prepare_frame(image: &DynamicImage) -> Result<CapturedImage, CaptureError> {
    let looks_like_scoreboard = looks_like_scoreboard(image);
    let png = encode_png(image)?;
    let (bytes, width, height) = if png.len() > MAX_UPLOAD_BYTES {
        let smaller = image.resize(MAX_LONG_EDGE, MAX_LONG_EDGE, FilterType::Lanczos3);
        log::info!(
            "[CAPTURE] PNG {} bytes over limit, downscaled {}x{} -> {}x{}",
            png.len(),
            image.width(),
            image.height(),
            smaller.width(),
            smaller.height()
        );
        (encode_png(&smaller)?, smaller.width(), smaller.height())
    } else {
        (png, image.width(), image.height())
    };

    Ok(CapturedImage {
        bytes,
        media_type: "image/png",
        width,
        height,
        looks_like_scoreboard,
    })
}

/// Reads and validates an image file for analysis.
///
/// Files already under the size limit are sent as-is in their own format;
/// larger ones go through [`prepare_frame`].
pub fn load_image_file(path: &Path) -> Result<CapturedImage, CaptureError> {
    let bytes = std::fs::read(path).map_err(|e| CaptureError::UnreadableFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let format = image::guess_format(&bytes).map_err(|e| CaptureError::UnreadableFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let media_type = media_type_for(format).ok_or_else(|| CaptureError::UnreadableFile {
        path: path.to_path_buf(),
        reason: format!("unsupported image format {format:?}"),
    })?;

    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
        CaptureError::UnreadableFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    if bytes.len() > MAX_UPLOAD_BYTES {
        return prepare_frame(&decoded);
    }

    Ok(CapturedImage {
        media_type,
        width: decoded.width(),
        height: decoded.height(),
        looks_like_scoreboard: looks_like_scoreboard(&decoded),
        bytes,
    })
}

/// Fast check for the scoreboard's solid header band.
///
/// Samples y ∈ [2%, 6%), x ∈ [35%, 65%): clear of the tabs on the left and
/// the map name on the right: and accepts at most two distinct colours to
/// allow for compression noise.
pub fn looks_like_scoreboard(image: &DynamicImage) -> bool {
    let (w, h) = (image.width(), image.height());
    let (y0, y1) = (h * 2 / 100, h * 6 / 100);
    let (x0, x1) = (w * 35 / 100, w * 65 / 100);
    if y1 <= y0 || x1 <= x0 {
        return false;
    }

    let rgb = image.to_rgb8();
    let mut seen: Vec<[u8; 3]> = Vec::with_capacity(3);
    for y in y0..y1 {
        for x in x0..x1 {
            let px = rgb.get_pixel(x, y).0;
            if !seen.contains(&px) {
                seen.push(px);
                if seen.len() > 2 {
                    return false;
                }
            }
        }
    }
    true
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CaptureError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
    Ok(png_bytes)
}

/// Media types the vision API accepts.
fn media_type_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}
