// THEORY:
// The loader is the only stage that touches the filesystem. It turns a path into
// an owned RGB buffer and hands out a bounded working copy for the numeric
// stages. The file handle lives inside `ImageReader` and is released when the
// reader is consumed or dropped, on the error paths as well.
//
// Downscaling is a throughput knob only: every downstream feature is a mean or a
// ratio, so a proportionally resampled buffer gives the same answers up to noise.

use crate::error::{VisionError, VisionResult};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// Longest side, in pixels, of the buffer the freshness features are computed on.
pub const DEFAULT_MAX_DIMENSION: u32 = 640;

/// Decodes the raster file at `path` into an RGB buffer.
///
/// The format is sniffed from the file contents, so a mislabelled extension
/// still decodes. Missing, empty, and corrupt files all map to
/// [`VisionError::Decode`].
pub fn load_rgb(path: &Path) -> VisionResult<RgbImage> {
    let decode_error = |source: image::ImageError| VisionError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let image = ImageReader::open(path)
        .map_err(|e| decode_error(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| decode_error(image::ImageError::IoError(e)))?
        .decode()
        .map_err(decode_error)?;

    debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded image");
    from_dynamic(&image)
}

/// Converts an already decoded image into the RGB layout the engine works on.
pub fn from_dynamic(image: &DynamicImage) -> VisionResult<RgbImage> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(VisionError::EmptyImage { width, height });
    }
    Ok(rgb)
}

/// Returns `rgb` scaled so that its longest side is at most `max_dimension`.
///
/// Buffers that already fit (or a `None` limit) are borrowed, not copied.
pub fn downscale(rgb: &RgbImage, max_dimension: Option<u32>) -> Cow<'_, RgbImage> {
    let Some(limit) = max_dimension.filter(|limit| *limit > 0) else {
        return Cow::Borrowed(rgb);
    };

    let (width, height) = rgb.dimensions();
    let longest = width.max(height);
    if longest <= limit {
        return Cow::Borrowed(rgb);
    }

    let scale = limit as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    debug!(width, height, new_width, new_height, "downscaling working buffer");

    Cow::Owned(image::imageops::resize(rgb, new_width, new_height, FilterType::Triangle))
}
