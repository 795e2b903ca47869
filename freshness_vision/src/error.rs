// THEORY:
// Every stage of the engine reports failure through `VisionError`. The stages
// themselves propagate with `?`; only the top-level `FreshnessPipeline` turns an
// error into a degraded result, so the failure taxonomy stays visible to tests
// while callers of `analyze` never see an `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning an image file into an analysis.
#[derive(Error, Debug)]
pub enum VisionError {
    /// The file is missing, unreadable, or not a decodable raster image.
    #[error("failed to decode image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The decoder produced a buffer with no pixels.
    #[error("image has zero area ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// A numeric stage could not produce a value from the buffers it was given.
    #[error("computation failed: {0}")]
    Computation(String),

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl VisionError {
    pub fn computation(message: impl Into<String>) -> Self {
        VisionError::Computation(message.into())
    }

    /// True for failures that happened before any pixel was available.
    pub fn is_decode(&self) -> bool {
        matches!(self, VisionError::Decode { .. } | VisionError::EmptyImage { .. })
    }
}

pub type VisionResult<T> = Result<T, VisionError>;
