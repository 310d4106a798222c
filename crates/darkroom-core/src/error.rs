//! Error types for resource loading and parameter parsing.
//!
//! Curve configuration problems are never errors: malformed curves are
//! normalised to identity during evaluation. Only external resources
//! (CLUT files, parameter files) and buffer construction can fail.

use std::path::PathBuf;
use std::sync::Arc;

/// Failure to load or parse a 3D colour lookup table.
#[derive(Debug, thiserror::Error)]
pub enum ClutError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("missing LUT_3D_SIZE")]
    MissingSize,
    #[error("LUT size {0} out of range (2..=256)")]
    InvalidSize(usize),
    #[error("LUT data size mismatch: expected {expected} entries, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("1D LUTs are not supported as film simulations")]
    OneDimensional,
    #[error("unsupported CLUT format: {0}")]
    UnsupportedFormat(String),
    #[error("{width}x{height} is not a valid Hald CLUT geometry")]
    InvalidHald { width: u32, height: u32 },
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure of the film simulation stage. The image is left untouched.
#[derive(Debug, Clone, thiserror::Error)]
#[error("film simulation with {path} skipped: {source}")]
pub struct FilmSimError {
    pub path: PathBuf,
    #[source]
    pub source: Arc<ClutError>,
}

/// Failure to read processing parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid parameter JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Buffer construction with inconsistent dimensions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("plane {plane} has {actual} samples, expected {expected}")]
    PlaneLength {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("buffer has {actual} bytes, expected {expected}")]
    ByteLength { expected: usize, actual: usize },
}
