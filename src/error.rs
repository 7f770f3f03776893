//! Error types for raster access and shift search
//!
//! "No consistent shift" is not an error: the search reports it as `Ok(None)`.
//! Everything in here means the input itself was unusable.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the raster collaborator (file access, decoding, window reads)
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("raster not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported raster format: {0}")]
    Format(String),

    #[error(
        "window {ncols}x{nrows} at ({col}, {row}) is outside the {width}x{height} band"
    )]
    OutOfBounds {
        col: i64,
        row: i64,
        ncols: usize,
        nrows: usize,
        width: usize,
        height: usize,
    },

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RasterError {
    /// Window reads past the band extent are expected near tile edges
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}

/// Failures of the shift search itself
#[derive(Debug, Error)]
pub enum ShiftError {
    #[error("affine transform is not invertible (determinant {determinant})")]
    DegenerateTransform { determinant: f64 },

    #[error(
        "margin (w={west}, n={north}, e={east}, s={south}) leaves nothing of a {ncols}x{nrows} tile"
    )]
    InvalidMargin {
        west: usize,
        north: usize,
        east: usize,
        south: usize,
        ncols: usize,
        nrows: usize,
    },

    #[error("tile has no pixels")]
    EmptyTile,

    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_classification() {
        let err = RasterError::OutOfBounds {
            col: -1,
            row: 0,
            ncols: 4,
            nrows: 4,
            width: 10,
            height: 10,
        };
        assert!(err.is_out_of_bounds());
        assert!(!RasterError::Format("rgb".into()).is_out_of_bounds());
    }

    #[test]
    fn test_raster_error_is_transparent_in_shift_error() {
        let err: ShiftError = RasterError::NotFound(PathBuf::from("missing.tif")).into();
        assert_eq!(err.to_string(), "raster not found: missing.tif");
    }
}
