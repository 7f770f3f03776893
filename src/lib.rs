//! Snap raster tiles onto a reference raster grid.
//!
//! A tile is matched against the reference by testing the integer grid
//! origins around its georeferenced position. When the whole tile does not
//! match, bands along its edges (likely overwritten by neighbouring tiles)
//! are excluded until a consistent match is found.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod raster;

pub use algorithms::*;
pub use config::{Config, SearchConfig};
pub use error::{RasterError, ShiftError};
pub use geometry::*;
pub use pipeline::{apply_shift, compute_shift, run_batch, shift_raster, shift_tile};
pub use raster::{read_geotiff, write_geotiff, GeoKeys, PixelArray, Raster, RasterBand};

pub type Result<T> = anyhow::Result<T>;
