//! Raster access consumed by the shift search
//!
//! The search only needs [`RasterBand`]: "give me the samples of this pixel
//! window". [`Raster`] is the in-memory single-band implementation that the
//! GeoTIFF reader produces and the writer consumes.

pub mod geotiff;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::RasterError;
use crate::geometry::AffineTransform;

pub use geotiff::{read_geotiff, write_geotiff, GeoTiffCompression};

/// One band of 8-bit samples, indexed `[row, col]`
pub type PixelArray = Array2<u8>;

/// Read access to a single raster band
pub trait RasterBand {
    /// Band extent as `(ncols, nrows)`
    fn size(&self) -> (usize, usize);

    /// Read an `ncols` x `nrows` window whose top-left pixel is `(col, row)`.
    ///
    /// Windows that leave the band, including negative origins, fail with
    /// [`RasterError::OutOfBounds`].
    fn read_window(
        &self,
        col: i64,
        row: i64,
        ncols: usize,
        nrows: usize,
    ) -> Result<PixelArray, RasterError>;

    /// Read the entire band
    fn read_all(&self) -> Result<PixelArray, RasterError> {
        let (ncols, nrows) = self.size();
        self.read_window(0, 0, ncols, nrows)
    }

    /// Declared no-data value, if any
    fn nodata(&self) -> Option<f64> {
        None
    }
}

/// GeoTIFF projection keys, carried verbatim between files
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoKeys {
    pub directory: Vec<u16>,
    pub double_params: Option<Vec<f64>>,
    pub ascii_params: Option<String>,
}

/// Single-band byte raster held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub pixels: PixelArray,
    pub transform: AffineTransform,
    pub nodata: Option<f64>,
    pub projection: Option<GeoKeys>,
}

impl Raster {
    pub fn new(pixels: PixelArray, transform: AffineTransform) -> Self {
        Self {
            pixels,
            transform,
            nodata: None,
            projection: None,
        }
    }

    /// Raster of `ncols` x `nrows` pixels all set to `value`
    pub fn filled(ncols: usize, nrows: usize, value: u8, transform: AffineTransform) -> Self {
        Self::new(Array2::from_elem((nrows, ncols), value), transform)
    }

    #[must_use]
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    #[must_use]
    pub fn with_projection(mut self, projection: GeoKeys) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn ncols(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn nrows(&self) -> usize {
        self.pixels.nrows()
    }
}

impl RasterBand for Raster {
    fn size(&self) -> (usize, usize) {
        (self.ncols(), self.nrows())
    }

    fn read_window(
        &self,
        col: i64,
        row: i64,
        ncols: usize,
        nrows: usize,
    ) -> Result<PixelArray, RasterError> {
        let (width, height) = self.size();
        let out_of_bounds = || RasterError::OutOfBounds {
            col,
            row,
            ncols,
            nrows,
            width,
            height,
        };

        let c0 = usize::try_from(col).map_err(|_| out_of_bounds())?;
        let r0 = usize::try_from(row).map_err(|_| out_of_bounds())?;
        let fits = |start: usize, len: usize, extent: usize| {
            start.checked_add(len).is_some_and(|end| end <= extent)
        };
        if !fits(c0, ncols, width) || !fits(r0, nrows, height) {
            return Err(out_of_bounds());
        }

        Ok(self.pixels.slice(s![r0..r0 + nrows, c0..c0 + ncols]).to_owned())
    }

    fn read_all(&self) -> Result<PixelArray, RasterError> {
        Ok(self.pixels.clone())
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }
}
