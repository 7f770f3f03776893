use ndarray::{s, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::overlap::{exclusion_order, Margin, OverlapMask};
use crate::config::SearchConfig;
use crate::error::{RasterError, ShiftError};
use crate::geometry::AffineTransform;
use crate::logging::ShiftSearchSpan;
use crate::raster::RasterBand;

/// Offsets from the floored reference-grid origin, visited in this order
const CANDIDATE_OFFSETS: [(i64, i64); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Geographic translation to add to a tile's transform origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoShift {
    pub dx: f64,
    pub dy: f64,
}

/// A found shift together with the edges that had to be excluded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileShift {
    pub shift: GeoShift,
    pub overlap: OverlapMask,
}

impl TileShift {
    pub fn dx(&self) -> f64 {
        self.shift.dx
    }

    pub fn dy(&self) -> f64 {
        self.shift.dy
    }
}

/// Integer-pixel shift search of tiles against one reference band
pub struct ShiftSearch<'a, B: RasterBand + ?Sized> {
    reference: &'a B,
    reference_transform: AffineTransform,
    config: SearchConfig,
}

impl<'a, B: RasterBand + ?Sized> ShiftSearch<'a, B> {
    pub fn new(reference: &'a B, reference_transform: AffineTransform) -> Self {
        Self {
            reference,
            reference_transform,
            config: SearchConfig::default(),
        }
    }

    /// Replace the search parameters. A divisor below 3 or a zero sentinel
    /// is rejected here so the search itself never sees them.
    pub fn with_config(mut self, config: SearchConfig) -> Result<Self, ShiftError> {
        config
            .validate()
            .map_err(|errors| ShiftError::InvalidConfig(errors.join("; ")))?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Test one margin: trim the tile, map its NW corner onto the reference
    /// grid and compare against the four neighbouring integer origins.
    ///
    /// Returns `Ok(None)` when no candidate is consistent. Candidates whose
    /// window falls outside the reference are skipped.
    pub fn try_shift(
        &self,
        tile: ArrayView2<'_, u8>,
        tile_transform: &AffineTransform,
        margin: Margin,
    ) -> Result<Option<GeoShift>, ShiftError> {
        if tile.is_empty() {
            return Err(ShiftError::EmptyTile);
        }
        let (ncols, nrows) = margin.trimmed_size(tile.ncols(), tile.nrows())?;
        let trimmed = tile.slice(s![
            margin.north..margin.north + nrows,
            margin.west..margin.west + ncols
        ]);

        let (nw_x, nw_y) = tile_transform.to_geo(margin.west as f64, margin.north as f64);
        let (col, row) = self.reference_transform.to_grid(nw_x, nw_y)?;
        let (col0, row0) = (col.floor() as i64, row.floor() as i64);

        for (dc, dr) in CANDIDATE_OFFSETS {
            // Saturated far-off origins cannot name a reference pixel
            let (Some(c), Some(r)) = (col0.checked_add(dc), row0.checked_add(dr)) else {
                tracing::trace!(col, row, "candidate outside i64 grid range");
                continue;
            };
            let window = match self.reference.read_window(c, r, ncols, nrows) {
                Ok(window) => window,
                Err(e) if e.is_out_of_bounds() => {
                    tracing::trace!(col = c, row = r, "candidate outside reference");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if window.dim() != trimmed.dim() {
                return Err(RasterError::Format(format!(
                    "band returned a {:?} window, expected {:?}",
                    window.dim(),
                    trimmed.dim()
                ))
                .into());
            }

            let sum = difference_sum(trimmed, window.view(), &self.config);
            tracing::trace!(col = c, row = r, sum, "candidate tested");
            if sum == 0 {
                let (ref_x, ref_y) = self.reference_transform.to_geo(c as f64, r as f64);
                return Ok(Some(GeoShift {
                    dx: ref_x - nw_x,
                    dy: ref_y - nw_y,
                }));
            }
        }
        Ok(None)
    }

    /// Whole tile first, then every non-empty subset of edges excluded, in
    /// [`exclusion_order`]. The first consistent margin wins.
    ///
    /// Excluded edges lose `ncols / margin_divisor` columns (west/east) or
    /// `nrows / margin_divisor` rows (north/south). That fraction assumes
    /// overwritten borders are never wider; it is not derived from the
    /// actual overlap geometry.
    pub fn find_shift(
        &self,
        tile: ArrayView2<'_, u8>,
        tile_transform: &AffineTransform,
    ) -> Result<Option<TileShift>, ShiftError> {
        let span = ShiftSearchSpan::new(tile.ncols(), tile.nrows());
        let _enter = span.enter();

        if let Some(shift) = self.try_shift(tile, tile_transform, Margin::ZERO)? {
            span.record_trial(OverlapMask::NONE, true);
            return Ok(Some(span.record_found(shift, OverlapMask::NONE)));
        }
        span.record_trial(OverlapMask::NONE, false);

        let skip_we = tile.ncols() / self.config.margin_divisor;
        let skip_ns = tile.nrows() / self.config.margin_divisor;

        for mask in exclusion_order() {
            let margin = Margin::for_mask(mask, skip_we, skip_ns);
            let found = self.try_shift(tile, tile_transform, margin)?;
            span.record_trial(mask, found.is_some());
            if let Some(shift) = found {
                return Ok(Some(span.record_found(shift, mask)));
            }
        }

        span.record_exhausted();
        Ok(None)
    }

    /// Read a tile band once and run [`ShiftSearch::find_shift`] on it
    pub fn find_shift_band<T: RasterBand + ?Sized>(
        &self,
        tile: &T,
        tile_transform: &AffineTransform,
    ) -> Result<Option<TileShift>, ShiftError> {
        let pixels = tile.read_all()?;
        self.find_shift(pixels.view(), tile_transform)
    }
}

/// Accumulated `(tile - value_offset) - reference` over pixels below the
/// no-data sentinel, each term taken modulo 256. Zero means consistent.
pub fn difference_sum(
    tile: ArrayView2<'_, u8>,
    reference: ArrayView2<'_, u8>,
    config: &SearchConfig,
) -> u64 {
    Zip::from(tile).and(reference).fold(0u64, |acc, &t, &r| {
        if t < config.nodata_sentinel {
            acc + u64::from(t.wrapping_sub(config.value_offset).wrapping_sub(r))
        } else {
            acc
        }
    })
}
