//! Tile-level operations: compute a shift for a tile file, or write a
//! shifted copy of it.

pub mod batch;

use std::path::Path;

use tracing::Level;

use crate::algorithms::{ShiftSearch, TileShift};
use crate::config::Config;
use crate::error::ShiftError;
use crate::raster::{read_geotiff, write_geotiff, Raster};

pub use batch::{run_batch, BatchReport, TileReport};

/// Search the shift of an in-memory tile against the reference
pub fn shift_tile(
    reference: &Raster,
    tile: &Raster,
    config: &Config,
) -> Result<Option<TileShift>, ShiftError> {
    ShiftSearch::new(reference, reference.transform)
        .with_config(config.search.clone())?
        .find_shift_band(tile, &tile.transform)
}

/// Open a tile GeoTIFF and search its shift. Nothing is written.
pub fn compute_shift<P: AsRef<Path>>(
    reference: &Raster,
    tile_path: P,
    config: &Config,
) -> Result<Option<TileShift>, ShiftError> {
    let tile_path = tile_path.as_ref();
    let span = crate::correlation_span!(Level::INFO, "compute_shift", tile = %tile_path.display());
    let _enter = span.enter();

    let tile = read_geotiff(tile_path)?;
    let found = shift_tile(reference, &tile, config)?;
    match &found {
        Some(found) => tracing::info!(
            dx = found.dx(),
            dy = found.dy(),
            overlap = %found.overlap,
            "shift calculated"
        ),
        None => tracing::warn!("failed to calculate shift"),
    }
    Ok(found)
}

/// Copy of `tile` whose transform origin is moved by the found shift.
/// Pixels, no-data value and projection are unchanged.
pub fn shift_raster(tile: &Raster, found: &TileShift) -> Raster {
    Raster {
        transform: tile.transform.translated(found.dx(), found.dy()),
        ..tile.clone()
    }
}

/// Search the shift of a tile GeoTIFF and write the shifted tile to
/// `new_path`.
///
/// When no shift is found `Ok(None)` is returned and no file is created.
pub fn apply_shift<P: AsRef<Path>, Q: AsRef<Path>>(
    reference: &Raster,
    tile_path: P,
    new_path: Q,
    config: &Config,
) -> Result<Option<TileShift>, ShiftError> {
    let (tile_path, new_path) = (tile_path.as_ref(), new_path.as_ref());
    let span = crate::correlation_span!(
        Level::INFO,
        "apply_shift",
        tile = %tile_path.display(),
        output = %new_path.display()
    );
    let _enter = span.enter();

    let tile = read_geotiff(tile_path)?;
    let Some(found) = shift_tile(reference, &tile, config)? else {
        tracing::warn!("failed to shift");
        return Ok(None);
    };

    write_geotiff(new_path, &shift_raster(&tile, &found), config.output.compression)?;
    tracing::info!(
        dx = found.dx(),
        dy = found.dy(),
        overlap = %found.overlap,
        "shifted tile written"
    );
    Ok(Some(found))
}
