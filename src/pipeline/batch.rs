//! Parallel shifting of many tiles against one reference
//!
//! Each tile is searched independently; a failing tile is recorded in the
//! report and never stops the rest of the batch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::apply_shift;
use crate::algorithms::TileShift;
use crate::config::Config;
use crate::raster::Raster;

/// Outcome for one tile of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileReport {
    pub tile: PathBuf,
    pub correlation_id: uuid::Uuid,
    /// Written file, present only when a shift was found
    pub output: Option<PathBuf>,
    pub result: Option<TileShift>,
    pub error: Option<String>,
}

impl TileReport {
    pub fn is_shifted(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub tiles: Vec<TileReport>,
}

impl BatchReport {
    pub fn shifted(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_shifted()).count()
    }

    /// Tiles that were read fine but had no consistent shift
    pub fn unmatched(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| !t.is_shifted() && !t.is_failed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_failed()).count()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("Cannot write report {}", path.as_ref().display()))?;
        Ok(())
    }
}

/// Shift every tile in `tiles`, writing results under `output_dir` with the
/// tile's file name
pub fn run_batch(
    reference: &Raster,
    tiles: &[PathBuf],
    output_dir: &Path,
    config: &Config,
) -> crate::Result<BatchReport> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create output directory {}", output_dir.display()))?;

    tracing::info!(tiles = tiles.len(), output_dir = %output_dir.display(), "batch started");

    let reports: Vec<TileReport> = tiles
        .par_iter()
        .map(|tile| process_tile(reference, tile, output_dir, config))
        .collect();

    let report = BatchReport {
        generated_at: Utc::now(),
        output_dir: output_dir.to_path_buf(),
        tiles: reports,
    };
    tracing::info!(
        shifted = report.shifted(),
        unmatched = report.unmatched(),
        failed = report.failed(),
        "batch finished"
    );
    Ok(report)
}

fn process_tile(reference: &Raster, tile: &Path, output_dir: &Path, config: &Config) -> TileReport {
    let mut report = TileReport {
        tile: tile.to_path_buf(),
        correlation_id: crate::logging::new_correlation_id(),
        output: None,
        result: None,
        error: None,
    };
    shift_into_dir(&mut report, reference, output_dir, config);

    // Rayon workers are reused; the next tile on this thread gets its own id
    crate::logging::clear_correlation_id();
    report
}

fn shift_into_dir(report: &mut TileReport, reference: &Raster, output_dir: &Path, config: &Config) {
    let tile = report.tile.clone();
    let Some(file_name) = tile.file_name() else {
        report.error = Some("tile path has no file name".to_string());
        return;
    };
    let output = output_dir.join(file_name);
    if same_file(&tile, &output) {
        report.error = Some("output would overwrite the source tile".to_string());
        return;
    }

    match apply_shift(reference, &tile, &output, config) {
        Ok(Some(found)) => {
            report.output = Some(output);
            report.result = Some(found);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(tile = %tile.display(), error = %e, "tile failed");
            report.error = Some(e.to_string());
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AffineTransform;
    use crate::logging::get_correlation_id;
    use tempfile::TempDir;

    #[test]
    fn test_process_tile_leaves_no_correlation_id_behind() {
        let dir = TempDir::new().unwrap();
        let reference = Raster::filled(10, 10, 5, AffineTransform::default());

        let report = process_tile(
            &reference,
            &dir.path().join("missing.tif"),
            &dir.path().join("out"),
            &Config::default(),
        );
        assert!(report.is_failed());
        assert!(get_correlation_id().is_none());

        let second = process_tile(
            &reference,
            &dir.path().join("missing.tif"),
            &dir.path().join("out"),
            &Config::default(),
        );
        assert_ne!(second.correlation_id, report.correlation_id);
    }
}
