//! Structured spans for the shift search

use std::cell::Cell;
use std::time::Instant;

use tracing::{field, span, Level, Span};

use crate::algorithms::{GeoShift, OverlapMask, TileShift};

/// Span covering one multi-margin search of a single tile
pub struct ShiftSearchSpan {
    span: Span,
    start_time: Instant,
    trials: Cell<usize>,
}

impl ShiftSearchSpan {
    pub fn new(ncols: usize, nrows: usize) -> Self {
        let span = if let Some(corr_id) = crate::logging::get_correlation_id() {
            span!(
                Level::DEBUG,
                "shift_search",
                tile_cols = ncols,
                tile_rows = nrows,
                trials = field::Empty,
                overlap = field::Empty,
                dx = field::Empty,
                dy = field::Empty,
                correlation_id = %corr_id
            )
        } else {
            span!(
                Level::DEBUG,
                "shift_search",
                tile_cols = ncols,
                tile_rows = nrows,
                trials = field::Empty,
                overlap = field::Empty,
                dx = field::Empty,
                dy = field::Empty
            )
        };

        Self {
            span,
            start_time: Instant::now(),
            trials: Cell::new(0),
        }
    }

    /// Record one margin trial
    pub fn record_trial(&self, mask: OverlapMask, matched: bool) {
        self.trials.set(self.trials.get() + 1);
        tracing::trace!(
            parent: &self.span,
            overlap = %mask,
            matched,
            "margin tried"
        );
    }

    /// Record the winning margin and hand back the result
    pub fn record_found(&self, shift: GeoShift, overlap: OverlapMask) -> TileShift {
        let trials = self.trials.get();
        self.span.record("trials", trials);
        self.span.record("overlap", overlap.bits());
        self.span.record("dx", shift.dx);
        self.span.record("dy", shift.dy);
        tracing::debug!(
            parent: &self.span,
            dx = shift.dx,
            dy = shift.dy,
            overlap = %overlap,
            trials,
            elapsed_us = self.start_time.elapsed().as_micros() as u64,
            "shift found"
        );
        TileShift { shift, overlap }
    }

    /// Record that every margin combination failed
    pub fn record_exhausted(&self) {
        let trials = self.trials.get();
        self.span.record("trials", trials);
        tracing::debug!(
            parent: &self.span,
            trials,
            elapsed_us = self.start_time.elapsed().as_micros() as u64,
            "no consistent shift under any margin"
        );
    }

    pub fn trials(&self) -> usize {
        self.trials.get()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}
