//! Per-tile pixel transforms run by the tile processor.

use crate::histogram::{equalize_with_histogram, EqualizeError, Histogram, HistogramEqualizer};
use crate::raster::{Raster, Sample};

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Equalize(#[from] EqualizeError),

    #[error("{0}")]
    Other(String),
}

/// A pure, tile-local transform. Implementations must not depend on other tiles.
pub trait TileTransform: Sync {
    fn apply<S: Sample>(&self, tile: &Raster<S>) -> Result<Raster<S>, TransformError>;

    /// Histogram handed to diagnostic sinks, for transforms that compute one.
    fn histogram<S: Sample>(&self, _tile: &Raster<S>) -> Option<Histogram> {
        None
    }

    /// [`TileTransform::apply`] given the histogram returned by
    /// [`TileTransform::histogram`] for the same tile.
    fn apply_with_histogram<S: Sample>(
        &self,
        tile: &Raster<S>,
        _histogram: &Histogram,
    ) -> Result<Raster<S>, TransformError> {
        self.apply(tile)
    }
}

impl TileTransform for HistogramEqualizer {
    fn apply<S: Sample>(&self, tile: &Raster<S>) -> Result<Raster<S>, TransformError> {
        Ok(self.equalize(tile)?)
    }

    fn histogram<S: Sample>(&self, tile: &Raster<S>) -> Option<Histogram> {
        HistogramEqualizer::histogram(self, tile).ok()
    }

    fn apply_with_histogram<S: Sample>(
        &self,
        tile: &Raster<S>,
        histogram: &Histogram,
    ) -> Result<Raster<S>, TransformError> {
        Ok(equalize_with_histogram(tile, self.config(), histogram)?)
    }
}

/// Passes tiles through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl TileTransform for Identity {
    fn apply<S: Sample>(&self, tile: &Raster<S>) -> Result<Raster<S>, TransformError> {
        Ok(tile.clone())
    }
}
