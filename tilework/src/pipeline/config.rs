//! Pipeline configuration, loadable from YAML or JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PipelineError;
use crate::histogram::HistogramConfig;
use crate::raster::RasterSize;
use crate::tile_grid::TileGridConfig;

/// What to do when a tile fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop at the first failed tile and return its error.
    #[default]
    Abort,
    /// Keep going; return the partial output together with every tile error.
    SkipAndReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tile width and height in pixels.
    pub tile_size: (usize, usize),
    pub min_overlap: usize,
    pub scale: f64,
    pub histogram: HistogramConfig,
    pub on_tile_error: ErrorPolicy,
    /// Tiles in flight at once. Defaults to twice the rayon thread count.
    pub max_concurrent_tiles: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tile_size: (256, 256),
            min_overlap: 0,
            scale: 1.0,
            histogram: HistogramConfig::default(),
            on_tile_error: ErrorPolicy::Abort,
            max_concurrent_tiles: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        Ok(common::load_file(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        Ok(common::save_file(self, path)?)
    }

    /// Checks everything that does not depend on the raster size.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.histogram.validate()?;
        if self.max_concurrent_tiles == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "max_concurrent_tiles must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn grid_config(&self, raster_size: RasterSize) -> TileGridConfig {
        TileGridConfig::new(raster_size, RasterSize::from(self.tile_size), self.min_overlap)
            .with_scale(self.scale)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent_tiles
            .unwrap_or_else(common::parallel::default_concurrency)
    }
}
