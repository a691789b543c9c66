//! Raster access backends.
//!
//! The tile processor reads source pixels and writes results back through
//! [`RasterAccess`], so in-memory and on-disk tile storage share one contract.

use std::path::PathBuf;

use crate::raster::{Raster, RasterError, RasterSize, Sample};
use crate::tile_grid::TileSpec;

mod directory;
mod memory;


pub use directory::TileDirectory;
pub use memory::MemoryAccess;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Tile {index} lies outside the {width}x{height} raster")]
    OutOfBounds {
        index: usize,
        width: usize,
        height: usize,
    },

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Backend(String),
}

/// Tile-granular access to a raster.
///
/// Calls for distinct tiles may come from several worker threads at once.
pub trait RasterAccess<S: Sample>: Sync {
    /// Dimensions of the full raster.
    fn size(&self) -> RasterSize;

    fn channels(&self) -> usize;

    /// Pixels of one tile. `Ok(None)` means the backend has no data for it.
    fn read(&self, spec: &TileSpec) -> Result<Option<Raster<S>>, AccessError>;

    /// Stores the processed pixels of one tile.
    fn write(&self, spec: &TileSpec, tile: &Raster<S>) -> Result<(), AccessError>;
}

pub(crate) fn check_bounds(spec: &TileSpec, size: RasterSize) -> Result<(), AccessError> {
    if spec.right() > size.width || spec.bottom() > size.height {
        return Err(AccessError::OutOfBounds {
            index: spec.index,
            width: size.width,
            height: size.height,
        });
    }
    Ok(())
}
