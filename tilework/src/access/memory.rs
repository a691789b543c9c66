use std::sync::atomic::{AtomicUsize, Ordering};

use super::{check_bounds, AccessError, RasterAccess};
use crate::raster::{Raster, RasterSize, Sample};
use crate::tile_grid::TileSpec;

/// Reads tiles out of a borrowed raster.
///
/// Writes are checked and counted but not stored: the assembled output is the
/// only place processed pixels live, so tile buffers are freed once merged.
#[derive(Debug)]
pub struct MemoryAccess<'a, S> {
    source: &'a Raster<S>,
    writes: AtomicUsize,
}

impl<'a, S: Sample> MemoryAccess<'a, S> {
    pub fn new(source: &'a Raster<S>) -> Self {
        Self {
            source,
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of tiles written back so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl<S: Sample> RasterAccess<S> for MemoryAccess<'_, S> {
    fn size(&self) -> RasterSize {
        self.source.size()
    }

    fn channels(&self) -> usize {
        self.source.channels()
    }

    fn read(&self, spec: &TileSpec) -> Result<Option<Raster<S>>, AccessError> {
        check_bounds(spec, self.size())?;
        let tile = self
            .source
            .crop(spec.origin_x, spec.origin_y, spec.width, spec.height)?;
        Ok(Some(tile))
    }

    fn write(&self, spec: &TileSpec, tile: &Raster<S>) -> Result<(), AccessError> {
        check_bounds(spec, self.size())?;
        if tile.size() != spec.size() || tile.channels() != self.source.channels() {
            return Err(AccessError::Backend(format!(
                "tile {} written as {}x{}x{}, expected {}x{}x{}",
                spec.index,
                tile.width(),
                tile.height(),
                tile.channels(),
                spec.width,
                spec.height,
                self.source.channels()
            )));
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
