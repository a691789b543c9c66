use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{check_bounds, AccessError, RasterAccess};
use crate::raster::{ImageSample, Raster, RasterSize};
use crate::tile_grid::{TileGrid, TileSpec};

const MANIFEST_FILE: &str = "tiles.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    size: RasterSize,
    channels: usize,
    extension: String,
}

/// One image file per tile, named `tile_<row>_<col>.<ext>`, plus a `tiles.yaml` manifest.
///
/// A tile whose file is missing reads as "no data".
#[derive(Debug, Clone)]
pub struct TileDirectory<S> {
    dir: PathBuf,
    manifest: Manifest,
    _sample: PhantomData<fn() -> S>,
}

impl<S: ImageSample> TileDirectory<S> {
    /// Creates `dir` and writes every tile of `grid`, cropped from `source`, into it.
    pub fn slice(source: &Raster<S>, grid: &TileGrid, dir: &Path) -> Result<Self, AccessError> {
        if source.size() != grid.raster_size() {
            return Err(AccessError::Backend(format!(
                "grid was computed for {}x{}, raster is {}x{}",
                grid.raster_size().width,
                grid.raster_size().height,
                source.width(),
                source.height()
            )));
        }

        std::fs::create_dir_all(dir).map_err(|source| AccessError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let manifest = Manifest {
            size: source.size(),
            channels: source.channels(),
            extension: "png".to_string(),
        };
        common::save_file(&manifest, &dir.join(MANIFEST_FILE))
            .map_err(|e| AccessError::Backend(e.to_string()))?;

        let directory = Self {
            dir: dir.to_path_buf(),
            manifest,
            _sample: PhantomData,
        };
        for spec in grid {
            let tile = source.crop(spec.origin_x, spec.origin_y, spec.width, spec.height)?;
            tile.save(&directory.tile_path(spec))?;
        }

        tracing::info!(
            tiles = grid.len(),
            dir = %dir.display(),
            "sliced raster into tile directory"
        );
        Ok(directory)
    }

    /// Opens a directory previously written by [`TileDirectory::slice`].
    pub fn open(dir: &Path) -> Result<Self, AccessError> {
        let manifest: Manifest = common::load_file(&dir.join(MANIFEST_FILE))
            .map_err(|e| AccessError::Backend(e.to_string()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            _sample: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tile_path(&self, spec: &TileSpec) -> PathBuf {
        self.dir.join(format!(
            "tile_{:03}_{:03}.{}",
            spec.row, spec.col, self.manifest.extension
        ))
    }
}

impl<S: ImageSample> RasterAccess<S> for TileDirectory<S> {
    fn size(&self) -> RasterSize {
        self.manifest.size
    }

    fn channels(&self) -> usize {
        self.manifest.channels
    }

    fn read(&self, spec: &TileSpec) -> Result<Option<Raster<S>>, AccessError> {
        check_bounds(spec, self.size())?;
        let path = self.tile_path(spec);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Raster::load(&path)?))
    }

    fn write(&self, spec: &TileSpec, tile: &Raster<S>) -> Result<(), AccessError> {
        check_bounds(spec, self.size())?;
        tile.save(&self.tile_path(spec))?;
        Ok(())
    }
}
