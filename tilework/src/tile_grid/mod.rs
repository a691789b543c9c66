//! Tile grid geometry.
//!
//! Tiles are placed along each axis at multiples of `tile - min_overlap`. The
//! final tile on an axis is clipped so its far edge lands on the raster edge:
//! it replaces the last stepped tile when that leaves no gap to the tile
//! before it, otherwise it is appended and overlaps its predecessor by more
//! than `min_overlap`. Tiles are indexed in row-major order.

use serde::{Deserialize, Serialize};

use crate::raster::RasterSize;


#[derive(Debug, thiserror::Error)]
pub enum TileGridError {
    #[error("Invalid tile grid config: {0}")]
    InvalidConfig(String),
}

/// Extent of one tile inside the raster.
///
/// Always satisfies `origin_x + width <= raster_width` and
/// `origin_y + height <= raster_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSpec {
    pub origin_x: usize,
    pub origin_y: usize,
    pub width: usize,
    pub height: usize,
    /// Row-major position in the grid, also the overlap precedence.
    pub index: usize,
    pub row: usize,
    pub col: usize,
}

impl TileSpec {
    #[inline]
    pub fn right(&self) -> usize {
        self.origin_x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> usize {
        self.origin_y + self.height
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.origin_x && x < self.right() && y >= self.origin_y && y < self.bottom()
    }

    #[inline]
    pub fn size(&self) -> RasterSize {
        RasterSize::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileGridConfig {
    pub raster_size: RasterSize,
    pub tile_size: RasterSize,
    pub min_overlap: usize,
    /// Multiplies tile size and overlap before placement (multi-resolution tiling).
    pub scale: f64,
}

impl TileGridConfig {
    pub fn new(raster_size: RasterSize, tile_size: RasterSize, min_overlap: usize) -> Self {
        Self {
            raster_size,
            tile_size,
            min_overlap,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Non-overlapping config splitting the raster into roughly `count` tiles.
    ///
    /// Uses `ceil(sqrt(count))` columns and as many rows as needed to reach
    /// `count`, so the grid may hold a few more tiles than requested.
    pub fn for_tile_count(raster_size: RasterSize, count: usize) -> Result<Self, TileGridError> {
        if count == 0 {
            return Err(TileGridError::InvalidConfig(
                "tile count must be positive".to_string(),
            ));
        }
        if raster_size.width == 0 || raster_size.height == 0 {
            return Err(TileGridError::InvalidConfig(format!(
                "raster size {}x{} is empty",
                raster_size.width, raster_size.height
            )));
        }

        let cols = (count as f64).sqrt().ceil() as usize;
        let rows = count.div_ceil(cols);
        let tile_size = RasterSize::new(
            raster_size.width.div_ceil(cols),
            raster_size.height.div_ceil(rows),
        );
        Ok(Self::new(raster_size, tile_size, 0))
    }

    /// Validates the config and returns the scaled tile size and overlap.
    fn effective(&self) -> Result<(RasterSize, usize), TileGridError> {
        let invalid = |msg: String| Err(TileGridError::InvalidConfig(msg));

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return invalid(format!("scale must be positive, got {}", self.scale));
        }
        if self.tile_size.width == 0 || self.tile_size.height == 0 {
            return invalid(format!(
                "tile size {}x{} has a zero dimension",
                self.tile_size.width, self.tile_size.height
            ));
        }
        let min_tile = self.tile_size.width.min(self.tile_size.height);
        if self.min_overlap >= min_tile {
            return invalid(format!(
                "min_overlap {} must be smaller than the tile size {}",
                self.min_overlap, min_tile
            ));
        }

        let scaled = |v: usize| (v as f64 * self.scale).round() as usize;
        let tile = RasterSize::new(scaled(self.tile_size.width), scaled(self.tile_size.height));
        let overlap = scaled(self.min_overlap);

        if tile.width == 0 || tile.height == 0 {
            return invalid(format!(
                "scaled tile size {}x{} has a zero dimension",
                tile.width, tile.height
            ));
        }
        if tile.width > self.raster_size.width || tile.height > self.raster_size.height {
            return invalid(format!(
                "tile size {}x{} exceeds raster size {}x{}",
                tile.width, tile.height, self.raster_size.width, self.raster_size.height
            ));
        }
        if overlap >= tile.width.min(tile.height) {
            return invalid(format!(
                "scaled min_overlap {} must be smaller than the scaled tile size {}x{}",
                overlap, tile.width, tile.height
            ));
        }

        Ok((tile, overlap))
    }
}

#[derive(Debug, Clone)]
pub struct TileGrid {
    raster_size: RasterSize,
    tile_size: RasterSize,
    min_overlap: usize,
    rows: usize,
    cols: usize,
    tiles: Vec<TileSpec>,
}

impl TileGrid {
    pub fn compute(config: &TileGridConfig) -> Result<Self, TileGridError> {
        let (tile_size, min_overlap) = config.effective()?;
        let raster_size = config.raster_size;

        let xs = axis_origins(raster_size.width, tile_size.width, min_overlap);
        let ys = axis_origins(raster_size.height, tile_size.height, min_overlap);

        let tiles: Vec<TileSpec> = ys
            .iter()
            .enumerate()
            .flat_map(|(row, &origin_y)| {
                let cols = xs.len();
                xs.iter().enumerate().map(move |(col, &origin_x)| TileSpec {
                    origin_x,
                    origin_y,
                    width: tile_size.width,
                    height: tile_size.height,
                    index: row * cols + col,
                    row,
                    col,
                })
            })
            .collect();

        tracing::debug!(
            rows = ys.len(),
            cols = xs.len(),
            tile_width = tile_size.width,
            tile_height = tile_size.height,
            min_overlap,
            "computed tile grid"
        );

        Ok(Self {
            raster_size,
            tile_size,
            min_overlap,
            rows: ys.len(),
            cols: xs.len(),
            tiles,
        })
    }

    /// Number of tiles along an axis, from the stepping rule in closed form.
    ///
    /// `None` unless `0 < tile <= length` and `overlap < tile`.
    pub fn axis_count(length: usize, tile: usize, overlap: usize) -> Option<usize> {
        if tile == 0 || overlap >= tile {
            return None;
        }
        let step = tile - overlap;
        let room = length.checked_sub(tile)?;
        let stepped = room / step + 1;
        let last_end = (stepped - 1) * step + tile;

        let count = if last_end == length
            || (stepped >= 2 && room <= (stepped - 2) * step + tile)
        {
            stepped
        } else {
            stepped + 1
        };
        Some(count)
    }

    #[inline]
    pub fn tiles(&self) -> &[TileSpec] {
        &self.tiles
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TileSpec> {
        self.tiles.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn raster_size(&self) -> RasterSize {
        self.raster_size
    }

    /// Scaled tile size actually used for placement.
    #[inline]
    pub fn tile_size(&self) -> RasterSize {
        self.tile_size
    }

    #[inline]
    pub fn min_overlap(&self) -> usize {
        self.min_overlap
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TileSpec> {
        self.tiles.iter()
    }
}

impl<'a> IntoIterator for &'a TileGrid {
    type Item = &'a TileSpec;
    type IntoIter = std::slice::Iter<'a, TileSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}

fn axis_origins(length: usize, tile: usize, overlap: usize) -> Vec<usize> {
    let step = tile - overlap;
    let mut origins: Vec<usize> = (0..)
        .map(|k| k * step)
        .take_while(|&origin| origin + tile <= length)
        .collect();

    let last = origins.last().copied().unwrap_or(0);
    if origins.is_empty() || last + tile < length {
        let clipped = length - tile;
        let n = origins.len();
        if n >= 2 && clipped <= origins[n - 2] + tile {
            origins[n - 1] = clipped;
        } else {
            origins.push(clipped);
        }
    }
    origins
}
