//! Reassembly of processed tiles into one output raster.
//!
//! Overlap policy is last-writer-wins in tile index order: where tiles overlap,
//! the pixels of the tile with the higher index end up in the output. Tiles are
//! committed one at a time and must arrive in strictly ascending index order,
//! so the result does not depend on the order in which workers finished.

use crate::processor::ProcessedTile;
use crate::raster::{Raster, RasterSize, Sample};

mod coverage;


use coverage::CoverageMask;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("Cannot allocate {width}x{height}x{channels} output raster: {reason}")]
    Allocation {
        width: usize,
        height: usize,
        channels: usize,
        reason: String,
    },

    #[error("Tile {index} does not fit the {width}x{height} output")]
    OutOfBounds {
        index: usize,
        width: usize,
        height: usize,
    },

    #[error("Tile {index} has {actual} channels, output has {expected}")]
    ChannelMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Tile {index} pixels are {actual_width}x{actual_height}, its extent is {width}x{height}")]
    SizeMismatch {
        index: usize,
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("Tile {index} committed after tile {last}; tiles must arrive in ascending index order")]
    OutOfOrder { index: usize, last: usize },

    #[error("{uncovered} output pixels were not written by any tile")]
    IncompleteCoverage { uncovered: usize },
}

#[derive(Debug)]
pub struct MosaicAssembler<S> {
    output: Raster<S>,
    coverage: CoverageMask,
    last_index: Option<usize>,
    committed: usize,
}

impl<S: Sample> MosaicAssembler<S> {
    /// Zero-filled output of the given geometry.
    pub fn new(size: RasterSize, channels: usize) -> Result<Self, AssemblyError> {
        let allocation = |reason: String| AssemblyError::Allocation {
            width: size.width,
            height: size.height,
            channels,
            reason,
        };

        if size.width == 0 || size.height == 0 {
            return Err(allocation("output has a zero dimension".to_string()));
        }
        let output = Raster::new(size.width, size.height, channels)
            .map_err(|e| allocation(e.to_string()))?;

        Ok(Self {
            output,
            coverage: CoverageMask::new(size.width, size.height),
            last_index: None,
            committed: 0,
        })
    }

    #[inline]
    pub fn size(&self) -> RasterSize {
        self.output.size()
    }

    /// Number of tiles committed so far.
    #[inline]
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Copies a tile into the output at its origin, overwriting earlier tiles.
    pub fn commit(&mut self, tile: &ProcessedTile<S>) -> Result<(), AssemblyError> {
        let spec = &tile.spec;
        let size = self.output.size();

        if let Some(last) = self.last_index {
            if spec.index <= last {
                return Err(AssemblyError::OutOfOrder {
                    index: spec.index,
                    last,
                });
            }
        }
        if tile.raster.channels() != self.output.channels() {
            return Err(AssemblyError::ChannelMismatch {
                index: spec.index,
                expected: self.output.channels(),
                actual: tile.raster.channels(),
            });
        }
        if tile.raster.width() != spec.width || tile.raster.height() != spec.height {
            return Err(AssemblyError::SizeMismatch {
                index: spec.index,
                width: spec.width,
                height: spec.height,
                actual_width: tile.raster.width(),
                actual_height: tile.raster.height(),
            });
        }
        if spec.right() > size.width || spec.bottom() > size.height {
            return Err(AssemblyError::OutOfBounds {
                index: spec.index,
                width: size.width,
                height: size.height,
            });
        }

        self.output
            .blit(&tile.raster, spec.origin_x, spec.origin_y)
            .map_err(|_| AssemblyError::OutOfBounds {
                index: spec.index,
                width: size.width,
                height: size.height,
            })?;
        self.coverage
            .mark_rect(spec.origin_x, spec.origin_y, spec.width, spec.height);

        self.last_index = Some(spec.index);
        self.committed += 1;
        Ok(())
    }

    /// Output pixels no committed tile has written yet.
    pub fn uncovered_pixels(&self) -> usize {
        self.coverage.unmarked_count()
    }

    pub fn is_covered(&self, x: usize, y: usize) -> bool {
        self.coverage.is_marked(x, y)
    }

    /// Returns the output as is; unwritten pixels stay zero.
    pub fn finish(self) -> Raster<S> {
        self.output
    }

    /// Returns the output, failing if any pixel was never written.
    pub fn finish_complete(self) -> Result<Raster<S>, AssemblyError> {
        let uncovered = self.uncovered_pixels();
        if uncovered > 0 {
            return Err(AssemblyError::IncompleteCoverage { uncovered });
        }
        Ok(self.output)
    }
}

/// Assembles a full set of tiles, given in any order, into a fully covered raster.
pub fn assemble<S, I>(size: RasterSize, channels: usize, tiles: I) -> Result<Raster<S>, AssemblyError>
where
    S: Sample,
    I: IntoIterator<Item = ProcessedTile<S>>,
{
    let mut tiles: Vec<ProcessedTile<S>> = tiles.into_iter().collect();
    tiles.sort_by_key(|t| t.spec.index);

    let mut assembler = MosaicAssembler::new(size, channels)?;
    for tile in &tiles {
        assembler.commit(tile)?;
    }
    assembler.finish_complete()
}
