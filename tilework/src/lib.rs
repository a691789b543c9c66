//! Tilework - tiled histogram equalization for rasters too large to process at once.
//!
//! A raster is cut into a grid of overlapping tiles, each tile is equalized on its
//! own histogram, and the results are stitched back into a single raster of the
//! original geometry:
//! - Tile grid computation with a minimum overlap and optional scaling
//! - Histogram and CDF-based contrast equalization for 8 and 16 bit samples
//! - Parallel per-tile processing with ordered, deterministic assembly
//! - In-memory and on-disk (PNG tile directory) raster access
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tilework::prelude::*;
//!
//! let raster: Raster<u8> = Raster::load(Path::new("scan.png"))?;
//!
//! let config = PipelineConfig {
//!     tile_size: (256, 256),
//!     min_overlap: 15,
//!     ..Default::default()
//! };
//! let output = Pipeline::new(config)?.equalize_raster(&raster)?;
//!
//! output.raster.save(Path::new("scan_equalized.png"))?;
//! ```

pub mod access;
pub mod diagnostics;
pub mod histogram;
pub mod mosaic;
pub mod pipeline;
pub mod processor;
pub mod raster;
pub mod tile_grid;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude;

// ============================================================================
// Rasters
// ============================================================================

pub use raster::{ImageSample, Raster, RasterError, RasterSize, Sample, SampleDepth};

// ============================================================================
// Tiling
// ============================================================================

pub use tile_grid::{TileGrid, TileGridConfig, TileGridError, TileSpec};

// ============================================================================
// Equalization
// ============================================================================

pub use histogram::{
    EqualizeError, Histogram, HistogramConfig, HistogramEqualizer, compute_histogram,
    equalization_curve, equalize, equalize_with_histogram,
};
pub use transform::{Identity, TileTransform, TransformError};

// ============================================================================
// Processing and assembly
// ============================================================================

pub use access::{AccessError, MemoryAccess, RasterAccess, TileDirectory};
pub use diagnostics::{
    CollectingSink, DiagnosticSink, DiagnosticsError, DirectorySink, TileDiagnostics,
};
pub use mosaic::{AssemblyError, MosaicAssembler, assemble};
pub use processor::{ProcessedTile, TileError, TileProcessingError, TileProcessor};

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{ErrorPolicy, Pipeline, PipelineConfig, PipelineError, PipelineOutput};
