//! Top-level driver: grid, per-tile processing on a worker pool, ordered assembly.
//!
//! Configuration problems are reported before any tile is touched. Tile
//! failures either stop the run ([`ErrorPolicy::Abort`]) or are collected and
//! returned next to the partially assembled output
//! ([`ErrorPolicy::SkipAndReport`]).

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};

use common::parallel::par_map_ordered;
use common::SerdeFormatError;

use crate::access::{MemoryAccess, RasterAccess};
use crate::diagnostics::DiagnosticSink;
use crate::histogram::{EqualizeError, HistogramEqualizer};
use crate::mosaic::{AssemblyError, MosaicAssembler};
use crate::processor::{TileProcessingError, TileProcessor};
use crate::raster::{Raster, Sample};
use crate::tile_grid::{TileGrid, TileGridError};
use crate::transform::TileTransform;

mod config;

#[cfg(test)]
mod tests;

pub use config::{ErrorPolicy, PipelineConfig};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Grid(#[from] TileGridError),

    #[error(transparent)]
    Histogram(#[from] EqualizeError),

    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("Failed to load or save pipeline config: {0}")]
    ConfigFile(#[from] SerdeFormatError),

    #[error(transparent)]
    Tile(#[from] TileProcessingError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl PipelineError {
    /// Raised before processing started.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Grid(_)
                | PipelineError::Histogram(_)
                | PipelineError::InvalidConfig(_)
                | PipelineError::ConfigFile(_)
        )
    }
}

#[derive(Debug)]
pub struct PipelineOutput<S> {
    pub raster: Raster<S>,
    /// Failed tiles in index order. Always empty under [`ErrorPolicy::Abort`].
    pub errors: Vec<TileProcessingError>,
    pub tile_count: usize,
}

impl<S> PipelineOutput<S> {
    /// Every tile succeeded and every output pixel was written.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.errors.iter().map(|e| e.index).collect()
    }
}

pub struct Pipeline<'a> {
    config: PipelineConfig,
    sink: Option<&'a dyn DiagnosticSink>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config, sink: None })
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Equalizes an in-memory raster.
    pub fn equalize_raster<S: Sample>(
        &self,
        raster: &Raster<S>,
    ) -> Result<PipelineOutput<S>, PipelineError> {
        self.run(&MemoryAccess::new(raster))
    }

    /// Equalizes every tile read through `access`, writing results back to it.
    pub fn run<S, A>(&self, access: &A) -> Result<PipelineOutput<S>, PipelineError>
    where
        S: Sample,
        A: RasterAccess<S> + ?Sized,
    {
        let histogram = self.config.histogram;
        if histogram.output_depth > S::DEPTH {
            return Err(EqualizeError::DepthMismatch {
                output: histogram.output_depth,
                sample: S::DEPTH,
            }
            .into());
        }
        let equalizer = HistogramEqualizer::new(histogram)?;
        self.run_with(access, equalizer)
    }

    /// Runs an arbitrary tile transform through the same grid and assembly.
    pub fn run_with<S, A, T>(
        &self,
        access: &A,
        transform: T,
    ) -> Result<PipelineOutput<S>, PipelineError>
    where
        S: Sample,
        A: RasterAccess<S> + ?Sized,
        T: TileTransform,
    {
        let size = access.size();
        let channels = access.channels();
        let grid = TileGrid::compute(&self.config.grid_config(size))?;
        let mut assembler = MosaicAssembler::new(size, channels)?;

        let mut processor = TileProcessor::new(transform);
        if let Some(sink) = self.sink {
            processor = processor.with_sink(sink);
        }

        let abort_on_error = self.config.on_tile_error == ErrorPolicy::Abort;
        let aborted = AtomicBool::new(false);
        let mut errors: Vec<TileProcessingError> = Vec::new();
        let mut assembly_error: Option<AssemblyError> = None;

        tracing::info!(
            width = size.width,
            height = size.height,
            tiles = grid.len(),
            rows = grid.rows(),
            cols = grid.cols(),
            "starting tile pipeline"
        );

        par_map_ordered(
            grid.tiles(),
            self.config.max_concurrent(),
            |_, spec| {
                // Tiles not started before an abort are abandoned.
                if aborted.load(Ordering::Relaxed) {
                    return None;
                }
                let result = processor.process(spec, access);
                if result.is_err() && abort_on_error {
                    aborted.store(true, Ordering::Relaxed);
                }
                Some(result)
            },
            |_, result| match result {
                None => ControlFlow::Continue(()),
                Some(Ok(tile)) => match assembler.commit(&tile) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(e) => {
                        assembly_error = Some(e);
                        ControlFlow::Break(())
                    }
                },
                Some(Err(e)) => {
                    if abort_on_error {
                        tracing::error!("aborting tile pipeline: {}", e);
                        errors.push(e);
                        ControlFlow::Break(())
                    } else {
                        tracing::warn!("skipping tile: {}", e);
                        errors.push(e);
                        ControlFlow::Continue(())
                    }
                }
            },
        );

        if let Some(e) = assembly_error {
            return Err(e.into());
        }
        if abort_on_error {
            if let Some(e) = errors.pop() {
                return Err(e.into());
            }
        }

        let raster = if errors.is_empty() {
            assembler.finish_complete()?
        } else {
            assembler.finish()
        };

        tracing::info!(
            tiles = grid.len(),
            failed = errors.len(),
            "tile pipeline finished"
        );

        Ok(PipelineOutput {
            raster,
            errors,
            tile_count: grid.len(),
        })
    }
}
