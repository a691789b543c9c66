//! Per-tile read, transform, write-back.

use crate::access::{AccessError, RasterAccess};
use crate::diagnostics::{DiagnosticSink, TileDiagnostics};
use crate::raster::{Raster, Sample};
use crate::tile_grid::TileSpec;
use crate::transform::{TileTransform, TransformError};


#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("read failed: {0}")]
    Read(#[source] AccessError),

    #[error("read returned no data")]
    NoData,

    #[error(
        "read returned {actual_width}x{actual_height}x{actual_channels}, \
         expected {expected_width}x{expected_height}x{expected_channels}"
    )]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        expected_channels: usize,
        actual_width: usize,
        actual_height: usize,
        actual_channels: usize,
    },

    #[error("transform failed: {0}")]
    Transform(#[source] TransformError),

    #[error("write failed: {0}")]
    Write(#[source] AccessError),
}

/// Failure of one tile, tagged with its grid index.
#[derive(Debug, thiserror::Error)]
#[error("Tile {index} failed: {kind}")]
pub struct TileProcessingError {
    pub index: usize,
    #[source]
    pub kind: TileError,
}

impl TileProcessingError {
    pub fn new(index: usize, kind: TileError) -> Self {
        Self { index, kind }
    }

    /// The tile could not be read (I/O failure, missing data or wrong shape).
    pub fn is_read_error(&self) -> bool {
        matches!(
            self.kind,
            TileError::Read(_) | TileError::NoData | TileError::ShapeMismatch { .. }
        )
    }

    pub fn is_write_error(&self) -> bool {
        matches!(self.kind, TileError::Write(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedTile<S> {
    pub spec: TileSpec,
    pub raster: Raster<S>,
}

pub struct TileProcessor<'a, T> {
    transform: T,
    sink: Option<&'a dyn DiagnosticSink>,
}

impl<'a, T: TileTransform> TileProcessor<'a, T> {
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn process<S, A>(
        &self,
        spec: &TileSpec,
        access: &A,
    ) -> Result<ProcessedTile<S>, TileProcessingError>
    where
        S: Sample,
        A: RasterAccess<S> + ?Sized,
    {
        let fail = |kind| TileProcessingError::new(spec.index, kind);

        let tile = match access.read(spec).map_err(|e| fail(TileError::Read(e)))? {
            Some(tile) if !tile.is_empty() => tile,
            _ => return Err(fail(TileError::NoData)),
        };

        let channels = access.channels();
        if tile.width() != spec.width || tile.height() != spec.height || tile.channels() != channels
        {
            return Err(fail(TileError::ShapeMismatch {
                expected_width: spec.width,
                expected_height: spec.height,
                expected_channels: channels,
                actual_width: tile.width(),
                actual_height: tile.height(),
                actual_channels: tile.channels(),
            }));
        }

        let diagnostics = self.sink.and_then(|sink| {
            let histogram = self.transform.histogram(&tile)?;
            let diagnostics = TileDiagnostics::new(spec.index, histogram);
            sink.record(&diagnostics);
            Some(diagnostics)
        });

        let output = match &diagnostics {
            Some(d) => self.transform.apply_with_histogram(&tile, &d.histogram),
            None => self.transform.apply(&tile),
        }
        .map_err(|e| fail(TileError::Transform(e)))?;

        access
            .write(spec, &output)
            .map_err(|e| fail(TileError::Write(e)))?;

        tracing::debug!(
            tile = spec.index,
            x = spec.origin_x,
            y = spec.origin_y,
            "processed tile"
        );

        Ok(ProcessedTile {
            spec: *spec,
            raster: output,
        })
    }
}
