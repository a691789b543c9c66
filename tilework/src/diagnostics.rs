//! Optional per-tile histogram output.
//!
//! Sinks receive each tile's histogram and CDF for external plotting. They
//! are infallible from the pipeline's point of view: a sink that cannot
//! store a record logs it and carries on.

use std::path::{Path, PathBuf};

use common::FileFormat;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    #[error("Failed to create diagnostics directory '{path}': {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDiagnostics {
    pub tile_index: usize,
    pub histogram: Histogram,
    /// CDF scaled to the tallest bin, ready to overlay on the histogram.
    pub normalized_cdf: Vec<f64>,
}

impl TileDiagnostics {
    pub fn new(tile_index: usize, histogram: Histogram) -> Self {
        let normalized_cdf = histogram.normalized_cdf();
        Self {
            tile_index,
            histogram,
            normalized_cdf,
        }
    }
}

pub trait DiagnosticSink: Sync {
    fn record(&self, diagnostics: &TileDiagnostics);
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<TileDiagnostics>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drains the collected records, ordered by tile index.
    pub fn take(&self) -> Vec<TileDiagnostics> {
        let mut records = std::mem::take(&mut *self.records.lock());
        records.sort_by_key(|r| r.tile_index);
        records
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, diagnostics: &TileDiagnostics) {
        self.records.lock().push(diagnostics.clone());
    }
}

/// Writes one `histogram_<index>.<yaml|json>` file per tile.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    format: FileFormat,
}

impl DirectorySink {
    pub fn new(dir: &Path, format: FileFormat) -> Result<Self, DiagnosticsError> {
        std::fs::create_dir_all(dir).map_err(|source| DiagnosticsError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            format,
        })
    }

    pub fn path_for(&self, tile_index: usize) -> PathBuf {
        self.dir
            .join(format!("histogram_{}.{}", tile_index, self.format.extension()))
    }
}

impl DiagnosticSink for DirectorySink {
    fn record(&self, diagnostics: &TileDiagnostics) {
        let path = self.path_for(diagnostics.tile_index);
        if let Err(e) = common::save_file(diagnostics, &path) {
            tracing::warn!(
                tile = diagnostics.tile_index,
                path = %path.display(),
                "failed to write tile diagnostics: {}",
                e
            );
        }
    }
}
