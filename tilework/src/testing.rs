//! Shared test fixtures.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::access::{AccessError, RasterAccess};
use crate::histogram::{Histogram, HistogramEqualizer};
use crate::raster::{Raster, RasterSize, Sample};
use crate::tile_grid::TileSpec;
use crate::transform::{TileTransform, TransformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    ReadError,
    NoData,
    WrongShape,
    WriteError,
}

/// Wraps a backend and injects faults for chosen tile indices.
pub(crate) struct FaultyAccess<A> {
    pub inner: A,
    faults: HashMap<usize, Fault>,
}

impl<A> FaultyAccess<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            faults: HashMap::new(),
        }
    }

    pub fn with_fault(mut self, index: usize, fault: Fault) -> Self {
        self.faults.insert(index, fault);
        self
    }
}

impl<S: Sample, A: RasterAccess<S>> RasterAccess<S> for FaultyAccess<A> {
    fn size(&self) -> RasterSize {
        self.inner.size()
    }

    fn channels(&self) -> usize {
        self.inner.channels()
    }

    fn read(&self, spec: &TileSpec) -> Result<Option<Raster<S>>, AccessError> {
        match self.faults.get(&spec.index) {
            Some(Fault::ReadError) => Err(AccessError::Backend(format!(
                "injected read failure for tile {}",
                spec.index
            ))),
            Some(Fault::NoData) => Ok(None),
            Some(Fault::WrongShape) => {
                let tile = self.inner.read(spec)?;
                Ok(tile.map(|t| {
                    t.crop(0, 0, t.width() - 1, t.height())
                        .expect("crop within tile")
                }))
            }
            _ => self.inner.read(spec),
        }
    }

    fn write(&self, spec: &TileSpec, tile: &Raster<S>) -> Result<(), AccessError> {
        if self.faults.get(&spec.index) == Some(&Fault::WriteError) {
            return Err(AccessError::Backend(format!(
                "injected write failure for tile {}",
                spec.index
            )));
        }
        self.inner.write(spec, tile)
    }
}

/// Wraps a backend and keeps a copy of every tile written through it.
pub(crate) struct RecordingAccess<A, S> {
    pub inner: A,
    written: Mutex<BTreeMap<usize, Raster<S>>>,
}

impl<A, S: Sample> RecordingAccess<A, S> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            written: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn written_tile(&self, index: usize) -> Option<Raster<S>> {
        self.written.lock().get(&index).cloned()
    }

    pub fn written_count(&self) -> usize {
        self.written.lock().len()
    }
}

impl<S: Sample, A: RasterAccess<S>> RasterAccess<S> for RecordingAccess<A, S> {
    fn size(&self) -> RasterSize {
        self.inner.size()
    }

    fn channels(&self) -> usize {
        self.inner.channels()
    }

    fn read(&self, spec: &TileSpec) -> Result<Option<Raster<S>>, AccessError> {
        self.inner.read(spec)
    }

    fn write(&self, spec: &TileSpec, tile: &Raster<S>) -> Result<(), AccessError> {
        self.inner.write(spec, tile)?;
        self.written.lock().insert(spec.index, tile.clone());
        Ok(())
    }
}

/// Equalizer that counts how many histograms it computes.
pub(crate) struct CountingEqualizer {
    inner: HistogramEqualizer,
    histograms: AtomicUsize,
}

impl CountingEqualizer {
    pub fn new(inner: HistogramEqualizer) -> Self {
        Self {
            inner,
            histograms: AtomicUsize::new(0),
        }
    }

    pub fn histograms(&self) -> usize {
        self.histograms.load(Ordering::Relaxed)
    }
}

impl TileTransform for CountingEqualizer {
    fn apply<S: Sample>(&self, tile: &Raster<S>) -> Result<Raster<S>, TransformError> {
        self.histograms.fetch_add(1, Ordering::Relaxed);
        self.inner.apply(tile)
    }

    fn histogram<S: Sample>(&self, tile: &Raster<S>) -> Option<Histogram> {
        self.histograms.fetch_add(1, Ordering::Relaxed);
        TileTransform::histogram(&self.inner, tile)
    }

    fn apply_with_histogram<S: Sample>(
        &self,
        tile: &Raster<S>,
        histogram: &Histogram,
    ) -> Result<Raster<S>, TransformError> {
        self.inner.apply_with_histogram(tile, histogram)
    }
}

/// Transform that always fails.
pub(crate) struct BrokenTransform;

impl TileTransform for BrokenTransform {
    fn apply<S: Sample>(&self, _tile: &Raster<S>) -> Result<Raster<S>, TransformError> {
        Err(TransformError::Other("broken transform".to_string()))
    }
}

/// Single-channel raster with samples confined to `[100, 120]`.
pub(crate) fn low_contrast_raster(width: usize, height: usize) -> Raster<u8> {
    let samples = (0..width * height)
        .map(|i| 100 + ((i % width + i / width) % 21) as u8)
        .collect();
    Raster::from_samples(width, height, 1, samples).expect("valid shape")
}

/// Raster with distinct, position-dependent samples.
pub(crate) fn gradient_raster(width: usize, height: usize, channels: usize) -> Raster<u8> {
    let samples = (0..width * height * channels)
        .map(|i| (i * 31 % 256) as u8)
        .collect();
    Raster::from_samples(width, height, channels, samples).expect("valid shape")
}
