//! Histogram and CDF-driven contrast equalization.
//!
//! # Algorithm
//!
//! 1. Count samples into `bin_count` equal-width bins over `[range_min, range_max)`
//! 2. Running sum of the counts gives the raw CDF
//! 3. CDF entries equal to zero (leading empty bins) are masked out of the min/max
//! 4. Unmasked entries are stretched linearly onto `[0, output_max]`, masked ones map to 0
//! 5. A per-input-value lookup table built from the curve rewrites every sample
//!
//! A CDF whose unmasked entries are all equal (e.g. a flat tile) has no contrast to
//! stretch, and the tile is returned unchanged.

use serde::{Deserialize, Serialize};

use crate::raster::{Raster, Sample, SampleDepth};


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EqualizeError {
    #[error("Invalid histogram config: {0}")]
    InvalidConfig(String),

    #[error("Output depth {output:?} is wider than the {sample:?} samples it must be stored in")]
    DepthMismatch {
        output: SampleDepth,
        sample: SampleDepth,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    pub bin_count: usize,
    pub range_min: u32,
    /// Exclusive upper bound of the binned range.
    pub range_max: u32,
    pub output_depth: SampleDepth,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bin_count: 256,
            range_min: 0,
            range_max: 256,
            output_depth: SampleDepth::U8,
        }
    }
}

impl HistogramConfig {
    pub fn validate(&self) -> Result<(), EqualizeError> {
        if self.bin_count == 0 {
            return Err(EqualizeError::InvalidConfig(
                "bin_count must be positive".to_string(),
            ));
        }
        if self.range_min >= self.range_max {
            return Err(EqualizeError::InvalidConfig(format!(
                "range_min {} must be below range_max {}",
                self.range_min, self.range_max
            )));
        }
        Ok(())
    }

    /// Bin of an in-range value, `None` outside `[range_min, range_max)`.
    #[inline]
    pub fn bin_of(&self, value: u32) -> Option<usize> {
        if value < self.range_min || value >= self.range_max {
            return None;
        }
        let offset = (value - self.range_min) as u64;
        let span = (self.range_max - self.range_min) as u64;
        Some((offset * self.bin_count as u64 / span) as usize)
    }

    /// Bin of any value, clamping out-of-range values to the first or last bin.
    #[inline]
    fn clamped_bin_of(&self, value: u32) -> usize {
        if value < self.range_min {
            0
        } else if value >= self.range_max {
            self.bin_count - 1
        } else {
            self.bin_of(value).unwrap_or(0)
        }
    }
}

/// Frequency counts and their running sum, `bin_count` entries each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub cdf: Vec<u64>,
}

impl Histogram {
    #[inline]
    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    /// Number of samples that fell inside the range.
    #[inline]
    pub fn total(&self) -> u64 {
        self.cdf.last().copied().unwrap_or(0)
    }

    /// CDF rescaled to the height of the tallest bin, for plotting over the histogram.
    pub fn normalized_cdf(&self) -> Vec<f64> {
        let peak = self.counts.iter().copied().max().unwrap_or(0);
        let total = self.total();
        if total == 0 {
            return vec![0.0; self.cdf.len()];
        }
        self.cdf
            .iter()
            .map(|&c| c as f64 * peak as f64 / total as f64)
            .collect()
    }
}

/// Histogram of `samples` (all channels pooled). Samples outside the range are not counted.
pub fn compute_histogram<S: Sample>(
    samples: &[S],
    config: &HistogramConfig,
) -> Result<Histogram, EqualizeError> {
    config.validate()?;

    let mut counts = vec![0u64; config.bin_count];
    for &sample in samples {
        if let Some(bin) = config.bin_of(sample.to_u32()) {
            counts[bin] += 1;
        }
    }

    let cdf = counts
        .iter()
        .scan(0u64, |acc, &c| {
            *acc += c;
            Some(*acc)
        })
        .collect();

    Ok(Histogram { counts, cdf })
}

/// Maps each CDF entry onto `[0, output_max]`, ignoring zero entries for the min/max.
///
/// Returns `None` when there is nothing to stretch: no non-zero entry, or all
/// non-zero entries equal.
pub fn equalization_curve(cdf: &[u64], output_max: u32) -> Option<Vec<u32>> {
    let mut unmasked = cdf.iter().copied().filter(|&c| c != 0);
    let first = unmasked.next()?;
    let (cdf_min, cdf_max) = unmasked.fold((first, first), |(lo, hi), c| (lo.min(c), hi.max(c)));

    if cdf_max == cdf_min {
        return None;
    }

    let span = (cdf_max - cdf_min) as u128;
    let curve = cdf
        .iter()
        .map(|&c| {
            if c == 0 {
                0
            } else {
                ((c - cdf_min) as u128 * output_max as u128 / span) as u32
            }
        })
        .collect();
    Some(curve)
}

fn check_depth<S: Sample>(config: &HistogramConfig) -> Result<(), EqualizeError> {
    if config.output_depth > S::DEPTH {
        return Err(EqualizeError::DepthMismatch {
            output: config.output_depth,
            sample: S::DEPTH,
        });
    }
    Ok(())
}

/// Equalizes one tile. Output has the same shape and sample type as the input.
pub fn equalize<S: Sample>(
    tile: &Raster<S>,
    config: &HistogramConfig,
) -> Result<Raster<S>, EqualizeError> {
    check_depth::<S>(config)?;
    let histogram = compute_histogram(tile.samples(), config)?;
    equalize_with_histogram(tile, config, &histogram)
}

/// [`equalize`] reusing a histogram already computed for `tile` under `config`.
pub fn equalize_with_histogram<S: Sample>(
    tile: &Raster<S>,
    config: &HistogramConfig,
    histogram: &Histogram,
) -> Result<Raster<S>, EqualizeError> {
    check_depth::<S>(config)?;
    if histogram.bin_count() != config.bin_count || histogram.cdf.len() != config.bin_count {
        return Err(EqualizeError::InvalidConfig(format!(
            "histogram has {} bins, config expects {}",
            histogram.bin_count(),
            config.bin_count
        )));
    }

    let Some(curve) = equalization_curve(&histogram.cdf, config.output_depth.max_value()) else {
        tracing::trace!(
            total = histogram.total(),
            "degenerate CDF, tile left unchanged"
        );
        return Ok(tile.clone());
    };

    let lut: Vec<S> = (0..=S::DEPTH.max_value())
        .map(|value| S::from_u32(curve[config.clamped_bin_of(value)]))
        .collect();

    Ok(tile.map(|s| lut[s.to_u32() as usize]))
}

/// [`equalize`] bound to a validated config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramEqualizer {
    config: HistogramConfig,
}

impl HistogramEqualizer {
    pub fn new(config: HistogramConfig) -> Result<Self, EqualizeError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &HistogramConfig {
        &self.config
    }

    pub fn histogram<S: Sample>(&self, tile: &Raster<S>) -> Result<Histogram, EqualizeError> {
        compute_histogram(tile.samples(), &self.config)
    }

    pub fn equalize<S: Sample>(&self, tile: &Raster<S>) -> Result<Raster<S>, EqualizeError> {
        equalize(tile, &self.config)
    }
}
