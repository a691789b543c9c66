//! Owned multi-channel sample grids.
//!
//! A [`Raster`] stores interleaved samples in row-major order: pixel `(x, y)`
//! occupies `channels` consecutive samples starting at `(y * width + x) * channels`.

use std::fmt::Debug;
use std::path::PathBuf;

use num_traits::{PrimInt, Unsigned};
use serde::{Deserialize, Serialize};

mod io;


pub use io::ImageSample;

/// Maximum interleaved channels (gray, gray+alpha, rgb, rgba).
pub const MAX_CHANNELS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Invalid raster shape {width}x{height}x{channels}: {reason}")]
    InvalidShape {
        width: usize,
        height: usize,
        channels: usize,
        reason: String,
    },

    #[error(
        "Region {width}x{height} at ({x}, {y}) exceeds raster bounds {raster_width}x{raster_height}"
    )]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        raster_width: usize,
        raster_height: usize,
    },

    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Failed to read or write image '{path}': {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Width and height of a raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RasterSize {
    pub width: usize,
    pub height: usize,
}

impl RasterSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl From<(usize, usize)> for RasterSize {
    fn from((width, height): (usize, usize)) -> Self {
        Self { width, height }
    }
}

/// Bit depth of stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleDepth {
    #[default]
    U8,
    U16,
}

impl SampleDepth {
    #[inline]
    pub fn max_value(self) -> u32 {
        match self {
            SampleDepth::U8 => u8::MAX as u32,
            SampleDepth::U16 => u16::MAX as u32,
        }
    }
}

/// Unsigned integer sample type a [`Raster`] can hold.
pub trait Sample: PrimInt + Unsigned + Default + Debug + Send + Sync + 'static {
    const DEPTH: SampleDepth;

    fn to_u32(self) -> u32;

    /// Converts from `u32`, saturating at the type's maximum.
    fn from_u32(value: u32) -> Self;
}

macro_rules! impl_sample {
    ($ty:ty, $depth:expr) => {
        impl Sample for $ty {
            const DEPTH: SampleDepth = $depth;

            #[inline]
            fn to_u32(self) -> u32 {
                self as u32
            }

            #[inline]
            fn from_u32(value: u32) -> Self {
                value.min(<$ty>::MAX as u32) as $ty
            }
        }
    };
}

impl_sample!(u8, SampleDepth::U8);
impl_sample!(u16, SampleDepth::U16);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster<S> {
    width: usize,
    height: usize,
    channels: usize,
    samples: Vec<S>,
}

fn sample_count(width: usize, height: usize, channels: usize) -> Result<usize, RasterError> {
    let invalid = |reason: &str| RasterError::InvalidShape {
        width,
        height,
        channels,
        reason: reason.to_string(),
    };

    if channels == 0 || channels > MAX_CHANNELS {
        return Err(invalid("channel count must be 1..=4"));
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| invalid("sample count overflows usize"))
}

impl<S: Sample> Raster<S> {
    /// Zero-filled raster.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self, RasterError> {
        Self::new_filled(width, height, channels, S::zero())
    }

    pub fn new_filled(
        width: usize,
        height: usize,
        channels: usize,
        value: S,
    ) -> Result<Self, RasterError> {
        let len = sample_count(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            samples: vec![value; len],
        })
    }

    pub fn from_samples(
        width: usize,
        height: usize,
        channels: usize,
        samples: Vec<S>,
    ) -> Result<Self, RasterError> {
        let len = sample_count(width, height, channels)?;
        if samples.len() != len {
            return Err(RasterError::InvalidShape {
                width,
                height,
                channels,
                reason: format!("expected {} samples, got {}", len, samples.len()),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn size(&self) -> RasterSize {
        RasterSize::new(self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn samples(&self) -> &[S] {
        &self.samples
    }

    #[inline]
    pub fn into_samples(self) -> Vec<S> {
        self.samples
    }

    #[inline]
    fn row_stride(&self) -> usize {
        self.width * self.channels
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[S] {
        debug_assert!(x < self.width && y < self.height);
        let start = (y * self.width + x) * self.channels;
        &self.samples[start..start + self.channels]
    }

    fn check_region(&self, x: usize, y: usize, width: usize, height: usize) -> Result<(), RasterError> {
        let fits_x = x.checked_add(width).is_some_and(|end| end <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|end| end <= self.height);
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(RasterError::OutOfBounds {
                x,
                y,
                width,
                height,
                raster_width: self.width,
                raster_height: self.height,
            })
        }
    }

    /// Copies the `width`x`height` region at `(x, y)` into a new raster.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Result<Self, RasterError> {
        self.check_region(x, y, width, height)?;

        let row_len = width * self.channels;
        let mut samples = Vec::with_capacity(row_len * height);
        for row in y..y + height {
            let start = row * self.row_stride() + x * self.channels;
            samples.extend_from_slice(&self.samples[start..start + row_len]);
        }
        Self::from_samples(width, height, self.channels, samples)
    }

    /// Overwrites the region at `(x, y)` with `src`.
    pub fn blit(&mut self, src: &Raster<S>, x: usize, y: usize) -> Result<(), RasterError> {
        if src.channels != self.channels {
            return Err(RasterError::ChannelMismatch {
                expected: self.channels,
                actual: src.channels,
            });
        }
        self.check_region(x, y, src.width, src.height)?;

        let row_len = src.row_stride();
        let dst_stride = self.row_stride();
        for (src_row, dst_row) in src.samples.chunks_exact(row_len.max(1)).zip(y..) {
            let start = dst_row * dst_stride + x * self.channels;
            self.samples[start..start + row_len].copy_from_slice(src_row);
        }
        Ok(())
    }

    /// Applies `f` to every sample, keeping the shape.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(S) -> S,
    {
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            samples: self.samples.iter().map(|&s| f(s)).collect(),
        }
    }
}
