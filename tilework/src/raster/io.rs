use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};

use super::{Raster, RasterError, Sample};

/// Sample types that can be read from and written to image files.
pub trait ImageSample: Sample {
    fn into_dynamic(raster: Raster<Self>) -> Result<DynamicImage, RasterError>;

    /// Converts any decoded image to this sample type, keeping its channel count.
    fn from_dynamic(image: DynamicImage) -> Result<Raster<Self>, RasterError>;
}

fn shape_error(width: usize, height: usize, channels: usize, reason: &str) -> RasterError {
    RasterError::InvalidShape {
        width,
        height,
        channels,
        reason: reason.to_string(),
    }
}

fn image_dimensions<S>(raster: &Raster<S>) -> Result<(u32, u32), RasterError> {
    let width = u32::try_from(raster.width);
    let height = u32::try_from(raster.height);
    match (width, height) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(shape_error(
            raster.width,
            raster.height,
            raster.channels,
            "dimensions exceed u32",
        )),
    }
}

macro_rules! impl_image_sample {
    ($ty:ty, $l:ident, $la:ident, $rgb:ident, $rgba:ident,
     $into_l:ident, $into_la:ident, $into_rgb:ident, $into_rgba:ident) => {
        impl ImageSample for $ty {
            fn into_dynamic(raster: Raster<Self>) -> Result<DynamicImage, RasterError> {
                let (w, h) = image_dimensions(&raster)?;
                let (width, height, channels) = (raster.width, raster.height, raster.channels);
                let samples = raster.into_samples();
                let image = match channels {
                    1 => ImageBuffer::<Luma<$ty>, _>::from_raw(w, h, samples)
                        .map(DynamicImage::$l),
                    2 => ImageBuffer::<LumaA<$ty>, _>::from_raw(w, h, samples)
                        .map(DynamicImage::$la),
                    3 => ImageBuffer::<Rgb<$ty>, _>::from_raw(w, h, samples)
                        .map(DynamicImage::$rgb),
                    4 => ImageBuffer::<Rgba<$ty>, _>::from_raw(w, h, samples)
                        .map(DynamicImage::$rgba),
                    _ => None,
                };
                image.ok_or_else(|| {
                    shape_error(width, height, channels, "sample buffer does not match image layout")
                })
            }

            fn from_dynamic(image: DynamicImage) -> Result<Raster<Self>, RasterError> {
                let width = image.width() as usize;
                let height = image.height() as usize;
                let channels = image.color().channel_count() as usize;
                let samples = match channels {
                    1 => image.$into_l().into_raw(),
                    2 => image.$into_la().into_raw(),
                    3 => image.$into_rgb().into_raw(),
                    4 => image.$into_rgba().into_raw(),
                    _ => {
                        return Err(shape_error(
                            width,
                            height,
                            channels,
                            "unsupported channel count",
                        ))
                    }
                };
                Raster::from_samples(width, height, channels, samples)
            }
        }
    };
}

impl_image_sample!(
    u8,
    ImageLuma8,
    ImageLumaA8,
    ImageRgb8,
    ImageRgba8,
    into_luma8,
    into_luma_alpha8,
    into_rgb8,
    into_rgba8
);

impl_image_sample!(
    u16,
    ImageLuma16,
    ImageLumaA16,
    ImageRgb16,
    ImageRgba16,
    into_luma16,
    into_luma_alpha16,
    into_rgb16,
    into_rgba16
);

impl<S: ImageSample> Raster<S> {
    /// Loads a PNG, JPEG or TIFF file. Format is picked from the file contents and extension.
    pub fn load(path: &Path) -> Result<Self, RasterError> {
        let image = image::open(path).map_err(|source| RasterError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        S::from_dynamic(image)
    }

    /// Saves to a file; the format is picked from the extension.
    pub fn save(&self, path: &Path) -> Result<(), RasterError> {
        let image = S::into_dynamic(self.clone())?;
        image.save(path).map_err(|source| RasterError::Image {
            path: path.to_path_buf(),
            source,
        })
    }
}
