//! Image loading and saving for the demo.

use std::path::Path;

use darkroom_core::{GammaTables, PlanarImage, Rgb8Buffer};

/// Load an image file as linear planar RGB in the 16-bit domain.
///
/// Files are assumed to be sRGB-encoded, as PNG, JPEG and TIFF files from
/// ordinary tools are.
pub fn load_linear(path: &Path, gamma: &GammaTables) -> Result<PlanarImage, ImageIoError> {
    let img = image::open(path).map_err(ImageIoError::Decode)?;
    let mut planar = PlanarImage::from_rgb32f(&img.into_rgb32f());
    planar.for_each_row_mut(true, |_, planes| {
        for plane in planes {
            for v in plane.iter_mut() {
                *v = gamma.decode(*v);
            }
        }
    });
    Ok(planar)
}

/// Encode linear samples to sRGB and write them. PNG and TIFF outputs keep
/// 16 bits per channel; other formats get 8.
pub fn save_encoded(
    path: &Path,
    image: &PlanarImage,
    gamma: &GammaTables,
) -> Result<(), ImageIoError> {
    let mut encoded = image.clone();
    encoded.for_each_row_mut(true, |_, planes| {
        for plane in planes {
            for v in plane.iter_mut() {
                *v = gamma.encode(*v);
            }
        }
    });

    let out = image::DynamicImage::ImageRgb32F(encoded.to_rgb32f());
    let sixteen_bit = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "tif" | "tiff"));

    if sixteen_bit {
        out.into_rgb16().save(path).map_err(ImageIoError::Encode)
    } else {
        out.into_rgb8().save(path).map_err(ImageIoError::Encode)
    }
}

/// 8-bit preview of a linear image.
pub fn to_preview(image: &PlanarImage, gamma: &GammaTables) -> Rgb8Buffer {
    let mut buffer = Rgb8Buffer::new(image.width(), image.height());
    for row in 0..image.height() {
        for col in 0..image.width() {
            let rgb = image
                .get(row, col)
                .map(|v| (gamma.encode_normalized(v / darkroom_core::MAX_SAMPLE) * 255.0).round() as u8);
            buffer.set_pixel(col, row, rgb);
        }
    }
    buffer
}

/// Write an 8-bit preview buffer.
pub fn save_preview(path: &Path, preview: Rgb8Buffer) -> Result<(), ImageIoError> {
    let width = u32::try_from(preview.width()).map_err(|_| ImageIoError::TooLarge)?;
    let height = u32::try_from(preview.height()).map_err(|_| ImageIoError::TooLarge)?;
    let img = image::RgbImage::from_raw(width, height, preview.into_raw())
        .ok_or(ImageIoError::TooLarge)?;
    img.save(path).map_err(ImageIoError::Encode)
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, thiserror::Error)]
pub enum ImageIoError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
    #[error("image dimensions exceed the encoder's limits")]
    TooLarge,
}
