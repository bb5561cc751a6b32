//! Thumbnail generation.
//!
//! Thumbnails are upright JPEGs no larger than a square bounding box. The
//! source's Exif orientation is applied before resizing, since the output
//! carries no Exif block.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageReader};

use crate::error::CatalogError;
use crate::exif::tags::image as image_tags;
use crate::exif::{read_exif, IfdKind, TagValue};

/// Thumbnail generator settings.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailOptions {
    /// Longest edge in pixels
    pub max_size: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_size: 800,
            quality: 80,
        }
    }
}

/// Exif orientation of a JPEG, if it declares one.
pub fn orientation(data: &[u8]) -> Option<Orientation> {
    let exif = read_exif(data).ok()??;
    let value = exif
        .get(IfdKind::Zeroth, image_tags::ORIENTATION)
        .and_then(TagValue::first_u32)?;
    u8::try_from(value).ok().and_then(Orientation::from_exif)
}

/// Decode `data`, rotate it upright and shrink it to fit `options.max_size`.
///
/// Images already inside the box are not enlarged.
pub fn render(data: &[u8], options: ThumbnailOptions, path: &Path) -> Result<DynamicImage, CatalogError> {
    let mut img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CatalogError::io(path, e))?
        .decode()
        .map_err(|e| CatalogError::image(path, e))?;

    if let Some(orientation) = orientation(data) {
        img.apply_orientation(orientation);
    }

    if img.width() > options.max_size || img.height() > options.max_size {
        img = img.resize(options.max_size, options.max_size, FilterType::Lanczos3);
    }

    Ok(img)
}

/// Render a thumbnail for `data` and write it to `dest`, creating parent
/// directories as needed.
pub fn write_thumbnail(
    data: &[u8],
    source: &Path,
    dest: &Path,
    options: ThumbnailOptions,
) -> Result<(), CatalogError> {
    let img = render(data, options, source)?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }

    let file = File::create(dest).map_err(|e| CatalogError::io(dest, e))?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, options.quality);

    // alpha and palette images are flattened to RGB
    encoder
        .encode_image(&img.to_rgb8())
        .map_err(|e| CatalogError::image(dest, e))?;

    Ok(())
}
