//! Thumbnail derivation

use image::{imageops::FilterType, io::Reader as ImageReader, DynamicImage, ImageFormat};
use ingr_common::{Error, Result};
use std::path::Path;

/// Edge length of every thumbnail, in pixels
pub const THUMBNAIL_SIZE: u32 = 150;

/// Open `source` with its format sniffed from the content, not the extension
fn open_reader(source: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>> {
    ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| Error::Asset(format!("Cannot open {}: {}", source.display(), e)))
}

/// Pixel dimensions of `source`, read from its header
pub fn image_dimensions(source: &Path) -> Result<(u32, u32)> {
    open_reader(source)?
        .into_dimensions()
        .map_err(|e| Error::Asset(format!("Cannot probe {}: {}", source.display(), e)))
}

/// Decode `source` and resample it to exactly 150x150 with Lanczos3
///
/// Aspect ratio is not preserved.
pub fn render_thumbnail(source: &Path) -> Result<DynamicImage> {
    let image = open_reader(source)?
        .decode()
        .map_err(|e| Error::Asset(format!("Cannot decode {}: {}", source.display(), e)))?;
    Ok(image.resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3))
}

/// Render the thumbnail for `source` and write it to `dest`
///
/// The output format follows the extension of `dest`, PNG when it has none.
pub fn derive_thumbnail(source: &Path, dest: &Path) -> Result<()> {
    let mut thumbnail = render_thumbnail(source)?;
    let format = ImageFormat::from_path(dest).unwrap_or(ImageFormat::Png);
    if format == ImageFormat::Jpeg {
        thumbnail = DynamicImage::ImageRgb8(thumbnail.to_rgb8());
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Asset(format!("Cannot create {}: {}", parent.display(), e)))?;
    }

    thumbnail
        .save_with_format(dest, format)
        .map_err(|e| Error::Asset(format!("Cannot write {}: {}", dest.display(), e)))
}
