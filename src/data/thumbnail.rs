//! Thumbnail generation
//!
//! Thumbnails are cropped to fill a fixed box (no letterboxing) and written
//! as JPEG.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::ImageFormat;
use thiserror::Error;

/// Errors produced while generating a thumbnail
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The source bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The thumbnail could not be encoded or written
    #[error("Failed to save thumbnail {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Turns source image bytes into a thumbnail file
pub trait Thumbnailer: Send + Sync {
    /// Crop-to-fill `source` into a `width` x `height` box and save it at `dest`
    fn fit_to_box(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        dest: &Path,
    ) -> Result<(), ThumbnailError>;
}

/// [`Thumbnailer`] backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageThumbnailer;

impl Thumbnailer for ImageThumbnailer {
    fn fit_to_box(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        dest: &Path,
    ) -> Result<(), ThumbnailError> {
        let image = image::load_from_memory(source).map_err(ThumbnailError::Decode)?;

        // JPEG has no alpha channel
        let thumb = image
            .resize_to_fill(width, height, FilterType::Lanczos3)
            .to_rgb8();

        thumb
            .save_with_format(dest, ImageFormat::Jpeg)
            .map_err(|source| ThumbnailError::Encode {
                path: dest.to_path_buf(),
                source,
            })
    }
}
