//! Image file I/O.
//!
//! - `load_image`: decode any supported format into an RGBA `Image`.
//! - `save_image`: encode an `Image` in the format implied by the file extension.
//!
//! Row 0 is the top row both when decoding and when encoding, which is also
//! row 0 of the convolution, so no vertical flip is involved.
use crate::buffer::Image;
use crate::error::{ConvolveError, Result};
use image::RgbaImage;
use std::path::Path;

/// Load an image from disk as RGBA.
pub fn load_image(path: &Path) -> Result<Image> {
    let rgba = image::open(path)
        .map_err(|e| {
            ConvolveError::Decode(format!("Could not load image '{}': {e}", path.display()))
        })?
        .into_rgba8();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    if width == 0 || height == 0 {
        return Err(ConvolveError::Decode(format!(
            "Image '{}' is empty ({}x{})",
            path.display(),
            width,
            height
        )));
    }
    Image::from_rgba_bytes(rgba.as_raw(), width, height)
}

/// Save an image to disk; the format follows the path's extension.
pub fn save_image(image: &Image, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let width = u32::try_from(image.width())
        .map_err(|_| ConvolveError::Encode(format!("Width {} too large", image.width())))?;
    let height = u32::try_from(image.height())
        .map_err(|_| ConvolveError::Encode(format!("Height {} too large", image.height())))?;
    let out = RgbaImage::from_raw(width, height, image.as_bytes().to_vec()).ok_or_else(|| {
        ConvolveError::Encode(format!("Buffer does not match {}x{}", width, height))
    })?;
    out.save(path).map_err(|e| {
        ConvolveError::Encode(format!("Could not save output to '{}': {e}", path.display()))
    })
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
