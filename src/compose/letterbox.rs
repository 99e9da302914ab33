//! Letterbox fit
//!
//! Scales a source uniformly to fit the target and centres it on a black
//! canvas of exactly the target size.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use super::ComposeError;

/// Largest accepted canvas edge
pub const MAX_DIMENSION: u32 = 16_384;

/// Size of `src` scaled to fit inside `target` with its aspect ratio kept
///
/// Upscales as well as downscales. The free dimension is rounded half to
/// even, so a 4:3 source in a 16:9 target keeps the full target height.
pub fn contain_size(src: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (src.0 as f64, src.1 as f64);
    let (tw, th) = (target.0 as f64, target.1 as f64);
    let src_ratio = sw / sh;
    let target_ratio = tw / th;

    if src_ratio > target_ratio {
        let height = (sh / sw * tw).round_ties_even() as u32;
        (target.0, height.max(1))
    } else if src_ratio < target_ratio {
        let width = (sw / sh * th).round_ties_even() as u32;
        (width.max(1), target.1)
    } else {
        target
    }
}

/// Top-left offset that centres `inner` in `outer`, biased towards the origin
pub fn centre_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    ((outer.0 - inner.0) / 2, (outer.1 - inner.1) / 2)
}

/// Fit `image` into a `width` x `height` black canvas
pub fn letterbox(image: &DynamicImage, width: u32, height: u32) -> Result<RgbImage, ComposeError> {
    check_size(width, height)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ComposeError::Decode("source image is empty".to_string()));
    }

    let source = image.to_rgb8();
    let scaled_size = contain_size(source.dimensions(), (width, height));
    let scaled = if scaled_size == source.dimensions() {
        source
    } else {
        imageops::resize(&source, scaled_size.0, scaled_size.1, FilterType::CatmullRom)
    };

    let (x, y) = centre_offset((width, height), scaled_size);
    let mut canvas = RgbImage::new(width, height);
    imageops::replace(&mut canvas, &scaled, x as i64, y as i64);
    Ok(canvas)
}

pub(crate) fn check_size(width: u32, height: u32) -> Result<(), ComposeError> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ComposeError::InvalidSize { width, height });
    }
    Ok(())
}
