//! Image composition pipeline
//!
//! `compose` turns an arbitrary source image into a fixed-size frame in two
//! steps: letterbox fit, then the captioned vignette. The output depends only
//! on the inputs.

pub mod caption;
pub mod letterbox;

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use tracing::debug;

pub use caption::{CaptionRenderer, CaptionStyle};
pub use letterbox::letterbox;

/// Default JPEG quality for composed frames
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Composition error types
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Failed to render caption: {0}")]
    Render(String),
}

/// Everything that determines one composed frame
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    /// Encoded source image
    pub source: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub caption_lines: Vec<String>,
}

impl CompositionRequest {
    /// Decode, compose and encode as JPEG
    pub fn render_jpeg(&self, captions: &CaptionRenderer, quality: u8) -> Result<Vec<u8>, ComposeError> {
        letterbox::check_size(self.width, self.height)?;
        let image = decode(&self.source)?;
        let frame = compose(&image, self.width, self.height, &self.caption_lines, captions)?;
        encode_jpeg(&frame, quality)
    }
}

/// Letterbox `image` to `width` x `height`, then overlay the caption
pub fn compose(
    image: &DynamicImage,
    width: u32,
    height: u32,
    caption_lines: &[String],
    captions: &CaptionRenderer,
) -> Result<RgbImage, ComposeError> {
    let mut canvas = letterbox(image, width, height)?;
    captions.overlay(&mut canvas, caption_lines)?;
    Ok(canvas)
}

/// Decode any supported image format
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ComposeError> {
    let image = image::load_from_memory(bytes).map_err(|e| ComposeError::Decode(e.to_string()))?;
    debug!(width = image.width(), height = image.height(), "Decoded source image");
    Ok(image)
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ComposeError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(|e| ComposeError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::sync::OnceLock;

    fn renderer() -> &'static CaptionRenderer {
        static RENDERER: OnceLock<CaptionRenderer> = OnceLock::new();
        RENDERER.get_or_init(|| CaptionRenderer::new(CaptionStyle::default(), None))
    }

    fn png(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(colour));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_blank_captions_equal_letterbox() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([10, 200, 30])));
        let lines = vec![String::new(), "  ".to_string()];

        let composed = compose(&source, 640, 480, &lines, renderer()).unwrap();
        let boxed = letterbox(&source, 640, 480).unwrap();
        assert_eq!(composed, boxed);
    }

    #[test]
    fn test_compose_is_deterministic() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_fn(120, 90, |x, y| {
            Rgb([(x * 2) as u8, (y * 2) as u8, 128])
        }));
        let lines = vec!["01/06/2023".to_string(), "Paris, , France".to_string()];

        let a = compose(&source, 320, 180, &lines, renderer()).unwrap();
        let b = compose(&source, 320, 180, &lines, renderer()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_photo_frame_scenario() {
        // 4:3 source into a 16:9 frame: bars left and right
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(800, 600, Rgb([200, 200, 200])));
        let lines = vec!["01/06/2023".to_string(), "Paris, Île-de-France, France".to_string()];

        let frame = compose(&source, 1920, 1080, &lines, renderer()).unwrap();
        assert_eq!(frame.dimensions(), (1920, 1080));

        // 1440x1080 content at x = 240
        assert_eq!(frame.get_pixel(239, 10).0, [0, 0, 0]);
        assert_eq!(frame.get_pixel(1680, 10).0, [0, 0, 0]);
        assert_eq!(frame.get_pixel(240, 10).0, [200, 200, 200]);
        assert_eq!(frame.get_pixel(1679, 10).0, [200, 200, 200]);
        assert_eq!(frame.get_pixel(960, 540).0, [200, 200, 200]);
        // Right-hand bottom corner is outside the vignette
        assert_eq!(frame.get_pixel(1679, 1079).0, [200, 200, 200]);

        if renderer().has_fonts() {
            // The vignette reaches into the photo below the text
            let shaded = frame.get_pixel(250, 1075).0[0];
            assert!(shaded < 200, "no vignette over content: {}", shaded);

            // White text sits in the bottom-left corner
            let text_pixels = frame
                .enumerate_pixels()
                .filter(|(x, y, p)| *x < 240 && *y > 900 && p.0[0] > 220)
                .count();
            assert!(text_pixels > 50);
        }
    }

    #[test]
    fn test_render_jpeg_roundtrip_size() {
        let request = CompositionRequest {
            source: png(64, 48, [255, 0, 0]),
            width: 160,
            height: 90,
            caption_lines: vec!["01/06/2023".to_string()],
        };
        let jpeg = request.render_jpeg(renderer(), DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = decode(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (160, 90));
    }

    #[test]
    fn test_render_rejects_garbage_and_bad_sizes() {
        let garbage = CompositionRequest {
            source: b"definitely not an image".to_vec(),
            width: 100,
            height: 100,
            caption_lines: vec![],
        };
        assert!(matches!(
            garbage.render_jpeg(renderer(), 90),
            Err(ComposeError::Decode(_))
        ));

        let zero = CompositionRequest {
            source: png(4, 4, [0, 0, 0]),
            width: 0,
            height: 100,
            caption_lines: vec![],
        };
        assert!(matches!(
            zero.render_jpeg(renderer(), 90),
            Err(ComposeError::InvalidSize { .. })
        ));
    }
}
