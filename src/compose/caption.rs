//! Captioned vignette overlay
//!
//! Caption lines are drawn white in the bottom-left corner over a blurred
//! dark patch sized to the text. Text is laid out as SVG `<text>` and
//! rasterised with resvg against a font database built once at startup.

use std::path::Path;
use std::sync::Arc;

use image::imageops;
use image::{GrayImage, Luma, RgbImage};
use resvg::tiny_skia;
use tracing::{debug, info, warn};
use usvg::fontdb;

use super::ComposeError;

/// Fixed caption appearance
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    /// SVG `font-family` list
    pub font_family: String,
    pub font_size: f32,
    /// Space between the text block and the vignette edge
    pub padding: u32,
    /// Gap between consecutive lines
    pub line_spacing: u32,
    /// Gaussian sigma applied to the vignette mask
    pub blur_sigma: f32,
    /// Mask level of the vignette before blurring (255 = solid black)
    pub vignette_strength: u8,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_family: "Ubuntu, sans-serif".to_string(),
            font_size: 30.0,
            padding: 30,
            line_spacing: 10,
            blur_sigma: 50.0,
            vignette_strength: 180,
        }
    }
}

/// Ink extent of one rendered line, relative to its pen position on the baseline
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextBox {
    pub left: f32,
    /// Negative: the ink starts above the baseline
    pub top: f32,
    pub width: u32,
    pub height: u32,
}

/// Measures and draws captions. Immutable once built, shared across requests.
pub struct CaptionRenderer {
    fontdb: Arc<fontdb::Database>,
    style: CaptionStyle,
}

impl CaptionRenderer {
    /// Build a renderer over the system fonts plus `font_dir`, if given
    pub fn new(style: CaptionStyle, font_dir: Option<&Path>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = font_dir {
            db.load_fonts_dir(dir);
        }

        if db.is_empty() {
            warn!("No fonts found, captions will be drawn without text");
        } else {
            info!(faces = db.len(), family = %style.font_family, "Caption fonts loaded");
        }

        Self::with_fontdb(style, Arc::new(db))
    }

    pub fn with_fontdb(style: CaptionStyle, fontdb: Arc<fontdb::Database>) -> Self {
        Self { fontdb, style }
    }

    /// Whether any font face is available to draw text with
    pub fn has_fonts(&self) -> bool {
        !self.fontdb.is_empty()
    }

    /// Measure the ink box of one line
    ///
    /// A line with no drawable glyphs (or no usable font) measures as zero.
    pub fn measure(&self, line: &str) -> Result<TextBox, ComposeError> {
        let size = self.style.font_size;
        let pen_x = size;
        let baseline = size * 2.0;
        let width = (line.chars().count() as f32 + 2.0) * size * 2.0;
        let height = size * 4.0;

        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">{}</svg>"#,
            width,
            height,
            self.text_element(line, pen_x, baseline)
        );
        let tree = self.parse(&svg)?;

        let root = tree.root();
        if !root.has_children() {
            return Ok(TextBox::default());
        }
        let bbox = root.bounding_box();
        Ok(TextBox {
            left: bbox.left() - pen_x,
            top: bbox.top() - baseline,
            width: (bbox.right().ceil() - bbox.left().floor()).max(0.0) as u32,
            height: (bbox.bottom().ceil() - bbox.top().floor()).max(0.0) as u32,
        })
    }

    /// Darken the bottom-left corner and draw `lines` over it
    ///
    /// Blank lines are dropped first; with nothing left the canvas is not
    /// touched.
    pub fn overlay(&self, canvas: &mut RgbImage, lines: &[String]) -> Result<(), ComposeError> {
        let lines: Vec<&str> = lines
            .iter()
            .map(String::as_str)
            .filter(|l| !l.trim().is_empty())
            .collect();
        if lines.is_empty() {
            return Ok(());
        }

        let boxes = lines
            .iter()
            .map(|l| self.measure(l))
            .collect::<Result<Vec<_>, _>>()?;

        let text_width = boxes.iter().map(|b| b.width).max().unwrap_or(0);
        let text_height = boxes.iter().map(|b| b.height).sum::<u32>()
            + (boxes.len() as u32 - 1) * self.style.line_spacing;
        let band_width = text_width + 2 * self.style.padding;
        let band_height = text_height + 2 * self.style.padding;

        debug!(
            lines = lines.len(),
            text_width = text_width,
            text_height = text_height,
            "Drawing caption"
        );

        self.darken(canvas, band_width, band_height);
        self.draw_text(canvas, &lines, &boxes, text_height)
    }

    /// Blend black into the canvas through a blurred rectangle mask
    fn darken(&self, canvas: &mut RgbImage, band_width: u32, band_height: u32) {
        let (width, height) = canvas.dimensions();

        // The blur tail is negligible past three sigma, so only that much of
        // the mask around the band is materialised
        let margin = (self.style.blur_sigma * 3.0).ceil() as u32;
        let mask_width = width.min(band_width + 1 + margin);
        let mask_height = height.min(band_height + margin);

        // Columns 0..=band_width, and the band_height rows above the bottom edge
        let mut mask = GrayImage::new(mask_width, mask_height);
        let rect_width = mask_width.min(band_width + 1);
        let rect_top = mask_height.saturating_sub(band_height);
        for y in rect_top..mask_height {
            for x in 0..rect_width {
                mask.put_pixel(x, y, Luma([self.style.vignette_strength]));
            }
        }
        if self.style.blur_sigma > 0.0 {
            mask = imageops::blur(&mask, self.style.blur_sigma);
        }

        let y_offset = height - mask_height;
        for (x, y, m) in mask.enumerate_pixels() {
            let keep = 255 - m.0[0] as u32;
            if keep == 255 {
                continue;
            }
            let px = canvas.get_pixel_mut(x, y + y_offset);
            for c in px.0.iter_mut() {
                *c = ((*c as u32 * keep + 127) / 255) as u8;
            }
        }
    }

    /// Rasterise the lines top to bottom inside the padded band
    fn draw_text(
        &self,
        canvas: &mut RgbImage,
        lines: &[&str],
        boxes: &[TextBox],
        text_height: u32,
    ) -> Result<(), ComposeError> {
        if !self.has_fonts() {
            return Ok(());
        }
        let (width, height) = canvas.dimensions();
        let padding = self.style.padding as i64;

        // Only the band's rows are rasterised
        let band_top = (height as i64 - text_height as i64 - 2 * padding).max(0);
        let band_height = height - band_top as u32;
        let band_width = width.min(boxes.iter().map(|b| b.width).max().unwrap_or(0) + 2 * self.style.padding);
        if band_width == 0 || band_height == 0 {
            return Ok(());
        }

        let mut elements = String::new();
        // Each line's ink box, not its pen origin or ascender line, is placed
        // at (padding, ink_top). An ascender-anchored layout would sit lower
        // by the ascender-to-ink gap and further right by the left bearing,
        // pushing the last line into the bottom padding.
        let mut ink_top = height as i64 - text_height as i64 - padding;
        for (line, bbox) in lines.iter().zip(boxes) {
            let pen_x = padding as f32 - bbox.left;
            let baseline = (ink_top - band_top) as f32 - bbox.top;
            elements.push_str(&self.text_element(line, pen_x, baseline));
            ink_top += bbox.height as i64 + self.style.line_spacing as i64;
        }

        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">{}</svg>"#,
            band_width, band_height, elements
        );
        let tree = self.parse(&svg)?;

        let mut pixmap = tiny_skia::Pixmap::new(band_width, band_height)
            .ok_or_else(|| ComposeError::Render("failed to allocate caption pixmap".to_string()))?;
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        // Source-over with premultiplied text pixels
        for (i, src) in pixmap.data().chunks_exact(4).enumerate() {
            let alpha = src[3] as u32;
            if alpha == 0 {
                continue;
            }
            let x = i as u32 % band_width;
            let y = i as u32 / band_width + band_top as u32;
            let dst = canvas.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = src[c] as u32 + (dst.0[c] as u32 * (255 - alpha) + 127) / 255;
                dst.0[c] = blended.min(255) as u8;
            }
        }
        Ok(())
    }

    fn text_element(&self, line: &str, x: f32, baseline: f32) -> String {
        format!(
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}" fill="white" xml:space="preserve">{}</text>"#,
            x,
            baseline,
            escape_xml(&self.style.font_family),
            self.style.font_size,
            escape_xml(line)
        )
    }

    fn parse(&self, svg: &str) -> Result<usvg::Tree, ComposeError> {
        let opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            font_resolver: font_resolver(),
            ..Default::default()
        };
        usvg::Tree::from_str(svg, &opts).map_err(|e| ComposeError::Render(e.to_string()))
    }
}

/// Resolve the requested families, then any sans-serif face, then any face at all
fn font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, db| {
            let mut families = Vec::<fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => fontdb::Family::Name(s),
                });
            }
            families.push(fontdb::Family::SansSerif);

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };

            if let Some(id) = db.query(&query) {
                return Some(id);
            }
            db.faces().next().map(|f| f.id)
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
