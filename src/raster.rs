//! Page rasterization – paints one page's positioned boxes into an RGBA
//! image at a configurable pixel scale.
//!
//! Text is drawn with `ab_glyph` through `imageproc`. Without a real font the
//! rasterizer falls back to greeking: each line becomes a grey bar of its
//! measured width, so layout is still visible in the output.

use std::collections::HashMap;

use ab_glyph::{FontVec, PxScale};
use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::error::{Error, Result};
use crate::fonts::{FontKey, FontManager, MONO, SANS};
use crate::layout::{font_key, BoxContent, PositionedBox};
use crate::style::Color;

/// Everything needed to paint one page.
#[derive(Debug, Clone)]
pub struct PageSurface {
    /// 0-based page index.
    pub page_index: usize,
    pub width_px: f32,
    pub height_px: f32,
    /// Boxes in page coordinates (origin at the top-left page corner).
    pub boxes: Vec<PositionedBox>,
    /// Footer text, stamped by the PDF writer rather than painted here.
    pub footer: Option<String>,
}

impl PageSurface {
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }
}

/// Turns a page surface into pixels.
pub trait Rasterizer {
    fn rasterize(&mut self, page: &PageSurface) -> Result<RgbaImage>;
}

/// Software rasterizer backed by `imageproc`.
pub struct CanvasRasterizer<'a> {
    scale: f32,
    fonts: &'a FontManager,
    glyphs: HashMap<FontKey, FontVec>,
    greeking_warned: bool,
}

impl<'a> CanvasRasterizer<'a> {
    /// Prepare glyph fonts once; every page reuses them.
    pub fn new(fonts: &'a FontManager, scale: f32) -> Self {
        let mut glyphs = HashMap::new();
        for family in [SANS, MONO] {
            for bold in [false, true] {
                let key = FontKey::new(family, bold);
                if let Some(font) = fonts.glyph_font(&key) {
                    glyphs.insert(key, font);
                }
            }
        }
        Self {
            scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
            fonts,
            glyphs,
            greeking_warned: false,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    fn paint_box(&mut self, img: &mut RgbaImage, b: &PositionedBox) {
        let style = &b.style;
        if !style.background.is_transparent() {
            fill(img, self.scale, b.x, b.y, b.width, b.height, style.background);
        }
        if let Some((width, color)) = style.border_left {
            fill(img, self.scale, b.x, b.y, width, b.height, color);
        }

        match &b.content {
            BoxContent::Text { lines } => self.paint_lines(img, b, lines),
            BoxContent::ListItem { marker } => {
                let marker_box = PositionedBox {
                    x: b.x - 18.0,
                    width: 18.0,
                    height: style.line_height,
                    children: Vec::new(),
                    content: BoxContent::None,
                    ..b.clone()
                };
                self.paint_lines(img, &marker_box, std::slice::from_ref(marker));
            }
            BoxContent::Image { src, alt } => {
                if let Err(e) = self.paint_image(img, b, src) {
                    log::warn!("skipping image {}: {e}", alt.as_deref().unwrap_or("without alt text"));
                    placeholder(img, self.scale, b);
                }
            }
            BoxContent::Rule => {
                let mid = b.y + b.height / 2.0;
                fill(img, self.scale, b.x, mid, b.width, 1.0, style.color);
            }
            BoxContent::None => {}
        }

        for child in &b.children {
            self.paint_box(img, child);
        }
    }

    fn paint_lines(&mut self, img: &mut RgbaImage, b: &PositionedBox, lines: &[String]) {
        let style = &b.style;
        let key = font_key(style);
        let s = self.scale;
        let color = Rgba(style.color.to_rgba8());

        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_top = b.y + style.padding_top + i as f32 * style.line_height;
            let x = b.x + style.padding_left;
            match self.glyphs.get(&key).or_else(|| self.glyphs.get(&FontKey::new(SANS, false))) {
                Some(font) => {
                    let y = line_top + (style.line_height - style.font_size * 1.2) / 2.0;
                    draw_text_mut(
                        img,
                        color,
                        (x * s) as i32,
                        (y * s) as i32,
                        PxScale::from(style.font_size * s),
                        font,
                        line,
                    );
                }
                None => {
                    if !self.greeking_warned {
                        log::warn!("no font available for rasterizing text, drawing placeholder bars");
                        self.greeking_warned = true;
                    }
                    let width = self
                        .fonts
                        .measure_text_width(line, style.font_size, &key)
                        .min(b.width - style.padding_left);
                    let bar = style.font_size * 0.5;
                    let y = line_top + (style.line_height - bar) / 2.0;
                    let grey = Color {
                        a: 0.35,
                        ..style.color
                    };
                    fill(img, s, x, y, width, bar, grey);
                }
            }
        }
    }

    fn paint_image(
        &self,
        img: &mut RgbaImage,
        b: &PositionedBox,
        src: &str,
    ) -> std::result::Result<(), String> {
        let bytes = decode_data_uri(src)?;
        let decoded = ::image::load_from_memory(&bytes)
            .map_err(|e| format!("decode error: {e}"))?
            .to_rgba8();
        let (src_w, src_h) = decoded.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err("image has no pixels".to_string());
        }

        let s = f64::from(self.scale);
        let (bx, by) = (f64::from(b.x) * s, f64::from(b.y) * s);
        let bw = (f64::from(b.width) * s).max(1.0);
        let bh = (f64::from(b.height) * s).max(1.0);

        // Only the part of the box that lands on the canvas is resampled.
        let (x0, y0) = (bx.max(0.0), by.max(0.0));
        let x1 = (bx + bw).min(f64::from(img.width()));
        let y1 = (by + bh).min(f64::from(img.height()));
        let (w, h) = ((x1 - x0).round(), (y1 - y0).round());
        if !(w >= 1.0 && h >= 1.0) {
            return Ok(());
        }

        // Source rectangle behind the visible part, at least one pixel.
        let (fx, fy) = (f64::from(src_w) / bw, f64::from(src_h) / bh);
        let sx = (((x0 - bx) * fx).floor() as u32).min(src_w - 1);
        let sy = (((y0 - by) * fy).floor() as u32).min(src_h - 1);
        let sw = (((x1 - x0) * fx).ceil() as u32).clamp(1, src_w - sx);
        let sh = (((y1 - y0) * fy).ceil() as u32).clamp(1, src_h - sy);
        let visible = imageops::crop_imm(&decoded, sx, sy, sw, sh).to_image();

        let resized = imageops::resize(&visible, w as u32, h as u32, imageops::FilterType::Triangle);
        imageops::overlay(img, &resized, x0 as i64, y0 as i64);
        Ok(())
    }
}

impl Rasterizer for CanvasRasterizer<'_> {
    fn rasterize(&mut self, page: &PageSurface) -> Result<RgbaImage> {
        let w = (page.width_px * self.scale).round() as u32;
        let h = (page.height_px * self.scale).round() as u32;
        if w == 0 || h == 0 {
            return Err(Error::raster(page.page_index, format!("empty canvas {w}x{h}")));
        }
        let mut img = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
        // Pixels past the canvas are dropped, clipping oversized blocks at
        // the page edge.
        for b in &page.boxes {
            self.paint_box(&mut img, b);
        }
        Ok(img)
    }
}

/// Fill a rectangle given in layout px.
fn fill(img: &mut RgbaImage, scale: f32, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let (pw, ph) = ((w * scale).round(), (h * scale).round());
    if pw < 1.0 || ph < 1.0 {
        return;
    }
    let rect = Rect::at((x * scale) as i32, (y * scale) as i32).of_size(pw as u32, ph as u32);
    if color.a >= 0.999 {
        draw_filled_rect_mut(img, rect, Rgba(color.to_rgba8()));
    } else {
        blend_rect(img, rect, color);
    }
}

fn blend_rect(img: &mut RgbaImage, rect: Rect, color: Color) {
    let [r, g, b, _] = color.to_rgba8();
    let alpha = color.a.clamp(0.0, 1.0);
    let x0 = rect.left().max(0) as u32;
    let y0 = rect.top().max(0) as u32;
    let x1 = (rect.right().max(-1) + 1).min(img.width() as i32) as u32;
    let y1 = (rect.bottom().max(-1) + 1).min(img.height() as i32) as u32;
    for py in y0..y1 {
        for px in x0..x1 {
            let p = img.get_pixel_mut(px, py);
            for (channel, src) in p.0.iter_mut().take(3).zip([r, g, b]) {
                *channel = (*channel as f32 * (1.0 - alpha) + src as f32 * alpha).round() as u8;
            }
        }
    }
}

fn placeholder(img: &mut RgbaImage, scale: f32, b: &PositionedBox) {
    let (pw, ph) = ((b.width * scale).round(), (b.height * scale).round());
    if pw < 1.0 || ph < 1.0 {
        return;
    }
    let rect = Rect::at((b.x * scale) as i32, (b.y * scale) as i32).of_size(pw as u32, ph as u32);
    draw_hollow_rect_mut(img, rect, Rgba([203, 210, 217, 255]));
}

/// Parse a `data:<mime>;base64,<data>` URI and return the decoded bytes.
///
/// Returns `Err` if `src` is not a data URI or is not base64 encoded.
pub fn decode_data_uri(src: &str) -> std::result::Result<Vec<u8>, String> {
    let Some(rest) = src.strip_prefix("data:") else {
        let preview: String = src.chars().take(80).collect();
        return Err(format!("image src is not a base64 data URI: {preview:?}"));
    };
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "invalid data URI: missing `,` after the header".to_string())?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::BlockStyle;

    fn text_box(y: f32) -> PositionedBox {
        PositionedBox {
            x: 64.0,
            y,
            width: 666.0,
            height: 28.0,
            style: BlockStyle::default(),
            content: BoxContent::Text {
                lines: vec!["Hello world".to_string()],
            },
            children: Vec::new(),
        }
    }

    fn page(boxes: Vec<PositionedBox>) -> PageSurface {
        PageSurface {
            page_index: 0,
            width_px: 794.0,
            height_px: 1123.0,
            boxes,
            footer: None,
        }
    }

    #[test]
    fn canvas_matches_page_size_times_scale() {
        let fonts = FontManager::default();
        let mut r = CanvasRasterizer::new(&fonts, 2.0);
        let img = r.rasterize(&page(Vec::new())).unwrap();
        assert_eq!(img.dimensions(), (1588, 2246));
        assert_eq!(img.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn greeked_text_leaves_ink() {
        let fonts = FontManager::default();
        let mut r = CanvasRasterizer::new(&fonts, 1.0);
        let img = r.rasterize(&page(vec![text_box(64.0)])).unwrap();
        let inked = (64..92).any(|y| img.get_pixel(70, y) != &Rgba([255, 255, 255, 255]));
        assert!(inked);
    }

    #[test]
    fn boxes_past_the_page_edge_are_clipped() {
        let fonts = FontManager::default();
        let mut r = CanvasRasterizer::new(&fonts, 1.0);
        let mut tall = text_box(1100.0);
        tall.height = 400.0;
        tall.style.background = Color::BLACK;
        let img = r.rasterize(&page(vec![tall])).unwrap();
        assert_eq!(img.height(), 1123);
        assert_eq!(img.get_pixel(100, 1122), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn broken_image_draws_placeholder() {
        let fonts = FontManager::default();
        let mut r = CanvasRasterizer::new(&fonts, 1.0);
        let b = PositionedBox {
            content: BoxContent::Image {
                src: "https://example.com/a.png".to_string(),
                alt: None,
            },
            height: 100.0,
            ..text_box(64.0)
        };
        let img = r.rasterize(&page(vec![b])).unwrap();
        assert_ne!(img.get_pixel(64, 64), &Rgba([255, 255, 255, 255]));
    }

    fn pixel_data_uri(color: Rgba<u8>) -> String {
        let mut png = Vec::new();
        RgbaImage::from_pixel(1, 1, color)
            .write_to(&mut std::io::Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", BASE64_STD.encode(png))
    }

    #[test]
    fn very_tall_image_is_clipped_before_resampling() {
        let fonts = FontManager::default();
        let mut r = CanvasRasterizer::new(&fonts, 2.0);
        let b = PositionedBox {
            content: BoxContent::Image {
                src: pixel_data_uri(Rgba([200, 0, 0, 255])),
                alt: None,
            },
            width: 100.0,
            height: 3_000_000.0,
            ..text_box(64.0)
        };
        let img = r.rasterize(&page(vec![b])).unwrap();
        assert_eq!(img.dimensions(), (1588, 2246));
        assert_eq!(img.get_pixel(200, 2245), &Rgba([200, 0, 0, 255]));
        assert_eq!(img.get_pixel(200, 100), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(400, 1000), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn image_above_the_page_shows_its_lower_part() {
        let fonts = FontManager::default();
        let mut r = CanvasRasterizer::new(&fonts, 1.0);
        let b = PositionedBox {
            content: BoxContent::Image {
                src: pixel_data_uri(Rgba([0, 0, 200, 255])),
                alt: None,
            },
            x: -50.0,
            y: -500.0,
            width: 100.0,
            height: 600.0,
            ..text_box(0.0)
        };
        let img = r.rasterize(&page(vec![b])).unwrap();
        assert_eq!(img.get_pixel(10, 50), &Rgba([0, 0, 200, 255]));
        assert_eq!(img.get_pixel(10, 150), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(60, 50), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn data_uri_decoding() {
        assert_eq!(decode_data_uri("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert!(decode_data_uri("https://x/y.png").is_err());
        assert!(decode_data_uri("data:text/plain,hi").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
    }
}
