//! PDF assembly – embeds one raster image per page with `printpdf` and
//! optionally stamps the "Page X of Y" footer as text.

use std::io::Cursor;

use image::RgbaImage;
use printpdf::{
    BuiltinFont, Color, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt,
    RawImage, Rgb, TextItem, XObjectTransform,
};

use crate::error::{Error, Result};
use crate::page::PageMetrics;

const MM_TO_PT: f32 = 72.0 / 25.4;
const FOOTER_FONT_SIZE: f32 = 9.0;

/// A rasterized page ready for the PDF.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number.
    pub page_number: usize,
    pub image: RgbaImage,
    pub footer: Option<String>,
}

/// Output of [`assemble_pdf`].
#[derive(Debug, Clone)]
pub struct AssembledPdf {
    pub bytes: Vec<u8>,
    /// 1-based numbers of pages whose image could not be embedded.
    pub skipped_pages: Vec<usize>,
}

/// Assemble page images into PDF bytes, one physical page per image.
///
/// Every image is stretched over the full page, so the raster scale only
/// affects sharpness. A page whose image cannot be embedded is logged and
/// left out. If nothing is embedded the PDF holds a single blank page.
pub fn assemble_pdf(pages: &[PageImage], metrics: &PageMetrics, title: &str) -> AssembledPdf {
    let page_w = Mm(metrics.width_mm);
    let page_h = Mm(metrics.height_mm);
    let page_w_pt = metrics.width_mm * MM_TO_PT;
    let page_h_pt = metrics.height_mm * MM_TO_PT;
    let pt_per_px = page_w_pt / metrics.width_px;

    let mut doc = PdfDocument::new(title);
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let mut pdf_pages = Vec::with_capacity(pages.len().max(1));
    let mut skipped_pages = Vec::new();

    for page in pages {
        let (px_w, px_h) = page.image.dimensions();
        let raw = match embeddable(page, &mut warnings) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("page {} left out of the PDF: {e}", page.page_number);
                skipped_pages.push(page.page_number);
                continue;
            }
        };
        let xobj_id = doc.add_image(&raw);

        // At dpi=72 printpdf maps 1 px to 1 pt, so scale = page_pt / px.
        let mut ops = vec![Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                dpi: Some(72.0),
                scale_x: Some(page_w_pt / px_w as f32),
                scale_y: Some(page_h_pt / px_h as f32),
                rotate: None,
            },
        }];

        if let Some(footer) = &page.footer {
            // Centred in the bottom margin.
            let width = footer.chars().count() as f32 * FOOTER_FONT_SIZE * 0.5;
            let baseline = metrics.margin_px * pt_per_px / 2.0 - FOOTER_FONT_SIZE / 3.0;
            footer_ops(&mut ops, footer, (page_w_pt - width) / 2.0, baseline);
        }

        pdf_pages.push(PdfPage::new(page_w, page_h, ops));
    }

    if pdf_pages.is_empty() {
        log::warn!("no page images to write, emitting a blank page");
        pdf_pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }
    for w in &warnings {
        log::debug!("printpdf: {w:?}");
    }

    doc.with_pages(pdf_pages);
    AssembledPdf {
        bytes: doc.save(&PdfSaveOptions::default(), &mut Vec::new()),
        skipped_pages,
    }
}

fn embeddable(page: &PageImage, warnings: &mut Vec<PdfWarnMsg>) -> Result<RawImage> {
    let (w, h) = page.image.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::Pdf(format!("page {} has an empty image", page.page_number)));
    }
    let png = encode_png(&page.image)?;
    RawImage::decode_from_bytes(&png, warnings)
        .map_err(|e| Error::Pdf(format!("page {}: {e}", page.page_number)))
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let rgb = ::image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut bytes = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bytes), ::image::ImageFormat::Png)
        .map_err(|e| Error::Pdf(format!("PNG encode error: {e}")))?;
    Ok(bytes)
}

fn footer_ops(ops: &mut Vec<Op>, text: &str, x: f32, y: f32) {
    let font = BuiltinFont::Helvetica;
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(FOOTER_FONT_SIZE),
        font,
    });
    ops.push(Op::SetFillColor {
        col: Color::Rgb(Rgb {
            r: 0.4,
            g: 0.45,
            b: 0.5,
            icc_profile: None,
        }),
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Map a string onto WinAnsiEncoding for the builtin fonts, one byte per
/// glyph. Characters outside ASCII become `?`.
fn to_winlatin(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{00A0}' => ' ',
            c if (c as u32) < 128 => c,
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn page(n: usize, footer: Option<&str>) -> PageImage {
        PageImage {
            page_number: n,
            image: RgbaImage::from_pixel(79, 112, Rgba([255, 255, 255, 255])),
            footer: footer.map(str::to_string),
        }
    }

    #[test]
    fn assembles_one_page_per_image() {
        let pages = vec![page(1, Some("Page 1 of 2")), page(2, Some("Page 2 of 2"))];
        let pdf = assemble_pdf(&pages, &PageMetrics::a4(), "test");
        assert_eq!(&pdf.bytes[0..5], b"%PDF-");
        assert!(pdf.bytes.len() > 100);
        assert!(pdf.skipped_pages.is_empty());
    }

    #[test]
    fn empty_input_gives_blank_page() {
        let pdf = assemble_pdf(&[], &PageMetrics::a4(), "empty");
        assert_eq!(&pdf.bytes[0..5], b"%PDF-");
    }

    #[test]
    fn empty_image_is_skipped() {
        let bad = PageImage {
            page_number: 2,
            image: RgbaImage::new(0, 0),
            footer: None,
        };
        let pages = vec![page(1, None), bad, page(3, None)];
        let pdf = assemble_pdf(&pages, &PageMetrics::a4(), "bad");
        assert_eq!(pdf.skipped_pages, vec![2]);
        assert_eq!(&pdf.bytes[0..5], b"%PDF-");
    }

    #[test]
    fn winlatin_replaces_non_ascii() {
        assert_eq!(to_winlatin("Page 1 of 2"), "Page 1 of 2");
        assert_eq!(to_winlatin("a\u{00A0}b\u{4e2d}"), "a b?");
    }
}
