//! Export paginator – re-derives page membership from the rendered surface,
//! rasterizes each page and writes a multi-page PDF.
//!
//! Independent of the live [`crate::controller`]: export lays the document
//! out itself and paginates from measured heights, so it can run as a
//! one-shot job. A page that fails to rasterize is logged and left out;
//! only a missing content source aborts the export.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::block::Document;
use crate::error::{Error, Result};
use crate::estimate::HeightSource;
use crate::fonts::FontManager;
use crate::layout::RenderedSurface;
use crate::page::PageMetrics;
use crate::pagination::{paginate, PageAssignment};
use crate::pdf::{assemble_pdf, PageImage};
use crate::presenter::page_label;
use crate::raster::{CanvasRasterizer, PageSurface, Rasterizer};

pub const MIN_QUALITY: f32 = 1.0;
pub const MAX_QUALITY: f32 = 4.0;
pub const DEFAULT_QUALITY: f32 = 2.0;

/// Options for [`export_to_pdf`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    /// Output file (default: `document.pdf`).
    pub filename: PathBuf,
    /// Stamp "Page X of Y" in each page's bottom margin (default: true).
    pub include_page_numbers: bool,
    /// Raster scale factor; out-of-range values are clamped, see [`Self::scale`].
    pub quality: f32,
    /// Title written to the PDF metadata.
    pub title: String,
    /// TTF/OTF file used for all text; overrides system fonts.
    pub font_path: Option<PathBuf>,
    /// Look up system fonts when no font file is given.
    pub system_fonts: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            filename: PathBuf::from("document.pdf"),
            include_page_numbers: true,
            quality: DEFAULT_QUALITY,
            title: "document".to_string(),
            font_path: None,
            system_fonts: true,
        }
    }
}

impl ExportOptions {
    /// Quality clamped to `1..=4`.
    pub fn scale(&self) -> f32 {
        if self.quality.is_nan() {
            return DEFAULT_QUALITY;
        }
        self.quality.clamp(MIN_QUALITY, MAX_QUALITY)
    }
}

/// Where the exported content comes from.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// An `.html` or `.json` file on disk.
    Path(PathBuf),
    /// Editor HTML, possibly still carrying pagination markers.
    Html(String),
    Document(Document),
}

/// Pages rasterized by [`export_pages`].
#[derive(Debug, Clone)]
pub struct ExportedPages {
    pub images: Vec<PageImage>,
    /// 1-based numbers of pages that failed to rasterize.
    pub failed_pages: Vec<usize>,
    pub page_count: usize,
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub pages_written: usize,
    /// 1-based numbers of pages that failed to rasterize or embed.
    pub failed_pages: Vec<usize>,
    /// Size of the written PDF.
    pub bytes: usize,
}

/// Greedy first-fit over the surface's measured heights.
pub fn assign_pages(surface: &RenderedSurface) -> PageAssignment {
    let (_, assignment) = paginate(
        surface.blocks(),
        surface.metrics().content_height(),
        surface,
    );
    log::debug!(
        "assigned {} block(s) to {} page(s)",
        assignment.len(),
        assignment.page_count()
    );
    assignment
}

/// Build the off-screen surface for one page: only the blocks assigned to
/// it, stacked from the top margin.
pub fn page_surface(
    surface: &RenderedSurface,
    assignment: &PageAssignment,
    page_index: usize,
    include_page_numbers: bool,
) -> PageSurface {
    let metrics = surface.metrics();
    let mut cursor = metrics.margin_px;
    let mut boxes = Vec::new();

    for index in assignment.blocks_on(page_index) {
        let (Some(block), Some(rendered)) =
            (surface.blocks().get(index), surface.rendered().get(index))
        else {
            continue;
        };
        let mut root = rendered.root.clone();
        let dy = cursor + root.style.margin_top - root.y;
        root.translate_y(dy);
        cursor += surface.block_height(index, block);
        boxes.push(root);
    }

    PageSurface {
        page_index,
        width_px: metrics.width_px,
        height_px: metrics.height_px,
        boxes,
        footer: include_page_numbers
            .then(|| page_label(page_index + 1, assignment.page_count())),
    }
}

/// Rasterize every page of `surface`, strictly in order.
pub fn export_pages(
    surface: &RenderedSurface,
    options: &ExportOptions,
    rasterizer: &mut impl Rasterizer,
) -> ExportedPages {
    let assignment = assign_pages(surface);
    let page_count = assignment.page_count();
    let mut images = Vec::with_capacity(page_count);
    let mut failed_pages = Vec::new();

    for page_index in 0..page_count {
        let page = page_surface(surface, &assignment, page_index, options.include_page_numbers);
        match rasterizer.rasterize(&page) {
            Ok(image) => images.push(PageImage {
                page_number: page.page_number(),
                image,
                footer: page.footer,
            }),
            Err(e) => {
                log::warn!("skipping page {} of {page_count}: {e}", page.page_number());
                failed_pages.push(page.page_number());
            }
        }
    }

    ExportedPages {
        images,
        failed_pages,
        page_count,
    }
}

/// Load fonts once before the first page is laid out.
pub fn load_fonts(options: &ExportOptions) -> Result<FontManager> {
    let mut fonts = FontManager::new();
    if let Some(path) = &options.font_path {
        fonts.load_font_file(path)?;
    } else if options.system_fonts {
        fonts.load_system_fonts();
    }
    fonts.ensure_default();
    Ok(fonts)
}

/// Lay out `source`, paginate, rasterize and write the PDF to
/// `options.filename`.
pub fn export_to_pdf(source: &ContentSource, options: &ExportOptions) -> Result<ExportReport> {
    let fonts = load_fonts(options)?;
    let mut rasterizer = CanvasRasterizer::new(&fonts, options.scale());
    export_with(source, options, &fonts, &mut rasterizer)
}

/// [`export_to_pdf`] with caller-supplied fonts and rasterizer.
pub fn export_with(
    source: &ContentSource,
    options: &ExportOptions,
    fonts: &FontManager,
    rasterizer: &mut impl Rasterizer,
) -> Result<ExportReport> {
    let metrics = PageMetrics::a4();
    let surface = build_surface(source, &metrics, fonts)?;
    log::info!(
        "exporting {} block(s) to {}",
        surface.blocks().len(),
        options.filename.display()
    );

    let exported = export_pages(&surface, options, rasterizer);
    let pdf = assemble_pdf(&exported.images, &metrics, &options.title);
    write_output(&options.filename, &pdf.bytes)?;

    let pages_written = exported.images.len() - pdf.skipped_pages.len();
    let mut failed_pages = exported.failed_pages;
    failed_pages.extend(pdf.skipped_pages);
    failed_pages.sort_unstable();

    log::info!(
        "wrote {} ({} bytes, {} of {} page(s))",
        options.filename.display(),
        pdf.bytes.len(),
        pages_written,
        exported.page_count
    );
    Ok(ExportReport {
        path: options.filename.clone(),
        pages_written,
        failed_pages,
        bytes: pdf.bytes.len(),
    })
}

/// Load a document from disk: `.json` files as editor JSON, anything else
/// as HTML.
pub fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    if is_json(path) {
        Document::from_json(&text)
    } else {
        Ok(Document::from_html(&text))
    }
}

fn build_surface(
    source: &ContentSource,
    metrics: &PageMetrics,
    fonts: &FontManager,
) -> Result<RenderedSurface> {
    match source {
        ContentSource::Path(path) => {
            if !path.exists() {
                return Err(Error::SourceNotFound(path.clone()));
            }
            if is_json(path) {
                let document = load_document(path)?;
                RenderedSurface::from_document(&document, metrics, fonts)
            } else {
                let html = fs::read_to_string(path)?;
                RenderedSurface::from_html(&html, metrics, fonts)
            }
        }
        ContentSource::Html(html) => RenderedSurface::from_html(html, metrics, fonts),
        ContentSource::Document(document) => {
            RenderedSurface::from_document(document, metrics, fonts)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}
