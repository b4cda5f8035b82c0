//! Rendered surface – lays the document out with Taffy at the page's
//! content width and reads back each top-level block's box height.
//!
//! This is the measuring backend of [`HeightSource`]: export paginates from
//! these measured boxes, falling back to [`estimate`] for blocks that cannot
//! be measured (unknown image sizes, page-break sentinels).

use std::collections::HashMap;

use taffy::prelude::*;

use crate::block::{surface_nodes, BlockKind, ContentBlock, Document, SurfaceNode};
use crate::dom;
use crate::error::{Error, Result};
use crate::estimate::{estimate, HeightSource, IMAGE_PLACEHOLDER_HEIGHT};
use crate::fonts::{wrap_text, FontKey, FontManager, MONO, SANS};
use crate::page::PageMetrics;
use crate::raster::decode_data_uri;
use crate::style::{style_for, BlockStyle};

// ---------------------------------------------------------------------------
// Positioned boxes
// ---------------------------------------------------------------------------

/// A laid-out box. `x` is page-absolute, `y` is relative to the top of the
/// surface until the export places it on a page.
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: BlockStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

impl PositionedBox {
    /// Height including vertical margins.
    pub fn outer_height(&self) -> f32 {
        self.height + self.style.vertical_margin()
    }

    /// Shift this box and all descendants vertically.
    pub fn translate_y(&mut self, dy: f32) {
        self.y += dy;
        for child in &mut self.children {
            child.translate_y(dy);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxContent {
    None,
    /// Pre-wrapped text lines.
    Text { lines: Vec<String> },
    Image { src: String, alt: Option<String> },
    /// Bullet or number drawn in the list gutter.
    ListItem { marker: String },
    /// Horizontal rule, drawn through the middle of the box.
    Rule,
}

/// One top-level block on the surface.
#[derive(Debug, Clone)]
pub struct RenderedBlock {
    pub root: PositionedBox,
    /// Measured outer height; `None` when the box only holds a placeholder.
    pub measured: Option<f32>,
}

/// The rendered content surface export paginates from.
#[derive(Debug, Clone)]
pub struct RenderedSurface {
    metrics: PageMetrics,
    blocks: Vec<ContentBlock>,
    rendered: Vec<RenderedBlock>,
    markers_skipped: usize,
}

/// A block whose measured and estimated heights disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightDrift {
    pub index: usize,
    pub kind: BlockKind,
    pub estimated: f32,
    pub measured: f32,
}

impl RenderedSurface {
    /// Lay out editor HTML. Pagination markers already present in the HTML
    /// are excluded so they are never counted as content.
    pub fn from_html(html: &str, metrics: &PageMetrics, fonts: &FontManager) -> Result<Self> {
        let nodes = dom::body_children(&dom::parse_html(html));
        Self::from_nodes(surface_nodes(&nodes), metrics, fonts)
    }

    pub fn from_document(
        document: &Document,
        metrics: &PageMetrics,
        fonts: &FontManager,
    ) -> Result<Self> {
        let nodes = document
            .blocks()
            .iter()
            .cloned()
            .map(SurfaceNode::Block)
            .collect();
        Self::from_nodes(nodes, metrics, fonts)
    }

    pub fn from_nodes(
        nodes: Vec<SurfaceNode>,
        metrics: &PageMetrics,
        fonts: &FontManager,
    ) -> Result<Self> {
        let mut markers_skipped = 0;
        let blocks: Vec<ContentBlock> = nodes
            .into_iter()
            .filter_map(|node| match node {
                SurfaceNode::Block(b) => Some(b),
                SurfaceNode::Marker => {
                    markers_skipped += 1;
                    None
                }
            })
            .collect();
        if markers_skipped > 0 {
            log::debug!("skipped {markers_skipped} pagination marker(s) on the surface");
        }

        let rendered = compute_layout(&blocks, metrics, fonts)?;
        Ok(Self {
            metrics: *metrics,
            blocks,
            rendered,
            markers_skipped,
        })
    }

    pub fn metrics(&self) -> &PageMetrics {
        &self.metrics
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn rendered(&self) -> &[RenderedBlock] {
        &self.rendered
    }

    pub fn markers_skipped(&self) -> usize {
        self.markers_skipped
    }

    pub fn measured_height(&self, index: usize) -> Option<f32> {
        self.rendered.get(index).and_then(|r| r.measured)
    }

    /// Blocks whose measured height differs from the estimate by more than
    /// `tolerance` px.
    pub fn drift(&self, tolerance: f32) -> Vec<HeightDrift> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| {
                let measured = self.measured_height(index)?;
                let estimated = estimate(block);
                ((measured - estimated).abs() > tolerance).then_some(HeightDrift {
                    index,
                    kind: block.kind,
                    estimated,
                    measured,
                })
            })
            .collect()
    }
}

impl HeightSource for RenderedSurface {
    fn block_height(&self, index: usize, block: &ContentBlock) -> f32 {
        self.measured_height(index).unwrap_or_else(|| estimate(block))
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from blocks
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, BlockStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

/// Result of building one top-level block.
struct Built {
    node: NodeId,
    measurable: bool,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    fn build_block(&mut self, block: &ContentBlock, width: f32) -> Result<Built> {
        let style = style_for(block);
        match block.kind {
            BlockKind::BulletList | BlockKind::OrderedList => {
                let inner = width - style.padding_left - style.padding_right;
                let mut children = Vec::new();
                for (n, item) in block.children.iter().enumerate() {
                    let built = if item.kind == BlockKind::ListItem {
                        self.build_block(item, inner)?
                    } else {
                        let wrapped = ContentBlock::container(BlockKind::ListItem, vec![item.clone()]);
                        self.build_block(&wrapped, inner)?
                    };
                    let marker = if block.kind == BlockKind::OrderedList {
                        format!("{}.", n + 1)
                    } else {
                        "\u{2022}".to_string()
                    };
                    self.node_content
                        .insert(built.node, BoxContent::ListItem { marker });
                    children.push(built.node);
                }
                self.container(style, width, &children)
            }
            // Bare item text goes into an unstyled line box so the item
            // itself can carry the list marker.
            BlockKind::ListItem if block.children.is_empty() => {
                let line_style = BlockStyle::default();
                let key = FontKey::new(SANS, false);
                let lines = wrap_text(block.text.trim(), line_style.font_size, &key, width, self.fonts);
                let text = self.text_leaf(line_style, width, lines)?;
                self.container(style, width, &[text.node])
            }
            BlockKind::ListItem | BlockKind::Blockquote => {
                let inner = width - style.padding_left - style.padding_right;
                let mut children = Vec::new();
                for child in &block.children {
                    children.push(self.build_block(child, inner)?.node);
                }
                self.container(style, width, &children)
            }
            BlockKind::CodeBlock => {
                let lines = block.text.split('\n').map(str::to_string).collect();
                self.text_leaf(style, width, lines)
            }
            BlockKind::HorizontalRule => {
                let height = style.min_height;
                self.leaf(style, width, height, BoxContent::Rule, true)
            }
            BlockKind::PageBreak => self.leaf(style, width, 0.0, BoxContent::None, false),
            BlockKind::Image => self.image_leaf(block, style, width),
            BlockKind::Paragraph
            | BlockKind::Heading
            | BlockKind::Text
            | BlockKind::Other => {
                let key = FontKey::new(SANS, style.bold);
                let inner = width - style.padding_left - style.padding_right;
                let lines = wrap_text(block.text.trim(), style.font_size, &key, inner, self.fonts);
                self.text_leaf(style, width, lines)
            }
        }
    }

    fn text_leaf(&mut self, style: BlockStyle, width: f32, lines: Vec<String>) -> Result<Built> {
        let line_count = lines.len().max(1) as f32;
        let height = (style.padding_top + line_count * style.line_height + style.padding_bottom)
            .max(style.min_height);
        self.leaf(style, width, height, BoxContent::Text { lines }, true)
    }

    fn image_leaf(&mut self, block: &ContentBlock, style: BlockStyle, width: f32) -> Result<Built> {
        let src = block.attr_str("src").unwrap_or_default().to_string();
        let attr_w = block.attr_f32("width").filter(|w| *w > 0.0);
        let attr_h = block.attr_f32("height").filter(|h| h.is_finite() && *h >= 0.0);
        let intrinsic = intrinsic_size(&src);

        let (w, h, measurable) = match (attr_h, intrinsic) {
            (Some(h), Some((iw, ih))) => (attr_w.unwrap_or(h * iw / ih), h, true),
            (Some(h), None) => (attr_w.unwrap_or(width), h, true),
            (None, Some((iw, ih))) => {
                let w = attr_w.unwrap_or(iw).min(width);
                (w, w * ih / iw, true)
            }
            // Nothing to measure: keep a placeholder box.
            (None, None) => (attr_w.unwrap_or(width), IMAGE_PLACEHOLDER_HEIGHT, false),
        };
        let content = BoxContent::Image {
            src,
            alt: block.attr_str("alt").map(str::to_string),
        };
        self.leaf(style, w.min(width), h, content, measurable)
    }

    fn leaf(
        &mut self,
        style: BlockStyle,
        width: f32,
        height: f32,
        content: BoxContent,
        measurable: bool,
    ) -> Result<Built> {
        let taffy_style = Style {
            size: Size {
                width: Dimension::Length(width.max(0.0)),
                height: Dimension::Length(height.max(0.0)),
            },
            margin: margins(&style),
            flex_shrink: 0.0,
            ..Default::default()
        };
        let node = self.taffy.new_leaf(taffy_style).map_err(layout_error)?;
        self.node_styles.insert(node, style);
        self.node_content.insert(node, content);
        Ok(Built { node, measurable })
    }

    fn container(&mut self, style: BlockStyle, width: f32, children: &[NodeId]) -> Result<Built> {
        let taffy_style = Style {
            display: taffy::Display::Flex,
            flex_direction: taffy::FlexDirection::Column,
            size: Size {
                width: Dimension::Length(width.max(0.0)),
                height: Dimension::Auto,
            },
            min_size: Size {
                width: Dimension::Auto,
                height: Dimension::Length(style.min_height),
            },
            margin: margins(&style),
            padding: Rect {
                top: LengthPercentage::Length(style.padding_top),
                right: LengthPercentage::Length(style.padding_right),
                bottom: LengthPercentage::Length(style.padding_bottom),
                left: LengthPercentage::Length(style.padding_left),
            },
            flex_shrink: 0.0,
            ..Default::default()
        };
        let node = self
            .taffy
            .new_with_children(taffy_style, children)
            .map_err(layout_error)?;
        self.node_styles.insert(node, style);
        Ok(Built {
            node,
            measurable: true,
        })
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(layout_error)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(layout_error)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            content,
            children,
        })
    }
}

fn margins(style: &BlockStyle) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(style.margin_top),
        right: LengthPercentageAuto::Length(0.0),
        bottom: LengthPercentageAuto::Length(style.margin_bottom),
        left: LengthPercentageAuto::Length(0.0),
    }
}

fn layout_error(e: taffy::TaffyError) -> Error {
    Error::Layout(e.to_string())
}

/// Pixel size of a base64 data-URI image, if it decodes.
fn intrinsic_size(src: &str) -> Option<(f32, f32)> {
    let bytes = decode_data_uri(src).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (w, h) = (img.width() as f32, img.height() as f32);
    (w > 0.0 && h > 0.0).then_some((w, h))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out top-level blocks at the content width, returning one rendered
/// block per input block.
pub fn compute_layout(
    blocks: &[ContentBlock],
    metrics: &PageMetrics,
    fonts: &FontManager,
) -> Result<Vec<RenderedBlock>> {
    let content_width = metrics.content_width();
    let mut builder = LayoutBuilder::new(fonts);

    let mut built = Vec::with_capacity(blocks.len());
    for block in blocks {
        built.push(builder.build_block(block, content_width)?);
    }
    let child_ids: Vec<NodeId> = built.iter().map(|b| b.node).collect();

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: Dimension::Length(content_width),
            height: Dimension::Auto,
        },
        ..Default::default()
    };
    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .map_err(layout_error)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_error)?;

    let root_box = builder.extract(root, metrics.margin_px, 0.0)?;
    Ok(root_box
        .children
        .into_iter()
        .zip(built)
        .map(|(root, b)| RenderedBlock {
            measured: b.measurable.then(|| root.outer_height()),
            root,
        })
        .collect())
}

/// Font key used to draw text in a box with `style`.
pub fn font_key(style: &BlockStyle) -> FontKey {
    FontKey::new(if style.monospace { MONO } else { SANS }, style.bold)
}
