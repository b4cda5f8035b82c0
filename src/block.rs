//! Content blocks – the tree-shaped document handed to the pagination core
//! by the editing surface.
//!
//! Blocks are plain values. The pagination engine reads them; only the
//! [`Document`] mutators (standing in for the editing surface) change them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::DocumentEvent;
use crate::dom::{self, escape_text, DomNode, ElementNode, Tag};

/// Structural type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    /// User-inserted manual page break.
    PageBreak,
    Image,
    /// Inline text leaf; folded into its parent's text on import.
    Text,
    Other,
}

impl BlockKind {
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::BulletList => "bulletList",
            BlockKind::OrderedList => "orderedList",
            BlockKind::ListItem => "listItem",
            BlockKind::Blockquote => "blockquote",
            BlockKind::CodeBlock => "codeBlock",
            BlockKind::HorizontalRule => "horizontalRule",
            BlockKind::PageBreak => "pageBreak",
            BlockKind::Image => "image",
            BlockKind::Text => "text",
            BlockKind::Other => "other",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "paragraph" => BlockKind::Paragraph,
            "heading" => BlockKind::Heading,
            "bulletList" => BlockKind::BulletList,
            "orderedList" => BlockKind::OrderedList,
            "listItem" => BlockKind::ListItem,
            "blockquote" => BlockKind::Blockquote,
            "codeBlock" => BlockKind::CodeBlock,
            "horizontalRule" => BlockKind::HorizontalRule,
            "pageBreak" => BlockKind::PageBreak,
            "image" => BlockKind::Image,
            "text" => BlockKind::Text,
            _ => BlockKind::Other,
        }
    }

}

impl From<String> for BlockKind {
    fn from(name: String) -> Self {
        BlockKind::from_name(&name)
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        kind.name().to_string()
    }
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Flattened text, used only for length heuristics and rendering.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, rename = "content", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, Value>,
}

impl ContentBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            text: String::new(),
            children: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(BlockKind::Paragraph)
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(BlockKind::Heading)
        }
        .with_attr("level", level)
    }

    pub fn code_block(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(BlockKind::CodeBlock)
        }
    }

    pub fn bullet_list(items: Vec<ContentBlock>) -> Self {
        Self::container(BlockKind::BulletList, items)
    }

    pub fn ordered_list(items: Vec<ContentBlock>) -> Self {
        Self::container(BlockKind::OrderedList, items)
    }

    /// A list item holding a single paragraph.
    pub fn list_item(text: impl Into<String>) -> Self {
        Self::container(BlockKind::ListItem, vec![Self::paragraph(text)])
    }

    pub fn blockquote(children: Vec<ContentBlock>) -> Self {
        Self::container(BlockKind::Blockquote, children)
    }

    pub fn horizontal_rule() -> Self {
        Self::new(BlockKind::HorizontalRule)
    }

    pub fn page_break() -> Self {
        Self::new(BlockKind::PageBreak)
    }

    /// An image block; `height` is its explicit rendered height, if known.
    pub fn image(src: impl Into<String>, height: Option<f32>) -> Self {
        let block = Self::new(BlockKind::Image).with_attr("src", src.into());
        match height {
            Some(h) => block.with_attr("height", h),
            None => block,
        }
    }

    pub fn container(kind: BlockKind, children: Vec<ContentBlock>) -> Self {
        let mut block = Self {
            children,
            ..Self::new(kind)
        };
        block.text = block.children.iter().map(|c| c.text.as_str()).collect();
        block
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Numeric attribute, accepting either a JSON number or a numeric string.
    pub fn attr_f32(&self, name: &str) -> Option<f32> {
        match self.attrs.get(name)? {
            Value::Number(n) => n.as_f64().map(|v| v as f32),
            Value::String(s) => s.trim().trim_end_matches("px").parse().ok(),
            _ => None,
        }
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    /// Heading level, when set.
    pub fn heading_level(&self) -> Option<u8> {
        self.attr_f32("level").map(|l| l as u8)
    }

    pub fn is_page_break(&self) -> bool {
        self.kind == BlockKind::PageBreak
    }

    /// Fold inline text leaves into their parents and derive container text.
    fn normalize(&mut self) {
        for child in &mut self.children {
            child.normalize();
        }
        if self.children.iter().any(|c| c.kind == BlockKind::Text) {
            let (inline, blocks): (Vec<_>, Vec<_>) = std::mem::take(&mut self.children)
                .into_iter()
                .partition(|c| c.kind == BlockKind::Text);
            let folded: String = inline.iter().map(|c| c.text.as_str()).collect();
            self.text.push_str(&folded);
            self.children = blocks;
        }
        if self.text.is_empty() && !self.children.is_empty() {
            self.text = self.children.iter().map(|c| c.text.as_str()).collect();
        }
    }

    /// Serialise back to editor HTML.
    pub fn to_html(&self) -> String {
        let inner: String = self.children.iter().map(ContentBlock::to_html).collect();
        match self.kind {
            BlockKind::Paragraph => format!("<p>{}</p>", escape_text(&self.text)),
            BlockKind::Heading => {
                let level = self.heading_level().unwrap_or(3).clamp(1, 6);
                format!("<h{level}>{}</h{level}>", escape_text(&self.text))
            }
            BlockKind::BulletList => format!("<ul>{inner}</ul>"),
            BlockKind::OrderedList => format!("<ol>{inner}</ol>"),
            BlockKind::ListItem => format!("<li>{inner}</li>"),
            BlockKind::Blockquote => format!("<blockquote>{inner}</blockquote>"),
            BlockKind::CodeBlock => format!("<pre><code>{}</code></pre>", escape_text(&self.text)),
            BlockKind::HorizontalRule => "<hr>".to_string(),
            BlockKind::PageBreak => {
                r#"<div data-type="page-break" class="page-break"></div>"#.to_string()
            }
            BlockKind::Image => {
                let mut html = format!(
                    r#"<img src="{}""#,
                    escape_text(self.attr_str("src").unwrap_or_default())
                );
                for name in ["width", "height"] {
                    if let Some(v) = self.attr_f32(name) {
                        html.push_str(&format!(r#" {name}="{v}""#));
                    }
                }
                html.push_str(" />");
                html
            }
            BlockKind::Text => escape_text(&self.text),
            BlockKind::Other => format!(
                r#"<div data-block="other">{}</div>"#,
                escape_text(&self.text)
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// DOM → blocks
// ---------------------------------------------------------------------------

/// A top-level item of a rendered surface: either real content or a
/// presentation marker that was rendered into it.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceNode {
    Block(ContentBlock),
    Marker,
}

/// Convert parsed DOM nodes into top-level surface nodes. Presentation
/// markers are kept (as [`SurfaceNode::Marker`]) so callers can decide to
/// skip them.
pub fn surface_nodes(nodes: &[DomNode]) -> Vec<SurfaceNode> {
    let mut out = Vec::new();
    convert_nodes(nodes, &mut out);
    out
}

/// Convert nested content, dropping any markers.
fn convert_blocks(nodes: &[DomNode]) -> Vec<ContentBlock> {
    surface_nodes(nodes)
        .into_iter()
        .filter_map(|n| match n {
            SurfaceNode::Block(b) => Some(b),
            SurfaceNode::Marker => None,
        })
        .collect()
}

fn convert_nodes(nodes: &[DomNode], out: &mut Vec<SurfaceNode>) {
    let mut inline_run: Vec<&DomNode> = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) if !e.tag.is_inline() => {
                flush_inline(&mut inline_run, out);
                convert_element(e, out);
            }
            _ => inline_run.push(node),
        }
    }
    flush_inline(&mut inline_run, out);
}

/// Loose inline content between blocks becomes a paragraph.
fn flush_inline(run: &mut Vec<&DomNode>, out: &mut Vec<SurfaceNode>) {
    let text: String = run.iter().map(|n| n.text_content()).collect();
    run.clear();
    let text = collapse_whitespace(&text);
    if !text.is_empty() {
        out.push(SurfaceNode::Block(ContentBlock::paragraph(text)));
    }
}

fn convert_element(e: &ElementNode, out: &mut Vec<SurfaceNode>) {
    if e.is_marker() {
        out.push(SurfaceNode::Marker);
        return;
    }
    if e.is_page_break() {
        out.push(SurfaceNode::Block(ContentBlock::page_break()));
        return;
    }
    let text_of = |e: &ElementNode| {
        let raw: String = e.children.iter().map(DomNode::text_content).collect();
        collapse_whitespace(&raw)
    };
    let block = match &e.tag {
        Tag::P => ContentBlock::paragraph(text_of(e)),
        Tag::Heading(level) => ContentBlock::heading(*level, text_of(e)),
        Tag::Ul => ContentBlock::bullet_list(list_items(e)),
        Tag::Ol => ContentBlock::ordered_list(list_items(e)),
        Tag::Li => ContentBlock::container(BlockKind::ListItem, convert_blocks(&e.children)),
        Tag::Blockquote => {
            ContentBlock::container(BlockKind::Blockquote, convert_blocks(&e.children))
        }
        Tag::Pre => {
            let text: String = e.children.iter().map(DomNode::text_content).collect();
            ContentBlock::code_block(text.trim_end_matches('\n'))
        }
        Tag::Hr => ContentBlock::horizontal_rule(),
        Tag::Img => image_block(e),
        Tag::Div if e.attr("data-block") == Some("other") => {
            ContentBlock::container(BlockKind::Other, Vec::new()).with_text(text_of(e))
        }
        // Wrappers contribute their children in place.
        Tag::Div | Tag::Body | Tag::Html => {
            convert_nodes(&e.children, out);
            return;
        }
        Tag::Head | Tag::Raw(_) => return,
        _ => ContentBlock::new(BlockKind::Other).with_text(text_of(e)),
    };
    out.push(SurfaceNode::Block(block));
}

/// Children of a list; stray non-`li` content is wrapped into an item.
fn list_items(list: &ElementNode) -> Vec<ContentBlock> {
    convert_blocks(&list.children)
        .into_iter()
        .map(|b| match b.kind {
            BlockKind::ListItem => b,
            _ => ContentBlock::container(BlockKind::ListItem, vec![b]),
        })
        .collect()
}

fn image_block(e: &ElementNode) -> ContentBlock {
    let src = e.attr("src").unwrap_or_default();
    let height = e
        .attr("height")
        .and_then(|h| h.trim_end_matches("px").parse().ok())
        .or_else(|| e.style_px("height"));
    let width = e
        .attr("width")
        .and_then(|w| w.trim_end_matches("px").parse::<f32>().ok())
        .or_else(|| e.style_px("width"));
    let mut block = ContentBlock::image(src, height);
    if let Some(w) = width {
        block = block.with_attr("width", w);
    }
    if let Some(alt) = e.attr("alt") {
        block = block.with_attr("alt", alt);
    }
    block
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ContentBlock {
    fn with_text(mut self, text: String) -> Self {
        self.text = text;
        self
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The ordered top-level block sequence owned by the editing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    blocks: Vec<ContentBlock>,
    #[serde(skip)]
    revision: u64,
}

impl Document {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self {
            blocks,
            revision: 0,
        }
    }

    /// Import editor HTML. Pagination markers found in the HTML are dropped.
    pub fn from_html(html: &str) -> Self {
        let nodes = dom::body_children(&dom::parse_html(html));
        let blocks = surface_nodes(&nodes)
            .into_iter()
            .filter_map(|n| match n {
                SurfaceNode::Block(b) => Some(b),
                SurfaceNode::Marker => None,
            })
            .collect();
        Self::new(blocks)
    }

    /// Import JSON: either a bare array of blocks or an editor document of
    /// the form `{"type": "doc", "content": [...]}`. A document without
    /// `content` (or with `null`) is empty.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let content = match value {
            Value::Object(mut map) => match map.remove("content") {
                None | Some(Value::Null) => Value::Array(Vec::new()),
                Some(content) => content,
            },
            other => other,
        };
        let mut blocks: Vec<ContentBlock> = serde_json::from_value(content)?;
        for block in &mut blocks {
            block.normalize();
        }
        // Bare text at the root is loose paragraph content.
        for block in &mut blocks {
            if block.kind == BlockKind::Text {
                block.kind = BlockKind::Paragraph;
            }
        }
        Ok(Self::new(blocks))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.blocks).unwrap_or_default()
    }

    pub fn to_html(&self) -> String {
        self.blocks.iter().map(ContentBlock::to_html).collect()
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of content mutations applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert a block before `index` (clamped to the end).
    pub fn insert_block(&mut self, index: usize, block: ContentBlock) -> DocumentEvent {
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
        self.touch()
    }

    pub fn push(&mut self, block: ContentBlock) -> DocumentEvent {
        self.blocks.push(block);
        self.touch()
    }

    /// The manual-break insertion command.
    pub fn insert_page_break(&mut self, index: usize) -> DocumentEvent {
        self.insert_block(index, ContentBlock::page_break())
    }

    /// Remove the block at `index`; out-of-range indices change nothing.
    pub fn remove_block(&mut self, index: usize) -> Option<(ContentBlock, DocumentEvent)> {
        if index >= self.blocks.len() {
            return None;
        }
        let block = self.blocks.remove(index);
        Some((block, self.touch()))
    }

    pub fn replace_block(&mut self, index: usize, block: ContentBlock) -> Option<DocumentEvent> {
        let slot = self.blocks.get_mut(index)?;
        *slot = block;
        Some(self.touch())
    }

    fn touch(&mut self) -> DocumentEvent {
        self.revision += 1;
        DocumentEvent::ContentChanged
    }
}

impl From<Vec<ContentBlock>> for Document {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::new(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_import_covers_block_types() {
        let html = r#"
            <h1>Title</h1>
            <p>Hello <strong>bold</strong> text</p>
            <ul><li>One</li><li><p>Two</p></li></ul>
            <ol><li>First</li></ol>
            <blockquote><p>Quoted</p></blockquote>
            <pre><code>a
b</code></pre>
            <hr>
            <div data-type="page-break"></div>
            <img src="pic.png" height="120" />
            <table><tr><td>cell</td></tr></table>
        "#;
        let doc = Document::from_html(html);
        let kinds: Vec<BlockKind> = doc.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading,
                BlockKind::Paragraph,
                BlockKind::BulletList,
                BlockKind::OrderedList,
                BlockKind::Blockquote,
                BlockKind::CodeBlock,
                BlockKind::HorizontalRule,
                BlockKind::PageBreak,
                BlockKind::Image,
                BlockKind::Other,
            ]
        );
        assert_eq!(doc.blocks()[0].heading_level(), Some(1));
        assert_eq!(doc.blocks()[1].text, "Hello bold text");
        assert_eq!(doc.blocks()[2].children.len(), 2);
        assert_eq!(doc.blocks()[2].children[0].children[0].kind, BlockKind::Paragraph);
        assert_eq!(doc.blocks()[5].text, "a\nb");
        assert_eq!(doc.blocks()[8].attr_f32("height"), Some(120.0));
    }

    #[test]
    fn wrapper_divs_are_unwrapped() {
        let doc = Document::from_html("<div class=\"editor\"><p>a</p><p>b</p></div>");
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn markers_never_become_content() {
        let html = r#"<p>a</p><div data-pagination-marker="true" contenteditable="false"><span>Page 1 of 2</span></div><p>b</p>"#;
        let doc = Document::from_html(html);
        assert_eq!(doc.len(), 2);
        let nodes = surface_nodes(&dom::parse_html(html));
        assert_eq!(nodes[1], SurfaceNode::Marker);
    }

    #[test]
    fn json_import_accepts_editor_documents() {
        let json = r#"{
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Intro"}]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "Hello "},
                    {"type": "text", "text": "world", "marks": [{"type": "bold"}]}
                ]},
                {"type": "pageBreak"},
                {"type": "bulletList", "content": [
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "x"}]}]}
                ]},
                {"type": "mystery"}
            ]
        }"#;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.len(), 5);
        assert_eq!(doc.blocks()[0].heading_level(), Some(2));
        assert_eq!(doc.blocks()[0].text, "Intro");
        assert_eq!(doc.blocks()[1].text, "Hello world");
        assert!(doc.blocks()[1].children.is_empty());
        assert!(doc.blocks()[2].is_page_break());
        assert_eq!(doc.blocks()[3].text, "x");
        assert_eq!(doc.blocks()[4].kind, BlockKind::Other);
    }

    #[test]
    fn json_import_accepts_bare_arrays() {
        let json = r#"[{"type": "paragraph", "text": "plain"}, {"type": "image", "attrs": {"height": "150px"}}]"#;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.blocks()[0].text, "plain");
        assert_eq!(doc.blocks()[1].attr_f32("height"), Some(150.0));
    }

    #[test]
    fn json_document_without_content_is_empty() {
        for json in [r#"{"type": "doc"}"#, r#"{"type": "doc", "content": null}"#] {
            let doc = Document::from_json(json).unwrap();
            assert!(doc.blocks().is_empty());
            let result = crate::compute_breaks(doc.blocks(), 995.0);
            assert_eq!(result.page_count, 1);
        }
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Document::from_json("{not json").is_err());
        assert!(Document::from_json(r#"{"type": "doc", "content": 3}"#).is_err());
    }

    #[test]
    fn html_round_trip_preserves_blocks() {
        let doc = Document::new(vec![
            ContentBlock::heading(1, "Title & more"),
            ContentBlock::paragraph("Body <text>"),
            ContentBlock::bullet_list(vec![
                ContentBlock::list_item("a"),
                ContentBlock::list_item("b"),
            ]),
            ContentBlock::page_break(),
            ContentBlock::code_block("x = 1\ny = 2"),
            ContentBlock::horizontal_rule(),
        ]);
        let reimported = Document::from_html(&doc.to_html());
        assert_eq!(reimported.blocks(), doc.blocks());
    }

    #[test]
    fn mutations_bump_revision() {
        let mut doc = Document::default();
        assert_eq!(doc.push(ContentBlock::paragraph("a")), DocumentEvent::ContentChanged);
        doc.insert_page_break(0);
        assert_eq!(doc.revision(), 2);
        assert!(doc.blocks()[0].is_page_break());
        assert!(doc.remove_block(5).is_none());
        assert_eq!(doc.revision(), 2);
        assert!(doc.remove_block(0).is_some());
        assert_eq!(doc.revision(), 3);
    }
}
