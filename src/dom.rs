//! HTML parser – converts the editor's HTML into a simple DOM tree.
//!
//! We support the subset a rich-text editor emits:
//! - Blocks: p, h1-h6, ul, ol, li, blockquote, pre, hr, img, div
//! - Inline: span, strong, b, em, i, u, s, a, code, br
//! - Page breaks via `data-type="page-break"` and presentation markers via
//!   `data-pagination-marker`

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// Attribute that tags an element as a pagination marker (never content).
pub const MARKER_ATTR: &str = "data-pagination-marker";

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    /// h1..h6, carrying the level.
    Heading(u8),
    Ul,
    Ol,
    Li,
    Blockquote,
    Pre,
    Code,
    Hr,
    Img,
    Br,
    Span,
    Strong,
    Em,
    Underline,
    Strike,
    Anchor,
    Body,
    Html,
    Head,
    /// Elements whose text is never document content (style, script, title).
    Raw(String),
    /// Catch-all for unknown tags.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "div" | "section" | "article" | "main" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "blockquote" => Tag::Blockquote,
            "pre" => Tag::Pre,
            "code" => Tag::Code,
            "hr" => Tag::Hr,
            "img" => Tag::Img,
            "br" => Tag::Br,
            "span" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "u" => Tag::Underline,
            "s" | "del" | "strike" => Tag::Strike,
            "a" => Tag::Anchor,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            "style" | "script" | "title" => Tag::Raw(lower),
            _ => Tag::Unknown(lower),
        }
    }

    /// Inline elements are flattened into their parent's text.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Tag::Span
                | Tag::Strong
                | Tag::Em
                | Tag::Underline
                | Tag::Strike
                | Tag::Anchor
                | Tag::Code
                | Tag::Br
        )
    }

    /// Void elements never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        match self {
            Tag::Img | Tag::Hr | Tag::Br => true,
            Tag::Unknown(name) => matches!(name.as_str(), "meta" | "link" | "input" | "wbr"),
            _ => false,
        }
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    /// Look up a `px` length in the inline style, e.g. `height: 120px`.
    pub fn style_px(&self, property: &str) -> Option<f32> {
        self.inline_style()?.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            if name.trim().eq_ignore_ascii_case(property) {
                value.trim().trim_end_matches("px").trim().parse().ok()
            } else {
                None
            }
        })
    }

    /// True for decorations inserted by the pagination presenter.
    pub fn is_marker(&self) -> bool {
        self.attributes.contains_key(MARKER_ATTR)
    }

    /// True for a user-inserted manual page break.
    pub fn is_page_break(&self) -> bool {
        self.attr("data-type") == Some("page-break") || self.has_class("page-break")
    }

    /// True when no child is a block-level element.
    pub fn all_inline(&self) -> bool {
        self.children.iter().all(|c| match c {
            DomNode::Text(_) => true,
            DomNode::Element(e) => e.tag.is_inline() && e.all_inline(),
        })
    }
}

impl DomNode {
    /// Concatenated text of this node and all descendants. `<br>` becomes a
    /// newline.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => {
                if e.tag == Tag::Br {
                    out.push('\n');
                }
                if matches!(e.tag, Tag::Raw(_)) {
                    return;
                }
                for child in &e.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// Editor output is well-formed and small, so a hand-written parser covers
/// it without pulling in a full HTML5 tree builder.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    let mut nodes = parser.parse_nodes();
    // Unmatched closing tags at the top level are dropped.
    while !parser.eof() {
        parser.skip_past('>');
        nodes.extend(parser.parse_nodes());
    }
    nodes
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_before_tag();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Doctype / processing instruction
            self.skip_past('>');
            return None;
        }
        if self.starts_with("<") {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance();
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance(); // '<'
        let tag_name = self.parse_name();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Stray character inside the tag; step over it.
                self.advance();
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if elem.tag.is_void() {
            return DomNode::Element(elem);
        }

        elem.children = if matches!(elem.tag, Tag::Pre | Tag::Raw(_)) {
            self.parse_preformatted(&tag_name)
        } else {
            self.parse_nodes()
        };

        if self.starts_with("</") {
            self.pos += 2;
            self.parse_name();
            self.skip_past('>');
        }

        DomNode::Element(elem)
    }

    /// Content of `<pre>` keeps its whitespace verbatim; nested inline tags
    /// (usually a single `<code>`) are flattened into one text node.
    fn parse_preformatted(&mut self, tag_name: &str) -> Vec<DomNode> {
        let close = format!("</{}", tag_name.to_ascii_lowercase());
        let start = self.pos;
        while !self.eof() {
            let at_close = self
                .input
                .get(self.pos..self.pos + close.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(&close));
            if at_close {
                break;
            }
            self.advance();
        }
        let raw = strip_tags(&self.input[start..self.pos]);
        let text = decode_entities(raw.strip_prefix('\n').unwrap_or(&raw));
        if text.is_empty() {
            Vec::new()
        } else {
            vec![DomNode::Text(text)]
        }
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ['"', '\''] {
            if self.current_char() == Some(quote) {
                self.advance();
                let start = self.pos;
                while !self.eof() && self.current_char() != Some(quote) {
                    self.advance();
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if !self.eof() {
                    self.advance();
                }
                return val;
            }
        }
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_whitespace() || c == '>' || c == '/' {
                break;
            }
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Skip whitespace-only runs between tags; keep them when text follows.
    fn skip_whitespace_before_tag(&mut self) {
        let saved = self.pos;
        self.skip_whitespace();
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_comment(&mut self) {
        self.pos += 4; // <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance();
        }
        if !self.eof() {
            self.pos += 3;
        }
    }

    fn skip_past(&mut self, c: char) {
        while !self.eof() && self.current_char() != Some(c) {
            self.advance();
        }
        if !self.eof() {
            self.advance();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
        }
    }
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&amp;", "&")
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head))
        .cloned()
        .collect()
}
