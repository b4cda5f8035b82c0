//! Block style sheet – typography and spacing for the rendered surface.
//!
//! Every number here is chosen so a single-line block measures exactly what
//! [`crate::estimate`] predicts for it (e.g. a paragraph line is 28 px with
//! 8 px above and below, giving 44). Keep the two in step.

use crate::block::{BlockKind, ContentBlock};
use crate::estimate;

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [c(self.r), c(self.g), c(self.b), c(self.a)]
    }
}

/// Resolved style for one block on the rendered surface.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStyle {
    pub font_size: f32,
    /// Line height in px.
    pub line_height: f32,
    pub bold: bool,
    pub monospace: bool,
    pub color: Color,
    pub background: Color,

    pub margin_top: f32,
    pub margin_bottom: f32,
    pub padding_top: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,
    pub padding_right: f32,
    /// Minimum border-box height.
    pub min_height: f32,
    /// Left rule (width, colour), used by blockquotes.
    pub border_left: Option<(f32, Color)>,
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_height: estimate::PARAGRAPH_LINE_HEIGHT,
            bold: false,
            monospace: false,
            color: Color::from_hex("#1f2933").unwrap_or(Color::BLACK),
            background: Color::TRANSPARENT,
            margin_top: 0.0,
            margin_bottom: 0.0,
            padding_top: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            padding_right: 0.0,
            min_height: 0.0,
            border_left: None,
        }
    }
}

impl BlockStyle {
    /// Vertical space the block takes outside its border box.
    pub fn vertical_margin(&self) -> f32 {
        self.margin_top + self.margin_bottom
    }

    fn heading(font_size: f32, line_height: f32, outer: f32) -> Self {
        let margin = (outer - line_height) / 2.0;
        Self {
            font_size,
            line_height,
            bold: true,
            margin_top: margin,
            margin_bottom: margin,
            ..Self::default()
        }
    }
}

/// Look up the style for `block`.
pub fn style_for(block: &ContentBlock) -> BlockStyle {
    let half = |v: f32| v / 2.0;
    match block.kind {
        BlockKind::Paragraph => BlockStyle {
            margin_top: half(estimate::PARAGRAPH_SPACING),
            margin_bottom: half(estimate::PARAGRAPH_SPACING),
            ..BlockStyle::default()
        },
        BlockKind::Heading => match block.heading_level() {
            Some(1) => BlockStyle::heading(32.0, 40.0, estimate::HEADING_1_HEIGHT),
            Some(2) => BlockStyle::heading(24.0, 32.0, estimate::HEADING_2_HEIGHT),
            _ => BlockStyle::heading(20.0, 28.0, estimate::HEADING_3_HEIGHT),
        },
        BlockKind::BulletList | BlockKind::OrderedList => BlockStyle {
            padding_top: half(estimate::LIST_SPACING),
            padding_bottom: half(estimate::LIST_SPACING),
            padding_left: 24.0,
            ..BlockStyle::default()
        },
        BlockKind::ListItem => BlockStyle {
            min_height: estimate::LIST_ITEM_MIN_HEIGHT,
            ..BlockStyle::default()
        },
        BlockKind::Blockquote => BlockStyle {
            padding_top: half(estimate::BLOCKQUOTE_SPACING),
            padding_bottom: half(estimate::BLOCKQUOTE_SPACING),
            padding_left: 16.0,
            color: Color::from_hex("#52606d").unwrap_or(Color::BLACK),
            border_left: Some((3.0, Color::from_hex("#cbd2d9").unwrap_or(Color::BLACK))),
            ..BlockStyle::default()
        },
        BlockKind::CodeBlock => BlockStyle {
            font_size: 14.0,
            line_height: estimate::CODE_LINE_HEIGHT,
            monospace: true,
            background: Color::from_hex("#f0f2f5").unwrap_or(Color::WHITE),
            padding_top: half(estimate::CODE_PADDING),
            padding_bottom: half(estimate::CODE_PADDING),
            padding_left: 16.0,
            padding_right: 16.0,
            ..BlockStyle::default()
        },
        BlockKind::HorizontalRule => BlockStyle {
            min_height: estimate::HORIZONTAL_RULE_HEIGHT,
            color: Color::from_hex("#cbd2d9").unwrap_or(Color::BLACK),
            ..BlockStyle::default()
        },
        BlockKind::PageBreak | BlockKind::Image => BlockStyle::default(),
        BlockKind::Text | BlockKind::Other => BlockStyle {
            min_height: estimate::DEFAULT_BLOCK_HEIGHT,
            ..BlockStyle::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_headings_match_estimates() {
        for level in 1..=3u8 {
            let block = ContentBlock::heading(level, "T");
            let style = style_for(&block);
            assert_eq!(
                style.line_height + style.vertical_margin(),
                estimate::estimate(&block)
            );
        }
    }

    #[test]
    fn paragraph_spacing_matches_estimate() {
        let style = style_for(&ContentBlock::paragraph("x"));
        assert_eq!(style.line_height + style.vertical_margin(), 44.0);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("000000"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("#12"), None);
        assert_eq!(Color::WHITE.to_rgba8(), [255, 255, 255, 255]);
    }
}
