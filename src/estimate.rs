//! Height estimation – predicts the rendered height of a block from its
//! structural type and text length alone.
//!
//! The constants here are shared with the rendered surface's style sheet
//! (see [`crate::style`]); changing one without the other makes the live
//! page markers drift away from the exported PDF.

use crate::block::{BlockKind, ContentBlock};

pub const HEADING_1_HEIGHT: f32 = 56.0;
pub const HEADING_2_HEIGHT: f32 = 44.0;
pub const HEADING_3_HEIGHT: f32 = 36.0;

/// Characters per wrapped paragraph line at the content width.
pub const CHARS_PER_LINE: usize = 70;
pub const PARAGRAPH_LINE_HEIGHT: f32 = 28.0;
/// Vertical margin around a paragraph (top + bottom).
pub const PARAGRAPH_SPACING: f32 = 16.0;

/// Padding added by a list container (top + bottom).
pub const LIST_SPACING: f32 = 16.0;
pub const LIST_ITEM_MIN_HEIGHT: f32 = 28.0;
/// Padding added by a blockquote (top + bottom).
pub const BLOCKQUOTE_SPACING: f32 = 32.0;

pub const CODE_LINE_HEIGHT: f32 = 24.0;
/// Padding inside a code block (top + bottom).
pub const CODE_PADDING: f32 = 32.0;

pub const HORIZONTAL_RULE_HEIGHT: f32 = 40.0;
pub const IMAGE_PLACEHOLDER_HEIGHT: f32 = 200.0;
pub const DEFAULT_BLOCK_HEIGHT: f32 = 28.0;

/// Estimated rendered height of `block` in px.
///
/// Total over every [`BlockKind`]; unknown types use the default height.
pub fn estimate(block: &ContentBlock) -> f32 {
    match block.kind {
        BlockKind::Heading => match block.heading_level() {
            Some(1) => HEADING_1_HEIGHT,
            Some(2) => HEADING_2_HEIGHT,
            _ => HEADING_3_HEIGHT,
        },
        BlockKind::Paragraph => {
            paragraph_lines(&block.text) as f32 * PARAGRAPH_LINE_HEIGHT + PARAGRAPH_SPACING
        }
        BlockKind::BulletList | BlockKind::OrderedList => LIST_SPACING + children_height(block),
        BlockKind::ListItem => children_height(block).max(LIST_ITEM_MIN_HEIGHT),
        BlockKind::Blockquote => BLOCKQUOTE_SPACING + children_height(block),
        BlockKind::CodeBlock => code_lines(&block.text) as f32 * CODE_LINE_HEIGHT + CODE_PADDING,
        BlockKind::HorizontalRule => HORIZONTAL_RULE_HEIGHT,
        BlockKind::PageBreak => 0.0,
        BlockKind::Image => block
            .attr_f32("height")
            .filter(|h| h.is_finite() && *h >= 0.0)
            .unwrap_or(IMAGE_PLACEHOLDER_HEIGHT),
        BlockKind::Text | BlockKind::Other => DEFAULT_BLOCK_HEIGHT,
    }
}

/// Wrapped line count of a paragraph: `ceil(chars / 70)`, at least one.
pub fn paragraph_lines(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_LINE).max(1)
}

/// Line count of a code block: one more than its newline count.
pub fn code_lines(text: &str) -> usize {
    text.matches('\n').count() + 1
}

fn children_height(block: &ContentBlock) -> f32 {
    block.children.iter().map(estimate).sum()
}

/// Where pagination reads block heights from.
///
/// Two backends exist: [`Estimator`] (the table above, used for the live
/// view) and [`crate::layout::RenderedSurface`] (measured boxes, used for
/// export). Both feed the same placement algorithm.
pub trait HeightSource {
    /// Height in px of the top-level block at `index`.
    fn block_height(&self, index: usize, block: &ContentBlock) -> f32;
}

/// The estimate-from-attributes backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Estimator;

impl HeightSource for Estimator {
    fn block_height(&self, _index: usize, block: &ContentBlock) -> f32 {
        estimate(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels() {
        assert_eq!(estimate(&ContentBlock::heading(1, "A")), 56.0);
        assert_eq!(estimate(&ContentBlock::heading(2, "A")), 44.0);
        assert_eq!(estimate(&ContentBlock::heading(3, "A")), 36.0);
        assert_eq!(estimate(&ContentBlock::new(BlockKind::Heading)), 36.0);
        assert_eq!(estimate(&ContentBlock::heading(5, "A")), 36.0);
    }

    #[test]
    fn paragraph_wraps_every_70_chars() {
        assert_eq!(estimate(&ContentBlock::paragraph("")), 44.0);
        assert_eq!(estimate(&ContentBlock::paragraph("x".repeat(50))), 44.0);
        assert_eq!(estimate(&ContentBlock::paragraph("x".repeat(70))), 44.0);
        assert_eq!(estimate(&ContentBlock::paragraph("x".repeat(71))), 72.0);
        assert_eq!(estimate(&ContentBlock::paragraph("x".repeat(210))), 100.0);
    }

    #[test]
    fn paragraph_counts_characters_not_bytes() {
        assert_eq!(estimate(&ContentBlock::paragraph("é".repeat(70))), 44.0);
    }

    #[test]
    fn lists_and_items() {
        let list = ContentBlock::bullet_list(vec![
            ContentBlock::list_item("a"),
            ContentBlock::list_item("b"),
        ]);
        // 16 + 2 × max(28, 44)
        assert_eq!(estimate(&list), 104.0);

        let empty_item = ContentBlock::container(BlockKind::ListItem, Vec::new());
        assert_eq!(estimate(&empty_item), 28.0);
        let ordered = ContentBlock::ordered_list(vec![empty_item]);
        assert_eq!(estimate(&ordered), 44.0);
    }

    #[test]
    fn blockquote_adds_padding() {
        let quote = ContentBlock::blockquote(vec![ContentBlock::paragraph("q")]);
        assert_eq!(estimate(&quote), 76.0);
    }

    #[test]
    fn code_block_counts_newlines() {
        assert_eq!(estimate(&ContentBlock::code_block("one")), 56.0);
        assert_eq!(estimate(&ContentBlock::code_block("a\nb\nc")), 104.0);
        assert_eq!(estimate(&ContentBlock::code_block("a\n")), 80.0);
    }

    #[test]
    fn fixed_heights() {
        assert_eq!(estimate(&ContentBlock::horizontal_rule()), 40.0);
        assert_eq!(estimate(&ContentBlock::page_break()), 0.0);
        assert_eq!(estimate(&ContentBlock::new(BlockKind::Other)), 28.0);
    }

    #[test]
    fn image_height_attribute_or_placeholder() {
        assert_eq!(estimate(&ContentBlock::image("a.png", Some(320.0))), 320.0);
        assert_eq!(estimate(&ContentBlock::image("a.png", None)), 200.0);
    }

    #[test]
    fn estimator_backend_matches_table() {
        let block = ContentBlock::paragraph("hello");
        assert_eq!(Estimator.block_height(0, &block), estimate(&block));
    }
}
