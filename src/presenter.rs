//! Break presentation – turns break records into visual markers.
//!
//! Markers are decorations layered over the document: they carry a position
//! and a gap height but never enter the block tree. Re-importing a rendered
//! preview drops them again (see [`crate::dom::MARKER_ATTR`]).

use serde::{Deserialize, Serialize};

use crate::block::Document;
use crate::dom::{escape_text, MARKER_ATTR};
use crate::page::PageMetrics;
use crate::pagination::BreakRecord;

/// A non-editable page separator shown between two pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualMarker {
    /// Index of the top-level block the marker is drawn before.
    pub position: usize,
    /// Number of the page starting after the marker.
    pub page_number: usize,
    /// Footer of the page ending at the marker, e.g. "Page 1 of 3".
    pub label: String,
    /// Filler height: unused space + bottom margin + gap + top margin.
    pub gap_height: f32,
    /// Always false; markers are never editable or selectable.
    pub editable: bool,
}

/// Footer text for `page` (1-indexed).
pub fn page_label(page: usize, page_count: usize) -> String {
    format!("Page {page} of {page_count}")
}

/// One marker per break record, in order.
pub fn present(breaks: &[BreakRecord], page_count: usize, metrics: &PageMetrics) -> Vec<VisualMarker> {
    breaks
        .iter()
        .map(|b| VisualMarker {
            position: b.position,
            page_number: b.page_number,
            label: page_label(b.page_number - 1, page_count),
            gap_height: b.remaining_space.max(0.0)
                + metrics.gap_px
                + metrics.margin_px
                + metrics.margin_px,
            editable: false,
        })
        .collect()
}

/// Render `document` as HTML with markers interleaved at their positions and
/// a footer after the last block.
pub fn render_preview(
    document: &Document,
    markers: &[VisualMarker],
    page_count: usize,
) -> String {
    let mut html = String::from("<div class=\"pageflow-document\">\n");
    let mut pending = markers.iter().peekable();
    for (i, block) in document.blocks().iter().enumerate() {
        while let Some(marker) = pending.next_if(|m| m.position <= i) {
            html.push_str(&marker_html(marker));
        }
        html.push_str(&block.to_html());
        html.push('\n');
    }
    for marker in pending {
        html.push_str(&marker_html(marker));
    }
    html.push_str(&format!(
        "<div class=\"page-footer\" {MARKER_ATTR}=\"footer\" contenteditable=\"false\">{}</div>\n",
        escape_text(&page_label(page_count, page_count))
    ));
    html.push_str("</div>\n");
    html
}

fn marker_html(marker: &VisualMarker) -> String {
    format!(
        "<div class=\"page-marker\" {MARKER_ATTR}=\"{}\" contenteditable=\"{}\" style=\"height: {}px\">\
         <span class=\"page-footer\">{}</span></div>\n",
        marker.page_number,
        marker.editable,
        marker.gap_height,
        escape_text(&marker.label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::ContentBlock;
    use crate::pagination::compute_breaks;

    #[test]
    fn one_marker_per_break() {
        let breaks = vec![
            BreakRecord {
                position: 3,
                page_number: 2,
                remaining_space: 100.0,
            },
            BreakRecord {
                position: 9,
                page_number: 3,
                remaining_space: 0.0,
            },
        ];
        let markers = present(&breaks, 3, &PageMetrics::a4());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].position, 3);
        assert_eq!(markers[0].label, "Page 1 of 3");
        assert_eq!(markers[0].gap_height, 100.0 + 40.0 + 64.0 + 64.0);
        assert_eq!(markers[1].label, "Page 2 of 3");
        assert_eq!(markers[1].gap_height, 168.0);
        assert!(markers.iter().all(|m| !m.editable));
    }

    #[test]
    fn no_breaks_no_markers() {
        assert!(present(&[], 1, &PageMetrics::a4()).is_empty());
    }

    #[test]
    fn presenting_leaves_the_document_untouched() {
        let doc = Document::new(
            (0..40)
                .map(|i| ContentBlock::paragraph(format!("paragraph {i}")))
                .collect(),
        );
        let before = doc.clone();
        let result = compute_breaks(doc.blocks(), PageMetrics::a4().content_height());
        let markers = present(&result.breaks, result.page_count, &PageMetrics::a4());
        let _ = render_preview(&doc, &markers, result.page_count);
        assert_eq!(doc, before);
    }

    #[test]
    fn preview_reimports_without_markers() {
        let doc = Document::new(vec![
            ContentBlock::heading(1, "Title"),
            ContentBlock::page_break(),
            ContentBlock::paragraph("Body"),
        ]);
        let result = compute_breaks(doc.blocks(), PageMetrics::a4().content_height());
        let markers = present(&result.breaks, result.page_count, &PageMetrics::a4());
        let html = render_preview(&doc, &markers, result.page_count);
        assert!(html.contains("Page 1 of 2"));
        assert!(html.contains("Page 2 of 2"));
        assert!(html.contains("contenteditable=\"false\""));

        let reimported = Document::from_html(&html);
        assert_eq!(reimported.blocks(), doc.blocks());
    }
}
