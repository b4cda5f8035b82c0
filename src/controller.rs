//! Recalculation controller – decides when pagination re-runs.
//!
//! Only content changes trigger a pass. Selection, focus and metadata
//! events return the cached result, and since markers are not content,
//! presenting them can never re-trigger a pass.

use sha2::{Digest, Sha256};

use crate::block::{ContentBlock, Document};
use crate::page::PageMetrics;
use crate::pagination::{compute_breaks, PaginationResult};
use crate::presenter::{present, VisualMarker};

/// Notifications from the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    ContentChanged,
    SelectionChanged,
    FocusChanged,
    MetadataChanged,
}

/// Holds the last pagination result for one editing session.
///
/// A pass runs to completion inside [`PaginationController::handle`], so
/// the stored result is always the one for the last paginated content.
#[derive(Debug, Clone)]
pub struct PaginationController {
    metrics: PageMetrics,
    result: PaginationResult,
    markers: Vec<VisualMarker>,
    fingerprint: Option<[u8; 32]>,
    recalculations: usize,
}

impl PaginationController {
    pub fn new(metrics: PageMetrics) -> Self {
        Self {
            metrics,
            result: PaginationResult::single_page(),
            markers: Vec::new(),
            fingerprint: None,
            recalculations: 0,
        }
    }

    /// Create a controller and paginate `document` once.
    pub fn attach(metrics: PageMetrics, document: &Document) -> Self {
        let mut controller = Self::new(metrics);
        controller.handle(DocumentEvent::ContentChanged, document);
        controller
    }

    /// React to an editor event, recomputing only when the content differs
    /// from what was last paginated.
    pub fn handle(&mut self, event: DocumentEvent, document: &Document) -> &PaginationResult {
        if event == DocumentEvent::ContentChanged {
            let fingerprint = fingerprint(document.blocks());
            if self.fingerprint != Some(fingerprint) {
                self.recompute(document);
                self.fingerprint = Some(fingerprint);
            } else {
                log::trace!("content unchanged, keeping cached pagination");
            }
        }
        &self.result
    }

    fn recompute(&mut self, document: &Document) {
        let result = compute_breaks(document.blocks(), self.metrics.content_height());
        self.markers = present(&result.breaks, result.page_count, &self.metrics);
        log::debug!(
            "recalculated pagination at revision {}: {} page(s)",
            document.revision(),
            result.page_count
        );
        self.recalculations += 1;
        self.result = result;
    }

    pub fn result(&self) -> &PaginationResult {
        &self.result
    }

    pub fn page_count(&self) -> usize {
        self.result.page_count
    }

    pub fn markers(&self) -> &[VisualMarker] {
        &self.markers
    }

    pub fn metrics(&self) -> &PageMetrics {
        &self.metrics
    }

    /// Number of pagination passes run so far.
    pub fn recalculations(&self) -> usize {
        self.recalculations
    }
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(PageMetrics::a4())
    }
}

fn fingerprint(blocks: &[ContentBlock]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for block in blocks {
        // Serialising plain data with string keys cannot fail.
        let bytes = serde_json::to_vec(block).unwrap_or_default();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_document() -> Document {
        Document::new(
            (0..40)
                .map(|_| ContentBlock::paragraph("x".repeat(50)))
                .collect(),
        )
    }

    #[test]
    fn starts_with_a_single_page() {
        let controller = PaginationController::default();
        assert_eq!(controller.page_count(), 1);
        assert!(controller.markers().is_empty());
        assert_eq!(controller.recalculations(), 0);
    }

    #[test]
    fn attach_paginates_once() {
        let controller = PaginationController::attach(PageMetrics::a4(), &long_document());
        assert_eq!(controller.page_count(), 2);
        assert_eq!(controller.markers().len(), 1);
        assert_eq!(controller.markers()[0].position, 22);
        assert_eq!(controller.recalculations(), 1);
    }

    #[test]
    fn non_content_events_use_the_cache() {
        let doc = long_document();
        let mut controller = PaginationController::attach(PageMetrics::a4(), &doc);
        for event in [
            DocumentEvent::SelectionChanged,
            DocumentEvent::FocusChanged,
            DocumentEvent::MetadataChanged,
        ] {
            controller.handle(event, &doc);
        }
        assert_eq!(controller.recalculations(), 1);
    }

    #[test]
    fn unchanged_content_is_not_recomputed() {
        let doc = long_document();
        let mut controller = PaginationController::attach(PageMetrics::a4(), &doc);
        let before = controller.result().clone();
        let after = controller.handle(DocumentEvent::ContentChanged, &doc).clone();
        assert_eq!(before, after);
        assert_eq!(controller.recalculations(), 1);
    }

    #[test]
    fn manual_break_insertion_triggers_recompute() {
        let mut doc = Document::new(vec![
            ContentBlock::heading(1, "Title"),
            ContentBlock::paragraph("body"),
        ]);
        let mut controller = PaginationController::attach(PageMetrics::a4(), &doc);
        assert_eq!(controller.page_count(), 1);

        let event = doc.insert_page_break(1);
        let result = controller.handle(event, &doc);
        assert_eq!(result.page_count, 2);
        assert_eq!(result.breaks[0].remaining_space, 939.0);
        assert_eq!(controller.markers()[0].label, "Page 1 of 2");
        assert_eq!(controller.recalculations(), 2);
    }

    #[test]
    fn result_and_markers_follow_each_pass() {
        let mut doc = Document::new(Vec::new());
        let mut controller = PaginationController::attach(PageMetrics::a4(), &doc);
        for _ in 0..30 {
            let event = doc.push(ContentBlock::paragraph("x".repeat(50)));
            let returned = controller.handle(event, &doc).clone();
            assert_eq!(&returned, controller.result());
            assert_eq!(controller.markers().len(), returned.breaks.len());
        }
        assert_eq!(controller.page_count(), 2);
        assert_eq!(controller.recalculations(), 31);
    }

    #[test]
    fn removing_content_shrinks_page_count() {
        let mut doc = long_document();
        let mut controller = PaginationController::attach(PageMetrics::a4(), &doc);
        while doc.len() > 10 {
            let (_, event) = doc.remove_block(0).unwrap();
            controller.handle(event, &doc);
        }
        assert_eq!(controller.page_count(), 1);
        assert!(controller.markers().is_empty());
    }
}
