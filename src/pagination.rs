//! Pagination – partitions the top-level block sequence into pages.
//!
//! Greedy first-fit in a single pass: blocks are added to the current page
//! until the next one would overflow it, then a new page starts. Breaks only
//! ever fall between top-level blocks, and nothing is split:
//! - a block taller than the whole budget sits alone on its page and
//!   overflows it visually
//! - a manual break on an empty page is skipped, so runs of manual breaks
//!   never produce blank pages

use serde::{Deserialize, Serialize};

use crate::block::ContentBlock;
use crate::estimate::{Estimator, HeightSource};

/// One page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakRecord {
    /// Index of the top-level block the break occurs before.
    pub position: usize,
    /// 1-indexed number of the page that starts after this break (≥ 2).
    pub page_number: usize,
    /// Unused height left on the page that ends here.
    pub remaining_space: f32,
}

/// Output of one pagination pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    pub breaks: Vec<BreakRecord>,
    pub page_count: usize,
}

impl PaginationResult {
    /// The result for a document with no blocks: one empty page.
    pub fn single_page() -> Self {
        Self {
            breaks: Vec::new(),
            page_count: 1,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for PaginationResult {
    fn default() -> Self {
        Self::single_page()
    }
}

/// Page index (0-based) of each top-level block. Manual break sentinels
/// belong to no page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAssignment {
    pages: Vec<Option<usize>>,
    page_count: usize,
}

impl PageAssignment {
    pub fn page_of(&self, index: usize) -> Option<usize> {
        self.pages.get(index).copied().flatten()
    }

    /// Block indices placed on `page`, in document order.
    pub fn blocks_on(&self, page: usize) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == Some(page))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Compute page breaks for `blocks` using estimated heights.
pub fn compute_breaks(blocks: &[ContentBlock], content_height: f32) -> PaginationResult {
    paginate(blocks, content_height, &Estimator).0
}

/// Compute page breaks reading heights from `source`.
pub fn compute_breaks_with(
    blocks: &[ContentBlock],
    content_height: f32,
    source: &impl HeightSource,
) -> PaginationResult {
    paginate(blocks, content_height, source).0
}

/// Run the placement pass, returning both the break list and the
/// per-block page assignment.
pub fn paginate(
    blocks: &[ContentBlock],
    content_height: f32,
    source: &impl HeightSource,
) -> (PaginationResult, PageAssignment) {
    let mut breaks = Vec::new();
    let mut pages = Vec::with_capacity(blocks.len());
    let mut page_number = 1usize;
    let mut current_height = 0.0f32;
    let mut placed_on_page = 0usize;

    for (i, block) in blocks.iter().enumerate() {
        if block.is_page_break() {
            pages.push(None);
            if current_height > 0.0 || placed_on_page > 0 {
                page_number += 1;
                breaks.push(BreakRecord {
                    position: i,
                    page_number,
                    remaining_space: content_height - current_height,
                });
                current_height = 0.0;
                placed_on_page = 0;
            }
            continue;
        }

        let h = source.block_height(i, block);
        if current_height + h > content_height && current_height > 0.0 {
            page_number += 1;
            breaks.push(BreakRecord {
                position: i,
                page_number,
                remaining_space: content_height - current_height,
            });
            current_height = h;
            placed_on_page = 1;
        } else {
            current_height += h;
            placed_on_page += 1;
        }
        pages.push(Some(page_number - 1));
    }

    log::debug!(
        "paginated {} blocks into {} page(s), {} break(s)",
        blocks.len(),
        page_number,
        breaks.len()
    );

    (
        PaginationResult {
            breaks,
            page_count: page_number,
        },
        PageAssignment {
            pages,
            page_count: page_number,
        },
    )
}
