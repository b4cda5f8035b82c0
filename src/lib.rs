//! # pageflow – A4 pagination for rich-text documents
//!
//! Splits a flowing block document into fixed-size A4 pages and keeps that
//! split current while the document is edited. The live path is:
//!
//! 1. **Estimate** – height of each top-level block from its type and text ([`estimate`])
//! 2. **Break** – greedy first-fit into pages, honouring manual breaks ([`pagination`])
//! 3. **Present** – page markers and footers as decorations ([`presenter`])
//! 4. **Recalculate** – rerun only when content changes ([`controller`])
//!
//! Export is a separate one-shot pipeline: lay the document out with Taffy
//! ([`layout`]), paginate from the measured boxes, rasterize each page
//! ([`raster`]) and write the page images into a PDF ([`pdf`], [`export`]).

pub mod block;
pub mod controller;
pub mod dom;
pub mod error;
pub mod estimate;
pub mod export;
pub mod fonts;
pub mod layout;
pub mod page;
pub mod pagination;
pub mod pdf;
pub mod presenter;
pub mod raster;
pub mod samples;
pub mod style;

// Re-exports for convenience
pub use block::{BlockKind, ContentBlock, Document};
pub use controller::{DocumentEvent, PaginationController};
pub use error::{Error, Result};
pub use estimate::{estimate, Estimator, HeightSource};
pub use export::{export_pages, export_to_pdf, ContentSource, ExportOptions, ExportReport};
pub use page::PageMetrics;
pub use pagination::{compute_breaks, BreakRecord, PageAssignment, PaginationResult};
pub use presenter::{present, VisualMarker};
