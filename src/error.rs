//! Error types for pageflow.
//!
//! Live pagination has no error path; everything here belongs to document
//! import and PDF export.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pageflow operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The export content source does not exist.
    #[error("Content source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// I/O error when reading input or writing the PDF.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document JSON could not be decoded.
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The layout engine rejected the rendered surface.
    #[error("Layout error: {0}")]
    Layout(String),

    /// A single page could not be rasterized.
    #[error("Failed to rasterize page {page}: {message}")]
    Raster { page: usize, message: String },

    /// The PDF document could not be assembled.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// A font file could not be parsed.
    #[error("Font error: {0}")]
    Font(String),
}

impl Error {
    pub(crate) fn raster(page: usize, message: impl Into<String>) -> Self {
        Error::Raster {
            page,
            message: message.into(),
        }
    }
}
