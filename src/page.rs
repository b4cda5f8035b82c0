//! Page metrics – the fixed A4 geometry shared by the live pagination view
//! and the PDF export. Both sides must read the same numbers, so every
//! consumer takes a [`PageMetrics`] rather than hard-coding its own.

use serde::{Deserialize, Serialize};

/// A4 page width in CSS pixels (96 dpi).
pub const PAGE_WIDTH_PX: f32 = 794.0;
/// A4 page height in CSS pixels (96 dpi).
pub const PAGE_HEIGHT_PX: f32 = 1123.0;
/// Uniform margin applied to all four sides.
pub const PAGE_MARGIN_PX: f32 = 64.0;
/// Visual gap between two pages in the live view.
pub const PAGE_GAP_PX: f32 = 40.0;

/// A4 width in millimetres.
pub const PAGE_WIDTH_MM: f32 = 210.0;
/// A4 height in millimetres.
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Usable vertical space per page: `PAGE_HEIGHT_PX - 2 * PAGE_MARGIN_PX`.
pub const CONTENT_HEIGHT_PX: f32 = PAGE_HEIGHT_PX - 2.0 * PAGE_MARGIN_PX;
/// Usable horizontal space per page: `PAGE_WIDTH_PX - 2 * PAGE_MARGIN_PX`.
pub const CONTENT_WIDTH_PX: f32 = PAGE_WIDTH_PX - 2.0 * PAGE_MARGIN_PX;

/// Physical page geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    /// Width of the page in px, margins included.
    pub width_px: f32,
    /// Height of the page in px, margins included.
    pub height_px: f32,
    /// Margin on every side, in px.
    pub margin_px: f32,
    /// Gap drawn between consecutive pages in the live view.
    #[serde(default = "PageMetrics::default_gap")]
    pub gap_px: f32,
    /// Physical width in millimetres (PDF media box).
    pub width_mm: f32,
    /// Physical height in millimetres (PDF media box).
    pub height_mm: f32,
}

impl PageMetrics {
    /// Portrait A4 with a 64 px margin.
    pub fn a4() -> Self {
        Self {
            width_px: PAGE_WIDTH_PX,
            height_px: PAGE_HEIGHT_PX,
            margin_px: PAGE_MARGIN_PX,
            gap_px: PAGE_GAP_PX,
            width_mm: PAGE_WIDTH_MM,
            height_mm: PAGE_HEIGHT_MM,
        }
    }

    fn default_gap() -> f32 {
        PAGE_GAP_PX
    }

    /// Content height budget per page.
    pub fn content_height(&self) -> f32 {
        self.height_px - 2.0 * self.margin_px
    }

    /// Width of the content area.
    pub fn content_width(&self) -> f32 {
        self.width_px - 2.0 * self.margin_px
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for PageMetrics {
    fn default() -> Self {
        Self::a4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_height_is_995() {
        assert_eq!(CONTENT_HEIGHT_PX, 995.0);
        assert_eq!(PageMetrics::a4().content_height(), 995.0);
    }

    #[test]
    fn content_width_is_666() {
        assert_eq!(CONTENT_WIDTH_PX, 666.0);
        assert_eq!(PageMetrics::a4().content_width(), 666.0);
    }

    #[test]
    fn json_without_gap_uses_default() {
        let json = r#"{"width_px":794,"height_px":1123,"margin_px":64,"width_mm":210,"height_mm":297}"#;
        let metrics = PageMetrics::from_json(json).unwrap();
        assert_eq!(metrics, PageMetrics::a4());
    }
}
