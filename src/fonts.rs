//! Font loading and text measurement.
//!
//! Metrics come from `ttf-parser`, advances from `rustybuzz` shaping, and
//! system fonts are discovered with `fontdb`. When no real font is loaded,
//! widths fall back to an average-character heuristic so pagination still
//! works in headless environments.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

pub const SANS: &str = "sans-serif";
pub const MONO: &str = "monospace";

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes; empty for the synthetic fallback face.
    pub bytes: Vec<u8>,
    /// Face index inside a font collection.
    pub index: u32,
    pub units_per_em: f32,
}

impl FontData {
    /// Helvetica-like metrics without any glyph data.
    fn synthetic() -> Self {
        Self {
            bytes: Vec::new(),
            index: 0,
            units_per_em: 1000.0,
        }
    }

    fn parse(bytes: Vec<u8>, index: u32) -> Result<Self> {
        let face = ttf_parser::Face::parse(&bytes, index)
            .map_err(|e| Error::Font(format!("failed to parse font: {e}")))?;
        Ok(Self {
            units_per_em: face.units_per_em() as f32,
            index,
            bytes,
        })
    }

    pub fn is_real(&self) -> bool {
        !self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool) -> Self {
        Self {
            family: family.to_string(),
            bold,
        }
    }
}

/// Manages loaded fonts.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    default_key: FontKey,
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default_key: FontKey::new(SANS, false),
        }
    }

    /// Load a TTF/OTF font from bytes.
    pub fn load_font(&mut self, family: &str, bold: bool, bytes: Vec<u8>) -> Result<()> {
        let data = FontData::parse(bytes, 0)?;
        self.insert(FontKey::new(family, bold), data);
        Ok(())
    }

    /// Load a font file and use it for every text style.
    pub fn load_font_file(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)?;
        let data = FontData::parse(bytes, 0)?;
        for family in [SANS, MONO] {
            for bold in [false, true] {
                self.insert(FontKey::new(family, bold), data.clone());
            }
        }
        log::info!("loaded font {}", path.display());
        Ok(())
    }

    /// Discover sans-serif and monospace system fonts. Returns the number of
    /// faces loaded.
    pub fn load_system_fonts(&mut self) -> usize {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let mut loaded = 0;
        for (family, generic) in [(SANS, fontdb::Family::SansSerif), (MONO, fontdb::Family::Monospace)] {
            for bold in [false, true] {
                let query = fontdb::Query {
                    families: &[generic, fontdb::Family::SansSerif],
                    weight: if bold {
                        fontdb::Weight::BOLD
                    } else {
                        fontdb::Weight::NORMAL
                    },
                    stretch: fontdb::Stretch::Normal,
                    style: fontdb::Style::Normal,
                };
                let Some(id) = db.query(&query) else {
                    continue;
                };
                let parsed = db.with_face_data(id, |data, index| FontData::parse(data.to_vec(), index));
                match parsed {
                    Some(Ok(data)) => {
                        self.insert(FontKey::new(family, bold), data);
                        loaded += 1;
                    }
                    Some(Err(e)) => log::warn!("skipping system font: {e}"),
                    None => {}
                }
            }
        }
        log::debug!("loaded {loaded} system font face(s)");
        loaded
    }

    fn insert(&mut self, key: FontKey, data: FontData) {
        let replaces_synthetic = !self.get(&self.default_key).is_real();
        if key.family == SANS && !key.bold && replaces_synthetic {
            self.default_key = key.clone();
        }
        self.fonts.insert(key, data);
    }

    /// Register Helvetica-like synthetic metrics for the default key.
    pub fn ensure_default(&mut self) {
        if self.fonts.is_empty() {
            self.fonts.insert(self.default_key.clone(), FontData::synthetic());
        }
    }

    /// Get font data for a key, falling back to the default, then to the
    /// synthetic face.
    pub fn get(&self, key: &FontKey) -> &FontData {
        static SYNTHETIC: std::sync::OnceLock<FontData> = std::sync::OnceLock::new();
        self.fonts
            .get(key)
            .or_else(|| self.fonts.get(&FontKey::new(&key.family, false)))
            .or_else(|| self.fonts.get(&self.default_key))
            .unwrap_or_else(|| SYNTHETIC.get_or_init(FontData::synthetic))
    }

    /// Measure the width of a string at a given font size (in px).
    ///
    /// With real font bytes the string is shaped and advances summed.
    /// Otherwise an average character width is used; the factors are tuned
    /// so wrapped prose lands near 70 characters per content-width line.
    pub fn measure_text_width(&self, text: &str, font_size: f32, key: &FontKey) -> f32 {
        let data = self.get(key);
        if data.is_real() {
            if let Some(face) = rustybuzz::Face::from_slice(&data.bytes, data.index) {
                let mut buffer = rustybuzz::UnicodeBuffer::new();
                buffer.push_str(text);
                let glyphs = rustybuzz::shape(&face, &[], buffer);
                let units: i32 = glyphs.glyph_positions().iter().map(|p| p.x_advance).sum();
                return units as f32 * font_size / data.units_per_em;
            }
        }
        let avg = match (key.family == MONO, key.bold) {
            (true, _) => 0.6,
            (false, true) => 0.6,
            (false, false) => 0.55,
        };
        text.chars().count() as f32 * font_size * avg
    }

    /// Check if real font bytes are loaded for the default font.
    pub fn has_real_fonts(&self) -> bool {
        self.get(&self.default_key).is_real()
    }

    /// A rasterizable font for `key`, if real bytes are loaded.
    pub fn glyph_font(&self, key: &FontKey) -> Option<ab_glyph::FontVec> {
        let data = self.get(key);
        if !data.is_real() {
            return None;
        }
        ab_glyph::FontVec::try_from_vec_and_index(data.bytes.clone(), data.index).ok()
    }
}

impl Default for FontManager {
    fn default() -> Self {
        let mut mgr = Self::new();
        mgr.ensure_default();
        mgr
    }
}

/// Word-wrap text to fit within `max_width` pixels. Explicit newlines always
/// start a new line; a single word wider than the line stays on its own.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    key: &FontKey,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            let w = fonts.measure_text_width(&candidate, font_size, key);
            if w > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
