//! Text measurement for card layout.
//!
//! Line breaking and header truncation need to know how wide a run of text
//! is before it is drawn. [`FontMetrics`] answers that from the same
//! `fontdb::Database` the rasterizer draws with, so the layout and the pixels
//! agree. [`AverageMetrics`] is a font-free estimate used when no database is
//! at hand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use resvg::usvg::fontdb::{self, Database, Family, Query, Stretch, Style, Weight};
use tracing::trace;

/// Families tried in order, mirroring the `font-family` written into the SVG.
pub(crate) const FONT_FAMILIES: [&str; 6] = [
    "Inter",
    "Helvetica Neue",
    "Helvetica",
    "Arial",
    "Liberation Sans",
    "DejaVu Sans",
];

/// Size and weight of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in CSS pixels.
    pub size: f32,
    pub bold: bool,
}

impl TextStyle {
    /// A regular-weight style at `size`.
    pub const fn regular(size: f32) -> Self {
        Self { size, bold: false }
    }

    /// A bold style at `size`.
    pub const fn bold(size: f32) -> Self {
        Self { size, bold: true }
    }
}

/// Measures the horizontal advance of text.
pub trait TextMeasure: Send + Sync {
    /// Returns the advance of `text` in CSS pixels.
    fn width(&self, text: &str, style: TextStyle) -> f32;
}

// ============================================================================
// AverageMetrics
// ============================================================================

/// Per-character estimate of a sans-serif face. Errs on the wide side.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageMetrics;

impl AverageMetrics {
    fn em(c: char, bold: bool) -> f32 {
        let em = match c {
            ' ' => 0.32,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 0.3,
            'm' | 'w' | 'M' | 'W' | '@' => 0.95,
            c if c.is_ascii_uppercase() || c.is_ascii_digit() => 0.72,
            c if c.is_ascii() => 0.62,
            c if c as u32 >= 0x2E80 => 1.0,
            _ => 0.7,
        };
        if bold { em * 1.08 } else { em }
    }
}

impl TextMeasure for AverageMetrics {
    fn width(&self, text: &str, style: TextStyle) -> f32 {
        text.chars().map(|c| Self::em(c, style.bold)).sum::<f32>() * style.size
    }
}

// ============================================================================
// FontMetrics
// ============================================================================

/// Glyph advances read from a font database.
///
/// Faces are picked the way usvg picks them: the family list first, then
/// the generic serif face, then any face that has the glyph. Advances are
/// cached per character in em units.
#[derive(Clone)]
pub struct FontMetrics {
    fontdb: Arc<Database>,
    cache: Arc<Mutex<HashMap<(char, bool), f32>>>,
}

impl FontMetrics {
    /// Measures with the faces in `fontdb`.
    pub fn new(fontdb: Arc<Database>) -> Self {
        Self {
            fontdb,
            cache: Arc::default(),
        }
    }

    fn primary_face(&self, bold: bool) -> Option<fontdb::ID> {
        let mut families: Vec<Family<'_>> =
            FONT_FAMILIES.iter().map(|name| Family::Name(name)).collect();
        families.push(Family::SansSerif);
        families.push(Family::Serif);

        self.fontdb.query(&Query {
            families: &families,
            weight: if bold { Weight::BOLD } else { Weight::NORMAL },
            stretch: Stretch::Normal,
            style: Style::Normal,
        })
    }

    fn advance_in(&self, id: fontdb::ID, c: char) -> Option<f32> {
        self.fontdb
            .with_face_data(id, |data, index| {
                let face = ttf_parser::Face::parse(data, index).ok()?;
                let glyph = face.glyph_index(c)?;
                let advance = face.glyph_hor_advance(glyph)?;
                Some(f32::from(advance) / f32::from(face.units_per_em()))
            })
            .flatten()
    }

    fn em(&self, c: char, bold: bool) -> f32 {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(em) = cache.get(&(c, bold)) {
            return *em;
        }

        let em = self
            .primary_face(bold)
            .and_then(|id| self.advance_in(id, c))
            .or_else(|| {
                self.fontdb
                    .faces()
                    .find_map(|face| self.advance_in(face.id, c))
            })
            .unwrap_or_else(|| {
                trace!(?c, "no face has this glyph, estimating");
                AverageMetrics::em(c, bold)
            });
        cache.insert((c, bold), em);
        em
    }
}

impl TextMeasure for FontMetrics {
    fn width(&self, text: &str, style: TextStyle) -> f32 {
        text.chars().map(|c| self.em(c, style.bold)).sum::<f32>() * style.size
    }
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_additive() {
        let style = TextStyle::regular(10.0);
        let m = AverageMetrics;
        let whole = m.width("ab c", style);
        let parts = m.width("ab", style) + m.width(" ", style) + m.width("c", style);
        assert!((whole - parts).abs() < 1e-4);
        assert!(m.width("W", style) > m.width("i", style));
    }

    #[test]
    fn bold_is_wider() {
        let m = AverageMetrics;
        assert!(m.width("Ada", TextStyle::bold(16.0)) > m.width("Ada", TextStyle::regular(16.0)));
    }

    #[test]
    fn empty_database_falls_back_to_estimate() {
        let metrics = FontMetrics::new(Arc::new(Database::new()));
        let style = TextStyle::regular(18.0);
        assert_eq!(metrics.width("hello", style), AverageMetrics.width("hello", style));
    }

    #[test]
    fn system_fonts_give_positive_advances() {
        let mut db = Database::new();
        db.load_system_fonts();
        if db.len() == 0 {
            return;
        }
        let metrics = FontMetrics::new(Arc::new(db));
        let style = TextStyle::regular(18.0);
        let w = metrics.width("Hello world", style);
        assert!(w > 0.0 && w < 18.0 * 11.0);
        // Cached lookups return the same value.
        assert_eq!(metrics.width("Hello world", style), w);
    }
}
