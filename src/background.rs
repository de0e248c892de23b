//! The fixed palette of card backgrounds.
//!
//! Every background is a linear gradient with two or three colour stops.
//! Keys are stable kebab-case strings used by drafts and the command line.

use std::fmt;
use std::str::FromStr;

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================================================
// GradientDirection
// ============================================================================

/// Direction in which a gradient runs across the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientDirection {
    /// Left edge to right edge.
    ToRight,
    /// Top-left corner to bottom-right corner.
    ToBottomRight,
}

impl GradientDirection {
    /// Returns the `(x1, y1, x2, y2)` vector in object bounding box units.
    pub fn vector(self) -> (f32, f32, f32, f32) {
        match self {
            Self::ToRight => (0.0, 0.0, 1.0, 0.0),
            Self::ToBottomRight => (0.0, 0.0, 1.0, 1.0),
        }
    }
}

// ============================================================================
// Background
// ============================================================================

/// One entry of the background palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum Background {
    #[default]
    PinkPurple,
    CyanBlue,
    GreenTeal,
    AmberOrange,
    FuchsiaPurple,
    RoseRed,
    SkyIndigo,
    VioletPurple,
    Yellow,
    EmeraldCyan,
    Midnight,
    Cloud,
    SlatePurple,
    EmeraldBlue,
    Sunset,
}

const fn hex(rgb: u32) -> Srgb<u8> {
    Srgb::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

impl Background {
    /// Every palette entry, in display order.
    pub const ALL: [Background; 15] = [
        Self::PinkPurple,
        Self::CyanBlue,
        Self::GreenTeal,
        Self::AmberOrange,
        Self::FuchsiaPurple,
        Self::RoseRed,
        Self::SkyIndigo,
        Self::VioletPurple,
        Self::Yellow,
        Self::EmeraldCyan,
        Self::Midnight,
        Self::Cloud,
        Self::SlatePurple,
        Self::EmeraldBlue,
        Self::Sunset,
    ];

    /// Picks a palette entry uniformly at random.
    ///
    /// The result may equal the current background.
    pub fn random() -> Self {
        Self::ALL[fastrand::usize(..Self::ALL.len())]
    }

    /// Picks a palette entry uniformly at random from the given generator.
    pub fn random_with(rng: &mut fastrand::Rng) -> Self {
        Self::ALL[rng.usize(..Self::ALL.len())]
    }

    /// Returns the stable key for this background.
    pub fn key(self) -> &'static str {
        match self {
            Self::PinkPurple => "pink-purple",
            Self::CyanBlue => "cyan-blue",
            Self::GreenTeal => "green-teal",
            Self::AmberOrange => "amber-orange",
            Self::FuchsiaPurple => "fuchsia-purple",
            Self::RoseRed => "rose-red",
            Self::SkyIndigo => "sky-indigo",
            Self::VioletPurple => "violet-purple",
            Self::Yellow => "yellow",
            Self::EmeraldCyan => "emerald-cyan",
            Self::Midnight => "midnight",
            Self::Cloud => "cloud",
            Self::SlatePurple => "slate-purple",
            Self::EmeraldBlue => "emerald-blue",
            Self::Sunset => "sunset",
        }
    }

    /// Returns the gradient direction.
    pub fn direction(self) -> GradientDirection {
        use GradientDirection::*;
        match self {
            Self::PinkPurple
            | Self::GreenTeal
            | Self::FuchsiaPurple
            | Self::SkyIndigo
            | Self::Yellow
            | Self::Cloud
            | Self::EmeraldBlue => ToBottomRight,
            Self::CyanBlue
            | Self::AmberOrange
            | Self::RoseRed
            | Self::VioletPurple
            | Self::EmeraldCyan
            | Self::Midnight
            | Self::SlatePurple
            | Self::Sunset => ToRight,
        }
    }

    /// Returns the colour stops, evenly spaced from start to end.
    pub fn stops(self) -> &'static [Srgb<u8>] {
        const PINK_PURPLE: [Srgb<u8>; 2] = [hex(0xf472b6), hex(0x9333ea)];
        const CYAN_BLUE: [Srgb<u8>; 2] = [hex(0x22d3ee), hex(0x3b82f6)];
        const GREEN_TEAL: [Srgb<u8>; 2] = [hex(0x86efac), hex(0x14b8a6)];
        const AMBER_ORANGE: [Srgb<u8>; 2] = [hex(0xfcd34d), hex(0xf97316)];
        const FUCHSIA_PURPLE: [Srgb<u8>; 2] = [hex(0xd946ef), hex(0x9333ea)];
        const ROSE_RED: [Srgb<u8>; 2] = [hex(0xfb7185), hex(0xef4444)];
        const SKY_INDIGO: [Srgb<u8>; 2] = [hex(0x38bdf8), hex(0x6366f1)];
        const VIOLET_PURPLE: [Srgb<u8>; 2] = [hex(0xa78bfa), hex(0xa855f7)];
        const YELLOW: [Srgb<u8>; 2] = [hex(0xfef08a), hex(0xeab308)];
        const EMERALD_CYAN: [Srgb<u8>; 2] = [hex(0x34d399), hex(0x06b6d4)];
        const MIDNIGHT: [Srgb<u8>; 2] = [hex(0x111827), hex(0x000000)];
        const CLOUD: [Srgb<u8>; 2] = [hex(0xffffff), hex(0xe5e7eb)];
        const SLATE_PURPLE: [Srgb<u8>; 3] = [hex(0x0f172a), hex(0x581c87), hex(0x0f172a)];
        const EMERALD_BLUE: [Srgb<u8>; 2] = [hex(0x10b981), hex(0x3b82f6)];
        const SUNSET: [Srgb<u8>; 3] = [hex(0xf43f5e), hex(0xf87171), hex(0xf97316)];

        match self {
            Self::PinkPurple => &PINK_PURPLE,
            Self::CyanBlue => &CYAN_BLUE,
            Self::GreenTeal => &GREEN_TEAL,
            Self::AmberOrange => &AMBER_ORANGE,
            Self::FuchsiaPurple => &FUCHSIA_PURPLE,
            Self::RoseRed => &ROSE_RED,
            Self::SkyIndigo => &SKY_INDIGO,
            Self::VioletPurple => &VIOLET_PURPLE,
            Self::Yellow => &YELLOW,
            Self::EmeraldCyan => &EMERALD_CYAN,
            Self::Midnight => &MIDNIGHT,
            Self::Cloud => &CLOUD,
            Self::SlatePurple => &SLATE_PURPLE,
            Self::EmeraldBlue => &EMERALD_BLUE,
            Self::Sunset => &SUNSET,
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Background {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bg| bg.key() == s)
            .ok_or_else(|| Error::UnknownBackground(s.to_string()))
    }
}

/// Formats a colour as an SVG `#rrggbb` string.
pub(crate) fn css_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn palette_has_fifteen_distinct_entries() {
        let keys: HashSet<_> = Background::ALL.iter().map(|bg| bg.key()).collect();
        assert_eq!(keys.len(), 15);
    }

    #[test]
    fn default_is_pink_purple() {
        assert_eq!(Background::default(), Background::PinkPurple);
        assert_eq!(css_hex(Background::default().stops()[0]), "#f472b6");
    }

    #[test]
    fn random_stays_inside_palette() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let bg = Background::random_with(&mut rng);
            assert!(Background::ALL.contains(&bg));
            seen.insert(bg);
        }
        // Uniform sampling over 2000 draws reaches every entry.
        assert_eq!(seen.len(), 15);

        for _ in 0..100 {
            assert!(Background::ALL.contains(&Background::random()));
        }
    }

    #[test]
    fn keys_parse_back() {
        for bg in Background::ALL {
            assert_eq!(bg.key().parse::<Background>().unwrap(), bg);
        }
        assert!("plaid".parse::<Background>().is_err());
    }

    #[test]
    fn three_stop_gradients() {
        assert_eq!(Background::SlatePurple.stops().len(), 3);
        assert_eq!(Background::Sunset.stops().len(), 3);
        assert_eq!(Background::Midnight.direction(), GradientDirection::ToRight);
    }

    #[test]
    fn serde_uses_keys() {
        let json = serde_json::to_string(&Background::EmeraldCyan).unwrap();
        assert_eq!(json, "\"emerald-cyan\"");
    }
}
