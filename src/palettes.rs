//! Immutable color palettes.
//!
//! A [`Palette`] never changes after construction and is shared between
//! animation units as `Arc<Palette>`. Sequential reads go through a
//! [`PaletteCursor`] owned by the reader, so two units cycling the same
//! palette do not disturb each other.

use crate::colors::{self, Color};
use crate::error::{Error, Result};
use rand::Rng;
use serde::Deserialize;

/// A fixed, ordered list of colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Creates a palette from a non-empty list of colors.
    ///
    /// # Errors
    /// `Error::Configuration` if `colors` is empty.
    pub fn new(colors: Vec<Color>) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::configuration("palette must contain at least one color"));
        }
        Ok(Self { colors })
    }

    /// Creates a palette from `RRGGBB` hex strings.
    pub fn from_hex<S: AsRef<str>>(hex: &[S]) -> Result<Self> {
        let colors = hex
            .iter()
            .map(|h| Color::from_hex(h.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(colors)
    }

    /// Looks up one of the predefined palettes by name (case-insensitive).
    pub fn named(name: &str) -> Option<Self> {
        use colors::{BLACK as K, BLUE as B, CYAN as C, GREEN as G, MAGENTA as M, RED as R};
        use colors::{WHITE as W, YELLOW as Y};

        let colors = match name.to_ascii_lowercase().as_str() {
            "rgb" => vec![R, G, B],
            "rgbw" => vec![R, G, B, W],
            "cmy" => vec![C, M, Y],
            "cmyk" => vec![C, M, Y, K],
            "cmyw" => vec![C, M, Y, W],
            "blackwhite" => vec![K, W],
            "xmas" => vec![R, G, B, W, M, C, Y],
            "red" => vec![R],
            "green" => vec![G],
            "blue" => vec![B],
            "cyan" => vec![C],
            "magenta" => vec![M],
            "yellow" => vec![Y],
            "white" => vec![W],
            _ => return None,
        };
        Some(Self { colors })
    }

    /// Returns the color at `index`, if any.
    pub fn entry(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    /// Returns the first color.
    pub fn first(&self) -> Color {
        self.colors[0]
    }

    /// Returns a uniformly random color.
    pub fn random_entry<R: Rng + ?Sized>(&self, rng: &mut R) -> Color {
        self.colors[rng.gen_range(0..self.colors.len())]
    }

    /// Number of colors; always at least one.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

/// Sequential, wrapping read position into a palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaletteCursor {
    next: usize,
}

impl PaletteCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next color and advances, cycling back to the start.
    pub fn next_entry(&mut self, palette: &Palette) -> Color {
        let index = self.next % palette.len();
        self.next = (index + 1) % palette.len();
        palette.colors[index]
    }

    /// Rewinds to the first entry.
    pub fn rewind(&mut self) {
        self.next = 0;
    }
}

/// Palette as written in configuration: a predefined name or a hex list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PaletteSpec {
    Named(String),
    Hex(Vec<String>),
}

impl PaletteSpec {
    /// Resolves the spec into a palette.
    pub fn build(&self) -> Result<Palette> {
        match self {
            PaletteSpec::Named(name) => Palette::named(name)
                .ok_or_else(|| Error::configuration(format!("unknown palette {name:?}"))),
            PaletteSpec::Hex(hex) => Palette::from_hex(hex),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BLUE, GREEN, RED};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn empty_palette_is_rejected() {
        assert!(matches!(Palette::new(vec![]), Err(Error::Configuration(_))));
    }

    #[test]
    fn cursor_cycles_in_order() {
        let palette = Palette::named("rgb").unwrap();
        let mut cursor = PaletteCursor::new();
        let seen: Vec<Color> = (0..7).map(|_| cursor.next_entry(&palette)).collect();
        assert_eq!(seen, vec![RED, GREEN, BLUE, RED, GREEN, BLUE, RED]);
    }

    #[test]
    fn independent_cursors_do_not_interfere() {
        let palette = Palette::named("rgb").unwrap();
        let mut a = PaletteCursor::new();
        let mut b = PaletteCursor::new();
        a.next_entry(&palette);
        a.next_entry(&palette);
        assert_eq!(b.next_entry(&palette), RED);
        assert_eq!(a.next_entry(&palette), BLUE);
    }

    #[test]
    fn random_entry_is_a_member() {
        let palette = Palette::named("xmas").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let c = palette.random_entry(&mut rng);
            assert!(palette.colors().contains(&c));
        }
    }

    #[test]
    fn spec_resolves_names_and_hex_lists() {
        let named: PaletteSpec = serde_json::from_str("\"cmy\"").unwrap();
        assert_eq!(named.build().unwrap().len(), 3);

        let hex: PaletteSpec = serde_json::from_str("[\"FF0000\", \"0000FF\"]").unwrap();
        let palette = hex.build().unwrap();
        assert_eq!(palette.entry(1), Some(Color::from_hex("0000FF").unwrap()));

        let unknown = PaletteSpec::Named("nope".into());
        assert!(unknown.build().is_err());
    }
}
