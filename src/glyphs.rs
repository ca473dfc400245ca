//! Glyph sources for text effects.
//!
//! Every font backend answers the same questions (how big is this text, what
//! are the line metrics, what does a glyph look like) through [`GlyphSource`].
//! The backend is chosen from the declared font file type with
//! [`FontKind::from_path`]. Only the built-in stroke font ships with the crate.

use crate::composite::paste_with_alpha_at;
use crate::error::{Error, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;

/// Line metrics of a font, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphMetrics {
    /// Horizontal distance from one glyph origin to the next.
    pub advance: u32,
    /// Height of a glyph cell.
    pub line_height: u32,
    /// Rows above the baseline.
    pub ascent: u32,
    /// Rows below the baseline.
    pub descent: u32,
}

/// Size of rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBox {
    pub width: u32,
    pub height: u32,
}

/// Font file flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    /// Bitmap distribution format (`.bdf`).
    Bdf,
    /// Vector outline font (`.ttf`, `.otf`).
    Outline,
    /// The compiled-in stroke font.
    Builtin,
}

impl FontKind {
    /// Picks the font kind from a file path, or the literal `"builtin"`.
    ///
    /// # Errors
    /// `Error::Configuration` for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().eq_ignore_ascii_case("builtin") {
            return Ok(FontKind::Builtin);
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("bdf") => Ok(FontKind::Bdf),
            Some("ttf") | Some("otf") => Ok(FontKind::Outline),
            _ => Err(Error::configuration(format!(
                "unsupported font type {}",
                path.display()
            ))),
        }
    }
}

/// Capability interface shared by all font backends.
pub trait GlyphSource: Send + Sync {
    fn kind(&self) -> FontKind;

    fn metrics(&self) -> GlyphMetrics;

    /// Size of `text` when laid out on one line.
    fn bbox(&self, text: &str) -> TextBox;

    /// Renders one glyph onto a transparent buffer of one glyph cell.
    fn draw_glyph(&self, ch: char, color: Rgba<u8>) -> RgbaImage;

    /// Draws `text` with its top-left corner at `(x, y)`, one character at a
    /// time. Characters take colors from `colors` in turn, or white if empty.
    ///
    /// Glyphs falling partly or fully outside `target` are clipped. Each glyph
    /// origin sits one `advance` after the previous one whatever was clipped,
    /// so text entering from the left edge keeps its spacing. Drawing stops at
    /// the first glyph that lands wholly past the right edge. Returns the laid
    /// out width.
    fn draw_text(
        &self,
        target: &mut RgbaImage,
        x: i32,
        y: i32,
        text: &str,
        colors: &[Rgba<u8>],
    ) -> u32 {
        let advance = i32::try_from(self.metrics().advance).unwrap_or(i32::MAX);
        let right_edge = i64::from(target.width());
        let mut pen = x;
        for (i, ch) in text.chars().enumerate() {
            let color = colors
                .get(i % colors.len().max(1))
                .copied()
                .unwrap_or(Rgba([255, 255, 255, 255]));
            let glyph = self.draw_glyph(ch, color);
            let drawn = paste_with_alpha_at(target, pen, y, &glyph);
            if drawn == 0 && i64::from(pen) >= right_edge {
                break;
            }
            pen = pen.saturating_add(advance);
        }
        self.bbox(text).width
    }
}

/// Largest font height, in pixels, any backend accepts.
pub const MAX_FONT_SIZE: u32 = 256;

/// Opens a font of the given kind at a pixel height.
///
/// # Errors
/// `Error::Configuration` for a size outside `1..=MAX_FONT_SIZE` or for
/// file-backed kinds, which have no parser compiled in.
pub fn open_font(kind: FontKind, size: u32) -> Result<Box<dyn GlyphSource>> {
    match kind {
        FontKind::Builtin => Ok(Box::new(BuiltinFont::new(size)?)),
        FontKind::Bdf | FontKind::Outline => Err(Error::configuration(format!(
            "{kind:?} fonts are not supported, use the builtin font"
        ))),
    }
}

const CELL_WIDTH: u32 = 3;
const CELL_HEIGHT: u32 = 5;

// Rows top to bottom, bit 2 is the leftmost column.
const GLYPHS: &[(char, [u8; 5])] = &[
    (' ', [0b000, 0b000, 0b000, 0b000, 0b000]),
    ('0', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('1', [0b010, 0b110, 0b010, 0b010, 0b111]),
    ('2', [0b111, 0b001, 0b111, 0b100, 0b111]),
    ('3', [0b111, 0b001, 0b111, 0b001, 0b111]),
    ('4', [0b101, 0b101, 0b111, 0b001, 0b001]),
    ('5', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('6', [0b111, 0b100, 0b111, 0b101, 0b111]),
    ('7', [0b111, 0b001, 0b001, 0b010, 0b010]),
    ('8', [0b111, 0b101, 0b111, 0b101, 0b111]),
    ('9', [0b111, 0b101, 0b111, 0b001, 0b111]),
    ('A', [0b010, 0b101, 0b111, 0b101, 0b101]),
    ('B', [0b110, 0b101, 0b110, 0b101, 0b110]),
    ('C', [0b011, 0b100, 0b100, 0b100, 0b011]),
    ('D', [0b110, 0b101, 0b101, 0b101, 0b110]),
    ('E', [0b111, 0b100, 0b110, 0b100, 0b111]),
    ('F', [0b111, 0b100, 0b110, 0b100, 0b100]),
    ('G', [0b011, 0b100, 0b101, 0b101, 0b011]),
    ('H', [0b101, 0b101, 0b111, 0b101, 0b101]),
    ('I', [0b111, 0b010, 0b010, 0b010, 0b111]),
    ('J', [0b001, 0b001, 0b001, 0b101, 0b010]),
    ('K', [0b101, 0b101, 0b110, 0b101, 0b101]),
    ('L', [0b100, 0b100, 0b100, 0b100, 0b111]),
    ('M', [0b101, 0b111, 0b111, 0b101, 0b101]),
    ('N', [0b110, 0b101, 0b101, 0b101, 0b101]),
    ('O', [0b010, 0b101, 0b101, 0b101, 0b010]),
    ('P', [0b110, 0b101, 0b110, 0b100, 0b100]),
    ('Q', [0b010, 0b101, 0b101, 0b110, 0b011]),
    ('R', [0b110, 0b101, 0b110, 0b101, 0b101]),
    ('S', [0b011, 0b100, 0b010, 0b001, 0b110]),
    ('T', [0b111, 0b010, 0b010, 0b010, 0b010]),
    ('U', [0b101, 0b101, 0b101, 0b101, 0b111]),
    ('V', [0b101, 0b101, 0b101, 0b101, 0b010]),
    ('W', [0b101, 0b101, 0b111, 0b111, 0b101]),
    ('X', [0b101, 0b101, 0b010, 0b101, 0b101]),
    ('Y', [0b101, 0b101, 0b010, 0b010, 0b010]),
    ('Z', [0b111, 0b001, 0b010, 0b100, 0b111]),
    ('.', [0b000, 0b000, 0b000, 0b000, 0b010]),
    (',', [0b000, 0b000, 0b000, 0b010, 0b100]),
    ('!', [0b010, 0b010, 0b010, 0b000, 0b010]),
    ('?', [0b111, 0b001, 0b010, 0b000, 0b010]),
    ('-', [0b000, 0b000, 0b111, 0b000, 0b000]),
    ('+', [0b000, 0b010, 0b111, 0b010, 0b000]),
    (':', [0b000, 0b010, 0b000, 0b010, 0b000]),
    ('\'', [0b010, 0b010, 0b000, 0b000, 0b000]),
    ('/', [0b001, 0b001, 0b010, 0b100, 0b100]),
];

fn rows_for(ch: char) -> [u8; 5] {
    let upper = ch.to_ascii_uppercase();
    GLYPHS
        .iter()
        .find(|(c, _)| *c == upper)
        .or_else(|| GLYPHS.iter().find(|(c, _)| *c == '?'))
        .map(|(_, rows)| *rows)
        .unwrap_or_default()
}

/// A 3x5 stroke font scaled up by whole pixels. Lower case letters render
/// as upper case and unknown characters as `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFont {
    scale: u32,
}

impl BuiltinFont {
    /// Creates the font for a pixel height; the glyph cell is scaled by the
    /// largest whole factor that fits, at least 1.
    pub fn new(size: u32) -> Result<Self> {
        if size == 0 || size > MAX_FONT_SIZE {
            return Err(Error::configuration(format!(
                "font size must be between 1 and {MAX_FONT_SIZE}, got {size}"
            )));
        }
        Ok(Self {
            scale: (size / CELL_HEIGHT).max(1),
        })
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }
}

impl GlyphSource for BuiltinFont {
    fn kind(&self) -> FontKind {
        FontKind::Builtin
    }

    fn metrics(&self) -> GlyphMetrics {
        GlyphMetrics {
            advance: (CELL_WIDTH + 1) * self.scale,
            line_height: CELL_HEIGHT * self.scale,
            ascent: CELL_HEIGHT * self.scale,
            descent: 0,
        }
    }

    fn bbox(&self, text: &str) -> TextBox {
        let count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        if count == 0 {
            return TextBox::default();
        }
        let metrics = self.metrics();
        TextBox {
            width: count.saturating_mul(metrics.advance) - self.scale,
            height: metrics.line_height,
        }
    }

    fn draw_glyph(&self, ch: char, color: Rgba<u8>) -> RgbaImage {
        let rows = rows_for(ch);
        let s = self.scale;
        RgbaImage::from_fn(CELL_WIDTH * s, CELL_HEIGHT * s, |x, y| {
            let bits = rows[(y / s) as usize];
            let column = CELL_WIDTH - 1 - x / s;
            if (bits >> column) & 1 == 1 {
                color
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{count_visible, transparent};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn font_kind_follows_extension() {
        assert_eq!(FontKind::from_path("fonts/5x7.BDF").unwrap(), FontKind::Bdf);
        assert_eq!(FontKind::from_path("a.ttf").unwrap(), FontKind::Outline);
        assert_eq!(FontKind::from_path("a.otf").unwrap(), FontKind::Outline);
        assert_eq!(FontKind::from_path("Builtin").unwrap(), FontKind::Builtin);
        assert!(matches!(FontKind::from_path("a.woff"), Err(Error::Configuration(_))));
        assert!(FontKind::from_path("noext").is_err());
    }

    #[test]
    fn only_builtin_fonts_open() {
        assert!(open_font(FontKind::Builtin, 10).is_ok());
        assert!(matches!(open_font(FontKind::Bdf, 10), Err(Error::Configuration(_))));
        assert!(matches!(open_font(FontKind::Outline, 10), Err(Error::Configuration(_))));
        assert!(open_font(FontKind::Builtin, 0).is_err());
    }

    #[test]
    fn oversized_fonts_are_rejected() {
        assert!(BuiltinFont::new(MAX_FONT_SIZE).is_ok());
        assert!(matches!(
            BuiltinFont::new(MAX_FONT_SIZE + 1),
            Err(Error::Configuration(_))
        ));
        assert!(open_font(FontKind::Builtin, u32::MAX).is_err());
    }

    #[test]
    fn bbox_scales_with_size() {
        let small = BuiltinFont::new(5).unwrap();
        assert_eq!(small.bbox("HI"), TextBox { width: 7, height: 5 });
        assert_eq!(small.bbox(""), TextBox::default());

        let big = BuiltinFont::new(12).unwrap();
        assert_eq!(big.scale(), 2);
        assert_eq!(big.bbox("HI"), TextBox { width: 14, height: 10 });
    }

    #[test]
    fn glyph_bits_map_to_pixels() {
        let font = BuiltinFont::new(5).unwrap();
        let one = font.draw_glyph('1', WHITE);
        assert_eq!(one.dimensions(), (3, 5));
        assert_eq!(one.get_pixel(0, 0).0[3], 0);
        assert_eq!(*one.get_pixel(1, 0), WHITE);
        assert_eq!(count_visible(&one), 8);
    }

    #[test]
    fn lower_case_and_unknown_characters() {
        let font = BuiltinFont::new(5).unwrap();
        assert_eq!(font.draw_glyph('a', WHITE), font.draw_glyph('A', WHITE));
        assert_eq!(font.draw_glyph('~', WHITE), font.draw_glyph('?', WHITE));
    }

    #[test]
    fn draw_text_clips_at_edges() {
        let font = BuiltinFont::new(5).unwrap();
        let mut target = transparent(4, 5);
        let width = font.draw_text(&mut target, -2, 0, "HI", &[WHITE]);
        assert_eq!(width, 7);
        // last column of H at x=0, then I at x=2..4
        assert_eq!(*target.get_pixel(0, 0), WHITE);
        assert_eq!(target.get_pixel(1, 0).0[3], 0);
        assert_eq!(*target.get_pixel(2, 0), WHITE);
    }

    #[test]
    fn draw_text_keeps_spacing_and_stops_past_right_edge() {
        let font = BuiltinFont::new(5).unwrap();
        let mut target = transparent(6, 5);
        // first "1" loses its left column, the second sits whole at x=3
        let width = font.draw_text(&mut target, -1, 0, "11111111", &[WHITE]);
        assert_eq!(width, 31);
        assert_eq!(*target.get_pixel(0, 0), WHITE);
        assert_eq!(*target.get_pixel(4, 0), WHITE);
        assert_eq!(target.get_pixel(3, 0).0[3], 0);
        assert_eq!(count_visible(&target), 6 + 8);
    }
}
