//! HSV colors and conversions to display pixels.
//!
//! Colors are held as HSV so that brightness can be scaled by multiplying the
//! value component without shifting the hue. Every component, hue included,
//! lives in `0.0..=1.0`. Transparency is not part of a [`Color`]; it is added
//! when a color is turned into a pixel or stored in a chain slot.

use crate::error::{Error, Result};
use image::Rgba;
use palette::{FromColor, Hsv, Srgb};
use serde::Deserialize;

/// An immutable HSV color.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    hue: f32,
    saturation: f32,
    value: f32,
}

pub const BLACK: Color = Color::raw(0.0, 0.0, 0.0);
pub const WHITE: Color = Color::raw(0.0, 0.0, 1.0);
pub const RED: Color = Color::raw(0.0, 1.0, 1.0);
pub const YELLOW: Color = Color::raw(1.0 / 6.0, 1.0, 1.0);
pub const GREEN: Color = Color::raw(1.0 / 3.0, 1.0, 1.0);
pub const CYAN: Color = Color::raw(0.5, 1.0, 1.0);
pub const BLUE: Color = Color::raw(2.0 / 3.0, 1.0, 1.0);
pub const MAGENTA: Color = Color::raw(5.0 / 6.0, 1.0, 1.0);

/// Opaque black pixel, the default panel background.
pub const PIXEL_OFF: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Fully transparent pixel.
pub const PIXEL_TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

impl Color {
    const fn raw(hue: f32, saturation: f32, value: f32) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Creates a color from HSV components, each clamped to `0.0..=1.0`.
    pub fn hsv(hue: f32, saturation: f32, value: f32) -> Self {
        Self::raw(unit(hue), unit(saturation), unit(value))
    }

    /// Parses an `RRGGBB` hex string. A leading `#` is accepted and inputs of
    /// two or four digits are zero-prefixed, so `"FF"` is a pure blue. Odd
    /// digit counts are rejected.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !matches!(digits.len(), 2 | 4 | 6) {
            return Err(Error::configuration(format!(
                "hex color {hex:?} must have 2, 4 or 6 digits"
            )));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::configuration(format!(
                "hex color {hex:?} contains non-hex characters"
            )));
        }

        let padded = format!("{digits:0>6}");
        let channel = |range: core::ops::Range<usize>| {
            u8::from_str_radix(&padded[range], 16)
                .map_err(|e| Error::configuration(format!("hex color {hex:?}: {e}")))
        };

        Ok(Self::from_rgb8(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Creates a color from 8-bit RGB channels.
    pub fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        let (hue, saturation, value) = rgb_to_hsv([red, green, blue]);
        Self::raw(hue, saturation, value)
    }

    #[inline]
    pub fn hue(&self) -> f32 {
        self.hue
    }

    #[inline]
    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Returns the color as `Srgb<f32>`.
    pub fn to_srgb(&self) -> Srgb {
        Srgb::from_color(Hsv::new(self.hue * 360.0, self.saturation, self.value))
    }

    /// Returns the pixel for this color with the value scaled by `brightness`
    /// and the given `alpha`. Both factors are clamped to `0.0..=1.0`.
    pub fn pixel(&self, brightness: f32, alpha: f32) -> Rgba<u8> {
        let [r, g, b] = hsv_to_rgb(self.hue, self.saturation, self.value * unit(brightness));
        Rgba([r, g, b, to_u8(alpha)])
    }

    /// Opaque pixel at full brightness.
    pub fn opaque(&self) -> Rgba<u8> {
        self.pixel(1.0, 1.0)
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Color::from_hex(&value)
    }
}

/// Clamps to `0.0..=1.0`, mapping NaN to zero.
#[inline]
pub(crate) fn unit(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Maps `0.0..=1.0` onto `0..=255` with rounding.
#[inline]
pub(crate) fn to_u8(x: f32) -> u8 {
    (unit(x) * 255.0).round() as u8
}

/// HSV (all in `0.0..=1.0`) to 8-bit RGB.
pub(crate) fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let rgb = Srgb::from_color(Hsv::new(unit(hue) * 360.0, unit(saturation), unit(value)));
    [to_u8(rgb.red), to_u8(rgb.green), to_u8(rgb.blue)]
}

/// 8-bit RGB to HSV (all in `0.0..=1.0`).
pub(crate) fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let srgb = Srgb::new(
        f32::from(rgb[0]) / 255.0,
        f32::from(rgb[1]) / 255.0,
        f32::from(rgb[2]) / 255.0,
    );
    let hsv = Hsv::from_color(srgb);
    let hue = hsv.hue.into_positive_degrees() / 360.0;
    // 360 degrees folds back onto red
    let hue = if hue >= 1.0 { 0.0 } else { hue };
    (unit(hue), unit(hsv.saturation), unit(hsv.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parses_primary_colors() {
        assert_eq!(Color::from_hex("FF0000").unwrap().opaque(), Rgba([255, 0, 0, 255]));
        assert_eq!(Color::from_hex("#00ff00").unwrap().opaque(), Rgba([0, 255, 0, 255]));
        assert_eq!(Color::from_hex("FF").unwrap().opaque(), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(matches!(Color::from_hex("F"), Err(Error::Configuration(_))));
        assert!(matches!(Color::from_hex("FFFFFFF"), Err(Error::Configuration(_))));
        assert!(Color::from_hex("FFF").is_err());
        assert!(Color::from_hex("#12345").is_err());
        assert!(matches!(Color::from_hex("GG0000"), Err(Error::Configuration(_))));
    }

    #[test]
    fn brightness_scales_value_only() {
        let half = RED.pixel(0.5, 1.0);
        assert_eq!(half, Rgba([128, 0, 0, 255]));
    }

    #[test]
    fn rgb_round_trips_through_hsv() {
        let color = Color::from_rgb8(12, 200, 99);
        assert_eq!(color.opaque(), Rgba([12, 200, 99, 255]));
    }

    #[test]
    fn named_colors_render_expected_pixels() {
        assert_eq!(BLACK.opaque(), PIXEL_OFF);
        assert_eq!(WHITE.opaque(), Rgba([255, 255, 255, 255]));
        assert_eq!(CYAN.opaque(), Rgba([0, 255, 255, 255]));
    }
}
