//! LED chains: ordered pixel slots mapped onto display coordinates.
//!
//! A chain behaves like an LED strip laid out along an arbitrary path. Each
//! slot stores HSV color, alpha and an anti-alias weight; coordinates are kept
//! apart from colors so that rolling and shifting move colors along the path
//! while every LED stays where it is. Anti-alias weights belong to the
//! coordinates and stay put as well.
//!
//! Chain-wide brightness and alpha are applied when pixels are read, never to
//! the stored slots, so dimming is fully reversible.

use crate::antialias::AntiAliasMethod;
use crate::colors::{hsv_to_rgb, rgb_to_hsv, to_u8, unit};
use crate::error::{Error, Result};
use image::Rgba;
use rand::Rng;

/// One chain slot. All components are in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSlot {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
    pub alpha: f32,
}

impl PixelSlot {
    /// A transparent black slot.
    pub const EMPTY: PixelSlot = PixelSlot {
        hue: 0.0,
        saturation: 0.0,
        value: 0.0,
        alpha: 0.0,
    };

    /// Derives HSV and normalized alpha from an RGBA pixel.
    pub fn from_rgba(color: Rgba<u8>) -> Self {
        let [r, g, b, a] = color.0;
        let (hue, saturation, value) = rgb_to_hsv([r, g, b]);
        Self {
            hue,
            saturation,
            value,
            alpha: f32::from(a) / 255.0,
        }
    }
}

/// A chain pixel as it should appear on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LitPixel {
    pub x: i32,
    pub y: i32,
    pub color: Rgba<u8>,
}

/// Fixed-length sequence of addressable pixels.
#[derive(Debug, Clone)]
pub struct PixelChain {
    coords: Vec<(i32, i32)>,
    alias: Vec<f32>,
    slots: Vec<PixelSlot>,
    brightness: f32,
    alpha: f32,
    cursor: usize,
}

impl PixelChain {
    /// Creates a chain from path coordinates.
    ///
    /// Without anti-aliasing every coordinate is rounded to the nearest pixel
    /// and given full weight. With a method, the path is expanded by the
    /// preprocessor and the chain grows accordingly (up to 4x for Quad, 2x for Wu).
    ///
    /// # Errors
    /// `Error::Configuration` if the path is empty.
    pub fn new(path: &[(f32, f32)], method: Option<AntiAliasMethod>) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::configuration("chain needs at least one coordinate"));
        }

        let (coords, alias): (Vec<_>, Vec<_>) = match method {
            Some(method) => method
                .apply(path)
                .into_iter()
                .map(|p| ((p.x, p.y), p.weight))
                .unzip(),
            None => path
                .iter()
                .map(|&(x, y)| ((x.round() as i32, y.round() as i32), 1.0))
                .unzip(),
        };

        Ok(Self {
            slots: vec![PixelSlot::EMPTY; coords.len()],
            coords,
            alias,
            brightness: 1.0,
            alpha: 1.0,
            cursor: 0,
        })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(Error::Range {
                index,
                len: self.len(),
            })
        }
    }

    /// Sets one slot from an RGBA pixel.
    pub fn set_pixel(&mut self, index: usize, color: Rgba<u8>) -> Result<()> {
        self.check(index)?;
        self.slots[index] = PixelSlot::from_rgba(color);
        Ok(())
    }

    /// Sets every slot to the same color.
    pub fn set_all_pixels(&mut self, color: Rgba<u8>) {
        self.slots.fill(PixelSlot::from_rgba(color));
    }

    /// Fills every slot with a random color and alpha.
    pub fn set_all_pixels_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for slot in &mut self.slots {
            *slot = PixelSlot {
                hue: rng.gen_range(0.0..1.0),
                saturation: rng.gen_range(0.0..=1.0),
                value: rng.gen_range(0.0..=1.0),
                alpha: rng.gen_range(0.0..=1.0),
            };
        }
    }

    /// Multiplies the stored value of one slot by `brightness`.
    pub fn set_pixel_brightness(&mut self, index: usize, brightness: f32) -> Result<()> {
        self.check(index)?;
        self.slots[index].value *= unit(brightness);
        Ok(())
    }

    /// Replaces the alpha of one slot.
    pub fn set_pixel_alpha(&mut self, index: usize, alpha: f32) -> Result<()> {
        self.check(index)?;
        self.slots[index].alpha = unit(alpha);
        Ok(())
    }

    /// Returns the stored slot.
    pub fn slot(&self, index: usize) -> Result<PixelSlot> {
        self.check(index)?;
        Ok(self.slots[index])
    }

    /// Returns the display coordinate of a slot.
    pub fn pixel_xy(&self, index: usize) -> Result<(i32, i32)> {
        self.check(index)?;
        Ok(self.coords[index])
    }

    /// Returns one slot as it would be displayed.
    pub fn pixel(&self, index: usize) -> Result<LitPixel> {
        self.check(index)?;
        Ok(self.lit(index))
    }

    /// Sets perceived chain brightness. Human brightness response is roughly
    /// square-law, so the stored multiplier is `brightness²`.
    pub fn set_chain_brightness(&mut self, brightness: f32) {
        let b = unit(brightness);
        self.brightness = b * b;
    }

    /// Sets perceived chain transparency, square-law like brightness.
    pub fn set_chain_alpha(&mut self, alpha: f32) {
        let a = unit(alpha);
        self.alpha = a * a;
    }

    /// Stored brightness multiplier (after the square law).
    pub fn chain_brightness(&self) -> f32 {
        self.brightness
    }

    /// Stored alpha multiplier (after the square law).
    pub fn chain_alpha(&self) -> f32 {
        self.alpha
    }

    fn lit(&self, index: usize) -> LitPixel {
        let slot = &self.slots[index];
        let value = slot.value * self.alias[index] * self.brightness;
        let [r, g, b] = hsv_to_rgb(slot.hue, slot.saturation, value);
        let (x, y) = self.coords[index];
        LitPixel {
            x,
            y,
            color: Rgba([r, g, b, to_u8(slot.alpha * self.alpha)]),
        }
    }

    /// Returns every slot as it should be displayed, in chain order.
    ///
    /// Chain brightness, chain alpha and alias weights are applied to the
    /// output only.
    pub fn all_pixels(&self) -> Vec<LitPixel> {
        (0..self.len()).map(|i| self.lit(i)).collect()
    }

    /// Current LED pointer.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the LED pointer, wrapping to the chain length.
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index % self.len();
    }

    /// Returns the pixel at the cursor and advances it.
    ///
    /// With `wrap` the cursor returns to the start after the last slot,
    /// otherwise `None` is returned once the end is passed.
    pub fn next_led(&mut self, wrap: bool) -> Option<LitPixel> {
        if self.cursor >= self.len() {
            if !wrap {
                return None;
            }
            self.cursor = 0;
        }
        let lit = self.lit(self.cursor);
        self.cursor += 1;
        if wrap && self.cursor >= self.len() {
            self.cursor = 0;
        }
        Some(lit)
    }

    /// Rotates colors along the chain. Positive steps move the head toward the
    /// tail; negative steps move the other way.
    pub fn roll(&mut self, steps: isize) {
        rotate(&mut self.slots, steps);
    }

    /// Rolls toward the tail and fills the vacated head slots.
    pub fn shift_right(&mut self, steps: usize, fill: Option<Rgba<u8>>) {
        let steps = steps.min(self.len());
        rotate(&mut self.slots, steps as isize);
        if let Some(fill) = fill {
            self.slots[..steps].fill(PixelSlot::from_rgba(fill));
        }
    }

    /// Rolls toward the head and fills the vacated tail slots.
    pub fn shift_left(&mut self, steps: usize, fill: Option<Rgba<u8>>) {
        let steps = steps.min(self.len());
        rotate(&mut self.slots, -(steps as isize));
        if let Some(fill) = fill {
            let len = self.len();
            self.slots[len - steps..].fill(PixelSlot::from_rgba(fill));
        }
    }

    /// Brings colors in from both ends toward the middle.
    pub fn shift_in(&mut self, steps: usize, fill: Option<Rgba<u8>>) {
        let mid = self.len() / 2;
        let (head, tail) = self.slots.split_at_mut(mid);
        rotate(head, steps as isize);
        rotate(tail, -(steps as isize));

        if let Some(fill) = fill {
            let slot = PixelSlot::from_rgba(fill);
            let len = self.len();
            let steps = steps.min(mid);
            self.slots[..steps].fill(slot);
            self.slots[len - steps..].fill(slot);
        }
    }

    /// Moves colors from the middle out toward both ends.
    pub fn shift_out(&mut self, steps: usize, fill: Option<Rgba<u8>>) {
        let mid = self.len() / 2;
        let (head, tail) = self.slots.split_at_mut(mid);
        rotate(head, -(steps as isize));
        rotate(tail, steps as isize);

        if let Some(fill) = fill {
            let slot = PixelSlot::from_rgba(fill);
            let steps = steps.min(mid);
            self.slots[mid - steps..mid + steps].fill(slot);
        }
    }
}

/// Positive steps move elements toward higher indices.
fn rotate<T>(items: &mut [T], steps: isize) {
    if items.is_empty() {
        return;
    }
    let shift = steps.rem_euclid(items.len() as isize) as usize;
    items.rotate_right(shift);
}
