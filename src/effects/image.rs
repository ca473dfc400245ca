//! Effects that rework the unit's foreground image before it is pasted.
//!
//! Each one needs a `fg_image` in the unit's configuration and fails its
//! first step without one.

use super::FadeMode;
use crate::animation::{Effect, StepContext};
use crate::colors::{hsv_to_rgb, rgb_to_hsv};
use crate::error::{Error, Result};
use crate::frame::roll_region;
use image::{Rgba, RgbaImage};
use serde::Deserialize;

fn require_foreground(ctx: &StepContext<'_>, kind: &str) -> Result<()> {
    match ctx.foreground_size() {
        Some(_) => Ok(()),
        None => Err(Error::configuration(format!(
            "{kind} needs a foreground image but none is set"
        ))),
    }
}

fn scale_channel(value: u8, factor: f32) -> u8 {
    (f32::from(value) * factor).round().clamp(0.0, 255.0) as u8
}

/// Fades the foreground image in or out by `rate` percent per tick.
///
/// In-out rises to full strength and falls back before finishing.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFade {
    mode: FadeMode,
    rate: f32,
    percent: f32,
    rising: bool,
}

impl ImageFade {
    pub fn new(mode: FadeMode, rate: f32) -> Self {
        let rate = if rate.is_finite() { rate.abs() } else { 1.0 };
        Self {
            mode,
            rate,
            percent: mode.starting_level() as f32 * 100.0,
            rising: mode != FadeMode::Out,
        }
    }

    /// Current strength in percent.
    pub fn percent(&self) -> f32 {
        self.percent
    }
}

impl Effect for ImageFade {
    fn kind(&self) -> &'static str {
        "image-fade"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        require_foreground(ctx, self.kind())?;
        if !ctx.tick_advanced() || ctx.is_first_step() {
            return Ok(());
        }

        if self.rising {
            self.percent = (self.percent + self.rate).min(100.0);
            if self.percent >= 100.0 {
                match self.mode {
                    FadeMode::InOut => self.rising = false,
                    _ => ctx.animation_has_finished(),
                }
            }
        } else {
            self.percent = (self.percent - self.rate).max(0.0);
            if self.percent <= 0.0 {
                ctx.animation_has_finished();
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new(self.mode, self.rate);
    }

    fn filter_foreground(&self, image: &RgbaImage) -> Option<RgbaImage> {
        if self.percent >= 100.0 {
            return None;
        }
        let factor = self.percent / 100.0;
        let mut out = image.clone();
        for px in out.pixels_mut() {
            px.0 = px.0.map(|c| scale_channel(c, factor));
        }
        Some(out)
    }
}

/// Rotates the hue of every foreground pixel, `turns` full circles over the
/// time between the pauses. Never finishes on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct HueCycle {
    turns: f32,
    shift: f32,
}

impl HueCycle {
    pub fn new(turns: f32) -> Self {
        Self {
            turns: if turns.is_finite() { turns } else { 1.0 },
            shift: 0.0,
        }
    }

    /// Current hue offset in `0.0..1.0`.
    pub fn shift(&self) -> f32 {
        self.shift
    }
}

impl Effect for HueCycle {
    fn kind(&self) -> &'static str {
        "hue-cycle"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        require_foreground(ctx, self.kind())?;
        let span = ctx.active_span().as_secs_f64();
        let progress = if span > 0.0 {
            ctx.active_time().as_secs_f64() / span
        } else {
            0.0
        };
        self.shift = (f64::from(self.turns) * progress).rem_euclid(1.0) as f32;
        Ok(())
    }

    fn reset(&mut self) {
        self.shift = 0.0;
    }

    fn filter_foreground(&self, image: &RgbaImage) -> Option<RgbaImage> {
        if self.shift == 0.0 {
            return None;
        }
        let mut out = image.clone();
        for px in out.pixels_mut() {
            let [r, g, b, a] = px.0;
            let (hue, saturation, value) = rgb_to_hsv([r, g, b]);
            let [r, g, b] = hsv_to_rgb((hue + self.shift).rem_euclid(1.0), saturation, value);
            *px = Rgba([r, g, b, a]);
        }
        Some(out)
    }
}

/// Which way [`ImageRoll`] moves the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl RollDirection {
    fn offset(self, distance: u32) -> (i64, i64) {
        let d = i64::from(distance);
        match self {
            RollDirection::Up => (0, -d),
            RollDirection::Down => (0, d),
            RollDirection::Left => (-d, 0),
            RollDirection::Right => (d, 0),
        }
    }
}

/// Rolls the foreground image one pixel per tick, wrapping around, then
/// finishes after `steps` pixels.
///
/// `window` limits the roll to `[x, y, width, height]` of the scaled image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRoll {
    direction: RollDirection,
    steps: u32,
    window: Option<[u32; 4]>,
    rolled: u32,
}

impl ImageRoll {
    pub fn new(direction: RollDirection, steps: u32, window: Option<[u32; 4]>) -> Self {
        Self {
            direction,
            steps,
            window,
            rolled: 0,
        }
    }

    pub fn rolled(&self) -> u32 {
        self.rolled
    }
}

impl Effect for ImageRoll {
    fn kind(&self) -> &'static str {
        "image-roll"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        require_foreground(ctx, self.kind())?;
        if !ctx.tick_advanced() {
            return Ok(());
        }
        if !ctx.is_first_step() && self.rolled < self.steps {
            self.rolled += 1;
        }
        if self.rolled >= self.steps {
            ctx.animation_has_finished();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.rolled = 0;
    }

    fn filter_foreground(&self, image: &RgbaImage) -> Option<RgbaImage> {
        if self.rolled == 0 {
            return None;
        }
        let window = self
            .window
            .unwrap_or([0, 0, image.width(), image.height()]);
        let (dx, dy) = self.direction.offset(self.rolled);
        let mut out = image.clone();
        roll_region(&mut out, window, dx, dy);
        Some(out)
    }
}
