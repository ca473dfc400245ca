//! Effects that animate a bound pixel chain.

use super::{Direction, FadeMode};
use crate::animation::{Effect, StepContext};
use crate::colors::{Color, PIXEL_OFF, PIXEL_TRANSPARENT, WHITE};
use crate::error::Result;
use rand::Rng;

/// Lights the whole chain with the next palette color and holds it.
#[derive(Debug, Default)]
pub struct On;

impl Effect for On {
    fn kind(&self) -> &'static str {
        "on"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if ctx.is_first_step() {
            let color = ctx.next_palette_entry()?;
            let chain = ctx.chain()?;
            chain.set_chain_brightness(1.0);
            chain.set_all_pixels(color.opaque());
        }
        Ok(())
    }
}

/// Does nothing; the layer keeps being rendered.
#[derive(Debug, Default)]
pub struct Wait;

impl Effect for Wait {
    fn kind(&self) -> &'static str {
        "wait"
    }

    fn step(&mut self, _ctx: &mut StepContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Gives every pixel a random palette color at a random brightness each tick.
///
/// With `random_colors` the palette is ignored and colors are fully random.
#[derive(Debug, Default)]
pub struct Sparkle {
    pub random_colors: bool,
}

impl Effect for Sparkle {
    fn kind(&self) -> &'static str {
        "sparkle"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }
        if self.random_colors {
            let (chain, rng) = ctx.chain_and_rng()?;
            chain.set_all_pixels_random(rng);
            return Ok(());
        }

        let len = ctx.chain()?.len();
        for index in 0..len {
            let color = ctx.random_palette_entry()?;
            let level = f32::from(ctx.rng().gen_range(0u8..=10)) / 10.0;
            let chain = ctx.chain()?;
            chain.set_pixel(index, color.opaque())?;
            chain.set_pixel_brightness(index, level)?;
        }
        Ok(())
    }
}

/// A single comet with a fading, increasingly transparent tail.
///
/// The tail is as long as the palette unless set. A monochrome comet takes the
/// next palette color on every restart.
#[derive(Debug, Default)]
pub struct Comet {
    pub direction: Direction,
    pub tail: Option<usize>,
    pub multi_colored: bool,
    drawn: bool,
}

impl Comet {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }
}

impl Effect for Comet {
    fn kind(&self) -> &'static str {
        "comet"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }

        if !self.drawn {
            let tail = match self.tail {
                Some(tail) => tail,
                None => ctx.palette()?.len(),
            }
            .max(1);
            ctx.chain()?.set_all_pixels(PIXEL_TRANSPARENT);

            let mut color = ctx.next_palette_entry()?;
            for index in 0..tail {
                if self.multi_colored {
                    color = ctx.next_palette_entry()?;
                }
                let mut level = index as f32 / tail as f32;
                if self.direction == Direction::Left {
                    level = 1.0 - level;
                }
                let chain = ctx.chain()?;
                if index >= chain.len() {
                    break;
                }
                chain.set_pixel(index, color.pixel(level, level))?;
            }
            self.drawn = true;
        }

        ctx.chain()?.roll(self.direction.steps());
        Ok(())
    }

    fn reset(&mut self) {
        self.drawn = false;
    }
}

/// Fills the whole chain with comets nose to tail and rolls them along.
///
/// Each comet is as long as the palette unless `tail` is set. A monochrome
/// run takes the next palette color on every restart.
#[derive(Debug, Default)]
pub struct Comets {
    pub direction: Direction,
    pub tail: Option<usize>,
    pub multi_colored: bool,
    drawn: bool,
}

impl Comets {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }
}

impl Effect for Comets {
    fn kind(&self) -> &'static str {
        "comets"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }

        if !self.drawn {
            let tail = match self.tail {
                Some(tail) => tail,
                None => ctx.palette()?.len(),
            }
            .max(1);
            let len = ctx.chain()?.len();
            ctx.chain()?.set_chain_brightness(1.0);

            let mut color = ctx.next_palette_entry()?;
            for index in 0..len {
                if self.multi_colored {
                    color = ctx.next_palette_entry()?;
                }
                let mut level = (index % tail) as f32 / tail as f32;
                if self.direction == Direction::Left {
                    level = 1.0 - level;
                }
                ctx.chain()?.set_pixel(index, color.pixel(level, level))?;
            }
            self.drawn = true;
        }

        ctx.chain()?.roll(self.direction.steps());
        Ok(())
    }

    fn reset(&mut self) {
        self.drawn = false;
    }
}

/// Square-wave flashing: on for `duty` percent of each tick cycle.
#[derive(Debug)]
pub struct Pulse {
    pub duty: f32,
}

impl Default for Pulse {
    fn default() -> Self {
        Self { duty: 25.0 }
    }
}

impl Effect for Pulse {
    fn kind(&self) -> &'static str {
        "pulse"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }
        if ctx.is_first_step() {
            let color = ctx.next_palette_entry()?;
            ctx.chain()?.set_all_pixels(color.opaque());
        }

        let switch_over = f64::from(self.duty) / 100.0 * ctx.ticks_per_second();
        let tick = f64::from(ctx.tick());
        let level = if tick > 0.0 && tick < switch_over { 1.0 } else { 0.0 };
        ctx.chain()?.set_chain_brightness(level);
        Ok(())
    }
}

/// Fades the chain in, out or in then out over `period`, then finishes.
///
/// Without a period the unit's duration is used.
#[derive(Debug, Default)]
pub struct Fade {
    pub mode: FadeMode,
    pub period: Option<std::time::Duration>,
}

impl Fade {
    pub fn new(mode: FadeMode) -> Self {
        Self { mode, period: None }
    }
}

impl Effect for Fade {
    fn kind(&self) -> &'static str {
        "fade"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if ctx.is_first_step() {
            let color = ctx.next_palette_entry()?;
            ctx.chain()?.set_all_pixels(color.opaque());
        }

        let period = self.period.unwrap_or(ctx.duration()).as_secs_f64();
        let progress = if period > 0.0 {
            ctx.elapsed().as_secs_f64() / period
        } else {
            1.0
        };

        let (level, done) = self.mode.level(progress);
        ctx.chain()?.set_chain_brightness(level as f32);
        if done {
            ctx.animation_has_finished();
        }
        Ok(())
    }
}

/// Fills the chain from one end with the next palette color, then starts
/// again with the following color.
#[derive(Debug, Default)]
pub struct Wipe {
    pub direction: Direction,
    pub multi_colored: bool,
    color: Option<Color>,
    position: usize,
    primed: bool,
}

impl Wipe {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }
}

impl Effect for Wipe {
    fn kind(&self) -> &'static str {
        "wipe"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }
        let len = ctx.chain()?.len();

        if !self.primed {
            let chain = ctx.chain()?;
            if self.color.is_none() {
                chain.set_all_pixels(PIXEL_OFF);
            }
            chain.set_chain_brightness(1.0);
            self.color = Some(ctx.next_palette_entry()?);
            self.position = match self.direction {
                Direction::Right => 0,
                Direction::Left => len - 1,
            };
            self.primed = true;
        }

        if self.multi_colored {
            self.color = Some(ctx.next_palette_entry()?);
        }
        let fill = self.color.unwrap_or(WHITE).opaque();

        let chain = ctx.chain()?;
        match self.direction {
            Direction::Right => {
                chain.shift_right(1, Some(fill));
                self.position += 1;
                if self.position + 1 >= len {
                    self.primed = false;
                }
            }
            Direction::Left => {
                chain.shift_left(1, Some(fill));
                self.position = self.position.saturating_sub(1);
                if self.position == 0 {
                    self.primed = false;
                }
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.color = None;
        self.primed = false;
    }
}

/// Fills from both ends toward the middle.
#[derive(Debug, Default)]
pub struct WipeIn {
    color: Option<Color>,
    position: usize,
    primed: bool,
}

impl Effect for WipeIn {
    fn kind(&self) -> &'static str {
        "wipe-in"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }
        let middle = ctx.chain()?.len() / 2;

        if !self.primed {
            let previous = self.color.map_or(PIXEL_OFF, |c| c.opaque());
            let chain = ctx.chain()?;
            chain.set_all_pixels(previous);
            chain.set_chain_brightness(1.0);
            self.color = Some(ctx.next_palette_entry()?);
            self.position = 0;
            self.primed = true;
        }

        let fill = self.color.unwrap_or(WHITE).opaque();
        ctx.chain()?.shift_in(1, Some(fill));
        self.position += 1;
        if self.position >= middle {
            self.primed = false;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.color = None;
        self.primed = false;
    }
}

/// Fills from the middle out toward both ends.
#[derive(Debug, Default)]
pub struct WipeOut {
    color: Option<Color>,
    position: usize,
    primed: bool,
}

impl Effect for WipeOut {
    fn kind(&self) -> &'static str {
        "wipe-out"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }
        let middle = ctx.chain()?.len() / 2;

        if !self.primed {
            let previous = self.color.map_or(PIXEL_OFF, |c| c.opaque());
            let chain = ctx.chain()?;
            chain.set_all_pixels(previous);
            chain.set_chain_brightness(1.0);
            self.color = Some(ctx.next_palette_entry()?);
            self.position = middle;
            self.primed = true;
        }

        let fill = self.color.unwrap_or(WHITE).opaque();
        ctx.chain()?.shift_out(1, Some(fill));
        self.position = self.position.saturating_sub(1);
        if self.position == 0 {
            self.primed = false;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.color = None;
        self.primed = false;
    }
}

/// Alternates the first two palette colors (or the first and black) along
/// the chain and marches them one step per tick.
#[derive(Debug, Default)]
pub struct AltOnOff {
    drawn: bool,
}

impl Effect for AltOnOff {
    fn kind(&self) -> &'static str {
        "alt-on-off"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }

        if !self.drawn {
            let palette = ctx.palette()?;
            let on = palette.first().opaque();
            let off = palette.entry(1).map_or(PIXEL_OFF, |c| c.opaque());
            let chain = ctx.chain()?;
            chain.set_chain_brightness(1.0);
            for index in 0..chain.len() {
                chain.set_pixel(index, if index % 2 == 1 { on } else { off })?;
            }
            self.drawn = true;
        }

        ctx.chain()?.roll(1);
        Ok(())
    }

    fn reset(&mut self) {
        self.drawn = false;
    }
}

/// A Larson scanner: a bright bar that sweeps to the end of the chain and
/// back.
///
/// The bar is `1 / size` of the chain long and fades toward both ends. The
/// rest of the chain shows `background`, or is transparent.
#[derive(Debug)]
pub struct Larson {
    pub size: usize,
    pub background: Option<Color>,
    position: usize,
    max_position: usize,
    moving_right: bool,
    drawn: bool,
}

impl Default for Larson {
    fn default() -> Self {
        Self {
            size: 2,
            background: None,
            position: 0,
            max_position: 0,
            moving_right: true,
            drawn: false,
        }
    }
}

impl Larson {
    pub fn new(size: usize, background: Option<Color>) -> Self {
        Self {
            size,
            background,
            ..Self::default()
        }
    }

    fn draw_bar(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let color = ctx.next_palette_entry()?;
        let chain = ctx.chain()?;
        let len = chain.len();
        let width = (len / self.size.max(1)).max(1);

        chain.set_chain_brightness(1.0);
        chain.set_all_pixels(self.background.map_or(PIXEL_TRANSPARENT, |c| c.opaque()));
        for offset in 0..=width / 2 {
            let level = (2.0 * offset as f32 / width as f32).min(1.0);
            let pixel = color.pixel(level, level);
            for index in [offset, width - offset] {
                if index < len {
                    chain.set_pixel(index, pixel)?;
                }
            }
        }

        self.position = 0;
        self.max_position = len.saturating_sub(width);
        self.moving_right = true;
        self.drawn = true;
        Ok(())
    }
}

impl Effect for Larson {
    fn kind(&self) -> &'static str {
        "larson"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }
        if !self.drawn {
            return self.draw_bar(ctx);
        }
        if self.max_position == 0 {
            return Ok(());
        }

        if self.position == self.max_position {
            self.moving_right = false;
        } else if self.position == 0 {
            self.moving_right = true;
        }
        if self.moving_right {
            self.position += 1;
            ctx.chain()?.roll(1);
        } else {
            self.position -= 1;
            ctx.chain()?.roll(-1);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.drawn = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColliderPhase {
    Start,
    Approaching { position: usize },
    Collided,
    /// Remaining fade steps, in tenths.
    Fading(u8),
}

/// Two comets run in from both ends, meet in the middle, flash white and
/// fade out, then start again with the next palette color.
#[derive(Debug)]
pub struct Collider {
    pub tail: usize,
    phase: ColliderPhase,
}

impl Collider {
    pub fn new(tail: usize) -> Self {
        Self {
            tail: tail.max(1),
            phase: ColliderPhase::Start,
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Effect for Collider {
    fn kind(&self) -> &'static str {
        "collider"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.tick_advanced() {
            return Ok(());
        }

        match self.phase {
            ColliderPhase::Start => {
                let color = ctx.next_palette_entry()?;
                let chain = ctx.chain()?;
                let len = chain.len();
                chain.set_all_pixels(PIXEL_TRANSPARENT);
                chain.set_chain_brightness(1.0);
                chain.set_chain_alpha(1.0);
                for offset in 0..self.tail.min(len) {
                    let level = offset as f32 / self.tail as f32;
                    let pixel = color.pixel(level, level);
                    chain.set_pixel(offset, pixel)?;
                    chain.set_pixel(len - offset - 1, pixel)?;
                }
                self.phase = ColliderPhase::Approaching {
                    position: self.tail,
                };
            }
            ColliderPhase::Approaching { position } => {
                let chain = ctx.chain()?;
                if position >= chain.len() / 2 {
                    self.phase = ColliderPhase::Collided;
                } else {
                    chain.shift_in(1, None);
                    self.phase = ColliderPhase::Approaching {
                        position: position + 1,
                    };
                }
            }
            ColliderPhase::Collided => {
                let chain = ctx.chain()?;
                chain.set_chain_alpha(1.0);
                chain.set_chain_brightness(1.0);
                chain.set_all_pixels(WHITE.opaque());
                self.phase = ColliderPhase::Fading(10);
            }
            ColliderPhase::Fading(0) => self.phase = ColliderPhase::Start,
            ColliderPhase::Fading(left) => {
                let level = f32::from(left) / 10.0;
                let chain = ctx.chain()?;
                chain.set_chain_brightness(level);
                chain.set_chain_alpha(level);
                self.phase = ColliderPhase::Fading(left - 1);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.phase = ColliderPhase::Start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationUnit, FrameOutcome};
    use crate::chain::PixelChain;
    use crate::config::AnimationConfig;
    use crate::error::Error;
    use crate::palettes::{Palette, PaletteSpec};
    use image::Rgba;
    use std::time::Duration;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn line(len: usize) -> PixelChain {
        let path: Vec<(f32, f32)> = (0..len).map(|i| (i as f32, 0.0)).collect();
        PixelChain::new(&path, None).unwrap()
    }

    fn unit(effect: Box<dyn Effect>, palette: &str) -> AnimationUnit {
        let config = AnimationConfig::builder()
            .fps(10)
            .duration(100.0)
            .palette(PaletteSpec::Named(palette.into()))
            .build()
            .unwrap();
        AnimationUnit::new(config, effect).unwrap().with_seed(1)
    }

    /// Steps once per tick (100 ms at 10 fps).
    fn run_ticks(unit: &mut AnimationUnit, chain: &mut PixelChain, ticks: u64) {
        for t in 0..ticks {
            unit.next_frame(Duration::from_millis(t * 100), Some(chain))
                .unwrap();
        }
    }

    fn colors(chain: &PixelChain) -> Vec<Rgba<u8>> {
        chain.all_pixels().into_iter().map(|p| p.color).collect()
    }

    #[test]
    fn on_fills_with_first_palette_color() {
        let mut chain = line(3);
        let mut unit = unit(Box::new(On), "red");
        run_ticks(&mut unit, &mut chain, 3);
        assert_eq!(colors(&chain), vec![RED; 3]);
    }

    #[test]
    fn chain_effect_without_chain_fails() {
        let mut unit = unit(Box::new(On), "red");
        let err = unit.next_frame(Duration::ZERO, None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn comet_rolls_one_step_per_tick() {
        let mut chain = line(6);
        let mut unit = unit(Box::new(Comet::new(Direction::Right)), "rgb");
        run_ticks(&mut unit, &mut chain, 1);
        // tail of three drawn at 0..3 then rolled right once
        assert_eq!(chain.pixel(0).unwrap().color.0[3], 0);
        assert_eq!(chain.pixel(1).unwrap().color.0[3], 0);
        assert!(chain.pixel(3).unwrap().color.0[3] > chain.pixel(2).unwrap().color.0[3]);

        unit.next_frame(Duration::from_millis(100), Some(&mut chain)).unwrap();
        assert_eq!(chain.pixel(2).unwrap().color.0[3], 0);
    }

    #[test]
    fn comet_waits_for_next_tick() {
        let mut chain = line(6);
        let mut unit = unit(Box::new(Comet::new(Direction::Left)), "rgb");
        unit.next_frame(Duration::from_millis(0), Some(&mut chain)).unwrap();
        let after_first = colors(&chain);
        unit.next_frame(Duration::from_millis(50), Some(&mut chain)).unwrap();
        assert_eq!(colors(&chain), after_first);
    }

    #[test]
    fn wipe_right_fills_from_head() {
        let mut chain = line(4);
        let mut unit = unit(Box::new(Wipe::new(Direction::Right)), "rgb");
        run_ticks(&mut unit, &mut chain, 2);
        assert_eq!(colors(&chain), vec![RED, RED, PIXEL_OFF, PIXEL_OFF]);
        run_ticks_from(&mut unit, &mut chain, 2, 2);
        assert_eq!(colors(&chain), vec![GREEN, RED, RED, RED]);
    }

    fn run_ticks_from(unit: &mut AnimationUnit, chain: &mut PixelChain, start: u64, ticks: u64) {
        for t in start..start + ticks {
            unit.next_frame(Duration::from_millis(t * 100), Some(chain))
                .unwrap();
        }
    }

    #[test]
    fn wipe_in_meets_in_the_middle() {
        let mut chain = line(6);
        let mut unit = unit(Box::new(WipeIn::default()), "blue");
        run_ticks(&mut unit, &mut chain, 3);
        assert_eq!(colors(&chain), vec![BLUE; 6]);
    }

    #[test]
    fn wipe_out_reaches_the_ends() {
        let mut chain = line(6);
        let mut unit = unit(Box::new(WipeOut::default()), "green");
        run_ticks(&mut unit, &mut chain, 3);
        assert_eq!(colors(&chain), vec![GREEN; 6]);
    }

    #[test]
    fn alt_on_off_alternates_and_marches() {
        let mut chain = line(4);
        let mut unit = unit(Box::new(AltOnOff::default()), "rgb");
        run_ticks(&mut unit, &mut chain, 1);
        assert_eq!(colors(&chain), vec![RED, GREEN, RED, GREEN]);
        run_ticks_from(&mut unit, &mut chain, 1, 1);
        assert_eq!(colors(&chain), vec![GREEN, RED, GREEN, RED]);
    }

    #[test]
    fn pulse_is_off_at_tick_zero() {
        let mut chain = line(2);
        let mut unit = unit(Box::new(Pulse { duty: 50.0 }), "red");
        run_ticks(&mut unit, &mut chain, 1);
        assert_eq!(chain.chain_brightness(), 0.0);
        run_ticks_from(&mut unit, &mut chain, 1, 1);
        assert_eq!(chain.chain_brightness(), 1.0);
        run_ticks_from(&mut unit, &mut chain, 2, 6);
        assert_eq!(chain.chain_brightness(), 0.0);
    }

    #[test]
    fn fade_in_finishes_after_period() {
        let mut chain = line(2);
        let fade = Fade {
            mode: FadeMode::In,
            period: Some(Duration::from_secs(1)),
        };
        let mut unit = unit(Box::new(fade), "white");
        unit.next_frame(Duration::ZERO, Some(&mut chain)).unwrap();
        assert_eq!(chain.chain_brightness(), 0.0);
        unit.next_frame(Duration::from_millis(500), Some(&mut chain)).unwrap();
        assert!((chain.chain_brightness() - 0.25).abs() < 1e-6);
        unit.next_frame(Duration::from_secs(1), Some(&mut chain)).unwrap();
        assert_eq!(chain.chain_brightness(), 1.0);
        assert_eq!(
            unit.next_frame(Duration::from_millis(1100), Some(&mut chain)).unwrap(),
            FrameOutcome::Frozen
        );
    }

    #[test]
    fn fade_in_out_peaks_half_way() {
        let mut chain = line(1);
        let fade = Fade {
            mode: FadeMode::InOut,
            period: Some(Duration::from_secs(2)),
        };
        let mut unit = unit(Box::new(fade), "white");
        unit.reset(Duration::ZERO).unwrap();
        unit.next_frame(Duration::from_secs(1), Some(&mut chain)).unwrap();
        assert_eq!(chain.chain_brightness(), 1.0);
        unit.next_frame(Duration::from_secs(2), Some(&mut chain)).unwrap();
        assert_eq!(chain.chain_brightness(), 0.0);
    }

    #[test]
    fn sparkle_uses_palette_members() {
        let mut chain = line(8);
        let mut unit = unit(Box::new(Sparkle::default()), "rgb");
        run_ticks(&mut unit, &mut chain, 2);
        for px in chain.all_pixels() {
            let [r, g, b, a] = px.color.0;
            assert_eq!(a, 255);
            assert!([r, g, b].iter().filter(|&&c| c > 0).count() <= 1);
        }
    }

    #[test]
    fn random_sparkle_needs_no_palette() {
        let mut chain = line(8);
        let config = AnimationConfig::builder().fps(10).build().unwrap();
        let mut unit = AnimationUnit::new(
            config,
            Box::new(Sparkle {
                random_colors: true,
            }),
        )
        .unwrap();
        unit.next_frame(Duration::ZERO, Some(&mut chain)).unwrap();
        assert_eq!(chain.len(), 8);
    }

    fn brightest(chain: &PixelChain) -> usize {
        let alphas: Vec<u8> = colors(chain).iter().map(|p| p.0[3]).collect();
        let max = alphas.iter().copied().max().unwrap_or(0);
        alphas.iter().position(|&a| a == max).unwrap()
    }

    #[test]
    fn comets_fill_the_chain_nose_to_tail() {
        let mut chain = line(6);
        let comets = Comets {
            tail: Some(3),
            ..Comets::new(Direction::Right)
        };
        let mut unit = unit(Box::new(comets), "red");
        run_ticks(&mut unit, &mut chain, 1);

        let alpha = |i: usize| chain.pixel(i).unwrap().color.0[3];
        assert_eq!(alpha(1), 0);
        assert_eq!(alpha(4), 0);
        assert_eq!(alpha(0), alpha(3));
        assert!(alpha(0) > alpha(2));
    }

    #[test]
    fn larson_sweeps_to_the_end_and_back() {
        let mut chain = line(8);
        let mut unit = unit(Box::new(Larson::default()), "red");
        let mut seen = Vec::new();
        for t in 0..10 {
            unit.next_frame(Duration::from_millis(t * 100), Some(&mut chain))
                .unwrap();
            seen.push(brightest(&chain));
        }
        assert_eq!(seen, vec![2, 3, 4, 5, 6, 5, 4, 3, 2, 3]);
    }

    #[test]
    fn larson_fills_background() {
        let mut chain = line(8);
        let larson = Larson {
            background: Some(crate::colors::BLUE),
            ..Larson::default()
        };
        let mut unit = unit(Box::new(larson), "red");
        run_ticks(&mut unit, &mut chain, 1);
        assert_eq!(chain.pixel(7).unwrap().color, BLUE);
    }

    #[test]
    fn collider_meets_flashes_and_fades() {
        let mut chain = line(10);
        let mut unit = unit(Box::new(Collider::new(3)), "rgb");

        run_ticks(&mut unit, &mut chain, 3);
        let alpha = |chain: &PixelChain, i: usize| chain.pixel(i).unwrap().color.0[3];
        assert_eq!(alpha(&chain, 4), alpha(&chain, 5));
        assert_eq!(brightest(&chain), 4);

        run_ticks_from(&mut unit, &mut chain, 3, 2);
        assert_eq!(colors(&chain), vec![Rgba([255, 255, 255, 255]); 10]);

        run_ticks_from(&mut unit, &mut chain, 5, 2);
        assert!((chain.chain_brightness() - 0.9).abs() < 1e-6);

        // fade runs out, then the next comets start in green
        run_ticks_from(&mut unit, &mut chain, 7, 10);
        let head = chain.pixel(2).unwrap().color;
        assert_eq!(head.0[0], 0);
        assert!(head.0[1] > 0);
    }

    #[test]
    fn shared_palette_advances_per_unit() {
        let palette = std::sync::Arc::new(Palette::named("rgb").unwrap());
        let config = AnimationConfig::builder().fps(10).build().unwrap();
        let mut a = AnimationUnit::new(config.clone(), Box::new(On))
            .unwrap()
            .with_palette(palette.clone());
        let mut b = AnimationUnit::new(config, Box::new(On)).unwrap().with_palette(palette);
        let mut chain_a = line(1);
        let mut chain_b = line(1);
        a.next_frame(Duration::ZERO, Some(&mut chain_a)).unwrap();
        b.next_frame(Duration::ZERO, Some(&mut chain_b)).unwrap();
        assert_eq!(colors(&chain_a), colors(&chain_b));
    }
}
