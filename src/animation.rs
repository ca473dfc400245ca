//! Animation units: the lifecycle state machine around one effect.
//!
//! An [`AnimationUnit`] owns the bookkeeping every effect shares (tick
//! computation, start and end pauses, looping, the duration clock, images and
//! the private layer) and delegates the visual work to a boxed [`Effect`].
//!
//! Two clocks run side by side:
//!
//! - the *tick*, an effect-local phase counter in `0..fps` derived from the time
//!   since the last (re)start and scaled by `speed`;
//! - the *duration*, the wall-clock lifetime of the unit's turn in a sequence,
//!   armed on the first frame and untouched by internal loop restarts.

use crate::assets::{ImageAsset, ScaleMode};
use crate::chain::PixelChain;
use crate::colors::Color;
use crate::composite::{draw_chain, merge_onto, paste_with_alpha_at};
use crate::config::{AnimationConfig, FPS_RANGE, ImageSpec};
use crate::error::{Error, Result};
use crate::frame::{self, FrameBuffer, LayerBuffer};
use crate::palettes::{Palette, PaletteCursor};
use image::RgbaImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lowest effective tick rate. Slower rates stall `tick` at zero.
pub const MIN_TICK_RATE: f64 = 1.1;

/// Per-effect behavior plugged into an [`AnimationUnit`].
pub trait Effect: Send {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    /// Advances the effect by one frame.
    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()>;

    /// Draws effect-owned content onto the layer. Called on every rendered
    /// frame, after images and before the chain.
    fn draw(&self, _layer: &mut LayerBuffer) {}

    /// Returns the effect to its starting point. Called on every unit reset,
    /// including loop restarts.
    fn reset(&mut self) {}

    /// Replacement for the foreground image on this frame, derived from the
    /// scaled source. `None` pastes the source unchanged.
    fn filter_foreground(&self, _image: &RgbaImage) -> Option<RgbaImage> {
        None
    }
}

/// Lifecycle state of an [`AnimationUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Never reset.
    Uninitialized,
    /// Stepping normally.
    Running,
    /// Inside the start pause; the last frame is re-rendered.
    StartPaused,
    /// Finished and inside the end pause.
    EndPaused,
    /// Finished and frozen until the duration expires.
    Finished,
    /// Duration expired; stays here until reset.
    Retired,
}

/// Result of [`AnimationUnit::next_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The effect was stepped.
    Stepped,
    /// Inside a start or end pause.
    Paused,
    /// Finished and not looping.
    Frozen,
    /// The unit's duration has elapsed.
    DurationExpired,
}

impl FrameOutcome {
    pub fn is_expired(self) -> bool {
        self == FrameOutcome::DurationExpired
    }
}

/// What an effect sees while stepping.
pub struct StepContext<'a> {
    tick: u32,
    last_tick: Option<u32>,
    fps: u32,
    rate: f64,
    elapsed: Duration,
    duration: Duration,
    start_pause: Duration,
    end_pause: Duration,
    foreground: Option<(u32, u32)>,
    display_size: Option<(u32, u32)>,
    chain: Option<&'a mut PixelChain>,
    palette: Option<&'a Palette>,
    cursor: &'a mut PaletteCursor,
    rng: &'a mut StdRng,
    finished: bool,
}

impl<'a> StepContext<'a> {
    /// Current tick, always in `0..fps`.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Effective ticks per second (`speed * fps`, floored at [`MIN_TICK_RATE`]).
    pub fn ticks_per_second(&self) -> f64 {
        self.rate
    }

    /// Time since the unit was last (re)started.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time since the start pause ended.
    pub fn active_time(&self) -> Duration {
        self.elapsed.saturating_sub(self.start_pause)
    }

    /// Share of the duration left between the start and end pauses.
    pub fn active_span(&self) -> Duration {
        self.duration
            .saturating_sub(self.start_pause)
            .saturating_sub(self.end_pause)
    }

    /// Size of the loaded foreground image, if the unit declares one.
    pub fn foreground_size(&self) -> Option<(u32, u32)> {
        self.foreground
    }

    /// True on the first step after a reset.
    pub fn is_first_step(&self) -> bool {
        self.last_tick.is_none()
    }

    /// True when the tick moved since the previous step, or on the first step.
    ///
    /// Effects that move one position per tick return early when this is false.
    pub fn tick_advanced(&self) -> bool {
        self.last_tick != Some(self.tick)
    }

    /// Size of the display, known once the unit has rendered a frame.
    pub fn display_size(&self) -> Option<(u32, u32)> {
        self.display_size
    }

    /// The bound chain.
    ///
    /// # Errors
    /// `Error::Configuration` if the unit runs without a chain.
    pub fn chain(&mut self) -> Result<&mut PixelChain> {
        self.chain
            .as_deref_mut()
            .ok_or_else(|| Error::configuration("effect needs a chain but none is bound"))
    }

    /// The bound chain together with the unit's random source.
    pub fn chain_and_rng(&mut self) -> Result<(&mut PixelChain, &mut StdRng)> {
        let chain = self
            .chain
            .as_deref_mut()
            .ok_or_else(|| Error::configuration("effect needs a chain but none is bound"))?;
        Ok((chain, &mut *self.rng))
    }

    pub fn palette(&self) -> Result<&'a Palette> {
        self.palette
            .ok_or_else(|| Error::configuration("effect needs a palette but none is set"))
    }

    /// Next color from the unit's palette, cycling back to the start.
    pub fn next_palette_entry(&mut self) -> Result<Color> {
        let palette = self.palette()?;
        Ok(self.cursor.next_entry(palette))
    }

    /// Uniformly random color from the unit's palette.
    pub fn random_palette_entry(&mut self) -> Result<Color> {
        let palette = self.palette()?;
        Ok(palette.random_entry(&mut *self.rng))
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    /// Marks the animation finished. The unit freezes (or loops) from the
    /// next frame on.
    pub fn animation_has_finished(&mut self) {
        self.finished = true;
    }
}

/// An image placed on the layer, loaded on first reset and scaled to the
/// layer when first drawn.
#[derive(Debug)]
struct LayerImage {
    spec: ImageSpec,
    mode: Option<ScaleMode>,
    source: Option<ImageAsset>,
    scaled: Option<ImageAsset>,
    scaled_for: (u32, u32),
}

impl LayerImage {
    fn new(spec: ImageSpec) -> Result<Self> {
        let mode = spec.scale_mode.as_deref().map(str::parse::<ScaleMode>).transpose()?;
        Ok(Self {
            spec,
            mode,
            source: None,
            scaled: None,
            scaled_for: (0, 0),
        })
    }

    fn load(&mut self) -> Result<()> {
        if self.source.is_none() {
            debug!(path = %self.spec.path.display(), "loading layer image");
            self.source = Some(ImageAsset::load(&self.spec.path)?);
        }
        Ok(())
    }

    fn size(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(|s| (s.width(), s.height()))
    }

    fn paste(&mut self, layer: &mut LayerBuffer, effect: Option<&dyn Effect>) {
        let Some(source) = &self.source else {
            return;
        };
        let size = layer.dimensions();
        if self.scaled.is_none() || self.scaled_for != size {
            self.scaled = Some(match self.mode {
                Some(mode) => source.apply_scale_mode(mode, size.0, size.1),
                None => source.clone(),
            });
            self.scaled_for = size;
        }
        let Some(image) = &self.scaled else {
            return;
        };
        match effect.and_then(|e| e.filter_foreground(image.image())) {
            Some(filtered) => paste_with_alpha_at(layer, self.spec.x, self.spec.y, &filtered),
            None => paste_with_alpha_at(layer, self.spec.x, self.spec.y, image.image()),
        };
    }
}

fn effective_rate(unit: &str, speed: f64, fps: u32) -> f64 {
    let rate = speed * f64::from(fps);
    if rate > 1.0 {
        return rate;
    }
    warn!(
        unit,
        requested = rate,
        adjusted = MIN_TICK_RATE,
        "tick rate raised to keep the animation moving"
    );
    MIN_TICK_RATE
}

/// One effect with its timing, pauses, palette, images and layer.
pub struct AnimationUnit {
    name: String,
    fps: u32,
    speed: f64,
    rate: f64,
    duration: Duration,
    start_pause: Duration,
    end_pause: Duration,
    loops: bool,
    background: Option<Color>,
    palette: Option<Arc<Palette>>,
    cursor: PaletteCursor,
    rng: StdRng,
    bg_image: Option<LayerImage>,
    fg_image: Option<LayerImage>,
    effect: Box<dyn Effect>,
    layer: Option<LayerBuffer>,

    state: UnitState,
    tick: u32,
    last_tick: Option<u32>,
    start_time: Duration,
    duration_start: Option<Duration>,
    finished_at: Option<Duration>,
}

impl core::fmt::Debug for AnimationUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnimationUnit")
            .field("name", &self.name)
            .field("effect", &self.effect.kind())
            .field("state", &self.state)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl AnimationUnit {
    /// Creates a unit from a validated config and an effect.
    ///
    /// # Errors
    /// `Error::Configuration` if the config does not validate.
    pub fn new(config: AnimationConfig, effect: Box<dyn Effect>) -> Result<Self> {
        config.validate()?;
        let fps = config
            .fps
            .ok_or_else(|| Error::configuration("fps not set"))?;

        let name = if config.name.is_empty() {
            effect.kind().to_string()
        } else {
            config.name.clone()
        };

        let rate = effective_rate(&name, config.speed, fps);
        let palette = config.palette.as_ref().map(|p| p.build()).transpose()?.map(Arc::new);

        Ok(Self {
            name,
            fps,
            speed: config.speed,
            rate,
            duration: config.duration(),
            start_pause: config.start_pause(),
            end_pause: config.end_pause(),
            loops: config.loops,
            background: config.background,
            palette,
            cursor: PaletteCursor::new(),
            rng: StdRng::from_entropy(),
            bg_image: config.bg_image.map(LayerImage::new).transpose()?,
            fg_image: config.fg_image.map(LayerImage::new).transpose()?,
            effect,
            layer: None,
            state: UnitState::Uninitialized,
            tick: 0,
            last_tick: None,
            start_time: Duration::ZERO,
            duration_start: None,
            finished_at: None,
        })
    }

    /// Replaces the palette, typically with one shared between units.
    pub fn with_palette(mut self, palette: Arc<Palette>) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Seeds the unit's random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.rate
    }

    /// Changes the tick rate base. The speed factor is kept.
    ///
    /// # Errors
    /// `Error::Configuration` if `fps` is outside `1..=200`.
    pub fn set_fps(&mut self, fps: u32) -> Result<()> {
        if !FPS_RANGE.contains(&fps) {
            return Err(Error::configuration(format!(
                "fps must be between 1 and 200, got {fps}"
            )));
        }
        self.fps = fps;
        self.rate = effective_rate(&self.name, self.speed, fps);
        self.tick %= fps;
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn palette(&self) -> Option<&Arc<Palette>> {
        self.palette.as_ref()
    }

    /// Restarts sequential palette reads from the first color.
    pub fn rewind_palette(&mut self) {
        self.cursor.rewind();
    }

    /// The unit's layer, once rendered.
    pub fn layer(&self) -> Option<&LayerBuffer> {
        self.layer.as_ref()
    }

    /// Starts the unit's turn from scratch.
    ///
    /// Restarts the tick clock, clears the finished flag, disarms the duration
    /// clock (re-armed by the next frame) and loads any declared images.
    ///
    /// # Errors
    /// `Error::Resource` if an image cannot be loaded.
    pub fn reset(&mut self, now: Duration) -> Result<()> {
        for image in [&mut self.bg_image, &mut self.fg_image].into_iter().flatten() {
            image.load()?;
        }
        self.duration_start = None;
        self.restart(now);
        debug!(unit = %self.name, "reset");
        Ok(())
    }

    /// Loop restart: like [`reset`](Self::reset) but keeps the duration clock.
    fn restart(&mut self, now: Duration) {
        self.start_time = now;
        self.tick = 0;
        self.last_tick = None;
        self.finished_at = None;
        self.state = UnitState::Running;
        self.effect.reset();
    }

    fn tick_at(&self, now: Duration) -> u32 {
        let elapsed = now.saturating_sub(self.start_time).as_secs_f64();
        // absorbs rounding at exact tick boundaries
        let ticks = (self.rate * elapsed + 1e-9).floor() as u64;
        (ticks % u64::from(self.fps)) as u32
    }

    /// Advances the unit to `now`.
    ///
    /// Returns [`FrameOutcome::DurationExpired`] on every call once the
    /// duration has elapsed, until the unit is reset.
    ///
    /// # Errors
    /// Propagates effect failures and image load failures of a first reset.
    pub fn next_frame(
        &mut self,
        now: Duration,
        chain: Option<&mut PixelChain>,
    ) -> Result<FrameOutcome> {
        if self.state == UnitState::Uninitialized {
            self.reset(now)?;
        }
        if self.state == UnitState::Retired {
            return Ok(FrameOutcome::DurationExpired);
        }

        let duration_start = *self.duration_start.get_or_insert(now);
        if now.saturating_sub(duration_start) >= self.duration {
            debug!(unit = %self.name, "duration expired");
            self.state = UnitState::Retired;
            return Ok(FrameOutcome::DurationExpired);
        }

        if let Some(finished_at) = self.finished_at {
            if now.saturating_sub(finished_at) < self.end_pause {
                self.state = UnitState::EndPaused;
                return Ok(FrameOutcome::Paused);
            }
            if !self.loops {
                self.state = UnitState::Finished;
                return Ok(FrameOutcome::Frozen);
            }
            debug!(unit = %self.name, "looping");
            self.restart(now);
        }

        self.tick = self.tick_at(now);
        let elapsed = now.saturating_sub(self.start_time);
        if elapsed < self.start_pause {
            self.state = UnitState::StartPaused;
            return Ok(FrameOutcome::Paused);
        }

        let mut ctx = StepContext {
            tick: self.tick,
            last_tick: self.last_tick,
            fps: self.fps,
            rate: self.rate,
            elapsed,
            duration: self.duration,
            start_pause: self.start_pause,
            end_pause: self.end_pause,
            foreground: self.fg_image.as_ref().and_then(LayerImage::size),
            display_size: self.layer.as_ref().map(|l| l.dimensions()),
            chain,
            palette: self.palette.as_deref(),
            cursor: &mut self.cursor,
            rng: &mut self.rng,
            finished: false,
        };
        self.effect.step(&mut ctx)?;
        let finished = ctx.finished;

        self.last_tick = Some(self.tick);
        if finished {
            debug!(unit = %self.name, "animation finished");
            self.finished_at = Some(now);
            self.state = UnitState::Finished;
        } else {
            self.state = UnitState::Running;
        }
        Ok(FrameOutcome::Stepped)
    }

    /// Redraws the layer and merges it onto `frame`.
    ///
    /// The layer is allocated at the frame's size on first use. Draw order is
    /// background color, background image, foreground image, effect content,
    /// then chain pixels.
    pub fn render(&mut self, frame: &mut FrameBuffer, chain: Option<&PixelChain>) {
        let size = frame.dimensions();
        if self.layer.as_ref().map_or(true, |l| l.dimensions() != size) {
            self.layer = Some(frame::transparent(size.0, size.1));
        }
        let Some(layer) = self.layer.as_mut() else {
            return;
        };

        match self.background {
            Some(color) => frame::fill(layer, color.opaque()),
            None => frame::clear(layer),
        }
        if let Some(image) = self.bg_image.as_mut() {
            image.paste(layer, None);
        }
        if let Some(image) = self.fg_image.as_mut() {
            image.paste(layer, Some(self.effect.as_ref()));
        }
        self.effect.draw(layer);
        if let Some(chain) = chain {
            draw_chain(layer, chain);
        }
        merge_onto(frame, layer);
    }
}
