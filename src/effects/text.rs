//! Effects that draw a line of text onto the unit's layer.
//!
//! Text is laid out with a [`GlyphSource`] and takes an explicit color, or
//! the next palette color on every restart. With an explicit color the text
//! is drawn from the first rendered frame, including the start pause.

use super::FadeMode;
use crate::animation::{Effect, StepContext};
use crate::colors::Color;
use crate::error::Result;
use crate::frame::LayerBuffer;
use crate::glyphs::{FontKind, GlyphSource, open_font};
use std::time::Duration;

/// Opens the font named in configuration.
pub(crate) fn load_font(font: &str, size: u32) -> Result<Box<dyn GlyphSource>> {
    open_font(FontKind::from_path(font)?, size)
}

/// Text, font and color shared by the text effects.
struct Caption {
    text: String,
    font: Box<dyn GlyphSource>,
    color: Option<Color>,
    current: Option<Color>,
    width: u32,
}

impl core::fmt::Debug for Caption {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Caption")
            .field("text", &self.text)
            .field("font", &self.font.kind())
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl Caption {
    fn new(text: String, font: Box<dyn GlyphSource>, color: Option<Color>) -> Self {
        let width = font.bbox(&text).width;
        Self {
            text,
            font,
            color,
            current: color,
            width,
        }
    }

    fn pick_color(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if self.current.is_none() {
            self.current = Some(match self.color {
                Some(color) => color,
                None => ctx.next_palette_entry()?,
            });
        }
        Ok(())
    }

    fn draw(&self, layer: &mut LayerBuffer, (x, y): (i32, i32), alpha: f32) {
        if let Some(color) = self.current {
            self.font
                .draw_text(layer, x, y, &self.text, &[color.pixel(1.0, alpha)]);
        }
    }

    fn reset(&mut self) {
        self.current = self.color;
    }
}

/// Fraction of `span` covered by `elapsed`; 1.0 for an empty span.
fn progress(elapsed: Duration, span: Duration) -> f64 {
    if span.is_zero() {
        1.0
    } else {
        elapsed.as_secs_f64() / span.as_secs_f64()
    }
}

fn lerp(from: (i32, i32), to: (i32, i32), t: f64) -> (i32, i32) {
    let t = t.clamp(0.0, 1.0);
    let at = |a: i32, b: i32| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as i32;
    (at(from.0, to.0), at(from.1, to.1))
}

/// Scrolls a line of text from the right edge to the left, one pixel per
/// tick. Finishes once the text has left the display.
#[derive(Debug)]
pub struct TextScroll {
    caption: Caption,
    y: i32,
    offset: i32,
}

impl TextScroll {
    /// Scrolls `text` at row `y`.
    pub fn new(
        text: impl Into<String>,
        font: Box<dyn GlyphSource>,
        y: i32,
        color: Option<Color>,
    ) -> Self {
        Self {
            caption: Caption::new(text.into(), font, color),
            y,
            offset: 0,
        }
    }

    pub fn text_width(&self) -> u32 {
        self.caption.width
    }
}

impl Effect for TextScroll {
    fn kind(&self) -> &'static str {
        "text-scroll"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        self.caption.pick_color(ctx)?;
        if !ctx.tick_advanced() {
            return Ok(());
        }

        if !ctx.is_first_step() {
            self.offset = self.offset.saturating_add(1);
        }
        if let Some((width, _)) = ctx.display_size() {
            let travel = i64::from(width) + i64::from(self.caption.width);
            if i64::from(self.offset) >= travel {
                ctx.animation_has_finished();
            }
        }
        Ok(())
    }

    fn draw(&self, layer: &mut LayerBuffer) {
        let x = i32::try_from(layer.width()).unwrap_or(i32::MAX) - self.offset;
        self.caption.draw(layer, (x, self.y), 1.0);
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.caption.reset();
    }
}

/// Fades text in or out in place, then finishes.
///
/// The fade runs over `period`, or over the part of the duration between the
/// start and end pauses.
#[derive(Debug)]
pub struct TextFade {
    caption: Caption,
    origin: (i32, i32),
    mode: FadeMode,
    period: Option<Duration>,
    alpha: f32,
}

impl TextFade {
    pub fn new(
        text: impl Into<String>,
        font: Box<dyn GlyphSource>,
        origin: (i32, i32),
        color: Option<Color>,
        mode: FadeMode,
    ) -> Self {
        Self {
            caption: Caption::new(text.into(), font, color),
            origin,
            mode,
            period: None,
            alpha: mode.starting_level() as f32,
        }
    }

    pub fn with_period(mut self, period: Option<Duration>) -> Self {
        self.period = period;
        self
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl Effect for TextFade {
    fn kind(&self) -> &'static str {
        "text-fade"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        self.caption.pick_color(ctx)?;
        let span = self.period.unwrap_or(ctx.active_span());
        let (level, done) = self.mode.level(progress(ctx.active_time(), span));
        self.alpha = level as f32;
        if done {
            ctx.animation_has_finished();
        }
        Ok(())
    }

    fn draw(&self, layer: &mut LayerBuffer) {
        self.caption.draw(layer, self.origin, self.alpha);
    }

    fn reset(&mut self) {
        self.alpha = self.mode.starting_level() as f32;
        self.caption.reset();
    }
}

/// Slides text along a straight line one pixel per tick and jumps back to
/// the start after reaching the end.
#[derive(Debug)]
pub struct TextMove {
    caption: Caption,
    from: (i32, i32),
    to: (i32, i32),
    steps: u32,
    taken: u32,
}

impl TextMove {
    pub fn new(
        text: impl Into<String>,
        font: Box<dyn GlyphSource>,
        from: (i32, i32),
        to: (i32, i32),
        color: Option<Color>,
    ) -> Self {
        let steps = from.0.abs_diff(to.0).max(from.1.abs_diff(to.1));
        Self {
            caption: Caption::new(text.into(), font, color),
            from,
            to,
            steps,
            taken: 0,
        }
    }

    /// Where the text is drawn on the next render.
    pub fn position(&self) -> (i32, i32) {
        if self.steps == 0 {
            return self.from;
        }
        lerp(
            self.from,
            self.to,
            f64::from(self.taken) / f64::from(self.steps),
        )
    }
}

impl Effect for TextMove {
    fn kind(&self) -> &'static str {
        "text-move"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        self.caption.pick_color(ctx)?;
        if !ctx.tick_advanced() || ctx.is_first_step() {
            return Ok(());
        }
        self.taken = if self.taken >= self.steps {
            0
        } else {
            self.taken + 1
        };
        Ok(())
    }

    fn draw(&self, layer: &mut LayerBuffer) {
        self.caption.draw(layer, self.position(), 1.0);
    }

    fn reset(&mut self) {
        self.taken = 0;
        self.caption.reset();
    }
}

/// Slides text from `from` to `to` over a fixed time, then finishes.
///
/// The move takes `period`, or the part of the duration between the start
/// and end pauses. It ignores the unit's speed.
#[derive(Debug)]
pub struct TextMoveTimed {
    caption: Caption,
    from: (i32, i32),
    to: (i32, i32),
    period: Option<Duration>,
    position: (i32, i32),
}

impl TextMoveTimed {
    pub fn new(
        text: impl Into<String>,
        font: Box<dyn GlyphSource>,
        from: (i32, i32),
        to: (i32, i32),
        color: Option<Color>,
    ) -> Self {
        Self {
            caption: Caption::new(text.into(), font, color),
            from,
            to,
            period: None,
            position: from,
        }
    }

    pub fn with_period(mut self, period: Option<Duration>) -> Self {
        self.period = period;
        self
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }
}

impl Effect for TextMoveTimed {
    fn kind(&self) -> &'static str {
        "text-move-timed"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        self.caption.pick_color(ctx)?;
        let span = self.period.unwrap_or(ctx.active_span());
        let t = progress(ctx.active_time(), span);
        self.position = lerp(self.from, self.to, t);
        if t >= 1.0 {
            ctx.animation_has_finished();
        }
        Ok(())
    }

    fn draw(&self, layer: &mut LayerBuffer) {
        self.caption.draw(layer, self.position, 1.0);
    }

    fn reset(&mut self) {
        self.position = self.from;
        self.caption.reset();
    }
}
