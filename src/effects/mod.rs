//! Built-in effects.
//!
//! Effects come in three families:
//!
//! - [`chain`] effects work on the bound [`PixelChain`](crate::chain::PixelChain)
//!   and mostly move one position per tick, so the unit's `speed` sets how
//!   fast they run;
//! - [`text`] effects draw a line of text onto the unit's layer;
//! - [`image`] effects transform the unit's foreground image.
//!
//! Each effect has a matching [`EffectSpec`] variant so sequences can be
//! described in JSON.

pub mod chain;
pub mod image;
pub mod text;

pub use self::chain::{
    AltOnOff, Collider, Comet, Comets, Fade, Larson, On, Pulse, Sparkle, Wait, Wipe, WipeIn,
    WipeOut,
};
pub use self::image::{HueCycle, ImageFade, ImageRoll, RollDirection};
pub use self::text::{TextFade, TextMove, TextMoveTimed, TextScroll};

use self::text::load_font;

use crate::animation::Effect;
use crate::colors::Color;
use crate::error::Result;
use crate::time::secs;
use serde::Deserialize;

/// Travel direction along a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    #[default]
    Right,
}

impl Direction {
    fn steps(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

/// Fade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FadeMode {
    #[default]
    In,
    Out,
    InOut,
}

impl FadeMode {
    /// Level in `0.0..=1.0` at `progress` through the fade, where 1.0 is the
    /// end, and whether the fade is complete.
    pub fn level(self, progress: f64) -> (f64, bool) {
        let progress = if progress.is_nan() { 1.0 } else { progress.max(0.0) };
        match self {
            FadeMode::In => (progress.min(1.0), progress >= 1.0),
            FadeMode::Out => (1.0 - progress.min(1.0), progress >= 1.0),
            FadeMode::InOut => {
                let phase = (progress * 2.0).min(2.0);
                let level = if phase <= 1.0 { phase } else { 2.0 - phase };
                (level, phase >= 2.0)
            }
        }
    }

    /// Level before the first step.
    fn starting_level(self) -> f64 {
        match self {
            FadeMode::Out => 1.0,
            FadeMode::In | FadeMode::InOut => 0.0,
        }
    }
}

fn default_duty() -> f32 {
    25.0
}

fn default_font() -> String {
    "builtin".to_string()
}

fn default_font_size() -> u32 {
    5
}

fn default_larson_size() -> usize {
    2
}

fn default_collider_tail() -> usize {
    5
}

fn default_fade_rate() -> f32 {
    1.0
}

fn default_turns() -> f32 {
    1.0
}

/// Effect as written in configuration, tagged by `"effect"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "effect", rename_all = "kebab-case", deny_unknown_fields)]
pub enum EffectSpec {
    On,
    /// Also accepted as `"place"`: the layer shows its images and nothing else.
    #[serde(alias = "place")]
    Wait,
    Sparkle {
        #[serde(default)]
        random_colors: bool,
    },
    Comet {
        #[serde(default)]
        direction: Direction,
        #[serde(default)]
        tail: Option<usize>,
        #[serde(default)]
        multi_colored: bool,
    },
    Comets {
        #[serde(default)]
        direction: Direction,
        #[serde(default)]
        tail: Option<usize>,
        #[serde(default)]
        multi_colored: bool,
    },
    #[serde(alias = "knight-rider")]
    Larson {
        #[serde(default = "default_larson_size")]
        size: usize,
        #[serde(default)]
        background: Option<Color>,
    },
    Collider {
        #[serde(default = "default_collider_tail")]
        tail: usize,
    },
    Pulse {
        #[serde(default = "default_duty")]
        duty: f32,
    },
    Fade {
        #[serde(default)]
        mode: FadeMode,
        /// Seconds.
        #[serde(default)]
        period: Option<f64>,
    },
    Wipe {
        #[serde(default)]
        direction: Direction,
        #[serde(default)]
        multi_colored: bool,
    },
    WipeIn,
    WipeOut,
    AltOnOff,
    TextScroll {
        text: String,
        #[serde(default = "default_font")]
        font: String,
        #[serde(default = "default_font_size")]
        size: u32,
        #[serde(default)]
        y: i32,
        #[serde(default)]
        color: Option<Color>,
    },
    TextFade {
        text: String,
        #[serde(default = "default_font")]
        font: String,
        #[serde(default = "default_font_size")]
        size: u32,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default)]
        color: Option<Color>,
        #[serde(default)]
        mode: FadeMode,
        /// Seconds; the time between the pauses when absent.
        #[serde(default)]
        period: Option<f64>,
    },
    TextMove {
        text: String,
        #[serde(default = "default_font")]
        font: String,
        #[serde(default = "default_font_size")]
        size: u32,
        #[serde(default)]
        color: Option<Color>,
        from: (i32, i32),
        to: (i32, i32),
    },
    TextMoveTimed {
        text: String,
        #[serde(default = "default_font")]
        font: String,
        #[serde(default = "default_font_size")]
        size: u32,
        #[serde(default)]
        color: Option<Color>,
        from: (i32, i32),
        to: (i32, i32),
        /// Seconds; the time between the pauses when absent.
        #[serde(default)]
        period: Option<f64>,
    },
    ImageFade {
        #[serde(default)]
        mode: FadeMode,
        /// Percent per tick.
        #[serde(default = "default_fade_rate")]
        rate: f32,
    },
    HueCycle {
        #[serde(default = "default_turns")]
        turns: f32,
    },
    ImageRoll {
        direction: RollDirection,
        steps: u32,
        /// `[x, y, width, height]` on the scaled image; all of it when absent.
        #[serde(default)]
        window: Option<[u32; 4]>,
    },
}

impl EffectSpec {
    /// Builds the effect.
    ///
    /// # Errors
    /// `Error::Configuration` for an unsupported font or font size.
    pub fn build(&self) -> Result<Box<dyn Effect>> {
        let effect: Box<dyn Effect> = match self {
            EffectSpec::On => Box::new(On),
            EffectSpec::Wait => Box::new(Wait),
            EffectSpec::Sparkle { random_colors } => Box::new(Sparkle {
                random_colors: *random_colors,
            }),
            EffectSpec::Comet {
                direction,
                tail,
                multi_colored,
            } => {
                let mut comet = Comet::new(*direction);
                comet.tail = *tail;
                comet.multi_colored = *multi_colored;
                Box::new(comet)
            }
            EffectSpec::Comets {
                direction,
                tail,
                multi_colored,
            } => {
                let mut comets = Comets::new(*direction);
                comets.tail = *tail;
                comets.multi_colored = *multi_colored;
                Box::new(comets)
            }
            EffectSpec::Larson { size, background } => Box::new(Larson::new(*size, *background)),
            EffectSpec::Collider { tail } => Box::new(Collider::new(*tail)),
            EffectSpec::Pulse { duty } => Box::new(Pulse { duty: *duty }),
            EffectSpec::Fade { mode, period } => Box::new(Fade {
                mode: *mode,
                period: period.map(secs),
            }),
            EffectSpec::Wipe {
                direction,
                multi_colored,
            } => {
                let mut wipe = Wipe::new(*direction);
                wipe.multi_colored = *multi_colored;
                Box::new(wipe)
            }
            EffectSpec::WipeIn => Box::new(WipeIn::default()),
            EffectSpec::WipeOut => Box::new(WipeOut::default()),
            EffectSpec::AltOnOff => Box::new(AltOnOff::default()),
            EffectSpec::TextScroll {
                text,
                font,
                size,
                y,
                color,
            } => Box::new(TextScroll::new(text.clone(), load_font(font, *size)?, *y, *color)),
            EffectSpec::TextFade {
                text,
                font,
                size,
                x,
                y,
                color,
                mode,
                period,
            } => Box::new(
                TextFade::new(text.clone(), load_font(font, *size)?, (*x, *y), *color, *mode)
                    .with_period(period.map(secs)),
            ),
            EffectSpec::TextMove {
                text,
                font,
                size,
                color,
                from,
                to,
            } => Box::new(TextMove::new(
                text.clone(),
                load_font(font, *size)?,
                *from,
                *to,
                *color,
            )),
            EffectSpec::TextMoveTimed {
                text,
                font,
                size,
                color,
                from,
                to,
                period,
            } => Box::new(
                TextMoveTimed::new(text.clone(), load_font(font, *size)?, *from, *to, *color)
                    .with_period(period.map(secs)),
            ),
            EffectSpec::ImageFade { mode, rate } => Box::new(ImageFade::new(*mode, *rate)),
            EffectSpec::HueCycle { turns } => Box::new(HueCycle::new(*turns)),
            EffectSpec::ImageRoll {
                direction,
                steps,
                window,
            } => Box::new(ImageRoll::new(*direction, *steps, *window)),
        };
        Ok(effect)
    }
}
