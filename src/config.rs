//! Typed configuration for animation units and the scheduler.
//!
//! Every struct rejects unknown fields when deserialized, and every value is
//! checked by `validate()` before an engine object is built from it.

use crate::animation::AnimationUnit;
use crate::colors::{self, Color};
use crate::effects::EffectSpec;
use crate::error::{Error, Result};
use crate::palettes::PaletteSpec;
use crate::time::{MAX_SECONDS, secs};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Lowest and highest supported frame rates.
pub const FPS_RANGE: core::ops::RangeInclusive<u32> = 1..=200;

/// Default wait for the display to become ready.
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 5_000;

fn default_speed() -> f64 {
    1.0
}

fn default_duration() -> f64 {
    2.0
}

fn default_background() -> Color {
    colors::BLACK
}

fn default_ready_timeout_ms() -> u64 {
    DEFAULT_READY_TIMEOUT_MS
}

fn check_fps(fps: u32, owner: &str) -> Result<()> {
    if FPS_RANGE.contains(&fps) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "{owner} fps must be between 1 and 200, got {fps}"
        )))
    }
}

fn check_secs(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::configuration(format!(
            "{field} must be a non-negative number of seconds, got {value}"
        )));
    }
    if value > MAX_SECONDS {
        return Err(Error::configuration(format!(
            "{field} must be at most {MAX_SECONDS} seconds, got {value}"
        )));
    }
    Ok(())
}

/// An image placed on an animation layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSpec {
    pub path: PathBuf,
    /// `"H"`, `"V"` or `"F"`; unscaled when absent.
    #[serde(default)]
    pub scale_mode: Option<String>,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl ImageSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scale_mode: None,
            x: 0,
            y: 0,
        }
    }
}

/// Per-unit animation settings.
///
/// Times are in seconds. `fps` has no default: a unit without one is a
/// configuration error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub start_pause: f64,
    #[serde(default)]
    pub end_pause: f64,
    #[serde(default)]
    pub loops: bool,
    #[serde(default)]
    pub background: Option<Color>,
    #[serde(default)]
    pub palette: Option<PaletteSpec>,
    #[serde(default)]
    pub fg_image: Option<ImageSpec>,
    #[serde(default)]
    pub bg_image: Option<ImageSpec>,
}

impl AnimationConfig {
    /// Creates a new config builder.
    pub fn builder() -> AnimationConfigBuilder {
        AnimationConfigBuilder::new()
    }

    /// Checks every field.
    pub fn validate(&self) -> Result<()> {
        let fps = self
            .fps
            .ok_or_else(|| Error::configuration(format!("fps not set for {:?}", self.name)))?;
        check_fps(fps, "animation")?;

        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(Error::configuration(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        check_secs(self.duration, "duration")?;
        check_secs(self.start_pause, "start_pause")?;
        check_secs(self.end_pause, "end_pause")?;

        if let Some(palette) = &self.palette {
            palette.build()?;
        }
        for image in [&self.fg_image, &self.bg_image].into_iter().flatten() {
            if let Some(mode) = &image.scale_mode {
                mode.parse::<crate::assets::ScaleMode>()?;
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        secs(self.duration)
    }

    pub fn start_pause(&self) -> Duration {
        secs(self.start_pause)
    }

    pub fn end_pause(&self) -> Duration {
        secs(self.end_pause)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("animation config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`AnimationConfig`].
#[derive(Debug, Clone)]
pub struct AnimationConfigBuilder {
    config: AnimationConfig,
}

impl AnimationConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AnimationConfig {
                name: String::new(),
                fps: None,
                speed: default_speed(),
                duration: default_duration(),
                start_pause: 0.0,
                end_pause: 0.0,
                loops: false,
                background: None,
                palette: None,
                fg_image: None,
                bg_image: None,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.config.fps = Some(fps);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.config.speed = speed;
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.config.duration = seconds;
        self
    }

    pub fn start_pause(mut self, seconds: f64) -> Self {
        self.config.start_pause = seconds;
        self
    }

    pub fn end_pause(mut self, seconds: f64) -> Self {
        self.config.end_pause = seconds;
        self
    }

    pub fn loops(mut self, loops: bool) -> Self {
        self.config.loops = loops;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.config.background = Some(color);
        self
    }

    pub fn palette(mut self, palette: PaletteSpec) -> Self {
        self.config.palette = Some(palette);
        self
    }

    pub fn fg_image(mut self, image: ImageSpec) -> Self {
        self.config.fg_image = Some(image);
        self
    }

    pub fn bg_image(mut self, image: ImageSpec) -> Self {
        self.config.bg_image = Some(image);
        self
    }

    /// Builds and validates the config.
    pub fn build(self) -> Result<AnimationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for AnimationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An animation config paired with the effect it drives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    pub animation: AnimationConfig,
    pub effect: EffectSpec,
}

impl UnitSpec {
    /// Validates the config and builds the unit.
    pub fn build(&self) -> Result<AnimationUnit> {
        AnimationUnit::new(self.animation.clone(), self.effect.build()?)
    }

    /// Parses a JSON array of unit specs.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| Error::configuration(format!("unit specs: {e}")))
    }
}

/// Frame loop and display settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

impl SchedulerConfig {
    pub fn new(fps: u32, width: u32, height: u32) -> Self {
        Self {
            fps,
            width,
            height,
            background: default_background(),
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_fps(self.fps, "scheduler")?;
        if self.width == 0 || self.height == 0 {
            return Err(Error::configuration(format!(
                "display must have a non-zero area, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("scheduler config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_fps() {
        let result = AnimationConfig::builder().name("no fps").build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(AnimationConfig::builder().fps(0).build().is_err());
        assert!(AnimationConfig::builder().fps(201).build().is_err());
        assert!(AnimationConfig::builder().fps(50).speed(0.0).build().is_err());
        assert!(AnimationConfig::builder().fps(50).duration(-1.0).build().is_err());
        assert!(AnimationConfig::builder().fps(50).end_pause(f64::NAN).build().is_err());
    }

    #[test]
    fn builder_defaults() {
        let config = AnimationConfig::builder().fps(50).build().unwrap();
        assert_eq!(config.speed, 1.0);
        assert_eq!(config.duration(), Duration::from_secs(2));
        assert_eq!(config.start_pause(), Duration::ZERO);
        assert!(!config.loops);
    }

    #[test]
    fn json_rejects_out_of_range_seconds() {
        let err = AnimationConfig::from_json(r#"{"fps": 50, "duration": 1e30}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(AnimationConfig::from_json(r#"{"fps": 50, "start_pause": 2e9}"#).is_err());

        let specs = UnitSpec::list_from_json(
            r#"[{"animation": {"fps": 50, "duration": 1e30}, "effect": {"effect": "wait"}}]"#,
        )
        .unwrap();
        assert!(matches!(specs[0].build(), Err(Error::Configuration(_))));
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let err = AnimationConfig::from_json(r#"{"fps": 50, "sped": 2.0}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn json_parses_full_config() {
        let config = AnimationConfig::from_json(
            r#"{
                "name": "intro",
                "fps": 50,
                "speed": 0.5,
                "duration": 5,
                "start_pause": 1,
                "loops": true,
                "background": "102030",
                "palette": "xmas",
                "fg_image": {"path": "logo.png", "scale_mode": "F", "x": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(config.fps, Some(50));
        assert_eq!(config.start_pause(), Duration::from_secs(1));
        assert_eq!(config.background, Some(Color::from_hex("102030").unwrap()));
        assert_eq!(config.fg_image.unwrap().x, 2);
    }

    #[test]
    fn json_rejects_invalid_scale_mode() {
        let result = AnimationConfig::from_json(
            r#"{"fps": 50, "bg_image": {"path": "a.png", "scale_mode": "Q"}}"#,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn unit_spec_builds_a_unit() {
        let specs = UnitSpec::list_from_json(
            r#"[{"animation": {"name": "glow", "fps": 25, "palette": "rgb"},
                 "effect": {"effect": "pulse", "duty": 40}}]"#,
        )
        .unwrap();
        let unit = specs[0].build().unwrap();
        assert_eq!(unit.name(), "glow");
        assert_eq!(unit.fps(), 25);
    }

    #[test]
    fn unit_spec_without_fps_fails_to_build() {
        let specs =
            UnitSpec::list_from_json(r#"[{"animation": {}, "effect": {"effect": "wait"}}]"#).unwrap();
        assert!(matches!(specs[0].build(), Err(Error::Configuration(_))));
    }

    #[test]
    fn scheduler_config_validates_fps_and_area() {
        assert!(SchedulerConfig::new(0, 8, 8).validate().is_err());
        assert!(SchedulerConfig::new(201, 8, 8).validate().is_err());
        assert!(SchedulerConfig::new(60, 0, 8).validate().is_err());
        assert!(SchedulerConfig::new(60, 8, 8).validate().is_ok());
    }

    #[test]
    fn scheduler_config_json_defaults() {
        let config = SchedulerConfig::from_json(r#"{"fps": 100, "width": 64, "height": 32}"#).unwrap();
        assert_eq!(config.background, colors::BLACK);
        assert_eq!(config.ready_timeout(), Duration::from_secs(5));
        assert_eq!(config.frame_interval(), Duration::from_millis(10));
    }
}
