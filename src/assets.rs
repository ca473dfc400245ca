//! Image assets used as layer backgrounds and foregrounds.

use crate::error::{Error, Result};
use core::str::FromStr;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::path::Path;

/// How an image is scaled onto the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Keep the aspect ratio and fit inside the display (`"H"` or `"V"`).
    Fit,
    /// Stretch to cover the display exactly (`"F"`).
    Fill,
}

impl FromStr for ScaleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('H') | Some('V') => Ok(ScaleMode::Fit),
            Some('F') => Ok(ScaleMode::Fill),
            _ => Err(Error::configuration(format!(
                "image scale mode should be V(ertical), H(orizontal) or F(ill), got {s:?}"
            ))),
        }
    }
}

/// A decoded RGBA image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    image: RgbaImage,
}

impl ImageAsset {
    /// Loads and decodes an image file. Images without an alpha channel are
    /// made fully opaque.
    ///
    /// # Errors
    /// `Error::Resource` if the file cannot be read or decodes to no pixels.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .map_err(|e| Error::resource(format!("load image {}: {e}", path.display())))?;
        Self::from_image(decoded.to_rgba8())
            .map_err(|_| Error::resource(format!("image {} has no pixel data", path.display())))
    }

    /// Wraps an in-memory image.
    pub fn from_image(image: RgbaImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::resource("image has no pixel data"));
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Scales to fit inside `width` x `height`, keeping the aspect ratio.
    pub fn resize_to_fit(&self, width: u32, height: u32) -> Self {
        let sx = f64::from(width) / f64::from(self.width());
        let sy = f64::from(height) / f64::from(self.height());
        self.resized(sx.min(sy))
    }

    /// Stretches to exactly `width` x `height`.
    pub fn resize_to_fill(&self, width: u32, height: u32) -> Self {
        Self {
            image: imageops::resize(&self.image, width.max(1), height.max(1), FilterType::Triangle),
        }
    }

    /// Scales both dimensions by `factor`.
    ///
    /// # Errors
    /// `Error::Configuration` if `factor` is not a positive number.
    pub fn resize_by_factor(&self, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::configuration(format!(
                "resize factor must be positive, got {factor}"
            )));
        }
        Ok(self.resized(factor))
    }

    /// Applies a scale mode against the display size.
    pub fn apply_scale_mode(&self, mode: ScaleMode, width: u32, height: u32) -> Self {
        match mode {
            ScaleMode::Fit => self.resize_to_fit(width, height),
            ScaleMode::Fill => self.resize_to_fill(width, height),
        }
    }

    fn resized(&self, factor: f64) -> Self {
        let w = ((f64::from(self.width()) * factor).round() as u32).max(1);
        let h = ((f64::from(self.height()) * factor).round() as u32).max(1);
        Self {
            image: imageops::resize(&self.image, w, h, FilterType::Triangle),
        }
    }
}
