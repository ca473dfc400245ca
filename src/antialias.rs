//! Anti-aliasing of fractional chain coordinates.
//!
//! Chains can be described by paths whose samples fall between physical
//! pixels. The preprocessor spreads each sample over its integer neighbors and
//! records a weight in `0.0..=1.0` per emitted pixel. The weight later scales
//! the value channel of that chain slot, so sub-pixel precision is baked into
//! a fixed-resolution chain once, at construction time.

use crate::error::{Error, Result};
use core::str::FromStr;
use heapless::Vec as FixedVec;

/// An integer pixel with its share of a sample's brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPixel {
    pub x: i32,
    pub y: i32,
    pub weight: f32,
}

impl WeightedPixel {
    fn new(x: f32, y: f32, weight: f32) -> Self {
        Self {
            x: x as i32,
            y: y as i32,
            weight,
        }
    }
}

/// Anti-aliasing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntiAliasMethod {
    /// Every sample overlaps up to four pixels; weights are overlap areas.
    ///
    /// Neighbors shared by adjacent samples are emitted once per sample and
    /// not merged, so overlapping samples can over-brighten a pixel.
    Quad,

    /// Simplified Wu: two pixels per sample, split across the axis
    /// perpendicular to the direction of travel.
    Wu,
}

impl FromStr for AntiAliasMethod {
    type Err = Error;

    /// Matches on the first letter, case-insensitive: `"quad"`, `"q"`, `"Wu"`...
    fn from_str(s: &str) -> Result<Self> {
        match s.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('q') => Ok(AntiAliasMethod::Quad),
            Some('w') => Ok(AntiAliasMethod::Wu),
            _ => Err(Error::configuration(format!(
                "unrecognised anti-alias method {s:?}"
            ))),
        }
    }
}

impl AntiAliasMethod {
    /// Converts a fractional path into weighted integer pixels.
    pub fn apply(self, samples: &[(f32, f32)]) -> Vec<WeightedPixel> {
        match self {
            AntiAliasMethod::Quad => quad(samples),
            AntiAliasMethod::Wu => wu(samples),
        }
    }
}

fn quad(samples: &[(f32, f32)]) -> Vec<WeightedPixel> {
    let mut out = Vec::with_capacity(samples.len() * 4);
    for &(x, y) in samples {
        out.extend(quad_neighbors(x, y));
    }
    out
}

/// The four unit cells touched by a unit cell whose corner sits at `(x, y)`.
fn quad_neighbors(x: f32, y: f32) -> FixedVec<WeightedPixel, 4> {
    let (fx, fy) = (x.floor(), y.floor());
    let mut cells = FixedVec::new();
    for (cx, cy) in [(fx, fy), (fx + 1.0, fy), (fx, fy + 1.0), (fx + 1.0, fy + 1.0)] {
        let w = (x + 1.0).min(cx + 1.0) - x.max(cx);
        let h = (y + 1.0).min(cy + 1.0) - y.max(cy);
        // capacity is exactly four
        let _ = cells.push(WeightedPixel::new(cx, cy, (w * h).max(0.0)));
    }
    cells
}

fn wu(samples: &[(f32, f32)]) -> Vec<WeightedPixel> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    let mut last: Option<(f32, f32)> = None;

    for &(x, y) in samples {
        let pair = match last {
            // no direction yet: treat as a horizontal step heading down/right
            None => split_vertically(x, y, 1.0),
            Some((lx, ly)) => {
                let (dx, dy) = (x - lx, y - ly);
                if dy.abs() >= dx.abs() {
                    split_horizontally(x, y, dx)
                } else {
                    split_vertically(x, y, dy)
                }
            }
        };
        out.extend(pair);
        last = Some((x, y));
    }
    out
}

/// Horizontal travel: the fractional Y remainder is shared between the
/// `floor(y)` pixel and the pixel above or below it, picked by `trend`.
fn split_vertically(x: f32, y: f32, trend: f32) -> FixedVec<WeightedPixel, 2> {
    let (fx, fy) = (x.floor(), y.floor());
    let frac = y - fy;
    let neighbor = if trend >= 0.0 { fy + 1.0 } else { fy - 1.0 };

    let mut pair = FixedVec::new();
    let _ = pair.push(WeightedPixel::new(fx, fy, 1.0 - frac));
    let _ = pair.push(WeightedPixel::new(fx, neighbor, frac));
    pair
}

/// Vertical travel: the fractional X remainder is shared between the
/// `floor(x)` pixel and its left or right neighbor, picked by `trend`.
fn split_horizontally(x: f32, y: f32, trend: f32) -> FixedVec<WeightedPixel, 2> {
    let (fx, fy) = (x.floor(), y.floor());
    let frac = x - fx;
    let neighbor = if trend >= 0.0 { fx + 1.0 } else { fx - 1.0 };

    let mut pair = FixedVec::new();
    let _ = pair.push(WeightedPixel::new(fx, fy, 1.0 - frac));
    let _ = pair.push(WeightedPixel::new(neighbor, fy, frac));
    pair
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn weight_sum(pixels: &[WeightedPixel]) -> f32 {
        pixels.iter().map(|p| p.weight).sum()
    }

    #[test]
    fn method_names_parse_by_first_letter() {
        assert_eq!("quad".parse::<AntiAliasMethod>().unwrap(), AntiAliasMethod::Quad);
        assert_eq!("Q".parse::<AntiAliasMethod>().unwrap(), AntiAliasMethod::Quad);
        assert_eq!("WU".parse::<AntiAliasMethod>().unwrap(), AntiAliasMethod::Wu);
        assert!(matches!(
            "bilinear".parse::<AntiAliasMethod>(),
            Err(Error::Configuration(_))
        ));
        assert!("".parse::<AntiAliasMethod>().is_err());
    }

    #[test]
    fn quad_weights_sum_to_one() {
        for &(x, y) in &[(1.5, 1.7), (0.0, 0.0), (3.25, 9.9), (-2.4, 0.1)] {
            let pixels = AntiAliasMethod::Quad.apply(&[(x, y)]);
            assert_eq!(pixels.len(), 4);
            assert!((weight_sum(&pixels) - 1.0).abs() < EPSILON, "sample ({x}, {y})");
        }
    }

    #[test]
    fn quad_splits_half_pixel_evenly() {
        let pixels = AntiAliasMethod::Quad.apply(&[(1.5, 2.0)]);
        assert_eq!((pixels[0].x, pixels[0].y), (1, 2));
        assert!((pixels[0].weight - 0.5).abs() < EPSILON);
        assert_eq!((pixels[1].x, pixels[1].y), (2, 2));
        assert!((pixels[1].weight - 0.5).abs() < EPSILON);
        assert!(pixels[2].weight.abs() < EPSILON);
        assert!(pixels[3].weight.abs() < EPSILON);
    }

    #[test]
    fn quad_does_not_merge_shared_neighbors() {
        let pixels = AntiAliasMethod::Quad.apply(&[(0.5, 0.0), (1.0, 0.0)]);
        assert_eq!(pixels.len(), 8);
    }

    #[test]
    fn wu_emits_two_pixels_per_sample_summing_to_one() {
        let path = [(0.0, 0.3), (1.0, 0.6), (1.4, 2.0), (1.9, 3.5), (0.2, 3.8)];
        let pixels = AntiAliasMethod::Wu.apply(&path);
        assert_eq!(pixels.len(), path.len() * 2);
        for pair in pixels.chunks(2) {
            assert!((weight_sum(pair) - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn wu_horizontal_step_splits_vertically() {
        let pixels = AntiAliasMethod::Wu.apply(&[(0.0, 4.0), (1.0, 4.25)]);
        let step = &pixels[2..];
        assert_eq!((step[0].x, step[0].y), (1, 4));
        assert!((step[0].weight - 0.75).abs() < EPSILON);
        assert_eq!((step[1].x, step[1].y), (1, 5));
        assert!((step[1].weight - 0.25).abs() < EPSILON);
    }

    #[test]
    fn wu_vertical_step_splits_horizontally_by_trend() {
        let pixels = AntiAliasMethod::Wu.apply(&[(5.0, 0.0), (4.75, 1.0)]);
        let step = &pixels[2..];
        assert_eq!((step[0].x, step[0].y), (4, 1));
        assert!((step[0].weight - 0.25).abs() < EPSILON);
        // moving left, so the remainder goes to the left neighbor
        assert_eq!((step[1].x, step[1].y), (3, 1));
        assert!((step[1].weight - 0.75).abs() < EPSILON);
    }
}
