//! Alpha-over compositing of layers onto frames.
//!
//! Layers are merged bottom (earliest registered) to top (latest registered)
//! with the straight-alpha "over" operator:
//!
//! ```text
//! out_a = fg_a + bg_a * (1 - fg_a)
//! out_c = (fg_c * fg_a + bg_c * bg_a * (1 - fg_a)) / out_a      (0 when out_a == 0)
//! ```
//!
//! Shape mismatches and empty regions are routine at buffer edges, so the
//! functions here skip them silently instead of failing.

use crate::chain::PixelChain;
use crate::frame::{FrameBuffer, put_pixel_clipped};
use image::{Rgba, RgbaImage};

/// Blends one foreground pixel over one background pixel.
pub fn blend_pixel(fg: Rgba<u8>, bg: Rgba<u8>) -> Rgba<u8> {
    let fa = f32::from(fg.0[3]) / 255.0;
    let ba = f32::from(bg.0[3]) / 255.0;
    let out_a = fa + ba * (1.0 - fa);

    let mut out = [0u8; 4];
    if out_a > 0.0 {
        for i in 0..3 {
            let fc = f32::from(fg.0[i]) / 255.0;
            let bc = f32::from(bg.0[i]) / 255.0;
            let c = (fc * fa + bc * ba * (1.0 - fa)) / out_a;
            out[i] = (c * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Blends `fg` over `bg` into a new grid.
///
/// Returns `None` when the shapes differ or either grid has zero area; neither
/// input is modified.
pub fn blend(fg: &RgbaImage, bg: &RgbaImage) -> Option<RgbaImage> {
    if fg.dimensions() != bg.dimensions() || fg.width() == 0 || fg.height() == 0 {
        return None;
    }
    let mut out = bg.clone();
    for (o, f) in out.pixels_mut().zip(fg.pixels()) {
        *o = blend_pixel(*f, *o);
    }
    Some(out)
}

/// Merges a layer over a frame in place.
///
/// Returns `false` (and leaves the frame untouched) when shapes differ.
pub fn merge_onto(frame: &mut FrameBuffer, layer: &RgbaImage) -> bool {
    if frame.dimensions() != layer.dimensions() || layer.width() == 0 || layer.height() == 0 {
        return false;
    }
    for (d, s) in frame.pixels_mut().zip(layer.pixels()) {
        if s.0[3] == 0 {
            continue;
        }
        *d = blend_pixel(*s, *d);
    }
    true
}

/// Pastes `fg` onto `bg` with its top-left corner at `(x, y)`, which may be
/// negative or run past the far edges.
///
/// Only the intersecting rectangle is blended. Returns the width of that
/// rectangle, which is zero when nothing overlaps.
pub fn paste_with_alpha_at(bg: &mut RgbaImage, x: i32, y: i32, fg: &RgbaImage) -> u32 {
    let Some(region) = overlap(bg.dimensions(), x, y, fg.dimensions()) else {
        return 0;
    };

    for row in 0..region.height {
        for col in 0..region.width {
            let f = *fg.get_pixel(region.src_x + col, region.src_y + row);
            let (dx, dy) = (region.dst_x + col, region.dst_y + row);
            let b = *bg.get_pixel(dx, dy);
            bg.put_pixel(dx, dy, blend_pixel(f, b));
        }
    }
    region.width
}

/// Writes chain pixels straight onto a layer, replacing what is there.
///
/// Destination alpha is ignored so nothing from a previous frame can show
/// through a transparent chain pixel. Returns how many pixels were on the layer.
pub fn draw_chain(layer: &mut RgbaImage, chain: &PixelChain) -> usize {
    chain
        .all_pixels()
        .into_iter()
        .filter(|p| put_pixel_clipped(layer, p.x, p.y, p.color))
        .count()
}

/// Intersection of a `fg` placed at `(x, y)` with `bg` at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overlap {
    src_x: u32,
    src_y: u32,
    dst_x: u32,
    dst_y: u32,
    width: u32,
    height: u32,
}

fn overlap(bg: (u32, u32), x: i32, y: i32, fg: (u32, u32)) -> Option<Overlap> {
    let (bw, bh) = (i64::from(bg.0), i64::from(bg.1));
    let (fw, fh) = (i64::from(fg.0), i64::from(fg.1));
    let (x, y) = (i64::from(x), i64::from(y));

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + fw).min(bw);
    let y1 = (y + fh).min(bh);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(Overlap {
        src_x: (x0 - x) as u32,
        src_y: (y0 - y) as u32,
        dst_x: x0 as u32,
        dst_y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}
