//! Pixel grids shared by layers, frames and assets.
//!
//! Every grid is straight (non-premultiplied) RGBA8 backed by
//! [`image::RgbaImage`].

use image::{Rgba, RgbaImage};

/// The composited frame submitted to a display.
pub type FrameBuffer = RgbaImage;

/// One animation unit's private, initially transparent, drawing surface.
pub type LayerBuffer = RgbaImage;

/// Allocates a fully transparent grid.
pub fn transparent(width: u32, height: u32) -> RgbaImage {
    RgbaImage::new(width, height)
}

/// Fills the whole grid with one pixel value.
pub fn fill(grid: &mut RgbaImage, color: Rgba<u8>) {
    for px in grid.pixels_mut() {
        *px = color;
    }
}

/// Makes every pixel transparent black.
pub fn clear(grid: &mut RgbaImage) {
    fill(grid, Rgba([0, 0, 0, 0]));
}

/// Writes a pixel at signed coordinates, ignoring anything off the grid.
///
/// Returns whether the pixel landed on the grid.
pub fn put_pixel_clipped(grid: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) -> bool {
    if x < 0 || y < 0 || x as u32 >= grid.width() || y as u32 >= grid.height() {
        return false;
    }
    grid.put_pixel(x as u32, y as u32, color);
    true
}

/// Counts pixels with non-zero alpha.
pub fn count_visible(grid: &RgbaImage) -> usize {
    grid.pixels().filter(|px| px.0[3] > 0).count()
}

/// Rotates the pixels inside `[x, y, width, height]` by `(dx, dy)`, wrapping
/// at the window's edges. The window is clipped to the grid.
pub fn roll_region(grid: &mut RgbaImage, window: [u32; 4], dx: i64, dy: i64) {
    let [x, y, width, height] = window;
    let width = width.min(grid.width().saturating_sub(x));
    let height = height.min(grid.height().saturating_sub(y));
    if width == 0 || height == 0 {
        return;
    }

    let source = image::imageops::crop_imm(&*grid, x, y, width, height).to_image();
    let (w, h) = (i64::from(width), i64::from(height));
    for row in 0..height {
        for col in 0..width {
            let src_col = (i64::from(col) - dx).rem_euclid(w) as u32;
            let src_row = (i64::from(row) - dy).rem_euclid(h) as u32;
            grid.put_pixel(x + col, y + row, *source.get_pixel(src_col, src_row));
        }
    }
}
