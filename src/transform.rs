//! Pixel buffer transforms: scale, rotate and flip
//!
//! All transforms take the input by reference and return a new buffer.
//! Buffers are validated against their declared dimensions before any work.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::visual::{check_len, PixelFormat, Visual};

/// Axis to mirror across
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
    Both,
}

/// Nearest-neighbor resample from `src_w`x`src_h` to `dst_w`x`dst_h`
///
/// Destination pixel (x, y) samples source pixel
/// (x * src_w / dst_w, y * src_h / dst_h), rounded down.
pub fn scale(
    buffer: &[u8],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    check_len(src_w, src_h, format, buffer.len())?;
    let bpp = format.bytes_per_pixel();
    let mut out = Vec::with_capacity(dst_w as usize * dst_h as usize * bpp);
    if src_w == 0 || src_h == 0 {
        out.resize(dst_w as usize * dst_h as usize * bpp, 0);
        return Ok(out);
    }

    for y in 0..dst_h as u64 {
        let sy = (y * u64::from(src_h) / u64::from(dst_h)) as usize;
        for x in 0..dst_w as u64 {
            let sx = (x * u64::from(src_w) / u64::from(dst_w)) as usize;
            let idx = (sy * src_w as usize + sx) * bpp;
            out.extend_from_slice(&buffer[idx..idx + bpp]);
        }
    }
    Ok(out)
}

/// Rotate 90 degrees clockwise; the result is `h`x`w`
pub fn rotate90(buffer: &[u8], w: u32, h: u32, format: PixelFormat) -> Result<Vec<u8>> {
    check_len(w, h, format, buffer.len())?;
    let bpp = format.bytes_per_pixel();
    let (w, h) = (w as usize, h as usize);
    let mut out = Vec::with_capacity(buffer.len());

    // Destination row `y` is source column `y` read bottom to top.
    for y in 0..w {
        for x in 0..h {
            let idx = ((h - 1 - x) * w + y) * bpp;
            out.extend_from_slice(&buffer[idx..idx + bpp]);
        }
    }
    Ok(out)
}

/// Number of clockwise quarter turns for an angle in degrees
///
/// Fractions of a quarter turn are dropped: 100 degrees is one turn,
/// -90 degrees is three.
pub fn quarter_turns(angle: f64) -> u32 {
    if !angle.is_finite() {
        return 0;
    }
    ((angle / 90.0).floor() as i64).rem_euclid(4) as u32
}

/// Rotate clockwise by `angle` degrees, reduced to whole quarter turns
///
/// Returns the new buffer with its width and height.
pub fn rotate(
    buffer: &[u8],
    w: u32,
    h: u32,
    angle: f64,
    format: PixelFormat,
) -> Result<(Vec<u8>, u32, u32)> {
    check_len(w, h, format, buffer.len())?;
    let mut out = buffer.to_vec();
    let (mut w, mut h) = (w, h);
    for _ in 0..quarter_turns(angle) {
        out = rotate90(&out, w, h, format)?;
        std::mem::swap(&mut w, &mut h);
    }
    Ok((out, w, h))
}

/// Mirror across one or both axes; dimensions are unchanged
pub fn flip(
    buffer: &[u8],
    w: u32,
    h: u32,
    direction: FlipDirection,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    check_len(w, h, format, buffer.len())?;
    let bpp = format.bytes_per_pixel();
    let (w, h) = (w as usize, h as usize);
    let (mirror_x, mirror_y) = match direction {
        FlipDirection::Horizontal => (true, false),
        FlipDirection::Vertical => (false, true),
        FlipDirection::Both => (true, true),
    };

    let mut out = Vec::with_capacity(buffer.len());
    for y in 0..h {
        let sy = if mirror_y { h - 1 - y } else { y };
        for x in 0..w {
            let sx = if mirror_x { w - 1 - x } else { x };
            let idx = (sy * w + sx) * bpp;
            out.extend_from_slice(&buffer[idx..idx + bpp]);
        }
    }
    Ok(out)
}

impl Visual {
    /// Nearest-neighbor resample to a new size
    pub fn scaled(&self, width: u32, height: u32) -> Result<Visual> {
        let data = scale(
            self.data(),
            self.width(),
            self.height(),
            width,
            height,
            self.format(),
        )?;
        Visual::new(width, height, self.format(), data)
    }

    /// Rotate clockwise by whole quarter turns of `angle` degrees
    pub fn rotated(&self, angle: f64) -> Result<Visual> {
        let (data, w, h) = rotate(self.data(), self.width(), self.height(), angle, self.format())?;
        Visual::new(w, h, self.format(), data)
    }

    pub fn flipped(&self, direction: FlipDirection) -> Result<Visual> {
        let data = flip(self.data(), self.width(), self.height(), direction, self.format())?;
        Visual::new(self.width(), self.height(), self.format(), data)
    }
}
