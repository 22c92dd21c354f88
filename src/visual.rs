//! Raw pixel buffers
//!
//! A [`Visual`] is an already-decoded image: width, height, pixel format and
//! the bytes. Decoding PNG/JPEG happens upstream.

use serde::{Deserialize, Serialize};

use crate::color::ColorChannel;
use crate::error::{GraphicsError, Result};

/// Byte layout of a single pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba,
    Rgb,
    Bgra,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
            PixelFormat::Rgb => 3,
        }
    }

    /// Decode one pixel from a slice of exactly `bytes_per_pixel` bytes
    pub fn decode(self, px: &[u8]) -> ColorChannel {
        match self {
            PixelFormat::Rgba => ColorChannel::new(px[0], px[1], px[2], px[3]),
            PixelFormat::Rgb => ColorChannel::rgb(px[0], px[1], px[2]),
            PixelFormat::Bgra => ColorChannel::new(px[2], px[1], px[0], px[3]),
        }
    }
}

/// Check that `len` bytes hold exactly `width * height` pixels of `format`
pub fn check_len(width: u32, height: u32, format: PixelFormat, len: usize) -> Result<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(format.bytes_per_pixel()));
    match expected {
        Some(expected) if expected == len => Ok(()),
        expected => Err(GraphicsError::InvalidDimension {
            width,
            height,
            format,
            expected: expected.unwrap_or(usize::MAX),
            actual: len,
        }),
    }
}

/// A decoded pixel buffer with its dimensions and format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visual {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Visual {
    /// Wrap a buffer, rejecting it if its length does not match the dimensions
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        check_len(width, height, format, data.len())?;
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// A single-color RGBA visual
    pub fn solid(width: u32, height: u32, color: ColorChannel) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        Self {
            width,
            height,
            format: PixelFormat::Rgba,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at (x, y); transparent black outside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> ColorChannel {
        if x >= self.width || y >= self.height {
            return ColorChannel::TRANSPARENT;
        }
        let bpp = self.format.bytes_per_pixel();
        let idx = (y as usize * self.width as usize + x as usize) * bpp;
        self.format.decode(&self.data[idx..idx + bpp])
    }

    /// Iterate over all pixels in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = ColorChannel> + '_ {
        let format = self.format;
        self.data
            .chunks_exact(format.bytes_per_pixel())
            .map(move |px| format.decode(px))
    }

    /// Convert to RGBA, copying only when the format differs
    pub fn to_rgba(&self) -> Visual {
        if self.format == PixelFormat::Rgba {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for c in self.pixels() {
            data.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        Visual {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba,
            data,
        }
    }
}
