//! Sixel encoder
//!
//! Output layout:
//!
//! ```text
//! ESC P q  #0;2;R;G;B #1;2;R;G;B ...  <strip> $- <strip> ... ESC \
//! ```
//!
//! Colour components are percentages. Each strip covers six pixel rows; one
//! data byte per column holds bit `i` for row offset `i`, plus 63.
//!
//! [`PackingMode::Mask`] draws every non-background pixel of a strip with
//! register 0, the dominant colour after quantization. [`PackingMode::PerColor`]
//! makes one pass per register so every colour shows.

use std::io::Write;

use super::{PackingMode, ST};
use crate::color::{quantize, ColorChannel, PaletteImage};
use crate::config::SixelConfig;
use crate::error::Result;
use crate::visual::Visual;

const SIXEL_START: &[u8] = b"\x1bPq";
const SIXEL_OFFSET: u8 = 63;
const STRIP_HEIGHT: u32 = 6;

/// Scale a channel from 0..=255 to 0..=100
fn percent(c: u8) -> u32 {
    (u32::from(c) * 100 + 127) / 255
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SixelEncoder {
    packing: PackingMode,
    max_colors: Option<usize>,
}

impl SixelEncoder {
    pub fn new(packing: PackingMode) -> Self {
        Self {
            packing,
            max_colors: None,
        }
    }

    pub fn from_config(config: &SixelConfig) -> Self {
        Self {
            packing: config.packing,
            max_colors: Some(config.max_colors),
        }
    }

    pub fn packing(&self) -> PackingMode {
        self.packing
    }

    pub fn with_packing(mut self, packing: PackingMode) -> Self {
        self.packing = packing;
        self
    }

    /// Encode a palette image to a byte vector
    pub fn encode(&self, image: &PaletteImage) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(image.indices().len() / 4 + image.palette().len() * 16 + 8);
        out.extend_from_slice(SIXEL_START);
        for (idx, color) in image.palette().iter().enumerate() {
            push_color(&mut out, idx, *color);
        }

        let strips = image.height().div_ceil(STRIP_HEIGHT);
        for strip in 0..strips {
            if strip > 0 {
                out.extend_from_slice(b"$-");
            }
            let top = strip * STRIP_HEIGHT;
            match self.packing {
                PackingMode::Mask => {
                    out.extend_from_slice(b"#0");
                    for x in 0..image.width() {
                        out.push(pack_column(image, x, top, |i| image.is_drawn(i)));
                    }
                }
                PackingMode::PerColor => {
                    for idx in colors_in_strip(image, top) {
                        out.push(b'#');
                        out.extend_from_slice(idx.to_string().as_bytes());
                        for x in 0..image.width() {
                            out.push(pack_column(image, x, top, |i| i == idx));
                        }
                        out.push(b'$');
                    }
                }
            }
        }

        out.extend_from_slice(ST);
        out
    }

    /// Encode and write to `out`
    pub fn write<W: Write>(&self, out: &mut W, image: &PaletteImage) -> Result<()> {
        out.write_all(&self.encode(image))?;
        Ok(())
    }

    /// Quantize `visual` and encode it
    pub fn encode_visual(&self, visual: &Visual) -> Vec<u8> {
        let max_colors = self.max_colors.unwrap_or(256);
        self.encode(&quantize(visual, max_colors))
    }
}

fn push_color(out: &mut Vec<u8>, idx: usize, color: ColorChannel) {
    let directive = format!(
        "#{};2;{};{};{}",
        idx,
        percent(color.r),
        percent(color.g),
        percent(color.b)
    );
    out.extend_from_slice(directive.as_bytes());
}

/// Sixel byte for column `x` of the strip starting at row `top`
fn pack_column(image: &PaletteImage, x: u32, top: u32, lit: impl Fn(u8) -> bool) -> u8 {
    let mut bits = 0u8;
    for offset in 0..STRIP_HEIGHT {
        let Some(idx) = image.index(x, top + offset) else {
            break;
        };
        if image.is_drawn(idx) && lit(idx) {
            bits |= 1 << offset;
        }
    }
    bits + SIXEL_OFFSET
}

/// Palette indices drawn in a strip, ascending
fn colors_in_strip(image: &PaletteImage, top: u32) -> Vec<u8> {
    let mut seen = [false; 256];
    let bottom = (top + STRIP_HEIGHT).min(image.height());
    for y in top..bottom {
        for x in 0..image.width() {
            if let Some(idx) = image.index(x, y) {
                seen[usize::from(idx)] = true;
            }
        }
    }
    (0..=255u8)
        .filter(|&i| seen[usize::from(i)] && image.is_drawn(i))
        .collect()
}
