//! Palette reduction for the sixel encoder
//!
//! Popularity quantization: colors are bucketed at 5 bits per channel, the
//! most frequent buckets become palette entries (their average color), and
//! every pixel is mapped to its nearest entry. Entry 0 is the dominant
//! color, so a single-register sixel strip draws in it. Mostly-transparent
//! pixels map to a background entry appended after the drawable colors and
//! are never drawn.

use std::collections::HashMap;

use super::{average, ColorChannel};
use crate::error::{GraphicsError, Result};
use crate::visual::{PixelFormat, Visual};

/// Pixels below this alpha are treated as background
const ALPHA_CUTOFF: u8 = 128;

/// An image stored as per-pixel indices into a palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteImage {
    width: u32,
    height: u32,
    indices: Vec<u8>,
    palette: Vec<ColorChannel>,
    background: Option<u8>,
}

impl PaletteImage {
    /// Build a palette image, checking the index buffer length
    ///
    /// Indices that point past the end of the palette are treated as
    /// background by the encoders.
    pub fn new(
        width: u32,
        height: u32,
        indices: Vec<u8>,
        palette: Vec<ColorChannel>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(GraphicsError::InvalidDimension {
                width,
                height,
                format: PixelFormat::Rgb,
                expected,
                actual: indices.len(),
            });
        }
        Ok(Self {
            width,
            height,
            indices,
            palette,
            background: None,
        })
    }

    /// Mark palette entry `index` as the never-drawn background
    pub fn with_background(mut self, index: u8) -> Self {
        self.background = Some(index);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn palette(&self) -> &[ColorChannel] {
        &self.palette
    }

    pub fn background(&self) -> Option<u8> {
        self.background
    }

    /// Palette index at (x, y); None outside the image
    pub fn index(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Whether `index` names a palette entry that gets drawn
    pub fn is_drawn(&self, index: u8) -> bool {
        usize::from(index) < self.palette.len() && Some(index) != self.background
    }
}

fn bucket_key(c: ColorChannel) -> u16 {
    (u16::from(c.r >> 3) << 10) | (u16::from(c.g >> 3) << 5) | u16::from(c.b >> 3)
}

fn distance_sq(a: ColorChannel, b: ColorChannel) -> u32 {
    let d = |x: u8, y: u8| {
        let d = i32::from(x) - i32::from(y);
        (d * d) as u32
    };
    d(a.r, b.r) + d(a.g, b.g) + d(a.b, b.b)
}

/// Reduce `visual` to at most `max_colors` palette entries (background included)
pub fn quantize(visual: &Visual, max_colors: usize) -> PaletteImage {
    let max_colors = max_colors.clamp(2, 256);

    struct Bucket {
        first_seen: usize,
        members: Vec<ColorChannel>,
    }

    let mut has_background = false;
    let mut buckets: HashMap<u16, Bucket> = HashMap::new();
    for (i, c) in visual.pixels().enumerate() {
        if c.a < ALPHA_CUTOFF {
            has_background = true;
            continue;
        }
        buckets
            .entry(bucket_key(c))
            .or_insert_with(|| Bucket {
                first_seen: i,
                members: Vec::new(),
            })
            .members
            .push(c.with_alpha(255));
    }

    let mut ranked: Vec<Bucket> = buckets.into_values().collect();
    ranked.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then(a.first_seen.cmp(&b.first_seen))
    });
    ranked.truncate(max_colors - usize::from(has_background));

    let mut palette: Vec<ColorChannel> = ranked
        .iter()
        .map(|b| average(&b.members).with_alpha(255))
        .collect();
    let drawable = palette.len();
    let background = if has_background {
        palette.push(ColorChannel::TRANSPARENT);
        Some(drawable as u8)
    } else {
        None
    };

    let mut cache: HashMap<ColorChannel, u8> = HashMap::new();
    let indices = visual
        .pixels()
        .map(|c| match background {
            Some(bg) if c.a < ALPHA_CUTOFF => bg,
            _ => {
                let c = c.with_alpha(255);
                *cache.entry(c).or_insert_with(|| {
                    palette[..drawable]
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, p)| distance_sq(c, **p))
                        .map_or(0, |(i, _)| i as u8)
                })
            }
        })
        .collect();

    PaletteImage {
        width: visual.width(),
        height: visual.height(),
        indices,
        palette,
        background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(pixels: &[ColorChannel], width: u32) -> Visual {
        let data = pixels.iter().flat_map(|c| [c.r, c.g, c.b, c.a]).collect();
        Visual::new(width, pixels.len() as u32 / width, PixelFormat::Rgba, data).unwrap()
    }

    #[test]
    fn test_quantize_two_colors() {
        let red = ColorChannel::rgb(255, 0, 0);
        let blue = ColorChannel::rgb(0, 0, 255);
        let img = rgba(&[red, red, blue, red], 2);
        let q = quantize(&img, 16);
        assert_eq!(q.palette(), &[red, blue]);
        assert_eq!(q.indices(), &[0, 0, 1, 0]);
        assert_eq!(q.background(), None);
    }

    #[test]
    fn test_quantize_transparent_is_background() {
        let img = rgba(&[ColorChannel::TRANSPARENT, ColorChannel::WHITE], 2);
        let q = quantize(&img, 4);
        assert_eq!(q.palette(), &[ColorChannel::WHITE, ColorChannel::TRANSPARENT]);
        assert_eq!(q.background(), Some(1));
        assert_eq!(q.indices(), &[1, 0]);
        assert!(q.is_drawn(0));
        assert!(!q.is_drawn(1));
    }

    #[test]
    fn test_quantize_respects_limit() {
        let pixels: Vec<ColorChannel> = (0..16u8)
            .map(|i| ColorChannel::rgb(i * 16, 255 - i * 16, 0))
            .collect();
        let img = rgba(&pixels, 4);
        let q = quantize(&img, 4);
        assert_eq!(q.palette().len(), 4);
        assert!(q.indices().iter().all(|&i| i < 4));

        let mut with_hole = pixels.clone();
        with_hole[0] = ColorChannel::TRANSPARENT;
        let q = quantize(&rgba(&with_hole, 4), 4);
        assert_eq!(q.palette().len(), 4);
        assert_eq!(q.background(), Some(3));
    }

    #[test]
    fn test_quantize_fully_transparent() {
        let q = quantize(&rgba(&[ColorChannel::TRANSPARENT; 4], 2), 16);
        assert_eq!(q.palette(), &[ColorChannel::TRANSPARENT]);
        assert_eq!(q.background(), Some(0));
        assert!(q.indices().iter().all(|&i| !q.is_drawn(i)));
    }

    #[test]
    fn test_palette_image_length_check() {
        assert!(PaletteImage::new(2, 2, vec![0; 3], vec![ColorChannel::BLACK]).is_err());
        assert!(PaletteImage::new(2, 2, vec![0; 4], vec![ColorChannel::BLACK]).is_ok());
    }

    #[test]
    fn test_index_out_of_bounds_is_none() {
        let image = PaletteImage::new(2, 1, vec![0, 0], vec![ColorChannel::BLACK]).unwrap();
        assert_eq!(image.index(1, 0), Some(0));
        assert_eq!(image.index(2, 0), None);
        assert_eq!(image.index(0, 1), None);
    }
}
