//! Color engine
//!
//! Pure value operations on RGBA colors:
//! - Alpha-over blending
//! - Linear gradients
//! - sRGB relative luminance and WCAG contrast ratios
//! - Hex formatting and parsing
//!
//! Nothing in here performs I/O or keeps hidden state. Every numeric result is
//! rounded to the nearest integer channel value and clamped to 0-255.

mod palette;
mod quantize;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use palette::{index_to_rgb, to_ansi16, to_ansi256};
pub use quantize::{quantize, PaletteImage};

/// A color with four 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ColorChannel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ColorChannel {
    pub const BLACK: ColorChannel = ColorChannel::rgb(0, 0, 0);
    pub const WHITE: ColorChannel = ColorChannel::rgb(255, 255, 255);
    pub const TRANSPARENT: ColorChannel = ColorChannel::new(0, 0, 0, 0);

    /// Create a color from all four channels
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Build a color from floating point channel values, rounding and clamping each
    pub fn from_f64(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: clamp_channel(r),
            g: clamp_channel(g),
            b: clamp_channel(b),
            a: clamp_channel(a),
        }
    }

    /// Same color with a different alpha
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// RGB components as a tuple
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Format as `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Format as `#rrggbbaa`
    pub fn to_display_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the leading `#` is optional)
    pub fn parse_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if !s.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        match s.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl fmt::Display for ColorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

fn clamp_channel(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Alpha-over composite of `fg` onto `bg`
///
/// Each RGB channel is `fg * α + bg * (1 - α)` with `α = fg.a / 255`.
/// The result alpha is the larger of the two input alphas.
pub fn blend(fg: ColorChannel, bg: ColorChannel) -> ColorChannel {
    let alpha = f64::from(fg.a) / 255.0;
    let mix = |f: u8, b: u8| f64::from(f) * alpha + f64::from(b) * (1.0 - alpha);
    ColorChannel {
        r: clamp_channel(mix(fg.r, bg.r)),
        g: clamp_channel(mix(fg.g, bg.g)),
        b: clamp_channel(mix(fg.b, bg.b)),
        a: fg.a.max(bg.a),
    }
}

/// Linear interpolation across all four channels, `t` in 0.0..=1.0
pub fn lerp(start: ColorChannel, end: ColorChannel, t: f64) -> ColorChannel {
    let t = t.clamp(0.0, 1.0);
    let mix = |s: u8, e: u8| f64::from(s) + (f64::from(e) - f64::from(s)) * t;
    ColorChannel::from_f64(
        mix(start.r, end.r),
        mix(start.g, end.g),
        mix(start.b, end.b),
        mix(start.a, end.a),
    )
}

/// `steps` evenly spaced colors from `start` to `end`, both inclusive
pub fn gradient(start: ColorChannel, end: ColorChannel, steps: usize) -> Vec<ColorChannel> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (steps - 1) as f64;
            (0..steps)
                .map(|i| lerp(start, end, i as f64 / last))
                .collect()
        }
    }
}

/// Average of a set of colors; transparent black for an empty set
pub fn average(colors: &[ColorChannel]) -> ColorChannel {
    if colors.is_empty() {
        return ColorChannel::TRANSPARENT;
    }
    let n = colors.len() as f64;
    let sum = colors.iter().fold([0u32; 4], |acc, c| {
        [
            acc[0] + u32::from(c.r),
            acc[1] + u32::from(c.g),
            acc[2] + u32::from(c.b),
            acc[3] + u32::from(c.a),
        ]
    });
    ColorChannel::from_f64(
        f64::from(sum[0]) / n,
        f64::from(sum[1]) / n,
        f64::from(sum[2]) / n,
        f64::from(sum[3]) / n,
    )
}

/// sRGB relative luminance (0.0 for black, 1.0 for white)
pub fn luminance(color: ColorChannel) -> f64 {
    fn linear(c: u8) -> f64 {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * linear(color.r) + 0.7152 * linear(color.g) + 0.0722 * linear(color.b)
}

/// WCAG contrast ratio, between 1.0 and 21.0
pub fn contrast_ratio(a: ColorChannel, b: ColorChannel) -> f64 {
    let la = luminance(a);
    let lb = luminance(b);
    (la.max(lb) + 0.05) / (la.min(lb) + 0.05)
}

/// WCAG conformance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessibilityLevel {
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "AAA")]
    Aaa,
}

impl AccessibilityLevel {
    /// Minimum contrast ratio for normal text
    pub fn threshold(self) -> f64 {
        match self {
            AccessibilityLevel::Aa => 4.5,
            AccessibilityLevel::Aaa => 7.0,
        }
    }
}

impl FromStr for AccessibilityLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AA" => Ok(AccessibilityLevel::Aa),
            "AAA" => Ok(AccessibilityLevel::Aaa),
            other => Err(format!("unknown accessibility level '{}'", other)),
        }
    }
}

/// Whether `a` on `b` meets the contrast ratio required by `level`
pub fn meets_accessibility_threshold(
    a: ColorChannel,
    b: ColorChannel,
    level: AccessibilityLevel,
) -> bool {
    contrast_ratio(a, b) >= level.threshold()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_color() -> impl Strategy<Value = ColorChannel> {
        any::<[u8; 4]>().prop_map(|[r, g, b, a]| ColorChannel::new(r, g, b, a))
    }

    #[test]
    fn test_blend_half_alpha() {
        let fg = ColorChannel::new(255, 0, 0, 128);
        let bg = ColorChannel::rgb(0, 0, 255);
        let out = blend(fg, bg);
        assert_eq!(out.r, 128);
        assert_eq!(out.g, 0);
        assert_eq!(out.b, 127);
        assert_eq!(out.a, 255);
    }

    #[test]
    fn test_gradient_edges() {
        let start = ColorChannel::BLACK;
        let end = ColorChannel::WHITE;
        assert!(gradient(start, end, 0).is_empty());
        assert_eq!(gradient(start, end, 1), vec![start]);

        let g = gradient(start, end, 3);
        assert_eq!(g, vec![start, ColorChannel::rgb(128, 128, 128), end]);
    }

    #[test]
    fn test_luminance_extremes() {
        assert_eq!(luminance(ColorChannel::BLACK), 0.0);
        assert!((luminance(ColorChannel::WHITE) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_contrast_white_black() {
        let ratio = contrast_ratio(ColorChannel::WHITE, ColorChannel::BLACK);
        assert!((ratio - 21.0).abs() < 1e-6);
        assert!(meets_accessibility_threshold(
            ColorChannel::WHITE,
            ColorChannel::BLACK,
            AccessibilityLevel::Aaa
        ));
    }

    #[test]
    fn test_contrast_same_color() {
        let gray = ColorChannel::rgb(119, 119, 119);
        assert!((contrast_ratio(gray, gray) - 1.0).abs() < 1e-9);
        assert!(!meets_accessibility_threshold(gray, gray, AccessibilityLevel::Aa));
    }

    #[test]
    fn test_accessibility_level_parse() {
        assert_eq!("aa".parse::<AccessibilityLevel>(), Ok(AccessibilityLevel::Aa));
        assert_eq!("AAA".parse::<AccessibilityLevel>(), Ok(AccessibilityLevel::Aaa));
        assert!("A".parse::<AccessibilityLevel>().is_err());
    }

    #[test]
    fn test_hex_formatting() {
        let c = ColorChannel::new(10, 171, 255, 1);
        assert_eq!(c.to_hex(), "#0aabff");
        assert_eq!(c.to_display_string(), "#0aabff01");
        assert_eq!(c.to_string(), "#0aabff01");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(
            ColorChannel::parse_hex("#ff8000"),
            Some(ColorChannel::rgb(255, 128, 0))
        );
        assert_eq!(
            ColorChannel::parse_hex("ff800080"),
            Some(ColorChannel::new(255, 128, 0, 128))
        );
        assert_eq!(ColorChannel::parse_hex("#fff"), None);
        assert_eq!(ColorChannel::parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_from_f64_clamps() {
        let c = ColorChannel::from_f64(-4.0, 300.0, 127.5, f64::NAN);
        assert_eq!(c, ColorChannel::new(0, 255, 128, 0));
    }

    #[test]
    fn test_average() {
        let avg = average(&[ColorChannel::BLACK, ColorChannel::WHITE]);
        assert_eq!(avg, ColorChannel::rgb(128, 128, 128));
        assert_eq!(average(&[]), ColorChannel::TRANSPARENT);
    }

    proptest! {
        #[test]
        fn prop_opaque_foreground_occludes(fg in any_color(), bg in any_color()) {
            let fg = fg.with_alpha(255);
            prop_assert_eq!(blend(fg, bg), fg);
        }

        #[test]
        fn prop_transparent_foreground_keeps_background(fg in any_color(), bg in any_color()) {
            let fg = fg.with_alpha(0);
            let out = blend(fg, bg);
            prop_assert_eq!(out.to_rgb(), bg.to_rgb());
        }

        #[test]
        fn prop_gradient_endpoints(start in any_color(), end in any_color(), steps in 2usize..64) {
            let g = gradient(start, end, steps);
            prop_assert_eq!(g.len(), steps);
            prop_assert_eq!(g[0], start);
            prop_assert_eq!(g[steps - 1], end);
        }

        #[test]
        fn prop_contrast_is_symmetric(a in any_color(), b in any_color()) {
            let ab = contrast_ratio(a, b);
            prop_assert!((ab - contrast_ratio(b, a)).abs() < 1e-12);
            prop_assert!((1.0..=21.0 + 1e-9).contains(&ab));
        }
    }
}
