//! xterm 256-color palette and nearest-index reduction
//!
//! Used when the terminal cannot take 24-bit SGR colors:
//! - 0-7: standard colors
//! - 8-15: bright colors
//! - 16-231: 6x6x6 color cube
//! - 232-255: grayscale

use super::ColorChannel;

/// Convert a 256-color index to RGB values using the xterm palette
pub fn index_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        // Standard colors (0-7)
        0 => (0, 0, 0),       // Black
        1 => (205, 0, 0),     // Red
        2 => (0, 205, 0),     // Green
        3 => (205, 205, 0),   // Yellow
        4 => (0, 0, 238),     // Blue
        5 => (205, 0, 205),   // Magenta
        6 => (0, 205, 205),   // Cyan
        7 => (229, 229, 229), // White

        // Bright colors (8-15)
        8 => (127, 127, 127),  // Bright Black (Gray)
        9 => (255, 0, 0),      // Bright Red
        10 => (0, 255, 0),     // Bright Green
        11 => (255, 255, 0),   // Bright Yellow
        12 => (92, 92, 255),   // Bright Blue
        13 => (255, 0, 255),   // Bright Magenta
        14 => (0, 255, 255),   // Bright Cyan
        15 => (255, 255, 255), // Bright White

        // 6x6x6 color cube (16-231)
        16..=231 => {
            let idx = index - 16;
            let r = idx / 36;
            let g = (idx % 36) / 6;
            let b = idx % 6;
            let to_val = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (to_val(r), to_val(g), to_val(b))
        }

        // Grayscale (232-255)
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            (gray, gray, gray)
        }
    }
}

fn distance_sq(color: ColorChannel, (r, g, b): (u8, u8, u8)) -> u32 {
    let d = |a: u8, b: u8| {
        let d = i32::from(a) - i32::from(b);
        (d * d) as u32
    };
    d(color.r, r) + d(color.g, g) + d(color.b, b)
}

fn nearest_in(color: ColorChannel, range: std::ops::RangeInclusive<u8>) -> u8 {
    // Ranges are non-empty constants, the first index is a valid fallback.
    let start = *range.start();
    range
        .min_by_key(|&idx| distance_sq(color, index_to_rgb(idx)))
        .unwrap_or(start)
}

/// Nearest entry in the color cube and grayscale ramp (16-255)
///
/// The first 16 entries are skipped because terminals commonly remap them.
pub fn to_ansi256(color: ColorChannel) -> u8 {
    nearest_in(color, 16..=255)
}

/// Nearest of the 16 standard and bright colors
pub fn to_ansi16(color: ColorChannel) -> u8 {
    nearest_in(color, 0..=15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_colors_to_rgb() {
        assert_eq!(index_to_rgb(0), (0, 0, 0));
        assert_eq!(index_to_rgb(1), (205, 0, 0));
        assert_eq!(index_to_rgb(7), (229, 229, 229));
    }

    #[test]
    fn test_color_cube_to_rgb() {
        assert_eq!(index_to_rgb(16), (0, 0, 0));
        assert_eq!(index_to_rgb(196), (255, 0, 0));
    }

    #[test]
    fn test_grayscale_to_rgb() {
        assert_eq!(index_to_rgb(232), (8, 8, 8));
        assert_eq!(index_to_rgb(255), (238, 238, 238));
    }

    #[test]
    fn test_to_ansi256_exact_matches() {
        assert_eq!(to_ansi256(ColorChannel::rgb(255, 0, 0)), 196);
        assert_eq!(to_ansi256(ColorChannel::rgb(0, 0, 0)), 16);
        assert_eq!(to_ansi256(ColorChannel::rgb(8, 8, 8)), 232);
    }

    #[test]
    fn test_to_ansi16() {
        assert_eq!(to_ansi16(ColorChannel::rgb(250, 10, 10)), 9);
        assert_eq!(to_ansi16(ColorChannel::rgb(0, 0, 0)), 0);
        assert_eq!(to_ansi16(ColorChannel::WHITE), 15);
    }
}
