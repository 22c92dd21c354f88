//! Character-cell renderers
//!
//! Each character blitter maps a block of sub-pixels onto one glyph with a
//! foreground and (for two-color tiers) a background. The input visual is
//! expected to be sized already: `cols * ratio.width` by `rows * ratio.height`.
//!
//! Partially transparent blocks draw only their visible sub-pixels and leave
//! the background unset. Opaque blocks are split into two clusters by mean
//! luminance: the brighter half is the foreground.

use serde::{Deserialize, Serialize};

use super::BlitterType;
use crate::color::{average, luminance, ColorChannel};
use crate::visual::Visual;

/// Density ramp for the ASCII blitter, darkest first
pub const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// Quadrant glyphs indexed by mask: bit 0 upper-left, 1 upper-right,
/// 2 lower-left, 3 lower-right
const QUADRANTS: [char; 16] = [
    ' ', '▘', '▝', '▀', '▖', '▌', '▞', '▛', '▗', '▚', '▐', '▜', '▄', '▙', '▟', '█',
];

const BRAILLE_BASE: u32 = 0x2800;

/// Braille dot bit for sub-pixel (col, row)
const BRAILLE_DOTS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

const SEXTANT_BASE: u32 = 0x1FB00;

/// One rendered terminal cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub ch: char,
    /// None leaves the terminal's current foreground
    pub fg: Option<ColorChannel>,
    /// None leaves whatever is already underneath
    pub bg: Option<ColorChannel>,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        ch: ' ',
        fg: None,
        bg: None,
    };

    pub fn is_empty(&self) -> bool {
        self.ch == ' ' && self.bg.is_none()
    }
}

/// A grid of cells in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGrid {
    pub cols: u32,
    pub rows: u32,
    pub cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::EMPTY; cols as usize * rows as usize],
        }
    }

    /// A grid filled with one background color
    pub fn filled(cols: u32, rows: u32, color: ColorChannel) -> Self {
        let cell = Cell {
            ch: ' ',
            fg: None,
            bg: Some(color),
        };
        Self {
            cols,
            rows,
            cells: vec![cell; cols as usize * rows as usize],
        }
    }

    pub fn get(&self, col: u32, row: u32) -> Option<&Cell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells.get(row as usize * self.cols as usize + col as usize)
    }

    /// Glyphs of one row as a string
    pub fn row_text(&self, row: u32) -> String {
        (0..self.cols)
            .filter_map(|col| self.get(col, row))
            .map(|c| c.ch)
            .collect()
    }
}

/// Sub-pixels of one cell, row-major
struct Block {
    width: u32,
    pixels: Vec<ColorChannel>,
}

impl Block {
    fn read(visual: &Visual, col: u32, row: u32, width: u32, height: u32) -> Self {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for dy in 0..height {
            for dx in 0..width {
                pixels.push(visual.pixel(col * width + dx, row * height + dy));
            }
        }
        Self { width, pixels }
    }

    /// Foreground mask (bit i = sub-pixel i), foreground and background colors
    fn split(&self) -> (u32, Option<ColorChannel>, Option<ColorChannel>) {
        let visible: Vec<bool> = self.pixels.iter().map(|p| !p.is_transparent()).collect();
        if !visible.iter().any(|&v| v) {
            return (0, None, None);
        }

        let set: Vec<bool> = if visible.iter().all(|&v| v) {
            let lum: Vec<f64> = self.pixels.iter().map(|&p| luminance(p)).collect();
            let mean = lum.iter().sum::<f64>() / lum.len() as f64;
            lum.iter().map(|&l| l >= mean - f64::EPSILON).collect()
        } else {
            visible
        };

        let mut mask = 0u32;
        let mut fg = Vec::new();
        let mut bg = Vec::new();
        for (i, (&is_set, &p)) in set.iter().zip(&self.pixels).enumerate() {
            if is_set {
                mask |= 1 << i;
                fg.push(p.with_alpha(255));
            } else if !p.is_transparent() {
                bg.push(p.with_alpha(255));
            }
        }
        let fg = (!fg.is_empty()).then(|| average(&fg));
        let bg = (!bg.is_empty()).then(|| average(&bg));
        (mask, fg, bg)
    }

    fn at(&self, col: u32, row: u32) -> ColorChannel {
        self.pixels[(row * self.width + col) as usize]
    }
}

fn half_block(block: &Block, threshold: f64) -> Cell {
    let top = block.at(0, 0);
    let bottom = block.at(0, 1);
    match (top.is_transparent(), bottom.is_transparent()) {
        (true, true) => Cell::EMPTY,
        (false, true) => Cell {
            ch: '▀',
            fg: Some(top.with_alpha(255)),
            bg: None,
        },
        (true, false) => Cell {
            ch: '▄',
            fg: Some(bottom.with_alpha(255)),
            bg: None,
        },
        (false, false) => {
            if (luminance(top) - luminance(bottom)).abs() < threshold {
                let both = average(&[top, bottom]).with_alpha(255);
                Cell {
                    ch: '█',
                    fg: Some(both),
                    bg: Some(both),
                }
            } else {
                Cell {
                    ch: '▀',
                    fg: Some(top.with_alpha(255)),
                    bg: Some(bottom.with_alpha(255)),
                }
            }
        }
    }
}

fn quadrant(block: &Block) -> Cell {
    let (mask, fg, bg) = block.split();
    Cell {
        ch: QUADRANTS[mask as usize & 0xF],
        fg,
        bg,
    }
}

/// Glyph for a sextant mask: bit (row * 2 + col), rows top to bottom
fn sextant_char(mask: u32) -> char {
    match mask {
        0 => ' ',
        // The sextant block omits the patterns that already exist as
        // half blocks and the full block.
        21 => '▌',
        42 => '▐',
        63 => '█',
        m => {
            let skipped = u32::from(m > 21) + u32::from(m > 42);
            char::from_u32(SEXTANT_BASE + m - 1 - skipped).unwrap_or('█')
        }
    }
}

fn sextant(block: &Block) -> Cell {
    let (mask, fg, bg) = block.split();
    Cell {
        ch: sextant_char(mask & 0x3F),
        fg,
        bg,
    }
}

fn braille(block: &Block) -> Cell {
    let (mask, fg, _) = block.split();
    let mut dots = 0u32;
    for row in 0..4 {
        for col in 0..2 {
            if mask & (1 << (row * 2 + col)) != 0 {
                dots |= u32::from(BRAILLE_DOTS[col as usize][row as usize]);
            }
        }
    }
    if dots == 0 {
        return Cell::EMPTY;
    }
    Cell {
        ch: char::from_u32(BRAILLE_BASE + dots).unwrap_or(' '),
        fg,
        bg: None,
    }
}

fn ascii(block: &Block) -> Cell {
    let p = block.at(0, 0);
    if p.is_transparent() {
        return Cell::EMPTY;
    }
    let coverage = luminance(p) * f64::from(p.a) / 255.0;
    let last = ASCII_RAMP.len() - 1;
    let idx = ((coverage * last as f64).round() as usize).min(last);
    Cell {
        ch: char::from(ASCII_RAMP[idx]),
        fg: Some(p.with_alpha(255)),
        bg: None,
    }
}

/// Render `visual` into cells with a character blitter
///
/// [`BlitterType::PixelTransport`] is not a character blitter; asking for it
/// here renders half blocks instead.
pub fn render_cells(visual: &Visual, blitter: BlitterType, half_block_threshold: f64) -> CellGrid {
    let blitter = match blitter {
        BlitterType::PixelTransport => BlitterType::HalfBlock,
        other => other,
    };
    let ratio = blitter.info().pixel_ratio;
    let cols = visual.width().div_ceil(ratio.width);
    let rows = visual.height().div_ceil(ratio.height);

    let mut grid = CellGrid::new(cols, rows);
    for row in 0..rows {
        for col in 0..cols {
            let block = Block::read(visual, col, row, ratio.width, ratio.height);
            let cell = match blitter {
                BlitterType::HalfBlock | BlitterType::PixelTransport => {
                    half_block(&block, half_block_threshold)
                }
                BlitterType::Quadrant => quadrant(&block),
                BlitterType::Sextant => sextant(&block),
                BlitterType::Braille => braille(&block),
                BlitterType::AsciiFallback => ascii(&block),
            };
            grid.cells[(row * cols + col) as usize] = cell;
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::PixelFormat;

    const RED: ColorChannel = ColorChannel::rgb(255, 0, 0);
    const BLUE: ColorChannel = ColorChannel::rgb(0, 0, 255);
    const W: ColorChannel = ColorChannel::WHITE;
    const K: ColorChannel = ColorChannel::BLACK;
    const T: ColorChannel = ColorChannel::TRANSPARENT;

    fn visual(width: u32, pixels: &[ColorChannel]) -> Visual {
        let data = pixels.iter().flat_map(|c| [c.r, c.g, c.b, c.a]).collect();
        Visual::new(width, pixels.len() as u32 / width, PixelFormat::Rgba, data).unwrap()
    }

    #[test]
    fn test_half_block_two_colors() {
        let grid = render_cells(&visual(1, &[RED, BLUE]), BlitterType::HalfBlock, 0.02);
        assert_eq!((grid.cols, grid.rows), (1, 1));
        let cell = grid.cells[0];
        assert_eq!(cell.ch, '▀');
        assert_eq!(cell.fg, Some(RED));
        assert_eq!(cell.bg, Some(BLUE));
    }

    #[test]
    fn test_half_block_threshold_collapses() {
        let a = ColorChannel::rgb(100, 100, 100);
        let b = ColorChannel::rgb(101, 101, 101);
        let grid = render_cells(&visual(1, &[a, b]), BlitterType::HalfBlock, 0.02);
        assert_eq!(grid.cells[0].ch, '█');
    }

    #[test]
    fn test_half_block_transparency() {
        let grid = render_cells(&visual(3, &[T, RED, T, T, T, BLUE]), BlitterType::HalfBlock, 0.02);
        assert_eq!(grid.row_text(0), " ▀▄");
        assert_eq!(grid.cells[0], Cell::EMPTY);
        assert_eq!(grid.cells[1].bg, None);
    }

    #[test]
    fn test_quadrant_diagonal() {
        let grid = render_cells(&visual(2, &[W, K, K, W]), BlitterType::Quadrant, 0.0);
        let cell = grid.cells[0];
        assert_eq!(cell.ch, '▚');
        assert_eq!(cell.fg, Some(W));
        assert_eq!(cell.bg, Some(K));
    }

    #[test]
    fn test_quadrant_uniform_is_full_block() {
        let grid = render_cells(&visual(2, &[RED, RED, RED, RED]), BlitterType::Quadrant, 0.0);
        assert_eq!(grid.cells[0].ch, '█');
        assert_eq!(grid.cells[0].bg, None);
    }

    #[test]
    fn test_sextant_chars() {
        assert_eq!(sextant_char(0), ' ');
        assert_eq!(sextant_char(1), '\u{1FB00}');
        assert_eq!(sextant_char(21), '▌');
        assert_eq!(sextant_char(22), '\u{1FB14}');
        assert_eq!(sextant_char(42), '▐');
        assert_eq!(sextant_char(62), '\u{1FB3B}');
        assert_eq!(sextant_char(63), '█');
    }

    #[test]
    fn test_sextant_left_column() {
        let grid = render_cells(&visual(2, &[W, K, W, K, W, K]), BlitterType::Sextant, 0.0);
        assert_eq!(grid.cells[0].ch, '▌');
    }

    #[test]
    fn test_braille_dots() {
        // Left column lit
        let px = [W, T, W, T, W, T, W, T];
        let grid = render_cells(&visual(2, &px), BlitterType::Braille, 0.0);
        assert_eq!(grid.cells[0].ch, '\u{2847}');
        assert_eq!(grid.cells[0].bg, None);

        let empty = render_cells(&visual(2, &[T; 8]), BlitterType::Braille, 0.0);
        assert_eq!(empty.cells[0], Cell::EMPTY);
    }

    #[test]
    fn test_ascii_ramp() {
        let grid = render_cells(&visual(3, &[K, W, T]), BlitterType::AsciiFallback, 0.0);
        assert_eq!(grid.row_text(0), " @ ");
        assert_eq!(grid.cells[1].fg, Some(W));
    }

    #[test]
    fn test_grid_size_rounds_up() {
        let grid = render_cells(&Visual::solid(5, 5, RED), BlitterType::Sextant, 0.0);
        assert_eq!((grid.cols, grid.rows), (3, 2));
        let grid = render_cells(&Visual::solid(5, 5, RED), BlitterType::Braille, 0.0);
        assert_eq!((grid.cols, grid.rows), (3, 2));
    }

    #[test]
    fn test_filled_grid() {
        let grid = CellGrid::filled(2, 2, BLUE);
        assert!(grid.cells.iter().all(|c| c.bg == Some(BLUE)));
        assert!(grid.get(2, 0).is_none());
    }
}
