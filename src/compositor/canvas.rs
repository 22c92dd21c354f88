//! Per-pass cell canvas and SGR output
//!
//! The canvas only lives for one render pass. It remembers what has been
//! drawn into each cell so far, which is what transparent planes blend
//! against.

use std::fmt::Write as _;

use crate::blitter::{Cell, CellGrid};
use crate::color::{blend, to_ansi16, to_ansi256, ColorChannel};

pub(super) struct Canvas {
    cols: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Canvas {
    pub(super) fn new(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::EMPTY; cols as usize * rows as usize],
        }
    }

    fn slot(&mut self, col: u32, row: u32) -> Option<&mut Cell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells
            .get_mut(row as usize * self.cols as usize + col as usize)
    }

    /// Draw `grid` at (x, y) and return the resulting cells for that region
    pub(super) fn draw(&mut self, grid: &CellGrid, x: u32, y: u32, transparent: bool) -> CellGrid {
        let mut result = CellGrid::new(grid.cols, grid.rows);
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let Some(&top) = grid.get(col, row) else {
                    continue;
                };
                let Some(slot) = self.slot(x + col, y + row) else {
                    continue;
                };
                // Empty cells leave whatever is beneath in place
                let cell = if transparent {
                    composite(top, *slot)
                } else if top.is_empty() {
                    *slot
                } else {
                    opaque(top)
                };
                *slot = cell;
                result.cells[(row * grid.cols + col) as usize] = cell;
            }
        }
        result
    }
}

fn opaque(cell: Cell) -> Cell {
    Cell {
        ch: cell.ch,
        fg: cell.fg.map(|c| c.with_alpha(255)),
        bg: cell.bg.map(|c| c.with_alpha(255)),
    }
}

/// `top` blended over `below`
fn composite(top: Cell, below: Cell) -> Cell {
    if top.is_empty() {
        return below;
    }
    let over = |t: ColorChannel, b: Option<ColorChannel>| match b {
        Some(b) => blend(t, b).with_alpha(255),
        None => t.with_alpha(255),
    };
    let bg = match top.bg {
        Some(t) => Some(over(t, below.bg)),
        None => below.bg,
    };

    if top.ch == ' ' {
        // Tinted overlay: the glyph underneath shows through
        let tint = top.bg.unwrap_or(ColorChannel::TRANSPARENT);
        return Cell {
            ch: below.ch,
            fg: below.fg.map(|f| over(tint, Some(f))),
            bg,
        };
    }

    Cell {
        ch: top.ch,
        fg: top.fg.map(|f| over(f, bg)),
        bg,
    }
}

/// Colour depth used for SGR sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ColorDepth {
    None,
    Ansi16,
    Ansi256,
    TrueColor,
}

impl ColorDepth {
    pub(super) fn from_bits(bits: u8) -> Self {
        match bits {
            0..=3 => ColorDepth::None,
            4..=7 => ColorDepth::Ansi16,
            8..=23 => ColorDepth::Ansi256,
            _ => ColorDepth::TrueColor,
        }
    }

    fn push(self, out: &mut String, color: ColorChannel, background: bool) {
        match self {
            ColorDepth::None => {}
            ColorDepth::Ansi16 => {
                let idx = to_ansi16(color);
                let base = match (background, idx >= 8) {
                    (false, false) => 30,
                    (false, true) => 90 - 8,
                    (true, false) => 40,
                    (true, true) => 100 - 8,
                };
                let _ = write!(out, ";{}", base + u32::from(idx));
            }
            ColorDepth::Ansi256 => {
                let sel = if background { 48 } else { 38 };
                let _ = write!(out, ";{};5;{}", sel, to_ansi256(color));
            }
            ColorDepth::TrueColor => {
                let sel = if background { 48 } else { 38 };
                let _ = write!(out, ";{};2;{};{};{}", sel, color.r, color.g, color.b);
            }
        }
    }
}

/// Cursor moves, SGR and glyphs for a grid placed at (x, y)
///
/// Empty cells are skipped with a cursor move so whatever is underneath
/// stays on screen.
pub(super) fn emit_cells(grid: &CellGrid, x: u32, y: u32, depth: ColorDepth) -> String {
    let mut out = String::new();
    for row in 0..grid.rows {
        let mut positioned = false;
        let mut wrote = false;
        for col in 0..grid.cols {
            let Some(cell) = grid.get(col, row) else {
                continue;
            };
            if cell.is_empty() && cell.fg.is_none() {
                positioned = false;
                continue;
            }
            if !positioned {
                let _ = write!(out, "\x1b[{};{}H", y + row + 1, x + col + 1);
                positioned = true;
            }
            out.push_str("\x1b[0");
            if let Some(fg) = cell.fg {
                depth.push(&mut out, fg, false);
            }
            if let Some(bg) = cell.bg {
                depth.push(&mut out, bg, true);
            }
            out.push('m');
            out.push(cell.ch);
            wrote = true;
        }
        if wrote {
            out.push_str("\x1b[0m");
        }
    }
    out
}
