//! Frame generation: draw intents plus the ambient colour.
//!
//! The terminal does not touch pixels. A frame is a list of [`DrawOp`]s in
//! paint order (surface fill, all cell backgrounds, then cursor block and
//! glyph per cell) for a surface to rasterize, along with the average
//! foreground colour of the screen.

use super::palette::{Pen, Rgb, BLACK, DEFAULT_FG};
use super::Terminal;

/// Cell width in pixels
pub const CELL_WIDTH: u32 = 10;
/// Cell height in pixels
pub const CELL_HEIGHT: u32 = 16;
/// Margin between the surface edge and the first cell
pub const ORIGIN: u32 = 1;
/// The cursor block sits this far below the top of its cell
pub const CURSOR_DROP: u32 = 4;

/// Pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Fixed images a surface is expected to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageId {
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    Fill { rect: Rect, color: Rgb },
    /// Glyph placed in the cell whose top-left pixel is (`x`, `y`)
    Glyph { x: u32, y: u32, ch: char, color: Rgb },
    Image { id: ImageId, x: u32, y: u32 },
}

/// Everything a surface needs for one paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub ops: Vec<DrawOp>,
    /// Average glyph colour over all cells, for theming the surroundings
    pub ambient: Rgb,
}

/// Cursor blink phase: on during odd seconds, rounding to the nearest second.
pub fn cursor_blink_on(now_ms: u64) -> bool {
    ((now_ms + 500) / 1000) % 2 == 1
}

fn cell_rect(col: usize, row: usize) -> Rect {
    Rect {
        x: col as u32 * CELL_WIDTH + ORIGIN,
        y: row as u32 * CELL_HEIGHT + ORIGIN,
        w: CELL_WIDTH,
        h: CELL_HEIGHT,
    }
}

impl Terminal {
    /// Surface size in pixels needed to show the whole grid and cursor.
    pub fn surface_size(&self) -> (u32, u32) {
        (
            self.width as u32 * CELL_WIDTH + 2 * ORIGIN,
            self.height as u32 * CELL_HEIGHT + 2 * ORIGIN + CURSOR_DROP,
        )
    }

    /// Build the draw intents for the current state at time `now_ms`.
    pub fn render(&self, now_ms: u64) -> Frame {
        let (sw, sh) = self.surface_size();
        let mut ops = Vec::with_capacity(2 * self.width * self.height + 2);
        ops.push(DrawOp::Fill { rect: Rect { x: 0, y: 0, w: sw, h: sh }, color: BLACK });

        if self.splash {
            ops.push(DrawOp::Image { id: ImageId::Welcome, x: ORIGIN, y: ORIGIN });
            return Frame { ops, ambient: DEFAULT_FG };
        }

        // Backgrounds first so a dropped cursor block is not painted over
        for (y, row) in self.rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let bg = cell.map_or(Pen::DEFAULT.bg, |c| c.pen.bg);
                ops.push(DrawOp::Fill { rect: cell_rect(x, y), color: bg });
            }
        }

        let blink = self.cursor_visible && cursor_blink_on(now_ms);
        let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
        for (y, row) in self.rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let rect = cell_rect(x, y);
                let fg = cell.map_or(Pen::DEFAULT.fg, |c| c.pen.fg);
                if blink && self.cursor.x == x && self.cursor.y == y {
                    let block = Rect { y: rect.y + CURSOR_DROP, ..rect };
                    ops.push(DrawOp::Fill { rect: block, color: fg });
                }
                if let Some(c) = cell {
                    r += c.pen.fg.r as u64;
                    g += c.pen.fg.g as u64;
                    b += c.pen.fg.b as u64;
                    ops.push(DrawOp::Glyph { x: rect.x, y: rect.y, ch: c.ch, color: c.pen.fg });
                }
            }
        }

        let cells = (self.width * self.height) as u64;
        let ambient = Rgb { r: (r / cells) as u8, g: (g / cells) as u8, b: (b / cells) as u8 };
        Frame { ops, ambient }
    }
}

#[cfg(test)]
mod tests {
    use super::super::palette::{BRIGHT_RED, GREEN};
    use super::*;

    fn glyphs(f: &Frame) -> Vec<(u32, u32, char)> {
        f.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Glyph { x, y, ch, .. } => Some((*x, *y, *ch)),
                _ => None,
            })
            .collect()
    }

    fn fills(f: &Frame) -> usize {
        f.ops.iter().filter(|op| matches!(op, DrawOp::Fill { .. })).count()
    }

    #[test]
    fn test_blink_phase() {
        assert!(!cursor_blink_on(0));
        assert!(!cursor_blink_on(499));
        assert!(cursor_blink_on(500));
        assert!(cursor_blink_on(1499));
        assert!(!cursor_blink_on(1500));
    }

    #[test]
    fn test_backgrounds_for_every_cell() {
        let t = Terminal::new(4, 3, 32);
        let f = t.render(0);
        // surface fill + one background per cell, cursor off at t=0
        assert_eq!(fills(&f), 1 + 12);
        assert!(glyphs(&f).is_empty());
        assert_eq!(f.ambient, Rgb::default());
    }

    #[test]
    fn test_glyph_positions() {
        let mut t = Terminal::new(4, 3, 32);
        t.write_str("ab\nc");
        let f = t.render(0);
        assert_eq!(glyphs(&f), vec![(1, 1, 'a'), (11, 1, 'b'), (1, 17, 'c')]);
    }

    #[test]
    fn test_cursor_block_when_visible_and_blinking() {
        let mut t = Terminal::new(4, 3, 32);
        t.write_str("x");
        let on = t.render(1000);
        assert_eq!(fills(&on), 1 + 12 + 1);
        assert!(on.ops.contains(&DrawOp::Fill {
            rect: Rect { x: 11, y: 1 + CURSOR_DROP, w: CELL_WIDTH, h: CELL_HEIGHT },
            color: DEFAULT_FG,
        }));
        t.write_str("\u{1b}[?25l");
        assert_eq!(fills(&t.render(1000)), 1 + 12);
    }

    #[test]
    fn test_ambient_is_average_over_all_cells() {
        let mut t = Terminal::new(2, 1, 32);
        t.write_str("\u{1b}[91mA");
        let f = t.render(0);
        assert_eq!(f.ambient, Rgb { r: BRIGHT_RED.r / 2, g: 0, b: 0 });

        let mut t = Terminal::new(2, 2, 32);
        t.write_str("\u{1b}[32mab");
        let f = t.render(0);
        assert_eq!(f.ambient, Rgb { r: 0, g: GREEN.g / 2, b: 0 });
    }

    #[test]
    fn test_splash_frame() {
        let mut t = Terminal::new(4, 3, 32);
        t.write_str("hidden");
        t.show_splash();
        let f = t.render(1000);
        assert_eq!(f.ops.len(), 2);
        assert_eq!(f.ops[1], DrawOp::Image { id: ImageId::Welcome, x: ORIGIN, y: ORIGIN });
        assert_eq!(f.ambient, DEFAULT_FG);
    }
}
