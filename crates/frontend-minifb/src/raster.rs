//! Rasterizes terminal draw intents into a 0RGB `u32` pixel buffer.

use zterm_core::terminal::palette::{Rgb, DEFAULT_FG};
use zterm_core::terminal::{DrawOp, Frame, ImageId, Rect};

use crate::font::{self, CHAR_HEIGHT, CHAR_WIDTH};

/// Font rows are doubled to fill a 16 px cell
const ROW_STRETCH: usize = 2;
/// Left padding of a glyph inside its cell
const GLYPH_INSET: usize = 1;

const WELCOME: [&str; 3] = ["ZTERM", "serial terminal", "waiting for output..."];

pub struct Canvas {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, pixels: vec![0; width * height] }
    }

    pub fn paint(&mut self, frame: &Frame) {
        for op in &frame.ops {
            match *op {
                DrawOp::Fill { rect, color } => self.fill(rect, color),
                DrawOp::Glyph { x, y, ch, color } => self.glyph(x as usize, y as usize, ch, color),
                DrawOp::Image { id: ImageId::Welcome, x, y } => {
                    self.welcome(x as usize, y as usize)
                }
            }
        }
    }

    fn fill(&mut self, r: Rect, color: Rgb) {
        let c = color.to_u32();
        let x1 = (r.x as usize + r.w as usize).min(self.width);
        let y1 = (r.y as usize + r.h as usize).min(self.height);
        for y in r.y as usize..y1 {
            let row = y * self.width;
            for x in r.x as usize..x1 {
                self.pixels[row + x] = c;
            }
        }
    }

    fn glyph(&mut self, x: usize, y: usize, ch: char, color: Rgb) {
        let c = color.to_u32();
        for (gy, bits) in font::glyph(ch).iter().enumerate() {
            for gx in 0..CHAR_WIDTH {
                if bits & (1 << gx) == 0 {
                    continue;
                }
                let px = x + GLYPH_INSET + gx;
                for s in 0..ROW_STRETCH {
                    let py = y + gy * ROW_STRETCH + s;
                    if px < self.width && py < self.height {
                        self.pixels[py * self.width + px] = c;
                    }
                }
            }
        }
    }

    fn welcome(&mut self, x: usize, y: usize) {
        let line_h = CHAR_HEIGHT * ROW_STRETCH;
        for (i, line) in WELCOME.iter().enumerate() {
            for (j, ch) in line.chars().enumerate() {
                self.glyph(x + j * (CHAR_WIDTH + 2), y + (2 * i + 1) * line_h, ch, DEFAULT_FG);
            }
        }
    }

    /// Nearest-neighbour upscale into `out`, which must hold
    /// `width * scale * height * scale` pixels.
    pub fn scale_into(&self, scale: usize, out: &mut [u32]) {
        let out_w = self.width * scale;
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.pixels[y * self.width + x];
                for sy in 0..scale {
                    let base = (y * scale + sy) * out_w + x * scale;
                    for sx in 0..scale {
                        if base + sx < out.len() {
                            out[base + sx] = c;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zterm_core::terminal::palette::RED;
    use zterm_core::Terminal;

    #[test]
    fn test_fill_clipped() {
        let mut c = Canvas::new(4, 4);
        c.fill(Rect { x: 2, y: 2, w: 10, h: 10 }, Rgb::from_hex(0x123456));
        assert_eq!(c.pixels[2 * 4 + 2], 0x123456);
        assert_eq!(c.pixels[3 * 4 + 3], 0x123456);
        assert_eq!(c.pixels[0], 0);
    }

    #[test]
    fn test_glyph_stretched() {
        let mut c = Canvas::new(10, 16);
        c.glyph(0, 0, '_', RED);
        // '_' has only its last font row set, doubled onto pixel rows 14 and 15
        assert_eq!(c.pixels[14 * 10 + 1], RED.to_u32());
        assert_eq!(c.pixels[15 * 10 + 8], RED.to_u32());
        assert_eq!(c.pixels[13 * 10 + 1], 0);
        assert_eq!(c.pixels[15 * 10], 0);
    }

    #[test]
    fn test_paint_terminal_frame() {
        let mut t = Terminal::new(4, 2, 32);
        t.write_str("\u{1b}[31m_");
        let (w, h) = t.surface_size();
        let mut c = Canvas::new(w as usize, h as usize);
        c.paint(&t.render(0));
        assert_eq!(c.pixels[15 * w as usize + 2], RED.to_u32());
    }

    #[test]
    fn test_scale_into() {
        let mut c = Canvas::new(2, 1);
        c.pixels = vec![1, 2];
        let mut out = vec![0; 4 * 2];
        c.scale_into(2, &mut out);
        assert_eq!(out, vec![1, 1, 2, 2, 1, 1, 2, 2]);
    }
}
