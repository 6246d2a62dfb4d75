//! Character-cell terminal driven by the serial output stream.
//!
//! The terminal is a two-state machine. In the normal state printable
//! characters are stored at the cursor with the current pen, and CR, LF,
//! BS and ESC get their control meaning. ESC switches to collecting an
//! escape sequence; the first terminator character (see
//! [`escape::TERMINATORS`]) dispatches the collected body and returns to
//! the normal state.
//!
//! Cursor advance wraps at the right edge, and advancing past the bottom row
//! scrolls the grid up by one.

pub mod escape;
pub mod palette;
pub mod render;

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::serial::OutputSink;
use escape::EscapeCommand;
use palette::Pen;

pub use render::{DrawOp, Frame, ImageId, Rect};

const ESC: char = '\u{1B}';
const BS: char = '\u{08}';

/// One occupied grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub pen: Pen,
}

/// Cursor position, 0-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    Normal,
    /// Body collected since ESC, without the ESC itself
    Escape(String),
}

pub struct Terminal {
    width: usize,
    height: usize,
    rows: VecDeque<Vec<Option<Cell>>>,
    cursor: Cursor,
    pen: Pen,
    cursor_visible: bool,
    state: ParseState,
    /// Longest escape body kept before the sequence is discarded
    max_escape_len: usize,
    splash: bool,
    /// Escape sequences discarded for exceeding the length limit
    pub overflowed_escapes: u64,
}

impl Terminal {
    /// Create a blank `width` × `height` terminal.
    pub fn new(width: usize, height: usize, max_escape_len: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut t = Terminal {
            width,
            height,
            rows: VecDeque::with_capacity(height),
            cursor: Cursor::default(),
            pen: Pen::DEFAULT,
            cursor_visible: true,
            state: ParseState::Normal,
            max_escape_len,
            splash: false,
            overflowed_escapes: 0,
        };
        t.clear();
        t
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn pen(&self) -> Pen {
        self.pen
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn is_collecting_escape(&self) -> bool {
        matches!(self.state, ParseState::Escape(_))
    }

    pub fn splash_active(&self) -> bool {
        self.splash
    }

    /// Show the splash image until the next character arrives.
    pub fn show_splash(&mut self) {
        self.splash = true;
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.rows.get(y).and_then(|r| r.get(x)).and_then(|c| c.as_ref())
    }

    /// Row contents as text, with empty cells as spaces.
    pub fn row_text(&self, y: usize) -> String {
        match self.rows.get(y) {
            Some(row) => row.iter().map(|c| c.map_or(' ', |c| c.ch)).collect(),
            None => String::new(),
        }
    }

    /// Whole screen as text, one line per row with trailing spaces trimmed.
    pub fn screen_text(&self) -> String {
        let mut s = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            s.push_str(self.row_text(y).trim_end());
            s.push('\n');
        }
        s
    }

    /// Empty every cell and home the cursor. Pen and cursor visibility are kept.
    pub fn clear(&mut self) {
        self.rows.clear();
        for _ in 0..self.height {
            self.rows.push_back(vec![None; self.width]);
        }
        self.cursor = Cursor::default();
    }

    /// Full power-on reset: blank grid, default pen, visible cursor.
    pub fn reset(&mut self) {
        self.clear();
        self.pen = Pen::DEFAULT;
        self.cursor_visible = true;
        self.state = ParseState::Normal;
        self.splash = false;
    }

    /// Feed one byte from the serial line, read as a Latin-1 character code.
    pub fn put_byte(&mut self, byte: u8) {
        self.put_char(char::from(byte));
    }

    pub fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.put_char(c);
        }
    }

    /// Feed one character.
    pub fn put_char(&mut self, ch: char) {
        self.splash = false;

        if let ParseState::Escape(body) = &mut self.state {
            body.push(ch);
            if escape::is_terminator(ch) {
                let body = std::mem::take(body);
                self.state = ParseState::Normal;
                self.dispatch(&body);
            } else if body.len() > self.max_escape_len {
                warn!("escape sequence longer than {} bytes discarded", self.max_escape_len);
                self.overflowed_escapes += 1;
                self.state = ParseState::Normal;
            }
            return;
        }

        match ch {
            '\r' => {}
            '\n' => {
                self.cursor.y += 1;
                self.cursor.x = 0;
            }
            BS => {
                // Clamp at the left edge rather than wrapping to the previous row
                self.cursor.x = self.cursor.x.saturating_sub(1);
                self.rows[self.cursor.y][self.cursor.x] = None;
            }
            ESC => {
                self.state = ParseState::Escape(String::new());
            }
            _ => {
                self.rows[self.cursor.y][self.cursor.x] = Some(Cell { ch, pen: self.pen });
                self.cursor.x += 1;
            }
        }

        if self.cursor.x >= self.width {
            self.cursor.x = 0;
            self.cursor.y += 1;
        }
        if self.cursor.y >= self.height {
            self.cursor.y = self.height - 1;
            self.scroll_up();
        }
    }

    /// Drop the top row and append an empty one at the bottom.
    fn scroll_up(&mut self) {
        self.rows.pop_front();
        self.rows.push_back(vec![None; self.width]);
    }

    fn dispatch(&mut self, body: &str) {
        let Some(cmd) = escape::parse(body) else {
            trace!("ignored escape sequence {:?}", body);
            return;
        };
        match cmd {
            EscapeCommand::Home => self.cursor = Cursor::default(),
            EscapeCommand::ResetPen => self.pen = Pen::RESET,
            EscapeCommand::ClearScreen => self.clear(),
            EscapeCommand::HideCursor => self.cursor_visible = false,
            EscapeCommand::ShowCursor => self.cursor_visible = true,
            EscapeCommand::MoveTo { row, col } => {
                let y = escape::one_based(row) as usize;
                let x = escape::one_based(col) as usize;
                self.cursor = Cursor {
                    x: x.min(self.width - 1),
                    y: y.min(self.height - 1),
                };
            }
            EscapeCommand::Color(a) => self.pen.apply(a),
            EscapeCommand::Color2(a, b) => {
                self.pen.apply(a);
                self.pen.apply(b);
            }
        }
    }
}

impl OutputSink for Terminal {
    fn emit(&mut self, byte: u8) {
        self.put_byte(byte);
    }
}
