//! Escape-sequence decoding.
//!
//! Sequences are collected after the ESC byte until one of the terminator
//! characters arrives; the collected body (without ESC) is then decoded here.
//! Only the literal forms and the two parametrised patterns below are
//! recognised; everything else decodes to `None` and is ignored.
//!
//! | Body          | Command                          |
//! |---------------|----------------------------------|
//! | `[H`          | cursor home                      |
//! | `[0m`         | reset pen                        |
//! | `[2J`         | clear screen, cursor home        |
//! | `[?25l`       | hide cursor                      |
//! | `[?25h`       | show cursor                      |
//! | `[r;cf`       | cursor to row r, column c (1-based) |
//! | `[nm`         | one colour code                  |
//! | `[n;mm`       | two colour codes                 |

/// Characters that end an escape sequence.
pub const TERMINATORS: [char; 6] = ['f', 'm', 'H', 'J', 'l', 'h'];

#[inline]
pub fn is_terminator(c: char) -> bool {
    TERMINATORS.contains(&c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeCommand {
    Home,
    ResetPen,
    ClearScreen,
    HideCursor,
    ShowCursor,
    /// Raw 1-based row and column as sent
    MoveTo { row: u32, col: u32 },
    Color(u32),
    Color2(u32, u32),
}

/// Decode a collected sequence body.
pub fn parse(body: &str) -> Option<EscapeCommand> {
    match body {
        "[H" => return Some(EscapeCommand::Home),
        "[0m" => return Some(EscapeCommand::ResetPen),
        "[2J" => return Some(EscapeCommand::ClearScreen),
        "[?25l" => return Some(EscapeCommand::HideCursor),
        "[?25h" => return Some(EscapeCommand::ShowCursor),
        _ => {}
    }

    let rest = body.strip_prefix('[')?;
    let final_char = rest.chars().last()?;
    let params = &rest[..rest.len() - final_char.len_utf8()];
    let mut nums = params.split(';').map(parse_number);

    match final_char {
        'f' => {
            let row = nums.next()??;
            let col = nums.next()??;
            if nums.next().is_some() {
                return None;
            }
            Some(EscapeCommand::MoveTo { row, col })
        }
        'm' => {
            let a = nums.next()??;
            match nums.next() {
                None => Some(EscapeCommand::Color(a)),
                Some(b) => {
                    let b = b?;
                    if nums.next().is_some() {
                        return None;
                    }
                    Some(EscapeCommand::Color2(a, b))
                }
            }
        }
        _ => None,
    }
}

/// Decimal parameter: one or more ASCII digits.
fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Convert a 1-based coordinate to 0-based, mapping 0 to 0.
#[inline]
pub fn one_based(v: u32) -> u32 {
    v.saturating_sub(1)
}
