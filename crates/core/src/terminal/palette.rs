//! 16-colour palette and SGR colour-code mapping.

/// 24-bit colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Build from a `0xRRGGBB` value.
    pub const fn from_hex(hex: u32) -> Self {
        Rgb { r: (hex >> 16) as u8, g: (hex >> 8) as u8, b: hex as u8 }
    }

    /// Pack as `0x00RRGGBB` (the pixel format minifb expects).
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

pub const BLACK: Rgb = Rgb::from_hex(0x000000);
pub const RED: Rgb = Rgb::from_hex(0x800000);
pub const GREEN: Rgb = Rgb::from_hex(0x008000);
pub const YELLOW: Rgb = Rgb::from_hex(0x808000);
pub const BLUE: Rgb = Rgb::from_hex(0x000080);
pub const MAGENTA: Rgb = Rgb::from_hex(0x800080);
pub const CYAN: Rgb = Rgb::from_hex(0x008080);
pub const WHITE: Rgb = Rgb::from_hex(0xC0C0C0);

pub const BRIGHT_BLACK: Rgb = Rgb::from_hex(0x808080);
pub const BRIGHT_RED: Rgb = Rgb::from_hex(0xFF0000);
pub const BRIGHT_GREEN: Rgb = Rgb::from_hex(0x00FF00);
pub const BRIGHT_YELLOW: Rgb = Rgb::from_hex(0xFFFF00);
pub const BRIGHT_BLUE: Rgb = Rgb::from_hex(0x0000FF);
pub const BRIGHT_MAGENTA: Rgb = Rgb::from_hex(0xFF00FF);
pub const BRIGHT_CYAN: Rgb = Rgb::from_hex(0x00FFFF);
pub const BRIGHT_WHITE: Rgb = Rgb::from_hex(0xFFFFFF);

/// Phosphor green used for power-on text and the splash ambient colour
pub const DEFAULT_FG: Rgb = Rgb::from_hex(0x00AA00);

/// Codes 30–37 followed by 90–97.
#[rustfmt::skip]
pub const PALETTE: [Rgb; 16] = [
    BLACK, RED, GREEN, YELLOW, BLUE, MAGENTA, CYAN, WHITE,
    BRIGHT_BLACK, BRIGHT_RED, BRIGHT_GREEN, BRIGHT_YELLOW,
    BRIGHT_BLUE, BRIGHT_MAGENTA, BRIGHT_CYAN, BRIGHT_WHITE,
];

/// Foreground colour for an SGR code, if the code is in 30–37 or 90–97.
pub fn lookup(code: u32) -> Option<Rgb> {
    match code {
        30..=37 => Some(PALETTE[(code - 30) as usize]),
        90..=97 => Some(PALETTE[(code - 90 + 8) as usize]),
        _ => None,
    }
}

/// Foreground/background pair carried forward onto printed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pen {
    pub fg: Rgb,
    pub bg: Rgb,
}

impl Pen {
    /// Power-on pen: phosphor green on black.
    pub const DEFAULT: Pen = Pen { fg: DEFAULT_FG, bg: BLACK };
    /// Pen installed by `ESC[0m`.
    pub const RESET: Pen = Pen { fg: BRIGHT_WHITE, bg: BLACK };

    /// Apply one SGR colour code.
    ///
    /// 30–37 and 90–97 set the foreground. Anything else is read as a
    /// background code and looked up as `code - 10`; codes with no palette
    /// entry leave the pen unchanged.
    pub fn apply(&mut self, code: u32) {
        if let Some(fg) = lookup(code) {
            self.fg = fg;
        } else if let Some(bg) = code.checked_sub(10).and_then(lookup) {
            self.bg = bg;
        }
    }
}

impl Default for Pen {
    fn default() -> Self {
        Pen::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let c = Rgb::from_hex(0x12AB34);
        assert_eq!((c.r, c.g, c.b), (0x12, 0xAB, 0x34));
        assert_eq!(c.to_u32(), 0x12AB34);
    }

    #[test]
    fn test_lookup_ranges() {
        assert_eq!(lookup(32), Some(GREEN));
        assert_eq!(lookup(97), Some(BRIGHT_WHITE));
        assert_eq!(lookup(38), None);
        assert_eq!(lookup(42), None);
    }

    #[test]
    fn test_foreground_and_background_codes() {
        let mut pen = Pen::DEFAULT;
        pen.apply(32);
        assert_eq!(pen.fg, GREEN);
        pen.apply(42);
        assert_eq!(pen.bg, GREEN);
        pen.apply(104);
        assert_eq!(pen.bg, BRIGHT_BLUE);
        assert_eq!(pen.fg, GREEN);
    }

    #[test]
    fn test_unmapped_codes_leave_pen_alone() {
        let mut pen = Pen { fg: RED, bg: BLUE };
        for code in [0, 1, 5, 39, 49, 38, 200] {
            pen.apply(code);
        }
        assert_eq!(pen, Pen { fg: RED, bg: BLUE });
    }
}
