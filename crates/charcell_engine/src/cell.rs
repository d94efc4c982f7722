use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{Color, MAX_CHARS_PER_CELL, Palette};

/// Boolean attribute flags, packed into [`CellAttrs::attr`].
pub mod attribute {
    pub const NONE: u16 = 0;
    pub const BOLD: u16 = 0b0000_0000_0000_0001;
    pub const ITALIC: u16 = 0b0000_0000_0000_0010;
    pub const BLINK: u16 = 0b0000_0000_0000_0100;
    pub const REVERSE: u16 = 0b0000_0000_0000_1000;
    pub const CONCEAL: u16 = 0b0000_0000_0001_0000;
    pub const STRIKE: u16 = 0b0000_0000_0010_0000;
    pub const SMALL: u16 = 0b0000_0000_0100_0000;
    pub const PROTECTED: u16 = 0b0000_0000_1000_0000;
    pub const DWL: u16 = 0b0000_0001_0000_0000;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Underline {
    #[default]
    Off,
    Single,
    Double,
    Curly,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Baseline {
    #[default]
    Normal,
    Raise,
    Lower,
}

/// Cursor rendering shape, reported through the `CursorShape` terminal
/// property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorShape {
    #[default]
    Block = 1,
    Underline = 2,
    BarLeft = 3,
}

/// The non-color drawing attributes of a cell or pen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAttrs {
    pub attr: u16,
    pub underline: Underline,
    pub baseline: Baseline,
    /// Font slot 0..=9 (SGR 10..19).
    pub font: u8,
    /// Double-height-line value: 0 off, 1 top half, 2 bottom half.
    pub dhl: u8,
}

macro_rules! attr_accessors {
    ($is:ident, $set:ident, $flag:expr) => {
        pub fn $is(&self) -> bool {
            self.attr & $flag != 0
        }

        pub fn $set(&mut self, value: bool) {
            if value {
                self.attr |= $flag;
            } else {
                self.attr &= !$flag;
            }
        }
    };
}

impl CellAttrs {
    attr_accessors!(is_bold, set_bold, attribute::BOLD);
    attr_accessors!(is_italic, set_italic, attribute::ITALIC);
    attr_accessors!(is_blinking, set_blinking, attribute::BLINK);
    attr_accessors!(is_reverse, set_reverse, attribute::REVERSE);
    attr_accessors!(is_concealed, set_concealed, attribute::CONCEAL);
    attr_accessors!(is_crossed_out, set_crossed_out, attribute::STRIKE);
    attr_accessors!(is_small, set_small, attribute::SMALL);
    attr_accessors!(is_protected, set_protected, attribute::PROTECTED);
    attr_accessors!(is_dwl, set_dwl, attribute::DWL);
}

bitflags! {
    /// Attribute selector for extent queries: which attributes two cells
    /// must agree on to belong to the same extent.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AttrMask: u32 {
        const BOLD       = 1 << 0;
        const UNDERLINE  = 1 << 1;
        const ITALIC     = 1 << 2;
        const BLINK      = 1 << 3;
        const REVERSE    = 1 << 4;
        const STRIKE     = 1 << 5;
        const FONT       = 1 << 6;
        const FOREGROUND = 1 << 7;
        const BACKGROUND = 1 << 8;
        const CONCEAL    = 1 << 9;
        const SMALL      = 1 << 10;
        const BASELINE   = 1 << 11;
        const ALL        = (1 << 12) - 1;
    }
}

/// One glyph cell: the base character plus up to five combining marks, the
/// display width, and the drawing attributes it was placed with.
///
/// `width` 0 marks the right half of a double-width glyph; such cells carry
/// no characters of their own.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub chars: [char; MAX_CHARS_PER_CELL],
    pub width: i8,
    pub attrs: CellAttrs,
    pub fg: Color,
    pub bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            chars: ['\0'; MAX_CHARS_PER_CELL],
            width: 1,
            attrs: CellAttrs::default(),
            fg: Color::rgb(240, 240, 240).as_default_fg(),
            bg: Color::rgb(0, 0, 0).as_default_bg(),
        }
    }
}

impl Cell {
    pub fn blank(palette: &Palette) -> Self {
        Cell {
            fg: palette.default_fg(),
            bg: palette.default_bg(),
            ..Cell::default()
        }
    }

    pub fn base_char(&self) -> char {
        self.chars[0]
    }

    /// True for a cell with no character in it (erased, or the right half
    /// of a wide glyph).
    pub fn is_empty(&self) -> bool {
        self.chars[0] == '\0'
    }

    pub fn char_count(&self) -> usize {
        self.chars.iter().position(|&c| c == '\0').unwrap_or(MAX_CHARS_PER_CELL)
    }

    /// Append a combining mark. Marks beyond the cell capacity are dropped.
    pub fn push_char(&mut self, ch: char) {
        let count = self.char_count();
        if count < MAX_CHARS_PER_CELL {
            self.chars[count] = ch;
        }
    }
}

/// Per-row display flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInfo {
    pub doublewidth: bool,
    /// 0 off, 1 top half, 2 bottom half.
    pub doubleheight: u8,
    /// This row continues the logical line of the row above it.
    pub continuation: bool,
}

/// A glyph being placed, as reported through `on_putglyph`.
#[derive(Debug, Clone, Copy)]
pub struct GlyphInfo<'a> {
    pub chars: &'a [char],
    pub width: i8,
    pub protected: bool,
    pub dwl: bool,
    pub dhl: u8,
}
