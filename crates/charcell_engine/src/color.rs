use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// The resolved shape of a color: direct RGB or a palette slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorValue {
    Rgb(u8, u8, u8),
    Indexed(u8),
}

/// A cell color. Besides the resolved value it carries two flag bits that
/// record whether the color came from a default-reset SGR (39/49); the value
/// slot still holds the resolved color so renderers without a default
/// concept can use it directly.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Color {
    pub value: ColorValue,
    default_fg: bool,
    default_bg: bool,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color {
            value: ColorValue::Rgb(r, g, b),
            default_fg: false,
            default_bg: false,
        }
    }

    pub fn index(idx: u8) -> Self {
        Color {
            value: ColorValue::Indexed(idx),
            default_fg: false,
            default_bg: false,
        }
    }

    pub fn is_rgb(&self) -> bool {
        matches!(self.value, ColorValue::Rgb(..))
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.value, ColorValue::Indexed(_))
    }

    pub fn indexed(&self) -> Option<u8> {
        match self.value {
            ColorValue::Indexed(idx) => Some(idx),
            ColorValue::Rgb(..) => None,
        }
    }

    pub fn is_default_fg(&self) -> bool {
        self.default_fg
    }

    pub fn is_default_bg(&self) -> bool {
        self.default_bg
    }

    pub fn as_default_fg(mut self) -> Self {
        self.default_fg = true;
        self.default_bg = false;
        self
    }

    pub fn as_default_bg(mut self) -> Self {
        self.default_bg = true;
        self.default_fg = false;
        self
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::rgb(0, 0, 0)
    }
}

impl PartialEq for Color {
    /// Colors compare by resolved value; the default flags are bookkeeping.
    fn eq(&self, other: &Color) -> bool {
        self.value == other.value
    }
}

lazy_static! {
    /// The xterm 256-color palette: 16 ANSI colors, a 6x6x6 color cube, and
    /// a 24-step grayscale ramp.
    pub static ref XTERM_256_PALETTE: Vec<(u8, u8, u8)> = {
        let mut palette = Vec::with_capacity(256);
        palette.extend_from_slice(&ANSI_COLORS);
        for r in 0..6u16 {
            for g in 0..6u16 {
                for b in 0..6u16 {
                    let scale = |v: u16| if v == 0 { 0 } else { (v * 40 + 55) as u8 };
                    palette.push((scale(r), scale(g), scale(b)));
                }
            }
        }
        for i in 0..24u16 {
            let v = (i * 10 + 8) as u8;
            palette.push((v, v, v));
        }
        palette
    };
}

const ANSI_COLORS: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (224, 0, 0),
    (0, 224, 0),
    (224, 224, 0),
    (0, 0, 224),
    (224, 0, 224),
    (0, 224, 224),
    (224, 224, 224),
    (128, 128, 128),
    (255, 64, 64),
    (64, 255, 64),
    (255, 255, 64),
    (64, 64, 255),
    (255, 64, 255),
    (64, 255, 255),
    (255, 255, 255),
];

/// The engine's palette plus the two default colors. Palette slots can be
/// redefined by the host; indexed colors resolve through it.
#[derive(Clone, Debug)]
pub struct Palette {
    colors: Vec<Color>,
    default_fg: Color,
    default_bg: Color,
}

impl Default for Palette {
    fn default() -> Self {
        let colors = XTERM_256_PALETTE
            .iter()
            .map(|&(r, g, b)| Color::rgb(r, g, b))
            .collect();
        Palette {
            colors,
            default_fg: Color::rgb(240, 240, 240),
            default_bg: Color::rgb(0, 0, 0),
        }
    }
}

impl Palette {
    pub fn color(&self, index: i32) -> Color {
        let index = index.clamp(0, 255) as usize;
        self.colors[index]
    }

    pub fn set_color(&mut self, index: i32, color: Color) {
        if (0..256).contains(&index) {
            self.colors[index as usize] = color;
        }
    }

    pub fn default_fg(&self) -> Color {
        self.default_fg.as_default_fg()
    }

    pub fn default_bg(&self) -> Color {
        self.default_bg.as_default_bg()
    }

    pub fn set_defaults(&mut self, fg: Color, bg: Color) {
        self.default_fg = fg;
        self.default_bg = bg;
    }

    /// Resolve a color to its RGB value, following the default flags first
    /// and palette indices second.
    pub fn to_rgb(&self, color: Color) -> Color {
        let mut resolved = if color.is_default_fg() {
            self.default_fg
        } else if color.is_default_bg() {
            self.default_bg
        } else {
            color
        };
        if let ColorValue::Indexed(idx) = resolved.value {
            resolved.value = self.colors[idx as usize].value;
        }
        resolved.default_fg = color.default_fg;
        resolved.default_bg = color.default_bg;
        resolved
    }
}
