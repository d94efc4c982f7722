//! Host-facing callback traits.
//!
//! Every method has a default implementation returning `false` ("decline"),
//! so hosts implement only the callbacks they care about. A decline makes
//! the engine fall back to an equivalent lower-level emission where one
//! exists (scrollrect → premove + moverect + erase); otherwise the
//! operation is simply not reported.

use bitflags::bitflags;
pub use charcell_parser_core::StringFragment;

use crate::{Cell, Color, GlyphInfo, LineInfo, Position, Rect};

/// Terminal-level properties reported through `on_settermprop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermProp {
    CursorVisible,
    CursorBlink,
    AltScreen,
    Title,
    IconName,
    Reverse,
    CursorShape,
    Mouse,
    FocusReport,
}

/// Mouse tracking granularity, the value of the `Mouse` property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseProp {
    #[default]
    None = 0,
    Click = 1,
    Drag = 2,
    Move = 3,
}

/// Value carried by a terminal property change.
#[derive(Debug, Clone, Copy)]
pub enum PropValue<'a> {
    Bool(bool),
    Int(i32),
    String(StringFragment<'a>),
    Color(Color),
}

impl PropValue<'_> {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// Pen attributes reported through `on_setpenattr`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PenAttr {
    Bold,
    Underline,
    Italic,
    Blink,
    Reverse,
    Conceal,
    Strike,
    Font,
    Foreground,
    Background,
    Small,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PenValue {
    Bool(bool),
    Int(i32),
    Color(Color),
}

bitflags! {
    /// Which selection buffers an OSC 52 operation addresses.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct SelectionMask: u16 {
        const CLIPBOARD = 1 << 0;
        const PRIMARY   = 1 << 1;
        const SECONDARY = 1 << 2;
        const SELECT    = 1 << 3;
        const CUT0      = 1 << 4;
    }
}

/// Damage merge granularity for the screen layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DamageSize {
    #[default]
    Cell,
    Row,
    Screen,
    Scroll,
}

/// Consumers of abstract screen operations emitted by the state machine.
pub trait StateCallbacks {
    fn on_putglyph(&mut self, _info: &GlyphInfo<'_>, _pos: Position) -> bool {
        false
    }

    fn on_movecursor(&mut self, _pos: Position, _oldpos: Position, _visible: bool) -> bool {
        false
    }

    fn on_scrollrect(&mut self, _rect: Rect, _downward: i32, _rightward: i32) -> bool {
        false
    }

    fn on_moverect(&mut self, _dest: Rect, _src: Rect) -> bool {
        false
    }

    fn on_erase(&mut self, _rect: Rect, _selective: bool) -> bool {
        false
    }

    fn on_initpen(&mut self) -> bool {
        false
    }

    fn on_setpenattr(&mut self, _attr: PenAttr, _val: PenValue) -> bool {
        false
    }

    fn on_settermprop(&mut self, _prop: TermProp, _val: PropValue<'_>) -> bool {
        false
    }

    fn on_bell(&mut self) -> bool {
        false
    }

    fn on_resize(&mut self, _rows: i32, _cols: i32) -> bool {
        false
    }

    fn on_setlineinfo(&mut self, _row: i32, _new: LineInfo, _old: LineInfo) -> bool {
        false
    }

    fn on_sb_clear(&mut self) -> bool {
        false
    }

    /// Fires before a moverect overwrites `dest`, so hosts can snapshot the
    /// region. Only emitted when premove is enabled on the state.
    fn on_premove(&mut self, _dest: Rect) -> bool {
        false
    }
}

/// Receives sequences the state machine does not recognize.
pub trait StateFallbacks {
    fn on_control(&mut self, _byte: u8) -> bool {
        false
    }

    fn on_csi(&mut self, _leader: &[u8], _args: &[i64], _intermed: &[u8], _final_byte: u8) -> bool {
        false
    }

    fn on_osc(&mut self, _command: i32, _frag: StringFragment<'_>) -> bool {
        false
    }

    fn on_dcs(&mut self, _command: &[u8], _frag: StringFragment<'_>) -> bool {
        false
    }

    fn on_apc(&mut self, _frag: StringFragment<'_>) -> bool {
        false
    }

    fn on_pm(&mut self, _frag: StringFragment<'_>) -> bool {
        false
    }

    fn on_sos(&mut self, _frag: StringFragment<'_>) -> bool {
        false
    }
}

/// Renderer-level callbacks emitted by the screen layer.
pub trait ScreenCallbacks {
    fn on_damage(&mut self, _rect: Rect) -> bool {
        false
    }

    fn on_moverect(&mut self, _dest: Rect, _src: Rect) -> bool {
        false
    }

    fn on_movecursor(&mut self, _pos: Position, _oldpos: Position, _visible: bool) -> bool {
        false
    }

    fn on_settermprop(&mut self, _prop: TermProp, _val: PropValue<'_>) -> bool {
        false
    }

    fn on_bell(&mut self) -> bool {
        false
    }

    fn on_resize(&mut self, _rows: i32, _cols: i32) -> bool {
        false
    }

    /// A line is leaving the top of the primary buffer. Return `true` to
    /// take ownership; on decline the internal scrollback ring stores it.
    fn on_sb_pushline(&mut self, _cells: &[Cell], _continuation: bool) -> bool {
        false
    }

    /// A row was vacated at the top during a grow; fill `cells` with the
    /// youngest stored line and return `true`. On decline the internal
    /// ring is consulted.
    fn on_sb_popline(&mut self, _cells: &mut [Cell], _continuation: &mut bool) -> bool {
        false
    }

    fn on_sb_clear(&mut self) -> bool {
        false
    }
}

/// OSC 52 selection traffic.
pub trait SelectionCallbacks {
    fn on_set(&mut self, _mask: SelectionMask, _frag: StringFragment<'_>) -> bool {
        false
    }

    fn on_query(&mut self, _mask: SelectionMask) -> bool {
        false
    }
}
