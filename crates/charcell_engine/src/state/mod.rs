//! The terminal state machine.
//!
//! Consumes parser events and emits abstract screen operations through
//! [`StateCallbacks`]. Holds everything mutable except the cell grid itself:
//! cursor, pen, modes, margins, tab stops, charsets, save/restore stacks,
//! mouse and keyboard encoding state, and the reply output buffer.

mod csi;

use charcell_parser_core::StringFragment;

use crate::{
    Charset, CharsetState, CursorShape, GlyphInfo, LineInfo, MouseProp, Palette, Pen, Position,
    PropValue, Rect, SelectionHandler, StateCallbacks, StateFallbacks, TermProp, Utf8Decoder,
    char_width,
};

pub(crate) const PRIMARY: usize = 0;
pub(crate) const ALTSCREEN: usize = 1;

/// The boolean mode set (SM/RM and DECSET/DECRST).
#[derive(Clone, Copy, Debug)]
pub struct Modes {
    pub insert: bool,            // IRM, mode 4
    pub newline: bool,           // LNM, mode 20
    pub cursor: bool,            // DECCKM, mode 1
    pub screen_reverse: bool,    // DECSCNM, mode 5
    pub origin: bool,            // DECOM, mode 6
    pub autowrap: bool,          // DECAWM, mode 7
    pub cursor_blink: bool,      // mode 12
    pub cursor_visible: bool,    // DECTCEM, mode 25
    pub alt_screen: bool,        // modes 47/1047/1049
    pub left_right_margin: bool, // DECLRMM, mode 69
    pub report_focus: bool,      // mode 1004
    pub bracketpaste: bool,      // mode 2004
}

impl Default for Modes {
    fn default() -> Self {
        Modes {
            insert: false,
            newline: false,
            cursor: false,
            screen_reverse: false,
            origin: false,
            autowrap: true,
            cursor_blink: true,
            cursor_visible: true,
            alt_screen: false,
            left_right_margin: false,
            report_focus: false,
            bracketpaste: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum MouseEncoding {
    #[default]
    Default,
    Utf8, // mode 1005
    Sgr,  // mode 1006
    Rxvt, // mode 1015
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MouseState {
    pub prop: MouseProp,
    pub encoding: MouseEncoding,
    pub row: i32,
    pub col: i32,
    pub buttons: u32,
}

#[derive(Clone)]
struct SavedState {
    pos: Position,
    pen: Pen,
    origin: bool,
    autowrap: bool,
    protected: bool,
    charsets: CharsetState,
}

/// What the current DCS sequence was recognized as.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum DcsRequest {
    #[default]
    None,
    RequestStatusString(Vec<u8>),
    Unknown,
}

pub struct State {
    rows: i32,
    cols: i32,

    pub(crate) pos: Position,
    at_phantom: bool,

    pen: Pen,
    pub(crate) palette: Palette,
    bold_highbright: bool,
    protected: bool, // DECSCA

    pub mode: Modes,
    pub(crate) keypad_app: bool,
    s8c1t: bool,

    // Scroll region; `bottom`/`right` of `None` track the screen edge.
    scroll_top: i32,
    scroll_bottom: Option<i32>,
    scroll_left: i32,
    scroll_right: Option<i32>,

    tabstops: Vec<u8>,
    pub(crate) lineinfos: [Vec<LineInfo>; 2],

    charsets: CharsetState,
    utf8: bool,
    decoder: Utf8Decoder,

    saved: [Vec<SavedState>; 2],

    pub(crate) mouse: MouseState,
    cursor_shape: CursorShape,

    // Last glyph placed, for REP.
    last_chars: Vec<char>,
    last_width: i8,

    dcs: DcsRequest,
    osc_command: i32,

    pub(crate) selection: SelectionHandler,
    fallbacks: Option<Box<dyn StateFallbacks>>,

    premove_enabled: bool,
    outbuffer: Vec<u8>,
}

impl State {
    pub fn new(rows: i32, cols: i32) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let mut state = State {
            rows,
            cols,
            pos: Position::default(),
            at_phantom: false,
            pen: Pen::default(),
            palette: Palette::default(),
            bold_highbright: false,
            protected: false,
            mode: Modes::default(),
            keypad_app: false,
            s8c1t: false,
            scroll_top: 0,
            scroll_bottom: None,
            scroll_left: 0,
            scroll_right: None,
            tabstops: Vec::new(),
            lineinfos: [
                vec![LineInfo::default(); rows as usize],
                vec![LineInfo::default(); rows as usize],
            ],
            charsets: CharsetState::default(),
            utf8: true,
            decoder: Utf8Decoder::new(),
            saved: [Vec::new(), Vec::new()],
            mouse: MouseState::default(),
            cursor_shape: CursorShape::Block,
            last_chars: Vec::new(),
            last_width: 0,
            dcs: DcsRequest::None,
            osc_command: -1,
            selection: SelectionHandler::default(),
            fallbacks: None,
            premove_enabled: false,
            outbuffer: Vec::new(),
        };
        state.pen.reset(&state.palette);
        state.reset_tabstops();
        state
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn cursor_pos(&self) -> Position {
        self.pos
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub fn utf8(&self) -> bool {
        self.utf8
    }

    pub fn set_utf8(&mut self, utf8: bool) {
        self.utf8 = utf8;
        self.decoder.reset();
    }

    pub fn enable_premove(&mut self) {
        self.premove_enabled = true;
    }

    pub fn set_bold_highbright(&mut self, enabled: bool) {
        self.bold_highbright = enabled;
    }

    pub fn set_fallbacks(&mut self, fallbacks: Box<dyn StateFallbacks>) {
        self.fallbacks = Some(fallbacks);
    }

    pub fn clear_fallbacks(&mut self) {
        self.fallbacks = None;
    }

    pub fn get_lineinfo(&self, row: i32) -> LineInfo {
        let buffer = usize::from(self.mode.alt_screen);
        self.lineinfos[buffer]
            .get(row.max(0) as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn get_palette_color(&self, index: i32) -> crate::Color {
        self.palette.color(index)
    }

    pub fn set_palette_color(&mut self, index: i32, color: crate::Color) {
        self.palette.set_color(index, color);
    }

    pub fn get_default_colors(&self) -> (crate::Color, crate::Color) {
        (self.palette.default_fg(), self.palette.default_bg())
    }

    pub fn set_default_colors(&mut self, fg: crate::Color, bg: crate::Color) {
        self.palette.set_defaults(fg, bg);
        self.pen.fg = self.palette.default_fg();
        self.pen.bg = self.palette.default_bg();
    }

    pub fn convert_color_to_rgb(&self, color: crate::Color) -> crate::Color {
        self.palette.to_rgb(color)
    }

    /// Drain the bytes queued for the host output sink (query replies,
    /// keyboard and mouse reports).
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbuffer)
    }

    pub(crate) fn has_output(&self) -> bool {
        !self.outbuffer.is_empty()
    }

    // --- Output helpers ---

    pub(crate) fn push_output(&mut self, bytes: &[u8]) {
        self.outbuffer.extend_from_slice(bytes);
    }

    /// CSI-prefixed reply, honoring S8C1T.
    pub(crate) fn output_csi(&mut self, rest: &str) {
        if self.s8c1t {
            self.outbuffer.push(0x9B);
        } else {
            self.outbuffer.extend_from_slice(b"\x1b[");
        }
        self.outbuffer.extend_from_slice(rest.as_bytes());
    }

    /// DCS-wrapped reply, honoring S8C1T.
    pub(crate) fn output_dcs(&mut self, body: &str) {
        if self.s8c1t {
            self.outbuffer.push(0x90);
        } else {
            self.outbuffer.extend_from_slice(b"\x1bP");
        }
        self.outbuffer.extend_from_slice(body.as_bytes());
        if self.s8c1t {
            self.outbuffer.push(0x9C);
        } else {
            self.outbuffer.extend_from_slice(b"\x1b\\");
        }
    }

    // --- Geometry helpers ---

    pub(crate) fn region_top(&self) -> i32 {
        self.scroll_top
    }

    pub(crate) fn region_bottom(&self) -> i32 {
        self.scroll_bottom.unwrap_or(self.rows).min(self.rows)
    }

    pub(crate) fn region_left(&self) -> i32 {
        if self.mode.left_right_margin {
            self.scroll_left
        } else {
            0
        }
    }

    pub(crate) fn region_right(&self) -> i32 {
        if self.mode.left_right_margin {
            self.scroll_right.unwrap_or(self.cols).min(self.cols)
        } else {
            self.cols
        }
    }

    pub(crate) fn scroll_region(&self) -> Rect {
        Rect::new(
            self.region_top(),
            self.region_bottom(),
            self.region_left(),
            self.region_right(),
        )
    }

    fn buffer_index(&self) -> usize {
        usize::from(self.mode.alt_screen)
    }

    pub(crate) fn lineinfo(&self, row: i32) -> LineInfo {
        self.get_lineinfo(row)
    }

    fn lineinfo_mut(&mut self, row: i32) -> &mut LineInfo {
        let buffer = usize::from(self.mode.alt_screen);
        &mut self.lineinfos[buffer][row.clamp(0, self.rows - 1) as usize]
    }

    /// Columns available on a row: half for double-width lines.
    pub(crate) fn row_width(&self, row: i32) -> i32 {
        if self.lineinfo(row).doublewidth {
            self.cols / 2
        } else {
            self.cols
        }
    }

    fn observe_cursor(&mut self, oldpos: Position, sink: &mut dyn StateCallbacks) {
        if self.pos != oldpos {
            sink.on_movecursor(self.pos, oldpos, self.mode.cursor_visible);
        }
    }

    // --- Parser event entry points ---

    pub(crate) fn on_text(&mut self, bytes: &[u8], sink: &mut dyn StateCallbacks) -> usize {
        let mut chars = Vec::with_capacity(bytes.len());
        if self.utf8 {
            let decoder = &mut self.decoder;
            for &b in bytes {
                decoder.feed(b, &mut |c| chars.push(c));
            }
        } else {
            for &b in bytes {
                chars.push(self.charsets.decode(b));
            }
        }
        for ch in chars {
            self.put_char(ch, sink);
        }
        bytes.len()
    }

    pub(crate) fn on_control(&mut self, byte: u8, sink: &mut dyn StateCallbacks) {
        let oldpos = self.pos;
        match byte {
            0x07 => {
                sink.on_bell();
            }
            0x08 => {
                // BS stops at the left margin.
                if self.pos.col > self.region_left() {
                    self.pos.col -= 1;
                }
                self.at_phantom = false;
            }
            0x09 => self.tab_forward(),
            0x0A | 0x0B | 0x0C => {
                self.index(sink);
                if self.mode.newline {
                    self.carriage_return();
                }
            }
            0x0D => self.carriage_return(),
            0x0E => self.charsets.lock_gl(1), // SO
            0x0F => self.charsets.lock_gl(0), // SI
            0x85 => {
                // NEL
                self.carriage_return();
                self.index(sink);
            }
            0x84 => self.index(sink),     // IND
            0x8D => self.reverse_index(sink), // RI
            0x88 => self.tab_set(),       // HTS
            _ => {
                if let Some(fb) = self.fallbacks.as_mut() {
                    if fb.on_control(byte) {
                        return;
                    }
                }
                log::debug!("unhandled control 0x{byte:02x}");
            }
        }
        self.observe_cursor(oldpos, sink);
    }

    pub(crate) fn on_escape(&mut self, bytes: &[u8], sink: &mut dyn StateCallbacks) {
        let oldpos = self.pos;
        match bytes {
            [b'7'] => self.save_cursor(),
            [b'8'] => self.restore_cursor(sink),
            [b'='] => self.keypad_app = true,
            [b'>'] => self.keypad_app = false,
            [b'D'] => self.index(sink),
            [b'E'] => {
                self.carriage_return();
                self.index(sink);
            }
            [b'H'] => self.tab_set(),
            [b'M'] => self.reverse_index(sink),
            [b'c'] => self.reset(true, sink),
            [b'n'] => self.charsets.lock_gl(2),
            [b'o'] => self.charsets.lock_gl(3),
            [b'~'] => self.charsets.lock_gr(1),
            [b'}'] => self.charsets.lock_gr(2),
            [b'|'] => self.charsets.lock_gr(3),
            [b'N'] => self.charsets.single_shift(2),
            [b'O'] => self.charsets.single_shift(3),
            [b' ', b'F'] => self.s8c1t = false,
            [b' ', b'G'] => self.s8c1t = true,
            [b'\\'] => {} // stray ST
            [designator @ (b'(' | b')' | b'*' | b'+'), final_byte] => {
                let slot = match *designator {
                    b'(' => 0,
                    b')' => 1,
                    b'*' => 2,
                    _ => 3,
                };
                match Charset::from_designator(*final_byte) {
                    Some(charset) => self.charsets.designate(slot, charset),
                    None => {
                        log::warn!("unknown charset designator {:?}", *final_byte as char);
                        self.charsets.designate(slot, Charset::Ascii);
                    }
                }
            }
            [b'#', line_cmd] => self.escape_dec_line(*line_cmd, sink),
            _ => log::debug!("unhandled escape sequence {bytes:?}"),
        }
        self.observe_cursor(oldpos, sink);
    }

    fn escape_dec_line(&mut self, cmd: u8, sink: &mut dyn StateCallbacks) {
        match cmd {
            b'3'..=b'6' => {
                let row = self.pos.row;
                let old = self.lineinfo(row);
                let mut new = old;
                match cmd {
                    b'3' => {
                        new.doublewidth = true;
                        new.doubleheight = 1;
                    }
                    b'4' => {
                        new.doublewidth = true;
                        new.doubleheight = 2;
                    }
                    b'5' => {
                        new.doublewidth = false;
                        new.doubleheight = 0;
                    }
                    _ => {
                        new.doublewidth = true;
                        new.doubleheight = 0;
                    }
                }
                if new != old {
                    *self.lineinfo_mut(row) = new;
                    sink.on_setlineinfo(row, new, old);
                    // The cursor cannot sit beyond the shortened row.
                    let width = self.row_width(row);
                    if self.pos.col >= width {
                        self.pos.col = width - 1;
                        self.at_phantom = false;
                    }
                }
            }
            b'8' => self.screen_alignment(sink),
            _ => log::debug!("unhandled ESC # {}", cmd as char),
        }
    }

    /// DECALN: fill the screen with 'E' in the default pen.
    fn screen_alignment(&mut self, sink: &mut dyn StateCallbacks) {
        let saved_pen = self.pen;
        self.pen.reset(&self.palette);
        let chars = ['E'];
        for row in 0..self.rows {
            for col in 0..self.cols {
                let info = GlyphInfo {
                    chars: &chars,
                    width: 1,
                    protected: false,
                    dwl: false,
                    dhl: 0,
                };
                sink.on_putglyph(&info, Position::new(row, col));
            }
        }
        self.pen = saved_pen;
        self.pos = Position::default();
        self.at_phantom = false;
    }

    // --- Glyph placement ---

    fn put_char(&mut self, ch: char, sink: &mut dyn StateCallbacks) {
        let width = char_width(ch);
        if width == 0 {
            self.combine_char(ch, sink);
            return;
        }
        self.last_chars.clear();
        self.last_chars.push(ch);
        self.last_width = width;
        self.place_last_glyph(sink);
    }

    /// Append a combining mark to the most recently placed glyph and
    /// re-report that cell. With nothing placed yet the mark is dropped.
    fn combine_char(&mut self, ch: char, sink: &mut dyn StateCallbacks) {
        if self.last_chars.is_empty() {
            return;
        }
        if self.last_chars.len() >= crate::MAX_CHARS_PER_CELL {
            return;
        }
        self.last_chars.push(ch);

        // The base glyph sits behind the cursor, or under it while the
        // pending-wrap state holds the cursor on the cell.
        let col = if self.at_phantom {
            self.pos.col
        } else {
            self.pos.col - i32::from(self.last_width)
        };
        if col < 0 {
            return;
        }
        let row = self.pos.row;
        let lineinfo = self.lineinfo(row);
        let info = GlyphInfo {
            chars: &self.last_chars,
            width: self.last_width,
            protected: self.protected,
            dwl: lineinfo.doublewidth,
            dhl: lineinfo.doubleheight,
        };
        sink.on_putglyph(&info, Position::new(row, col));
    }

    fn place_last_glyph(&mut self, sink: &mut dyn StateCallbacks) {
        let oldpos = self.pos;
        let width = i32::from(self.last_width);

        let row_width = self.row_width(self.pos.row);
        if self.at_phantom || self.pos.col + width > row_width {
            if self.mode.autowrap {
                self.index_for_wrap(sink);
                self.pos.col = 0;
                self.at_phantom = false;
                self.set_continuation(self.pos.row, true, sink);
            } else {
                self.pos.col = (row_width - width).max(0);
            }
        }

        if self.mode.insert {
            let rect = Rect::row_span(self.pos.row, self.pos.col, self.region_right());
            self.scrollrect(rect, 0, -width, sink);
        }

        let lineinfo = self.lineinfo(self.pos.row);
        let info = GlyphInfo {
            chars: &self.last_chars,
            width: self.last_width,
            protected: self.protected,
            dwl: lineinfo.doublewidth,
            dhl: lineinfo.doubleheight,
        };
        sink.on_putglyph(&info, self.pos);

        let row_width = self.row_width(self.pos.row);
        if self.pos.col + width >= row_width {
            if self.mode.autowrap {
                self.pos.col = row_width - width;
                self.at_phantom = true;
            }
        } else {
            self.pos.col += width;
        }
        self.observe_cursor(oldpos, sink);
    }

    /// REP: repeat the last placed glyph, stopping at the line end.
    pub(crate) fn repeat_last_glyph(&mut self, mut count: i64, sink: &mut dyn StateCallbacks) {
        if self.last_chars.is_empty() {
            return;
        }
        while count > 0 {
            if self.at_phantom {
                break;
            }
            self.place_last_glyph(sink);
            count -= 1;
        }
    }

    // --- Cursor flow ---

    pub(crate) fn carriage_return(&mut self) {
        self.at_phantom = false;
        let left = self.region_left();
        self.pos.col = if self.pos.col >= left { left } else { 0 };
    }

    /// Move down one row, scrolling when the cursor sits on the bottom
    /// margin of the scroll region.
    pub(crate) fn index(&mut self, sink: &mut dyn StateCallbacks) {
        self.at_phantom = false;
        if self.pos.row + 1 == self.region_bottom() {
            let rect = self.scroll_region();
            self.scrollrect(rect, 1, 0, sink);
        } else if self.pos.row + 1 < self.rows {
            self.pos.row += 1;
        }
    }

    /// Index performed because of autowrap; scrolling through the region
    /// marks continuation via the caller.
    fn index_for_wrap(&mut self, sink: &mut dyn StateCallbacks) {
        self.index(sink);
    }

    pub(crate) fn reverse_index(&mut self, sink: &mut dyn StateCallbacks) {
        self.at_phantom = false;
        if self.pos.row == self.region_top() {
            let rect = self.scroll_region();
            self.scrollrect(rect, -1, 0, sink);
        } else if self.pos.row > 0 {
            self.pos.row -= 1;
        }
    }

    // --- Tab stops ---

    pub(crate) fn reset_tabstops(&mut self) {
        let words = (self.cols as usize).div_ceil(8);
        self.tabstops = vec![0; words];
        let mut col = 0;
        while col < self.cols {
            self.set_tabstop(col);
            col += 8;
        }
    }

    pub(crate) fn set_tabstop(&mut self, col: i32) {
        if (0..self.cols).contains(&col) {
            self.tabstops[(col / 8) as usize] |= 1 << (col % 8);
        }
    }

    pub(crate) fn clear_tabstop(&mut self, col: i32) {
        if (0..self.cols).contains(&col) {
            self.tabstops[(col / 8) as usize] &= !(1 << (col % 8));
        }
    }

    pub(crate) fn clear_all_tabstops(&mut self) {
        self.tabstops.iter_mut().for_each(|w| *w = 0);
    }

    pub(crate) fn is_tabstop(&self, col: i32) -> bool {
        if !(0..self.cols).contains(&col) {
            return false;
        }
        self.tabstops[(col / 8) as usize] & (1 << (col % 8)) != 0
    }

    fn tab_set(&mut self) {
        self.set_tabstop(self.pos.col);
    }

    pub(crate) fn tab_forward(&mut self) {
        self.at_phantom = false;
        let limit = self.row_width(self.pos.row) - 1;
        let mut col = self.pos.col;
        while col < limit {
            col += 1;
            if self.is_tabstop(col) {
                break;
            }
        }
        self.pos.col = col.min(limit);
    }

    pub(crate) fn tab_backward(&mut self) {
        self.at_phantom = false;
        let mut col = self.pos.col;
        while col > 0 {
            col -= 1;
            if self.is_tabstop(col) {
                break;
            }
        }
        self.pos.col = col;
    }

    // --- Scroll / erase primitives ---

    /// Report an area-shifting operation. `downward > 0` shifts content up,
    /// `rightward > 0` shifts content left. Falls back to premove + moverect
    /// + erase when the host declines the scrollrect.
    pub(crate) fn scrollrect(
        &mut self,
        mut rect: Rect,
        downward: i32,
        rightward: i32,
        sink: &mut dyn StateCallbacks,
    ) {
        rect.clip(&Rect::new(0, self.rows, 0, self.cols));
        if rect.is_empty() {
            return;
        }
        let downward = downward.clamp(-rect.height(), rect.height());
        let rightward = rightward.clamp(-rect.width(), rect.width());
        if downward == 0 && rightward == 0 {
            return;
        }

        // Line display attributes travel with full-width row scrolls.
        if rightward == 0 && rect.start_col == 0 && rect.end_col == self.cols {
            self.scroll_lineinfo(&rect, downward);
        }

        if !sink.on_scrollrect(rect, downward, rightward) {
            // Shifting by the full extent leaves nothing to move.
            if downward.abs() >= rect.height() || rightward.abs() >= rect.width() {
                self.erase(rect, false, sink);
                return;
            }
            let mut src = rect;
            let mut dest = rect;
            if downward > 0 {
                src.start_row += downward;
                dest.end_row -= downward;
            } else {
                src.end_row += downward;
                dest.start_row -= downward;
            }
            if rightward > 0 {
                src.start_col += rightward;
                dest.end_col -= rightward;
            } else {
                src.end_col += rightward;
                dest.start_col -= rightward;
            }

            // The strip of `dest` that `src` does not re-cover is lost.
            let lost = if downward > 0 {
                Rect::new(rect.start_row, rect.start_row + downward, rect.start_col, rect.end_col)
            } else if downward < 0 {
                Rect::new(rect.end_row + downward, rect.end_row, rect.start_col, rect.end_col)
            } else if rightward > 0 {
                Rect::new(rect.start_row, rect.end_row, rect.start_col, rect.start_col + rightward)
            } else {
                Rect::new(rect.start_row, rect.end_row, rect.end_col + rightward, rect.end_col)
            };
            if self.premove_enabled {
                sink.on_premove(lost);
            }
            sink.on_moverect(dest, src);

            let freed = if downward > 0 {
                Rect::new(rect.end_row - downward, rect.end_row, rect.start_col, rect.end_col)
            } else if downward < 0 {
                Rect::new(rect.start_row, rect.start_row - downward, rect.start_col, rect.end_col)
            } else if rightward > 0 {
                Rect::new(rect.start_row, rect.end_row, rect.end_col - rightward, rect.end_col)
            } else {
                Rect::new(rect.start_row, rect.end_row, rect.start_col, rect.start_col - rightward)
            };
            self.erase(freed, false, sink);
        }
    }

    fn scroll_lineinfo(&mut self, rect: &Rect, downward: i32) {
        let buffer = self.buffer_index();
        let infos = &mut self.lineinfos[buffer];
        let top = rect.start_row as usize;
        let bottom = rect.end_row as usize;
        if downward > 0 {
            let n = downward as usize;
            infos[top..bottom].rotate_left(n);
            for info in &mut infos[bottom - n..bottom] {
                *info = LineInfo::default();
            }
        } else {
            let n = (-downward) as usize;
            infos[top..bottom].rotate_right(n);
            for info in &mut infos[top..top + n] {
                *info = LineInfo::default();
            }
        }
    }

    /// Report an erase. Erasing through the end of a row cancels the
    /// continuation marker on the following row.
    pub(crate) fn erase(&mut self, mut rect: Rect, selective: bool, sink: &mut dyn StateCallbacks) {
        rect.clip(&Rect::new(0, self.rows, 0, self.cols));
        if rect.is_empty() {
            return;
        }
        sink.on_erase(rect, selective);
        if rect.end_col == self.cols {
            for row in rect.start_row + 1..=rect.end_row {
                if row < self.rows {
                    self.set_continuation(row, false, sink);
                }
            }
        }
    }

    fn set_continuation(&mut self, row: i32, value: bool, sink: &mut dyn StateCallbacks) {
        let old = self.lineinfo(row);
        if old.continuation != value {
            let mut new = old;
            new.continuation = value;
            *self.lineinfo_mut(row) = new;
            sink.on_setlineinfo(row, new, old);
        }
    }

    // --- Save / restore ---

    pub(crate) fn save_cursor(&mut self) {
        let saved = SavedState {
            pos: self.pos,
            pen: self.pen,
            origin: self.mode.origin,
            autowrap: self.mode.autowrap,
            protected: self.protected,
            charsets: self.charsets.save(),
        };
        self.saved[self.buffer_index()].push(saved);
    }

    pub(crate) fn restore_cursor(&mut self, sink: &mut dyn StateCallbacks) {
        let oldpos = self.pos;
        match self.saved[self.buffer_index()].pop() {
            Some(saved) => {
                self.pos = saved.pos;
                self.pen = saved.pen;
                self.mode.origin = saved.origin;
                self.mode.autowrap = saved.autowrap;
                self.protected = saved.protected;
                self.charsets = saved.charsets;
            }
            None => {
                self.pos = Position::default();
                self.pen.reset(&self.palette);
                self.mode.origin = false;
                self.mode.autowrap = true;
                self.protected = false;
                self.charsets.reset();
            }
        }
        self.pos.row = self.pos.row.clamp(0, self.rows - 1);
        self.pos.col = self.pos.col.clamp(0, self.cols - 1);
        self.at_phantom = false;
        self.observe_cursor(oldpos, sink);
    }

    // --- Reset ---

    pub fn reset(&mut self, hard: bool, sink: &mut dyn StateCallbacks) {
        let oldpos = self.pos;
        self.pen.reset(&self.palette);
        sink.on_initpen();
        self.protected = false;
        self.mode.origin = false;
        self.mode.autowrap = true;
        self.mode.insert = false;
        self.mouse = MouseState::default();
        self.scroll_top = 0;
        self.scroll_bottom = None;
        self.scroll_left = 0;
        self.scroll_right = None;
        self.at_phantom = false;

        if !hard {
            // DECSTR restores cursor visibility but leaves the screen and
            // cursor position alone.
            if !self.mode.cursor_visible {
                self.mode.cursor_visible = true;
                sink.on_settermprop(TermProp::CursorVisible, PropValue::Bool(true));
            }
            return;
        }

        if self.mode.alt_screen {
            sink.on_settermprop(TermProp::AltScreen, PropValue::Bool(false));
        }
        self.mode = Modes::default();
        self.keypad_app = false;
        self.s8c1t = false;
        self.charsets.reset();
        self.decoder.reset();
        self.reset_tabstops();
        self.saved = [Vec::new(), Vec::new()];
        self.last_chars.clear();
        self.cursor_shape = CursorShape::Block;
        for infos in &mut self.lineinfos {
            infos.iter_mut().for_each(|i| *i = LineInfo::default());
        }

        self.pos = Position::default();
        self.erase(Rect::new(0, self.rows, 0, self.cols), false, sink);

        sink.on_settermprop(TermProp::CursorVisible, PropValue::Bool(true));
        sink.on_settermprop(TermProp::CursorBlink, PropValue::Bool(true));
        sink.on_settermprop(
            TermProp::CursorShape,
            PropValue::Int(CursorShape::Block as i32),
        );
        self.observe_cursor(oldpos, sink);
    }

    // --- Focus reporting ---

    pub fn focus_in(&mut self) {
        if self.mode.report_focus {
            self.output_csi("I");
        }
    }

    pub fn focus_out(&mut self) {
        if self.mode.report_focus {
            self.output_csi("O");
        }
    }

    // --- String sequences ---

    pub(crate) fn on_osc(&mut self, command: i32, frag: StringFragment<'_>, sink: &mut dyn StateCallbacks) {
        if frag.initial {
            self.osc_command = command;
        }
        match self.osc_command {
            0 => {
                sink.on_settermprop(TermProp::IconName, PropValue::String(frag));
                sink.on_settermprop(TermProp::Title, PropValue::String(frag));
            }
            1 => {
                sink.on_settermprop(TermProp::IconName, PropValue::String(frag));
            }
            2 => {
                sink.on_settermprop(TermProp::Title, PropValue::String(frag));
            }
            52 => {
                let reply = self.selection.on_osc_fragment(frag);
                if let Some(bytes) = reply {
                    self.push_output(&bytes);
                }
            }
            _ => {
                if let Some(fb) = self.fallbacks.as_mut() {
                    fb.on_osc(command, frag);
                }
            }
        }
    }

    pub(crate) fn on_dcs(&mut self, command: &[u8], frag: StringFragment<'_>, _sink: &mut dyn StateCallbacks) {
        if frag.initial {
            self.dcs = if command == b"$q" {
                DcsRequest::RequestStatusString(Vec::new())
            } else {
                DcsRequest::Unknown
            };
        }
        let mut dcs = std::mem::take(&mut self.dcs);
        match &mut dcs {
            DcsRequest::RequestStatusString(buf) => {
                if buf.len() + frag.bytes.len() <= 16 {
                    buf.extend_from_slice(frag.bytes);
                }
                if frag.is_final {
                    self.reply_status_string(buf);
                    dcs = DcsRequest::None;
                }
            }
            _ => {
                if let Some(fb) = self.fallbacks.as_mut() {
                    fb.on_dcs(command, frag);
                }
                if frag.is_final {
                    dcs = DcsRequest::None;
                }
            }
        }
        self.dcs = dcs;
    }

    /// DECRQSS: echo the current value of the requested setting.
    fn reply_status_string(&mut self, selector: &[u8]) {
        let value = match selector {
            [b'm'] => Some(format!("{}m", self.pen.sgr_params())),
            [b'r'] => Some(format!(
                "{};{}r",
                self.region_top() + 1,
                self.region_bottom()
            )),
            [b's'] => Some(format!(
                "{};{}s",
                self.scroll_left + 1,
                self.scroll_right.unwrap_or(self.cols)
            )),
            [b' ', b'q'] => {
                let shape = self.cursor_shape as i32;
                let value = shape * 2 - i32::from(self.mode.cursor_blink);
                Some(format!("{value} q"))
            }
            [b'"', b'q'] => Some(format!("{}\"q", i32::from(self.protected))),
            _ => None,
        };
        match value {
            Some(value) => self.output_dcs(&format!("1$r{value}")),
            None => self.output_dcs("0$r"),
        }
    }

    pub(crate) fn on_apc(&mut self, frag: StringFragment<'_>) {
        if let Some(fb) = self.fallbacks.as_mut() {
            fb.on_apc(frag);
        }
    }

    pub(crate) fn on_pm(&mut self, frag: StringFragment<'_>) {
        if let Some(fb) = self.fallbacks.as_mut() {
            fb.on_pm(frag);
        }
    }

    pub(crate) fn on_sos(&mut self, frag: StringFragment<'_>) {
        if let Some(fb) = self.fallbacks.as_mut() {
            fb.on_sos(frag);
        }
    }

    // --- Pen plumbing used by the CSI layer ---

    pub(crate) fn apply_sgr(&mut self, args: &[i64], sink: &mut dyn StateCallbacks) {
        let mut pen = self.pen;
        pen.apply_sgr(args, &self.palette, self.bold_highbright, &mut |attr, val| {
            sink.on_setpenattr(attr, val);
        });
        self.pen = pen;
    }

    pub(crate) fn set_cursor_shape(&mut self, shape: CursorShape, blink: bool, sink: &mut dyn StateCallbacks) {
        self.cursor_shape = shape;
        self.mode.cursor_blink = blink;
        sink.on_settermprop(TermProp::CursorBlink, PropValue::Bool(blink));
        sink.on_settermprop(TermProp::CursorShape, PropValue::Int(shape as i32));
    }

    pub(crate) fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
    }

    pub(crate) fn set_scroll_region(
        &mut self,
        top: i32,
        bottom: Option<i32>,
        left: i32,
        right: Option<i32>,
    ) {
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.scroll_left = left;
        self.scroll_right = right;
    }

    pub(crate) fn stored_lr_margins(&self) -> (i32, Option<i32>) {
        (self.scroll_left, self.scroll_right)
    }

    /// Move the cursor to the scroll-region origin (DECOM) or the absolute
    /// origin.
    pub(crate) fn home_cursor(&mut self) {
        self.at_phantom = false;
        if self.mode.origin {
            self.pos = Position::new(self.region_top(), self.region_left());
        } else {
            self.pos = Position::default();
        }
    }

    // --- Resize ---

    /// Adjust cursor-level state before the screen reflows its grid.
    pub(crate) fn resize_begin(&mut self, new_rows: i32, new_cols: i32) {
        if self.at_phantom && new_cols > self.cols {
            self.at_phantom = false;
            self.pos.col = self.cols;
        }
        let _ = new_rows;
    }

    /// Complete a resize after the screen moved its content.
    pub(crate) fn resize_finish(&mut self, new_rows: i32, new_cols: i32, sink: &mut dyn StateCallbacks) {
        let oldpos = self.pos;
        let grew_cols = new_cols > self.cols;
        self.rows = new_rows;
        self.cols = new_cols;

        for infos in &mut self.lineinfos {
            infos.resize(new_rows as usize, LineInfo::default());
        }

        if grew_cols || self.tabstops.len() * 8 < new_cols as usize {
            let old_len = self.tabstops.len() * 8;
            self.tabstops.resize((new_cols as usize).div_ceil(8), 0);
            let mut col = 0;
            while col < new_cols {
                if col >= old_len as i32 && col % 8 == 0 {
                    self.set_tabstop(col);
                }
                col += 1;
            }
        }

        // Margins tracking the screen edge keep doing so; explicit margins
        // clamp.
        if let Some(bottom) = self.scroll_bottom {
            if bottom > new_rows || self.scroll_top >= new_rows {
                self.scroll_top = 0;
                self.scroll_bottom = None;
            }
        }
        if let Some(right) = self.scroll_right {
            if right > new_cols || self.scroll_left >= new_cols {
                self.scroll_left = 0;
                self.scroll_right = None;
            }
        }

        self.pos.row = self.pos.row.clamp(0, new_rows - 1);
        self.pos.col = self.pos.col.clamp(0, new_cols - 1);
        sink.on_resize(new_rows, new_cols);
        self.observe_cursor(oldpos, sink);
    }
}
