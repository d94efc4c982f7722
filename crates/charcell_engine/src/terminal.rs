//! The terminal facade: owns the parser, state, screen and scrollback, and
//! performs all cross-component dispatch for a write call.

use charcell_parser_core::{Parser, ParserEvents, StringFragment};

use crate::{
    DamageSize, Key, Modifier, Position, Screen, Scrollback, SelectionCallbacks, State,
    StateCallbacks, StateFallbacks,
};

/// Fans one state operation out to the host's state callbacks and the
/// screen. The host's return value only drives the scrollrect fallback; the
/// screen applies each operation exactly once either way.
struct EngineSink<'a> {
    host: Option<&'a mut (dyn StateCallbacks + 'static)>,
    screen: &'a mut Screen,
    scrollback: &'a mut Scrollback,
    in_scroll_fallback: bool,
}

impl StateCallbacks for EngineSink<'_> {
    fn on_putglyph(&mut self, info: &crate::GlyphInfo<'_>, pos: Position) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_putglyph(info, pos),
            None => false,
        };
        self.screen.apply_putglyph(info, pos);
        handled
    }

    fn on_movecursor(&mut self, pos: Position, oldpos: Position, visible: bool) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_movecursor(pos, oldpos, visible),
            None => false,
        };
        self.screen.apply_movecursor(pos, oldpos, visible);
        handled
    }

    fn on_scrollrect(&mut self, rect: crate::Rect, downward: i32, rightward: i32) -> bool {
        let host_handled = match self.host.as_mut() {
            Some(cb) => {
                if cb.on_scrollrect(rect, downward, rightward) {
                    true
                } else {
                    // The host wants the moverect + erase fallback; those
                    // emissions must not hit the screen a second time.
                    self.in_scroll_fallback = true;
                    false
                }
            }
            None => true,
        };
        self.screen
            .apply_scrollrect(rect, downward, rightward, self.scrollback);
        host_handled
    }

    fn on_moverect(&mut self, dest: crate::Rect, src: crate::Rect) -> bool {
        match self.host.as_mut() {
            Some(cb) => cb.on_moverect(dest, src),
            None => false,
        }
    }

    fn on_premove(&mut self, dest: crate::Rect) -> bool {
        match self.host.as_mut() {
            Some(cb) => cb.on_premove(dest),
            None => false,
        }
    }

    fn on_erase(&mut self, rect: crate::Rect, selective: bool) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_erase(rect, selective),
            None => false,
        };
        if self.in_scroll_fallback {
            self.in_scroll_fallback = false;
        } else {
            self.screen.apply_erase(rect, selective);
        }
        handled
    }

    fn on_initpen(&mut self) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_initpen(),
            None => false,
        };
        self.screen.apply_initpen();
        handled
    }

    fn on_setpenattr(&mut self, attr: crate::PenAttr, val: crate::PenValue) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_setpenattr(attr, val),
            None => false,
        };
        self.screen.apply_setpenattr(attr, val);
        handled
    }

    fn on_settermprop(&mut self, prop: crate::TermProp, val: crate::PropValue<'_>) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_settermprop(prop, val),
            None => false,
        };
        self.screen.apply_settermprop(prop, &val);
        handled
    }

    fn on_bell(&mut self) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_bell(),
            None => false,
        };
        self.screen.apply_bell();
        handled
    }

    fn on_resize(&mut self, rows: i32, cols: i32) -> bool {
        match self.host.as_mut() {
            Some(cb) => cb.on_resize(rows, cols),
            None => false,
        }
    }

    fn on_setlineinfo(&mut self, row: i32, new: crate::LineInfo, old: crate::LineInfo) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_setlineinfo(row, new, old),
            None => false,
        };
        self.screen.apply_setlineinfo(row, new);
        handled
    }

    fn on_sb_clear(&mut self) -> bool {
        let handled = match self.host.as_mut() {
            Some(cb) => cb.on_sb_clear(),
            None => false,
        };
        if !handled {
            self.screen.apply_sb_clear(self.scrollback);
        }
        handled
    }
}

/// Adapts parser events onto the state machine.
struct StateDriver<'a, 'b> {
    state: &'a mut State,
    sink: &'a mut EngineSink<'b>,
}

impl ParserEvents for StateDriver<'_, '_> {
    fn text(&mut self, bytes: &[u8]) -> usize {
        self.state.on_text(bytes, self.sink)
    }

    fn control(&mut self, byte: u8) {
        self.state.on_control(byte, self.sink);
    }

    fn escape(&mut self, bytes: &[u8]) {
        self.state.on_escape(bytes, self.sink);
    }

    fn csi(&mut self, leader: &[u8], args: &[i64], intermed: &[u8], final_byte: u8) {
        self.state.on_csi(leader, args, intermed, final_byte, self.sink);
    }

    fn osc(&mut self, command: i32, frag: StringFragment<'_>) {
        self.state.on_osc(command, frag, self.sink);
    }

    fn dcs(&mut self, command: &[u8], frag: StringFragment<'_>) {
        self.state.on_dcs(command, frag, self.sink);
    }

    fn apc(&mut self, frag: StringFragment<'_>) {
        self.state.on_apc(frag);
    }

    fn pm(&mut self, frag: StringFragment<'_>) {
        self.state.on_pm(frag);
    }

    fn sos(&mut self, frag: StringFragment<'_>) {
        self.state.on_sos(frag);
    }
}

pub struct Terminal {
    parser: Parser,
    state: State,
    screen: Screen,
    scrollback: Scrollback,
    state_callbacks: Option<Box<dyn StateCallbacks>>,
    parser_callbacks: Option<Box<dyn ParserEvents>>,
    output_callback: Option<Box<dyn FnMut(&[u8])>>,
}

impl Terminal {
    pub fn new(rows: i32, cols: i32) -> Self {
        let mut state = State::new(rows, cols);
        state.set_utf8(false);
        Terminal {
            parser: Parser::new(false),
            state,
            screen: Screen::new(rows, cols),
            scrollback: Scrollback::new(0),
            state_callbacks: None,
            parser_callbacks: None,
            output_callback: None,
        }
    }

    pub fn rows(&self) -> i32 {
        self.state.rows()
    }

    pub fn cols(&self) -> i32 {
        self.state.cols()
    }

    pub fn utf8(&self) -> bool {
        self.parser.utf8()
    }

    pub fn set_utf8(&mut self, enabled: bool) {
        self.parser.set_utf8(enabled);
        self.state.set_utf8(enabled);
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn set_scrollback_capacity(&mut self, capacity: usize) {
        self.scrollback.set_capacity(capacity);
    }

    // --- Callback registration ---

    pub fn set_state_callbacks(&mut self, callbacks: Box<dyn StateCallbacks>) {
        self.state_callbacks = Some(callbacks);
    }

    pub fn clear_state_callbacks(&mut self) {
        self.state_callbacks = None;
    }

    pub fn set_state_fallbacks(&mut self, fallbacks: Box<dyn StateFallbacks>) {
        self.state.set_fallbacks(fallbacks);
    }

    /// Host parser callbacks bypass the state machine entirely.
    pub fn set_parser_callbacks(&mut self, callbacks: Box<dyn ParserEvents>) {
        self.parser_callbacks = Some(callbacks);
    }

    pub fn clear_parser_callbacks(&mut self) {
        self.parser_callbacks = None;
    }

    pub fn set_screen_callbacks(&mut self, callbacks: Box<dyn crate::ScreenCallbacks>) {
        self.screen.set_callbacks(callbacks);
    }

    pub fn set_selection_callbacks(
        &mut self,
        callbacks: Box<dyn SelectionCallbacks>,
        buflen: usize,
    ) {
        self.state.set_selection_callbacks(callbacks, buflen);
    }

    pub fn set_output_callback(&mut self, callback: Box<dyn FnMut(&[u8])>) {
        self.output_callback = Some(callback);
    }

    /// Reply bytes for hosts that poll instead of registering a callback.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.state.take_output()
    }

    fn flush_output(&mut self) {
        if !self.state.has_output() {
            return;
        }
        if let Some(cb) = self.output_callback.as_mut() {
            let bytes = self.state.take_output();
            cb(&bytes);
        }
    }

    // --- The byte pipeline ---

    pub fn write(&mut self, data: &[u8]) -> usize {
        if let Some(parser_cb) = self.parser_callbacks.as_mut() {
            self.parser.parse(data, parser_cb.as_mut());
        } else {
            let host = self.state_callbacks.as_deref_mut();
            let mut sink = EngineSink {
                host,
                screen: &mut self.screen,
                scrollback: &mut self.scrollback,
                in_scroll_fallback: false,
            };
            let mut driver = StateDriver {
                state: &mut self.state,
                sink: &mut sink,
            };
            self.parser.parse(data, &mut driver);
        }
        self.screen.end_of_write();
        self.flush_output();
        data.len()
    }

    pub fn reset(&mut self, hard: bool) {
        {
            let host = self.state_callbacks.as_deref_mut();
            let mut sink = EngineSink {
                host,
                screen: &mut self.screen,
                scrollback: &mut self.scrollback,
                in_scroll_fallback: false,
            };
            self.state.reset(hard, &mut sink);
        }
        self.parser.reset();
        self.flush_output();
    }

    pub fn set_size(&mut self, rows: i32, cols: i32) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if rows == self.rows() && cols == self.cols() {
            return;
        }
        self.state.resize_begin(rows, cols);
        self.screen
            .resize(rows, cols, &mut self.state, &mut self.scrollback);
        {
            let host = self.state_callbacks.as_deref_mut();
            let mut sink = EngineSink {
                host,
                screen: &mut self.screen,
                scrollback: &mut self.scrollback,
                in_scroll_fallback: false,
            };
            self.state.resize_finish(rows, cols, &mut sink);
        }
        self.flush_output();
    }

    // --- Synthetic input ---

    pub fn keyboard_unichar(&mut self, c: char, modifiers: Modifier) {
        self.state.keyboard_unichar(c, modifiers);
        self.flush_output();
    }

    pub fn keyboard_key(&mut self, key: Key, modifiers: Modifier) {
        self.state.keyboard_key(key, modifiers);
        self.flush_output();
    }

    pub fn keyboard_start_paste(&mut self) {
        self.state.keyboard_start_paste();
        self.flush_output();
    }

    pub fn keyboard_end_paste(&mut self) {
        self.state.keyboard_end_paste();
        self.flush_output();
    }

    pub fn mouse_move(&mut self, row: i32, col: i32, modifiers: Modifier) {
        self.state.mouse_move(row, col, modifiers);
        self.flush_output();
    }

    pub fn mouse_button(&mut self, button: i32, pressed: bool, modifiers: Modifier) {
        self.state.mouse_button(button, pressed, modifiers);
        self.flush_output();
    }

    pub fn focus_in(&mut self) {
        self.state.focus_in();
        self.flush_output();
    }

    pub fn focus_out(&mut self) {
        self.state.focus_out();
        self.flush_output();
    }

    pub fn set_damage_merge(&mut self, size: DamageSize) {
        self.screen.set_damage_merge(size);
    }

    pub fn flush_damage(&mut self) {
        self.screen.flush_damage();
    }
}
