//! CSI command dispatch: cursor motion, erasing, insert/delete, margins,
//! modes, SGR, and the query/report commands.

use charcell_parser_core::{csi_arg_count, csi_arg_is_missing, csi_arg_or};

use crate::{
    CursorShape, MouseProp, Position, PropValue, Rect, StateCallbacks, TermProp,
};

use super::{MouseEncoding, State};

impl State {
    pub(crate) fn on_csi(
        &mut self,
        leader: &[u8],
        args: &[i64],
        intermed: &[u8],
        final_byte: u8,
        sink: &mut dyn StateCallbacks,
    ) {
        let oldpos = self.pos;
        let handled = match (leader, intermed) {
            ([], []) => self.csi_plain(args, final_byte, sink),
            ([b'?'], []) => self.csi_dec_private(args, final_byte, sink),
            ([b'>'], []) => self.csi_gt(args, final_byte),
            ([], [b'!']) => self.csi_bang(final_byte, sink),
            ([], [b'$']) => self.csi_dollar(args, final_byte),
            ([b'?'], [b'$']) => self.csi_dec_dollar(args, final_byte),
            ([], [b' ']) => self.csi_space(args, final_byte, sink),
            ([], [b'"']) => self.csi_quote(args, final_byte),
            ([], [b'\'']) => self.csi_tick(args, final_byte, sink),
            _ => false,
        };
        if !handled {
            let mut consumed = false;
            if let Some(fb) = self.fallbacks.as_mut() {
                consumed = fb.on_csi(leader, args, intermed, final_byte);
            }
            if !consumed {
                log::debug!(
                    "unhandled CSI {:?} {:?} {:?} {:?}",
                    leader,
                    args,
                    intermed,
                    final_byte as char
                );
            }
        }
        self.observe_cursor_after_csi(oldpos, sink);
    }

    fn observe_cursor_after_csi(&mut self, oldpos: Position, sink: &mut dyn StateCallbacks) {
        if self.pos != oldpos {
            sink.on_movecursor(self.pos, oldpos, self.mode.cursor_visible);
        }
    }

    // --- Bounded cursor moves ---

    fn cancel_phantom(&mut self) {
        self.at_phantom = false;
    }

    fn cursor_up(&mut self, count: i32) {
        self.cancel_phantom();
        let stop = if self.pos.row >= self.region_top() {
            self.region_top()
        } else {
            0
        };
        self.pos.row = (self.pos.row - count).max(stop);
    }

    fn cursor_down(&mut self, count: i32) {
        self.cancel_phantom();
        let stop = if self.pos.row < self.region_bottom() {
            self.region_bottom() - 1
        } else {
            self.rows() - 1
        };
        self.pos.row = (self.pos.row + count).min(stop);
    }

    fn cursor_left(&mut self, count: i32) {
        self.cancel_phantom();
        let stop = if self.pos.col >= self.region_left() {
            self.region_left()
        } else {
            0
        };
        self.pos.col = (self.pos.col - count).max(stop);
    }

    fn cursor_right(&mut self, count: i32) {
        self.cancel_phantom();
        let limit = self.row_width(self.pos.row);
        let stop = if self.pos.col < self.region_right() {
            self.region_right().min(limit) - 1
        } else {
            limit - 1
        };
        self.pos.col = (self.pos.col + count).min(stop);
    }

    fn set_col_absolute(&mut self, col: i32) {
        self.cancel_phantom();
        if self.mode.origin {
            self.pos.col = (self.region_left() + col)
                .clamp(self.region_left(), self.region_right() - 1);
        } else {
            self.pos.col = col.clamp(0, self.row_width(self.pos.row) - 1);
        }
    }

    fn set_row_absolute(&mut self, row: i32) {
        self.cancel_phantom();
        if self.mode.origin {
            self.pos.row = (self.region_top() + row)
                .clamp(self.region_top(), self.region_bottom() - 1);
        } else {
            self.pos.row = row.clamp(0, self.rows() - 1);
        }
    }

    // --- Plain finals ---

    fn csi_plain(&mut self, args: &[i64], final_byte: u8, sink: &mut dyn StateCallbacks) -> bool {
        let count = csi_arg_count(args[0]) as i32;
        match final_byte {
            b'@' => {
                // ICH
                self.cancel_phantom();
                let rect = Rect::row_span(self.pos.row, self.pos.col, self.region_right());
                self.scrollrect(rect, 0, -count, sink);
            }
            b'A' => self.cursor_up(count),
            b'B' => self.cursor_down(count),
            b'C' => self.cursor_right(count),
            b'D' => self.cursor_left(count),
            b'E' => {
                // CNL
                self.cursor_down(count);
                self.pos.col = 0;
            }
            b'F' => {
                // CPL
                self.cursor_up(count);
                self.pos.col = 0;
            }
            b'G' | b'`' => self.set_col_absolute(csi_arg_count(args[0]) as i32 - 1),
            b'H' | b'f' => {
                // CUP / HVP
                let row = csi_arg_count(args[0]) as i32 - 1;
                let col = args.get(1).map_or(0, |&a| csi_arg_count(a) as i32 - 1);
                self.set_row_absolute(row);
                self.set_col_absolute(col);
            }
            b'I' => {
                for _ in 0..count {
                    self.tab_forward();
                }
            }
            b'J' => self.erase_in_display(csi_arg_or(args[0], 0), false, sink),
            b'K' => self.erase_in_line(csi_arg_or(args[0], 0), false, sink),
            b'L' => {
                // IL
                self.cancel_phantom();
                if (self.region_top()..self.region_bottom()).contains(&self.pos.row) {
                    let rect = Rect::new(
                        self.pos.row,
                        self.region_bottom(),
                        self.region_left(),
                        self.region_right(),
                    );
                    self.scrollrect(rect, -count, 0, sink);
                }
            }
            b'M' => {
                // DL
                self.cancel_phantom();
                if (self.region_top()..self.region_bottom()).contains(&self.pos.row) {
                    let rect = Rect::new(
                        self.pos.row,
                        self.region_bottom(),
                        self.region_left(),
                        self.region_right(),
                    );
                    self.scrollrect(rect, count, 0, sink);
                }
            }
            b'P' => {
                // DCH
                self.cancel_phantom();
                let rect = Rect::row_span(self.pos.row, self.pos.col, self.region_right());
                self.scrollrect(rect, 0, count, sink);
            }
            b'S' => {
                let rect = self.scroll_region();
                self.scrollrect(rect, count, 0, sink);
            }
            b'T' => {
                let rect = self.scroll_region();
                self.scrollrect(rect, -count, 0, sink);
            }
            b'X' => {
                // ECH
                self.cancel_phantom();
                let end = (self.pos.col + count).min(self.row_width(self.pos.row));
                let rect = Rect::row_span(self.pos.row, self.pos.col, end);
                self.erase(rect, false, sink);
            }
            b'Z' => {
                for _ in 0..count {
                    self.tab_backward();
                }
            }
            b'a' => self.cursor_right(count), // HPR
            b'b' => self.repeat_last_glyph(csi_arg_count(args[0]), sink),
            b'c' => {
                // DA
                if csi_arg_or(args[0], 0) == 0 {
                    self.output_csi("?1;2c");
                }
            }
            b'd' => self.set_row_absolute(csi_arg_count(args[0]) as i32 - 1), // VPA
            b'e' => self.cursor_down(count),                                 // VPR
            b'g' => match csi_arg_or(args[0], 0) {
                0 => self.clear_tabstop(self.pos.col),
                3 => self.clear_all_tabstops(),
                _ => {}
            },
            b'h' => self.set_ansi_modes(args, true, sink),
            b'l' => self.set_ansi_modes(args, false, sink),
            b'j' => self.cursor_left(count), // HPB
            b'k' => self.cursor_up(count),   // VPB
            b'm' => self.apply_sgr(args, sink),
            b'n' => match csi_arg_or(args[0], 0) {
                5 => self.output_csi("0n"),
                6 => {
                    let row = self.pos.row - if self.mode.origin { self.region_top() } else { 0 };
                    let col = self.pos.col - if self.mode.origin { self.region_left() } else { 0 };
                    self.output_csi(&format!("{};{}R", row + 1, col + 1));
                }
                _ => {}
            },
            b'r' => {
                // DECSTBM
                let top = csi_arg_or(args[0], 1) as i32 - 1;
                let bottom = args.get(1).map_or(self.rows(), |&a| {
                    if csi_arg_is_missing(a) || csi_arg_or(a, 0) == 0 {
                        self.rows()
                    } else {
                        csi_arg_or(a, 0) as i32
                    }
                });
                if top >= 0 && top < bottom && top < self.rows() {
                    let bottom = bottom.min(self.rows());
                    let (left, right) = self.stored_lr_margins();
                    let bottom = if bottom >= self.rows() { None } else { Some(bottom) };
                    self.set_scroll_region(top, bottom, left, right);
                    self.home_cursor();
                }
            }
            b's' => {
                if self.mode.left_right_margin {
                    // DECSLRM
                    let left = csi_arg_or(args[0], 1) as i32 - 1;
                    let right = args.get(1).map_or(self.cols(), |&a| {
                        if csi_arg_is_missing(a) || csi_arg_or(a, 0) == 0 {
                            self.cols()
                        } else {
                            csi_arg_or(a, 0) as i32
                        }
                    });
                    if left >= 0 && left < right && left < self.cols() {
                        let right = right.min(self.cols());
                        let top = self.region_top();
                        let bottom = if self.region_bottom() >= self.rows() {
                            None
                        } else {
                            Some(self.region_bottom())
                        };
                        let right = if right >= self.cols() { None } else { Some(right) };
                        self.set_scroll_region(top, bottom, left, right);
                        self.home_cursor();
                    }
                } else {
                    // SCOSC
                    self.save_cursor();
                }
            }
            _ => return false,
        }
        true
    }

    fn erase_in_display(&mut self, mode: i64, selective: bool, sink: &mut dyn StateCallbacks) {
        self.cancel_phantom();
        let rows = self.rows();
        let cols = self.cols();
        match mode {
            0 => {
                let row_end = self.row_width(self.pos.row);
                self.erase(
                    Rect::row_span(self.pos.row, self.pos.col, row_end),
                    selective,
                    sink,
                );
                if self.pos.row + 1 < rows {
                    self.erase(Rect::new(self.pos.row + 1, rows, 0, cols), selective, sink);
                }
            }
            1 => {
                if self.pos.row > 0 {
                    self.erase(Rect::new(0, self.pos.row, 0, cols), selective, sink);
                }
                self.erase(
                    Rect::row_span(self.pos.row, 0, self.pos.col + 1),
                    selective,
                    sink,
                );
            }
            2 => self.erase(Rect::new(0, rows, 0, cols), selective, sink),
            3 => {
                sink.on_sb_clear();
            }
            _ => {}
        }
    }

    fn erase_in_line(&mut self, mode: i64, selective: bool, sink: &mut dyn StateCallbacks) {
        self.cancel_phantom();
        let row_end = self.row_width(self.pos.row);
        match mode {
            0 => self.erase(
                Rect::row_span(self.pos.row, self.pos.col, row_end),
                selective,
                sink,
            ),
            1 => self.erase(
                Rect::row_span(self.pos.row, 0, self.pos.col + 1),
                selective,
                sink,
            ),
            2 => self.erase(Rect::row_span(self.pos.row, 0, row_end), selective, sink),
            _ => {}
        }
    }

    // --- DEC private (leader '?') ---

    fn csi_dec_private(&mut self, args: &[i64], final_byte: u8, sink: &mut dyn StateCallbacks) -> bool {
        match final_byte {
            b'h' => self.set_dec_modes(args, true, sink),
            b'l' => self.set_dec_modes(args, false, sink),
            b'J' => self.erase_in_display(csi_arg_or(args[0], 0), true, sink),
            b'K' => self.erase_in_line(csi_arg_or(args[0], 0), true, sink),
            b'n' => {
                if csi_arg_or(args[0], 0) == 6 {
                    self.output_csi(&format!("?{};{}R", self.pos.row + 1, self.pos.col + 1));
                }
            }
            _ => return false,
        }
        true
    }

    fn csi_gt(&mut self, args: &[i64], final_byte: u8) -> bool {
        match final_byte {
            b'c' => {
                if csi_arg_or(args[0], 0) == 0 {
                    self.output_csi(">0;100;0c");
                }
            }
            b'q' => self.output_dcs(">|libvterm(0.3)"),
            _ => return false,
        }
        true
    }

    fn csi_bang(&mut self, final_byte: u8, sink: &mut dyn StateCallbacks) -> bool {
        if final_byte == b'p' {
            // DECSTR
            self.reset(false, sink);
            return true;
        }
        false
    }

    fn csi_dollar(&mut self, args: &[i64], final_byte: u8) -> bool {
        if final_byte == b'p' {
            // RQM (ANSI)
            let mode = csi_arg_or(args[0], 0);
            let value = self.ansi_mode_value(mode);
            self.output_csi(&format!("{mode};{value}$y"));
            return true;
        }
        false
    }

    fn csi_dec_dollar(&mut self, args: &[i64], final_byte: u8) -> bool {
        if final_byte == b'p' {
            // DECRQM
            let mode = csi_arg_or(args[0], 0);
            let value = self.dec_mode_value(mode);
            self.output_csi(&format!("?{mode};{value}$y"));
            return true;
        }
        false
    }

    fn csi_space(&mut self, args: &[i64], final_byte: u8, sink: &mut dyn StateCallbacks) -> bool {
        if final_byte == b'q' {
            // DECSCUSR
            let arg = csi_arg_or(args[0], 1).max(1);
            let shape = match (arg + 1) / 2 {
                2 => CursorShape::Underline,
                3 => CursorShape::BarLeft,
                _ => CursorShape::Block,
            };
            let blink = arg % 2 == 1;
            self.set_cursor_shape(shape, blink, sink);
            return true;
        }
        false
    }

    fn csi_quote(&mut self, args: &[i64], final_byte: u8) -> bool {
        if final_byte == b'q' {
            // DECSCA
            self.set_protected(csi_arg_or(args[0], 0) == 1);
            return true;
        }
        false
    }

    fn csi_tick(&mut self, args: &[i64], final_byte: u8, sink: &mut dyn StateCallbacks) -> bool {
        let count = csi_arg_count(args[0]) as i32;
        match final_byte {
            b'}' => {
                // DECIC
                let rect = Rect::new(
                    self.region_top(),
                    self.region_bottom(),
                    self.pos.col,
                    self.region_right(),
                );
                self.scrollrect(rect, 0, -count, sink);
            }
            b'~' => {
                // DECDC
                let rect = Rect::new(
                    self.region_top(),
                    self.region_bottom(),
                    self.pos.col,
                    self.region_right(),
                );
                self.scrollrect(rect, 0, count, sink);
            }
            _ => return false,
        }
        true
    }

    // --- Modes ---

    fn set_ansi_modes(&mut self, args: &[i64], value: bool, _sink: &mut dyn StateCallbacks) {
        for &arg in args {
            match csi_arg_or(arg, 0) {
                4 => self.mode.insert = value,
                20 => self.mode.newline = value,
                other => log::debug!("unhandled ANSI mode {other}"),
            }
        }
    }

    fn ansi_mode_value(&self, mode: i64) -> i32 {
        let known = |set: bool| if set { 1 } else { 2 };
        match mode {
            4 => known(self.mode.insert),
            20 => known(self.mode.newline),
            _ => 0,
        }
    }

    fn set_dec_modes(&mut self, args: &[i64], value: bool, sink: &mut dyn StateCallbacks) {
        for &arg in args {
            self.set_dec_mode(csi_arg_or(arg, 0), value, sink);
        }
    }

    fn set_dec_mode(&mut self, mode: i64, value: bool, sink: &mut dyn StateCallbacks) {
        match mode {
            1 => self.mode.cursor = value,
            5 => {
                self.mode.screen_reverse = value;
                sink.on_settermprop(TermProp::Reverse, PropValue::Bool(value));
            }
            6 => {
                self.mode.origin = value;
                self.home_cursor();
            }
            7 => self.mode.autowrap = value,
            12 => {
                self.mode.cursor_blink = value;
                sink.on_settermprop(TermProp::CursorBlink, PropValue::Bool(value));
            }
            25 => {
                self.mode.cursor_visible = value;
                sink.on_settermprop(TermProp::CursorVisible, PropValue::Bool(value));
            }
            47 | 1047 => self.switch_altscreen(value, sink),
            66 => self.keypad_app = value,
            69 => self.mode.left_right_margin = value,
            1000 => self.set_mouse_prop(if value { MouseProp::Click } else { MouseProp::None }, sink),
            1002 => self.set_mouse_prop(if value { MouseProp::Drag } else { MouseProp::None }, sink),
            1003 => self.set_mouse_prop(if value { MouseProp::Move } else { MouseProp::None }, sink),
            1004 => {
                self.mode.report_focus = value;
                sink.on_settermprop(TermProp::FocusReport, PropValue::Bool(value));
            }
            1005 => {
                self.mouse.encoding = if value { MouseEncoding::Utf8 } else { MouseEncoding::Default };
            }
            1006 => {
                self.mouse.encoding = if value { MouseEncoding::Sgr } else { MouseEncoding::Default };
            }
            1015 => {
                self.mouse.encoding = if value { MouseEncoding::Rxvt } else { MouseEncoding::Default };
            }
            1048 => {
                if value {
                    self.save_cursor();
                } else {
                    self.restore_cursor(sink);
                }
            }
            1049 => {
                if value {
                    self.save_cursor();
                    self.switch_altscreen(true, sink);
                } else {
                    self.switch_altscreen(false, sink);
                    self.restore_cursor(sink);
                }
            }
            2004 => self.mode.bracketpaste = value,
            other => log::debug!("unhandled DEC mode {other}"),
        }
    }

    fn switch_altscreen(&mut self, value: bool, sink: &mut dyn StateCallbacks) {
        if self.mode.alt_screen != value {
            self.mode.alt_screen = value;
            sink.on_settermprop(TermProp::AltScreen, PropValue::Bool(value));
        }
    }

    fn set_mouse_prop(&mut self, prop: MouseProp, sink: &mut dyn StateCallbacks) {
        self.mouse.prop = prop;
        sink.on_settermprop(TermProp::Mouse, PropValue::Int(prop as i32));
    }

    fn dec_mode_value(&self, mode: i64) -> i32 {
        let known = |set: bool| if set { 1 } else { 2 };
        match mode {
            1 => known(self.mode.cursor),
            5 => known(self.mode.screen_reverse),
            6 => known(self.mode.origin),
            7 => known(self.mode.autowrap),
            12 => known(self.mode.cursor_blink),
            25 => known(self.mode.cursor_visible),
            47 | 1047 | 1049 => known(self.mode.alt_screen),
            66 => known(self.keypad_app),
            69 => known(self.mode.left_right_margin),
            1000 => known(self.mouse.prop == MouseProp::Click),
            1002 => known(self.mouse.prop == MouseProp::Drag),
            1003 => known(self.mouse.prop == MouseProp::Move),
            1004 => known(self.mode.report_focus),
            1005 => known(self.mouse.encoding == MouseEncoding::Utf8),
            1006 => known(self.mouse.encoding == MouseEncoding::Sgr),
            1015 => known(self.mouse.encoding == MouseEncoding::Rxvt),
            2004 => known(self.mode.bracketpaste),
            _ => 0,
        }
    }
}
