//! Input encoding: key and mouse events become output byte sequences
//! according to the active modes (DECCKM, keypad application mode, LNM, and
//! the mouse protocol/encoding pair).

use bitflags::bitflags;

use crate::{MouseProp, SelectionMask, State, state::MouseEncoding};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct Modifier: u8 {
        const SHIFT = 0x01;
        const ALT   = 0x02;
        const CTRL  = 0x04;
    }
}

/// Named special keys for [`State::keyboard_key`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Ins,
    Del,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1..F12 and beyond; `Function(1)` is F1.
    Function(u8),
    KP0,
    KP1,
    KP2,
    KP3,
    KP4,
    KP5,
    KP6,
    KP7,
    KP8,
    KP9,
    KPMult,
    KPPlus,
    KPComma,
    KPMinus,
    KPPeriod,
    KPDivide,
    KPEnter,
    KPEqual,
}

enum Encoding {
    Literal(u8),
    CsiCursor(u8),
    CsiNum(i32),
    Ss3(u8),
    Keypad { plain: u8, app: u8 },
}

impl State {
    fn output_ss3(&mut self, ch: u8) {
        self.push_output(b"\x1bO");
        self.push_output(&[ch]);
    }

    /// Encode a Unicode character keystroke.
    pub fn keyboard_unichar(&mut self, c: char, modifiers: Modifier) {
        let mut modifiers = modifiers;
        // Shift is never significant for Unicode characters apart from
        // Space.
        if c != ' ' {
            modifiers.remove(Modifier::SHIFT);
        }

        if modifiers.is_empty() {
            let mut buf = [0u8; 4];
            let encoded = c.encode_utf8(&mut buf);
            self.push_output(encoded.as_bytes());
            return;
        }

        let needs_csiu = match c {
            // Ctrl of these would collide with Tab/LF/CR.
            'i' | 'j' | 'm' | '[' => true,
            ' ' => modifiers.contains(Modifier::SHIFT),
            'a'..='z' => false,
            _ => true,
        };

        if needs_csiu && !(modifiers - Modifier::ALT).is_empty() {
            self.output_csi(&format!("{};{}u", c as u32, modifiers.bits() + 1));
            return;
        }

        let byte = if modifiers.contains(Modifier::CTRL) {
            (c as u8) & 0x1F
        } else {
            c as u8
        };
        if modifiers.contains(Modifier::ALT) {
            self.push_output(b"\x1b");
        }
        if modifiers.contains(Modifier::CTRL) || c.is_ascii() {
            self.push_output(&[byte]);
        } else {
            let mut buf = [0u8; 4];
            self.push_output(c.encode_utf8(&mut buf).as_bytes());
        }
    }

    /// Encode a named special key.
    pub fn keyboard_key(&mut self, key: Key, modifiers: Modifier) {
        // Tab and Enter carry their own modifier rules.
        match key {
            Key::Tab => {
                if modifiers == Modifier::SHIFT {
                    self.output_csi("Z");
                    return;
                }
                if modifiers.contains(Modifier::SHIFT) {
                    self.output_csi(&format!("1;{}Z", modifiers.bits() + 1));
                    return;
                }
                self.encode_literal(b'\t', modifiers);
                return;
            }
            Key::Enter => {
                if self.mode.newline && modifiers.is_empty() {
                    self.push_output(b"\r\n");
                    return;
                }
                self.encode_literal(b'\r', modifiers);
                return;
            }
            _ => {}
        }

        let encoding = match key {
            Key::Backspace => Encoding::Literal(0x7F),
            Key::Escape => Encoding::Literal(0x1B),
            Key::Up => Encoding::CsiCursor(b'A'),
            Key::Down => Encoding::CsiCursor(b'B'),
            Key::Right => Encoding::CsiCursor(b'C'),
            Key::Left => Encoding::CsiCursor(b'D'),
            Key::Home => Encoding::CsiCursor(b'H'),
            Key::End => Encoding::CsiCursor(b'F'),
            Key::Ins => Encoding::CsiNum(2),
            Key::Del => Encoding::CsiNum(3),
            Key::PageUp => Encoding::CsiNum(5),
            Key::PageDown => Encoding::CsiNum(6),
            Key::Function(n) => match n {
                1 => Encoding::Ss3(b'P'),
                2 => Encoding::Ss3(b'Q'),
                3 => Encoding::Ss3(b'R'),
                4 => Encoding::Ss3(b'S'),
                5 => Encoding::CsiNum(15),
                6 => Encoding::CsiNum(17),
                7 => Encoding::CsiNum(18),
                8 => Encoding::CsiNum(19),
                9 => Encoding::CsiNum(20),
                10 => Encoding::CsiNum(21),
                11 => Encoding::CsiNum(23),
                12 => Encoding::CsiNum(24),
                _ => return,
            },
            Key::KP0 => Encoding::Keypad { plain: b'0', app: b'p' },
            Key::KP1 => Encoding::Keypad { plain: b'1', app: b'q' },
            Key::KP2 => Encoding::Keypad { plain: b'2', app: b'r' },
            Key::KP3 => Encoding::Keypad { plain: b'3', app: b's' },
            Key::KP4 => Encoding::Keypad { plain: b'4', app: b't' },
            Key::KP5 => Encoding::Keypad { plain: b'5', app: b'u' },
            Key::KP6 => Encoding::Keypad { plain: b'6', app: b'v' },
            Key::KP7 => Encoding::Keypad { plain: b'7', app: b'w' },
            Key::KP8 => Encoding::Keypad { plain: b'8', app: b'x' },
            Key::KP9 => Encoding::Keypad { plain: b'9', app: b'y' },
            Key::KPMult => Encoding::Keypad { plain: b'*', app: b'j' },
            Key::KPPlus => Encoding::Keypad { plain: b'+', app: b'k' },
            Key::KPComma => Encoding::Keypad { plain: b',', app: b'l' },
            Key::KPMinus => Encoding::Keypad { plain: b'-', app: b'm' },
            Key::KPPeriod => Encoding::Keypad { plain: b'.', app: b'n' },
            Key::KPDivide => Encoding::Keypad { plain: b'/', app: b'o' },
            Key::KPEnter => Encoding::Keypad { plain: b'\r', app: b'M' },
            Key::KPEqual => Encoding::Keypad { plain: b'=', app: b'X' },
            Key::Tab | Key::Enter => unreachable!(),
        };

        match encoding {
            Encoding::Literal(byte) => self.encode_literal(byte, modifiers),
            Encoding::CsiCursor(ch) => {
                if modifiers.is_empty() {
                    if self.mode.cursor {
                        self.output_ss3(ch);
                    } else {
                        self.output_csi(std::str::from_utf8(&[ch]).unwrap_or("A"));
                    }
                } else {
                    self.output_csi(&format!("1;{}{}", modifiers.bits() + 1, ch as char));
                }
            }
            Encoding::CsiNum(n) => {
                if modifiers.is_empty() {
                    self.output_csi(&format!("{n}~"));
                } else {
                    self.output_csi(&format!("{n};{}~", modifiers.bits() + 1));
                }
            }
            Encoding::Ss3(ch) => {
                if modifiers.is_empty() {
                    self.output_ss3(ch);
                } else {
                    self.output_csi(&format!("1;{}{}", modifiers.bits() + 1, ch as char));
                }
            }
            Encoding::Keypad { plain, app } => {
                if self.keypad_app {
                    self.output_ss3(app);
                } else {
                    self.encode_literal(plain, modifiers);
                }
            }
        }
    }

    fn encode_literal(&mut self, byte: u8, modifiers: Modifier) {
        if modifiers.intersects(Modifier::SHIFT | Modifier::CTRL) {
            self.output_csi(&format!("{};{}u", byte, modifiers.bits() + 1));
            return;
        }
        if modifiers.contains(Modifier::ALT) {
            self.push_output(b"\x1b");
        }
        self.push_output(&[byte]);
    }

    /// Bracketed paste guards (mode 2004).
    pub fn keyboard_start_paste(&mut self) {
        if self.mode.bracketpaste {
            self.output_csi("200~");
        }
    }

    pub fn keyboard_end_paste(&mut self) {
        if self.mode.bracketpaste {
            self.output_csi("201~");
        }
    }

    // --- Mouse ---

    fn mouse_mod_flags(modifiers: Modifier) -> i32 {
        let mut flags = 0;
        if modifiers.contains(Modifier::SHIFT) {
            flags += 4;
        }
        if modifiers.contains(Modifier::ALT) {
            flags += 8;
        }
        if modifiers.contains(Modifier::CTRL) {
            flags += 16;
        }
        flags
    }

    fn output_mouse(&mut self, code: i32, pressed: bool) {
        let col = self.mouse.col;
        let row = self.mouse.row;
        match self.mouse.encoding {
            MouseEncoding::Sgr => {
                self.output_csi(&format!(
                    "<{code};{};{}{}",
                    col + 1,
                    row + 1,
                    if pressed { 'M' } else { 'm' }
                ));
            }
            MouseEncoding::Rxvt => {
                self.output_csi(&format!("{code};{};{}M", col + 1, row + 1));
            }
            MouseEncoding::Utf8 => {
                let mut bytes = vec![0x1B, b'[', b'M', (32 + code) as u8];
                let mut push_pos = |v: i32, bytes: &mut Vec<u8>| {
                    let ch = char::from_u32((v + 33).clamp(33, 0x7FF) as u32).unwrap_or(' ');
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                };
                push_pos(col, &mut bytes);
                push_pos(row, &mut bytes);
                self.push_output(&bytes);
            }
            MouseEncoding::Default => {
                let encode_pos = |v: i32| (v + 33).min(255) as u8;
                let bytes = [
                    0x1B,
                    b'[',
                    b'M',
                    (32 + code) as u8,
                    encode_pos(col),
                    encode_pos(row),
                ];
                self.push_output(&bytes);
            }
        }
    }

    /// Report a pointer move. Duplicate positions are suppressed; whether a
    /// move reports at all depends on the tracking granularity.
    pub fn mouse_move(&mut self, row: i32, col: i32, modifiers: Modifier) {
        if row == self.mouse.row && col == self.mouse.col {
            return;
        }
        self.mouse.row = row;
        self.mouse.col = col;

        let report = match self.mouse.prop {
            MouseProp::Move => true,
            MouseProp::Drag => self.mouse.buttons != 0,
            _ => false,
        };
        if !report {
            return;
        }

        let button = lowest_button(self.mouse.buttons);
        let base = button.map_or(3, |b| b - 1);
        let code = 32 + base + Self::mouse_mod_flags(modifiers);
        self.output_mouse(code, true);
    }

    /// Report a button press or release. Buttons 4..=7 are wheel events and
    /// only report presses.
    pub fn mouse_button(&mut self, button: i32, pressed: bool, modifiers: Modifier) {
        if (1..=3).contains(&button) {
            let bit = 1 << (button - 1);
            if pressed {
                self.mouse.buttons |= bit;
            } else {
                self.mouse.buttons &= !bit;
            }
        }

        if self.mouse.prop == MouseProp::None {
            return;
        }
        let flags = Self::mouse_mod_flags(modifiers);

        if (4..=7).contains(&button) {
            if pressed {
                self.output_mouse(64 + button - 4 + flags, true);
            }
            return;
        }
        if !(1..=3).contains(&button) {
            return;
        }

        if pressed {
            self.output_mouse(button - 1 + flags, true);
        } else if self.mouse.encoding == MouseEncoding::Sgr {
            self.output_mouse(button - 1 + flags, false);
        } else {
            self.output_mouse(3 + flags, true);
        }
    }

    /// Answer a selection query from the host side; emits an OSC 52 reply
    /// on the output sink.
    pub fn send_selection(&mut self, mask: SelectionMask, data: &[u8]) {
        let reply = self.selection.encode_reply(mask, data);
        self.push_output(&reply);
    }

    pub fn set_selection_callbacks(
        &mut self,
        callbacks: Box<dyn crate::SelectionCallbacks>,
        buflen: usize,
    ) {
        self.selection.set_callbacks(callbacks, buflen);
    }

    pub fn clear_selection_callbacks(&mut self) {
        self.selection.clear_callbacks();
    }
}

fn lowest_button(buttons: u32) -> Option<i32> {
    if buttons == 0 {
        None
    } else {
        Some(buttons.trailing_zeros() as i32 + 1)
    }
}
