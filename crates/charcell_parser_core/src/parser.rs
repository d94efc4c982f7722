//! The byte-level escape-sequence automaton.
//!
//! One [`Parser`] instance per terminal. Bytes go in through [`Parser::parse`];
//! events come out through the [`ParserEvents`] implementation passed to each
//! call. String bodies are never buffered, they stream out as fragments; the
//! only scratch kept is the current CSI's arguments, leader and
//! intermediates.

use crate::{
    CSI_ARG_FLAG_MORE, CSI_ARG_MASK, CSI_ARG_MISSING, MAX_CSI_ARGS, MAX_CSI_PREFIX,
    MAX_DCS_COMMAND, ParseError, ParserEvents, StringFragment, csi_arg,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    CsiLeader,
    CsiArgs,
    CsiIntermed,
    CsiIgnore,
    OscCommand,
    DcsCommand,
    StringBody,
    StringEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Osc,
    Dcs,
    Apc,
    Pm,
    Sos,
}

pub struct Parser {
    state: ParserState,
    utf8: bool,

    esc_intermed: Vec<u8>,

    leader: Vec<u8>,
    intermed: Vec<u8>,
    args: [i64; MAX_CSI_ARGS],
    argi: usize,
    args_overflowed: bool,

    string_kind: StringKind,
    string_initial: bool,
    osc_command: i32,
    osc_prefix: Vec<u8>,
    dcs_command: Vec<u8>,

    // Text bytes the consumer did not eat on a previous call.
    text_pending: Vec<u8>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Parser {
    pub fn new(utf8: bool) -> Self {
        Self {
            state: ParserState::Ground,
            utf8,
            esc_intermed: Vec::new(),
            leader: Vec::new(),
            intermed: Vec::new(),
            args: [CSI_ARG_MISSING; MAX_CSI_ARGS],
            argi: 0,
            args_overflowed: false,
            string_kind: StringKind::Osc,
            string_initial: false,
            osc_command: -1,
            osc_prefix: Vec::new(),
            dcs_command: Vec::new(),
            text_pending: Vec::new(),
        }
    }

    pub fn utf8(&self) -> bool {
        self.utf8
    }

    /// Switching the byte interpretation mid-stream abandons any sequence in
    /// progress.
    pub fn set_utf8(&mut self, utf8: bool) {
        self.utf8 = utf8;
        self.state = ParserState::Ground;
    }

    /// Abandon any partially received sequence and buffered text.
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.text_pending.clear();
    }

    fn enter_csi(&mut self) {
        self.leader.clear();
        self.intermed.clear();
        self.args = [CSI_ARG_MISSING; MAX_CSI_ARGS];
        self.argi = 0;
        self.args_overflowed = false;
        self.state = ParserState::CsiLeader;
    }

    fn enter_string(&mut self, kind: StringKind) {
        self.string_kind = kind;
        self.string_initial = true;
        match kind {
            StringKind::Osc => {
                self.osc_command = -1;
                self.osc_prefix.clear();
                self.state = ParserState::OscCommand;
            }
            StringKind::Dcs => {
                self.dcs_command.clear();
                self.state = ParserState::DcsCommand;
            }
            StringKind::Apc | StringKind::Pm | StringKind::Sos => {
                self.state = ParserState::StringBody;
            }
        }
    }

    fn next_arg(&mut self) {
        if self.argi + 1 < MAX_CSI_ARGS {
            self.argi += 1;
        } else {
            // Excess arguments are clipped into the last slot.
            self.args_overflowed = true;
            self.args[self.argi] = CSI_ARG_MISSING;
        }
    }

    fn push_digit(&mut self, digit: u8) {
        let cur = csi_arg(self.args[self.argi]);
        let value = if cur == CSI_ARG_MISSING {
            i64::from(digit)
        } else {
            (cur * 10 + i64::from(digit)).min(CSI_ARG_MASK - 1)
        };
        self.args[self.argi] = value;
    }

    fn dispatch_csi(&mut self, final_byte: u8, events: &mut dyn ParserEvents) {
        if self.args_overflowed {
            events.report_error(ParseError::CsiArgOverflow);
        }
        events.csi(
            &self.leader,
            &self.args[..=self.argi],
            &self.intermed,
            final_byte,
        );
        self.state = ParserState::Ground;
    }

    fn emit_fragment(&mut self, bytes: &[u8], is_final: bool, events: &mut dyn ParserEvents) {
        if bytes.is_empty() && !is_final {
            return;
        }
        let frag = StringFragment::new(bytes, self.string_initial, is_final);
        self.string_initial = false;
        match self.string_kind {
            StringKind::Osc => events.osc(self.osc_command, frag),
            StringKind::Dcs => {
                // Split borrow: hand the command buffer out by shared ref.
                let command = std::mem::take(&mut self.dcs_command);
                events.dcs(&command, frag);
                self.dcs_command = command;
            }
            StringKind::Apc => events.apc(frag),
            StringKind::Pm => events.pm(frag),
            StringKind::Sos => events.sos(frag),
        }
        if is_final {
            self.state = ParserState::Ground;
        }
    }

    fn cancel(&mut self, events: &mut dyn ParserEvents) {
        events.report_error(ParseError::SequenceCancelled);
        self.state = ParserState::Ground;
    }

    /// Dispatch the byte following an ESC introducer once any intermediates
    /// have been collected.
    fn escape_final(&mut self, byte: u8, events: &mut dyn ParserEvents) {
        if self.esc_intermed.is_empty() {
            match byte {
                b'[' => return self.enter_csi(),
                b']' => return self.enter_string(StringKind::Osc),
                b'P' => return self.enter_string(StringKind::Dcs),
                b'_' => return self.enter_string(StringKind::Apc),
                b'^' => return self.enter_string(StringKind::Pm),
                b'X' => return self.enter_string(StringKind::Sos),
                _ => {}
            }
            events.escape(&[byte]);
        } else {
            let mut seq = std::mem::take(&mut self.esc_intermed);
            seq.push(byte);
            events.escape(&seq);
        }
        self.state = ParserState::Ground;
    }

    /// Handle a C1 control byte (8-bit mode only) from the GROUND state.
    fn dispatch_c1(&mut self, byte: u8, events: &mut dyn ParserEvents) {
        match byte {
            0x9B => self.enter_csi(),
            0x90 => self.enter_string(StringKind::Dcs),
            0x9D => self.enter_string(StringKind::Osc),
            0x98 => self.enter_string(StringKind::Sos),
            0x9E => self.enter_string(StringKind::Pm),
            0x9F => self.enter_string(StringKind::Apc),
            // Stray string terminator with nothing open.
            0x9C => {}
            _ => events.control(byte),
        }
    }

    /// True for bytes that belong to a text run in the GROUND state.
    fn is_text_byte(&self, byte: u8) -> bool {
        match byte {
            0x20..=0x7E => true,
            0x80..=0x9F => self.utf8,
            0xA0..=0xFF => true,
            _ => false,
        }
    }

    fn emit_text(&mut self, bytes: &[u8], events: &mut dyn ParserEvents) {
        if self.text_pending.is_empty() {
            let eaten = events.text(bytes);
            if eaten < bytes.len() {
                self.text_pending.extend_from_slice(&bytes[eaten..]);
            }
        } else {
            self.text_pending.extend_from_slice(bytes);
            let buffered = std::mem::take(&mut self.text_pending);
            let eaten = events.text(&buffered);
            if eaten < buffered.len() {
                self.text_pending.extend_from_slice(&buffered[eaten..]);
            }
        }
    }

    /// Feed a slice of bytes through the automaton. Sequences may be split
    /// at any byte boundary across calls.
    pub fn parse(&mut self, input: &[u8], events: &mut dyn ParserEvents) {
        if !self.text_pending.is_empty() && self.state == ParserState::Ground {
            let buffered = std::mem::take(&mut self.text_pending);
            let eaten = events.text(&buffered);
            if eaten < buffered.len() {
                self.text_pending.extend_from_slice(&buffered[eaten..]);
            }
        }

        let mut i = 0;
        while i < input.len() {
            let byte = input[i];

            match self.state {
                ParserState::Ground => {
                    if self.is_text_byte(byte) {
                        let run_len = input[i..]
                            .iter()
                            .position(|&b| !self.is_text_byte(b))
                            .unwrap_or(input.len() - i);
                        let run_end = i + run_len;
                        self.emit_text(&input[i..run_end], events);
                        i = run_end;
                        continue;
                    }
                    match byte {
                        0x1B => {
                            self.esc_intermed.clear();
                            self.state = ParserState::Escape;
                        }
                        // NUL and DEL are discarded.
                        0x00 | 0x7F => {}
                        0x80..=0x9F => self.dispatch_c1(byte, events),
                        _ => events.control(byte),
                    }
                    i += 1;
                }

                ParserState::Escape => {
                    match byte {
                        0x18 | 0x1A => self.cancel(events),
                        0x1B => self.esc_intermed.clear(),
                        0x00 | 0x7F => {}
                        0x01..=0x17 | 0x19 | 0x1C..=0x1F => events.control(byte),
                        0x20..=0x2F => {
                            if self.esc_intermed.len() < MAX_CSI_PREFIX {
                                self.esc_intermed.push(byte);
                            }
                        }
                        0x30..=0x7E => self.escape_final(byte, events),
                        _ => {
                            // 8-bit byte mid-escape: abandon and retry in GROUND.
                            self.state = ParserState::Ground;
                            continue;
                        }
                    }
                    i += 1;
                }

                ParserState::CsiLeader => {
                    match byte {
                        0x3C..=0x3F => {
                            if self.leader.len() < MAX_CSI_PREFIX {
                                self.leader.push(byte);
                            }
                            i += 1;
                        }
                        _ => self.state = ParserState::CsiArgs,
                    }
                }

                ParserState::CsiArgs => {
                    match byte {
                        b'0'..=b'9' => self.push_digit(byte - b'0'),
                        b':' => {
                            self.args[self.argi] |= CSI_ARG_FLAG_MORE;
                            self.next_arg();
                        }
                        b';' => self.next_arg(),
                        0x20..=0x2F => {
                            self.intermed.push(byte);
                            self.state = ParserState::CsiIntermed;
                        }
                        0x3C..=0x3F => {
                            events.report_error(ParseError::MalformedCsi);
                            self.state = ParserState::CsiIgnore;
                        }
                        0x40..=0x7E => self.dispatch_csi(byte, events),
                        0x18 | 0x1A => self.cancel(events),
                        0x1B => {
                            self.esc_intermed.clear();
                            self.state = ParserState::Escape;
                        }
                        0x00 | 0x7F => {}
                        0x01..=0x17 | 0x19 | 0x1C..=0x1F => events.control(byte),
                        _ => {
                            self.state = ParserState::Ground;
                            continue;
                        }
                    }
                    i += 1;
                }

                ParserState::CsiIntermed => {
                    match byte {
                        0x20..=0x2F => {
                            if self.intermed.len() < MAX_CSI_PREFIX {
                                self.intermed.push(byte);
                            }
                        }
                        0x30..=0x3F => {
                            events.report_error(ParseError::MalformedCsi);
                            self.state = ParserState::CsiIgnore;
                        }
                        0x40..=0x7E => self.dispatch_csi(byte, events),
                        0x18 | 0x1A => self.cancel(events),
                        0x1B => {
                            self.esc_intermed.clear();
                            self.state = ParserState::Escape;
                        }
                        0x00 | 0x7F => {}
                        0x01..=0x17 | 0x19 | 0x1C..=0x1F => events.control(byte),
                        _ => {
                            self.state = ParserState::Ground;
                            continue;
                        }
                    }
                    i += 1;
                }

                ParserState::CsiIgnore => {
                    match byte {
                        0x40..=0x7E => self.state = ParserState::Ground,
                        0x18 | 0x1A => self.state = ParserState::Ground,
                        0x1B => {
                            self.esc_intermed.clear();
                            self.state = ParserState::Escape;
                        }
                        _ => {}
                    }
                    i += 1;
                }

                ParserState::OscCommand => {
                    match byte {
                        b'0'..=b'9' if self.osc_prefix.len() < 10 => {
                            self.osc_prefix.push(byte);
                            i += 1;
                        }
                        b';' => {
                            self.osc_command = parse_osc_command(&self.osc_prefix);
                            self.state = ParserState::StringBody;
                            i += 1;
                        }
                        0x07 | 0x1B | 0x18 | 0x1A => {
                            // Terminator before any `;`: the digits alone are
                            // the command, with an empty body.
                            self.osc_command = parse_osc_command(&self.osc_prefix);
                            self.state = ParserState::StringBody;
                        }
                        0x9C if !self.utf8 => {
                            self.osc_command = parse_osc_command(&self.osc_prefix);
                            self.state = ParserState::StringBody;
                        }
                        _ => {
                            // Not a numeric command prefix: everything seen so
                            // far belongs to the body.
                            self.osc_command = -1;
                            self.state = ParserState::StringBody;
                            let prefix = std::mem::take(&mut self.osc_prefix);
                            self.emit_fragment(&prefix, false, events);
                        }
                    }
                }

                ParserState::DcsCommand => {
                    match byte {
                        0x20..=0x3F => {
                            if self.dcs_command.len() < MAX_DCS_COMMAND {
                                self.dcs_command.push(byte);
                            }
                            i += 1;
                        }
                        0x40..=0x7E => {
                            if self.dcs_command.len() < MAX_DCS_COMMAND {
                                self.dcs_command.push(byte);
                            }
                            self.state = ParserState::StringBody;
                            i += 1;
                        }
                        0x1B => {
                            // No final byte yet, so the sequence never
                            // opened: cancel and restart in ESCAPE.
                            self.cancel(events);
                            self.esc_intermed.clear();
                            self.state = ParserState::Escape;
                            i += 1;
                        }
                        0x18 | 0x1A => {
                            self.cancel(events);
                            i += 1;
                        }
                        0x9C if !self.utf8 => {
                            self.cancel(events);
                            i += 1;
                        }
                        _ => i += 1,
                    }
                }

                ParserState::StringBody => {
                    let rest = &input[i..];
                    let mut stop = memchr::memchr3(0x1B, 0x18, 0x1A, rest).unwrap_or(rest.len());
                    if self.string_kind == StringKind::Osc {
                        if let Some(bel) = memchr::memchr(0x07, &rest[..stop]) {
                            stop = bel;
                        }
                    }
                    if !self.utf8 {
                        if let Some(st) = memchr::memchr(0x9C, &rest[..stop]) {
                            stop = st;
                        }
                    }

                    let body_end = i + stop;
                    match input.get(body_end) {
                        None => {
                            self.emit_fragment(&input[i..], false, events);
                            i = input.len();
                        }
                        Some(&0x1B) => {
                            self.emit_fragment(&input[i..body_end], false, events);
                            self.state = ParserState::StringEscape;
                            i = body_end + 1;
                        }
                        Some(&0x07) | Some(&0x9C) => {
                            self.emit_fragment(&input[i..body_end], true, events);
                            i = body_end + 1;
                        }
                        Some(_) => {
                            // CAN or SUB: abandon without a final fragment.
                            self.cancel(events);
                            i = body_end + 1;
                        }
                    }
                }

                ParserState::StringEscape => {
                    if byte == b'\\' {
                        self.emit_fragment(&[], true, events);
                        i += 1;
                    } else {
                        // ESC that was not the start of ST abandons the
                        // string; the ESC restarts an escape sequence.
                        self.esc_intermed.clear();
                        self.state = ParserState::Escape;
                    }
                }
            }
        }
    }
}

fn parse_osc_command(digits: &[u8]) -> i32 {
    if digits.is_empty() {
        return -1;
    }
    let mut value: i32 = 0;
    for &d in digits {
        value = value.saturating_mul(10).saturating_add(i32::from(d - b'0'));
    }
    value
}
