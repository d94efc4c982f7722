//! OSC 52 selection (clipboard) traffic.
//!
//! Set payloads stream through a bounded buffer: base64 input is decoded
//! incrementally and handed to the host in fragments no larger than the
//! buffer the host asked for. Queries are forwarded to the host, which
//! answers later through `send_selection`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use charcell_parser_core::StringFragment;

use crate::{SelectionCallbacks, SelectionMask};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Mask,
    Data,
    Query,
    Skip,
}

#[derive(Default)]
pub struct SelectionHandler {
    callbacks: Option<Box<dyn SelectionCallbacks>>,
    buflen: usize,
    mask: SelectionMask,
    phase: Phase,
    b64_carry: Vec<u8>,
    decoded: Vec<u8>,
    sent_initial: bool,
}

fn mask_from_char(ch: u8) -> SelectionMask {
    match ch {
        b'c' => SelectionMask::CLIPBOARD,
        b'p' => SelectionMask::PRIMARY,
        b'q' => SelectionMask::SECONDARY,
        b's' => SelectionMask::SELECT,
        b'0' => SelectionMask::CUT0,
        _ => SelectionMask::empty(),
    }
}

fn mask_chars(mask: SelectionMask) -> String {
    let mut out = String::new();
    if mask.contains(SelectionMask::CLIPBOARD) {
        out.push('c');
    }
    if mask.contains(SelectionMask::PRIMARY) {
        out.push('p');
    }
    if mask.contains(SelectionMask::SECONDARY) {
        out.push('q');
    }
    if mask.contains(SelectionMask::SELECT) {
        out.push('s');
    }
    if mask.contains(SelectionMask::CUT0) {
        out.push('0');
    }
    out
}

impl SelectionHandler {
    pub fn set_callbacks(&mut self, callbacks: Box<dyn SelectionCallbacks>, buflen: usize) {
        self.callbacks = Some(callbacks);
        self.buflen = buflen.max(4);
    }

    pub fn clear_callbacks(&mut self) {
        self.callbacks = None;
    }

    /// Feed one OSC 52 body fragment. Returns reply bytes to queue on the
    /// output sink, when the operation produces any directly.
    pub(crate) fn on_osc_fragment(&mut self, frag: StringFragment<'_>) -> Option<Vec<u8>> {
        if frag.initial {
            self.phase = Phase::Mask;
            self.mask = SelectionMask::empty();
            self.b64_carry.clear();
            self.decoded.clear();
            self.sent_initial = false;
        }
        if self.callbacks.is_none() {
            return None;
        }

        for &byte in frag.bytes {
            match self.phase {
                Phase::Mask => {
                    if byte == b';' {
                        if self.mask.is_empty() {
                            self.mask = SelectionMask::SELECT;
                        }
                        self.phase = Phase::Data;
                    } else {
                        self.mask |= mask_from_char(byte);
                    }
                }
                Phase::Data => {
                    if byte == b'?' {
                        self.phase = Phase::Query;
                    } else if is_base64_byte(byte) {
                        self.b64_carry.push(byte);
                        if self.b64_carry.len() == 4 {
                            if let Ok(bytes) = BASE64.decode(&self.b64_carry) {
                                self.decoded.extend_from_slice(&bytes);
                            }
                            self.b64_carry.clear();
                            if self.decoded.len() >= self.buflen {
                                self.flush_set(false);
                            }
                        }
                    } else {
                        self.phase = Phase::Skip;
                    }
                }
                Phase::Query | Phase::Skip => {}
            }
        }

        if frag.is_final {
            match self.phase {
                Phase::Query => {
                    let mask = self.mask;
                    if let Some(cb) = self.callbacks.as_mut() {
                        cb.on_query(mask);
                    }
                }
                Phase::Data => {
                    // Unpadded trailing group.
                    if !self.b64_carry.is_empty() {
                        let mut group = std::mem::take(&mut self.b64_carry);
                        while group.len() < 4 {
                            group.push(b'=');
                        }
                        if let Ok(bytes) = BASE64.decode(&group) {
                            self.decoded.extend_from_slice(&bytes);
                        }
                    }
                    self.flush_set(true);
                }
                _ => {}
            }
        }
        None
    }

    fn flush_set(&mut self, is_final: bool) {
        let mask = self.mask;
        let initial = !self.sent_initial;
        let payload = std::mem::take(&mut self.decoded);
        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_set(mask, StringFragment::new(&payload, initial, is_final));
        }
        self.sent_initial = true;
    }

    /// Encode a selection value back to the host as an OSC 52 reply. The
    /// caller queues the returned bytes on the output sink.
    pub(crate) fn encode_reply(&self, mask: SelectionMask, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() * 4 / 3 + 16);
        out.extend_from_slice(b"\x1b]52;");
        out.extend_from_slice(mask_chars(mask).as_bytes());
        out.push(b';');
        out.extend_from_slice(BASE64.encode(data).as_bytes());
        out.extend_from_slice(b"\x1b\\");
        out
    }
}

fn is_base64_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/' || byte == b'='
}
