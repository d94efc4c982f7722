//! Core parser infrastructure: the DEC/ECMA-48 byte-stream automaton and the
//! event trait it reports through.
//!
//! The parser turns an arbitrary byte stream, possibly split mid-sequence
//! across calls, into discrete semantic events: printable text runs, C0
//! controls, escape sequences, CSI commands, and the string-typed sequences
//! (OSC, DCS, APC, PM, SOS) delivered as streamed fragments. It holds no
//! screen state of its own; consumers implement [`ParserEvents`].

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::too_many_lines,
    clippy::cast_lossless,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::match_same_arms
)]

mod parser;
pub use parser::Parser;

/// Maximum number of CSI arguments retained per sequence. Further arguments
/// are clipped into the last slot.
pub const MAX_CSI_ARGS: usize = 16;

/// Maximum leader (`<`, `=`, `>`, `?`) and intermediate (0x20..0x2F) bytes
/// retained per CSI sequence.
pub const MAX_CSI_PREFIX: usize = 2;

/// Maximum length of the raw DCS command prefix (parameters, intermediates
/// and final byte) retained before the body streams.
pub const MAX_DCS_COMMAND: usize = 16;

// CSI arguments are i64 values: the low 31 bits carry the numeric value and
// bit 31 flags "a colon-separated sub-parameter follows". A missing argument
// is the all-ones low pattern, which compares equal to the mask.

/// Bit flagged on an argument when the separator after it was `:` not `;`.
pub const CSI_ARG_FLAG_MORE: i64 = 1 << 31;
/// Mask of the numeric value bits of an argument.
pub const CSI_ARG_MASK: i64 = (1 << 31) - 1;
/// Sentinel value of an absent argument.
pub const CSI_ARG_MISSING: i64 = (1 << 31) - 1;

/// Numeric value of an argument, without the sub-parameter flag.
#[inline]
pub fn csi_arg(arg: i64) -> i64 {
    arg & CSI_ARG_MASK
}

/// True when the argument was followed by a `:` separator.
#[inline]
pub fn csi_arg_has_more(arg: i64) -> bool {
    arg & CSI_ARG_FLAG_MORE != 0
}

/// True when the argument was not given.
#[inline]
pub fn csi_arg_is_missing(arg: i64) -> bool {
    csi_arg(arg) == CSI_ARG_MISSING
}

/// The argument's value, or `default` when absent.
#[inline]
pub fn csi_arg_or(arg: i64, default: i64) -> i64 {
    if csi_arg_is_missing(arg) { default } else { csi_arg(arg) }
}

/// The argument interpreted as a count: absent and zero both mean one.
#[inline]
pub fn csi_arg_count(arg: i64) -> i64 {
    if csi_arg_is_missing(arg) || csi_arg(arg) == 0 {
        1
    } else {
        csi_arg(arg)
    }
}

/// One piece of the body of a string-typed sequence (OSC, DCS, APC, PM,
/// SOS). Bodies are never buffered by the parser; they stream to the
/// consumer as the bytes arrive. `initial` is set on the first fragment of a
/// sequence, `is_final` on the fragment that saw the terminator. A sequence
/// delivered whole in one write arrives as a single fragment with both flags
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringFragment<'a> {
    pub bytes: &'a [u8],
    pub initial: bool,
    pub is_final: bool,
}

impl<'a> StringFragment<'a> {
    pub fn new(bytes: &'a [u8], initial: bool, is_final: bool) -> Self {
        Self { bytes, initial, is_final }
    }
}

/// Parser error types. Reported through [`ParserEvents::report_error`] and
/// never fatal: the parser always resynchronizes and keeps consuming.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A CSI sequence carried more than [`MAX_CSI_ARGS`] arguments; the
    /// excess was clipped into the last slot.
    #[error("CSI sequence exceeded {MAX_CSI_ARGS} arguments")]
    CsiArgOverflow,
    /// A sequence was cancelled by CAN or SUB before its final byte.
    #[error("sequence cancelled by CAN/SUB")]
    SequenceCancelled,
    /// A CSI sequence contained a byte that cannot occur at its position;
    /// the rest of the sequence was swallowed.
    #[error("malformed CSI sequence")]
    MalformedCsi,
}

/// Consumer of parser events. Every method has a default implementation so
/// hosts implement only what they need.
///
/// `text` returns the number of bytes it consumed; the parser carries any
/// unconsumed tail over to the next [`Parser::parse`] call and re-presents
/// it in front of the following text run.
pub trait ParserEvents {
    fn text(&mut self, bytes: &[u8]) -> usize {
        bytes.len()
    }

    fn control(&mut self, _byte: u8) {}

    /// A non-CSI escape sequence: the intermediate bytes plus the final
    /// byte, e.g. `b"="` for `ESC =` or `b"#8"` for `ESC # 8`.
    fn escape(&mut self, _bytes: &[u8]) {}

    /// A complete CSI sequence. `args` always holds at least one entry (the
    /// missing sentinel when no parameter was given).
    fn csi(&mut self, _leader: &[u8], _args: &[i64], _intermed: &[u8], _final_byte: u8) {}

    /// An OSC body fragment. `command` is the parsed numeric prefix, or -1
    /// when the sequence did not start with digits and a semicolon.
    fn osc(&mut self, _command: i32, _frag: StringFragment<'_>) {}

    /// A DCS body fragment. `command` is the raw command prefix: parameter
    /// and intermediate bytes plus the final byte, e.g. `b"$q"`.
    fn dcs(&mut self, _command: &[u8], _frag: StringFragment<'_>) {}

    fn apc(&mut self, _frag: StringFragment<'_>) {}

    fn pm(&mut self, _frag: StringFragment<'_>) {}

    fn sos(&mut self, _frag: StringFragment<'_>) {}

    /// Report a parsing error. Default implementation does nothing.
    fn report_error(&mut self, _error: ParseError) {}
}
