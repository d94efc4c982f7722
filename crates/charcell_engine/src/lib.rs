//! An embeddable, I/O-free terminal emulation engine.
//!
//! The engine converts a DEC/ECMA-48 byte stream into a structured model of a
//! character-cell display. A host feeds bytes into a [`Terminal`] and
//! observes the resulting grid mutations through callback traits; keyboard
//! and mouse events submitted by the host are encoded back into bytes on the
//! output sink. The engine performs no I/O of its own.

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::too_many_lines,
    clippy::cast_lossless,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::struct_excessive_bools,
    clippy::return_self_not_must_use,
    clippy::module_name_repetitions
)]

mod position;
pub use position::*;

mod rect;
pub use rect::*;

mod color;
pub use color::*;

mod cell;
pub use cell::*;

mod unicode;
pub use unicode::*;

mod charset;
pub use charset::*;

mod utf8;
pub use utf8::*;

mod callbacks;
pub use callbacks::*;

mod pen;
pub use pen::*;

pub mod state;
pub use state::*;

mod selection;
pub use selection::*;

mod input;
pub use input::*;

mod screen;
pub use screen::*;

mod scrollback;
pub use scrollback::*;

mod terminal;
pub use terminal::*;

/// Number of code points one cell can carry: the base character plus up to
/// five combining marks. Further marks are dropped.
pub const MAX_CHARS_PER_CELL: usize = 6;
