mod common;

use charcell_engine::{Position, Underline};
use common::{cursor, term};
use pretty_assertions::assert_eq;

#[test]
fn decsc_decrc_restores_cursor_and_pen() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[10;20H\x1b[1;4m");
    vt.write(b"\x1b7");
    vt.write(b"\x1b[H\x1b[m");
    assert_eq!(cursor(&vt), (0, 0));
    assert!(!vt.state().pen().attrs.is_bold());

    vt.write(b"\x1b8");
    assert_eq!(cursor(&vt), (9, 19));
    assert!(vt.state().pen().attrs.is_bold());
    assert_eq!(vt.state().pen().attrs.underline, Underline::Single);
}

#[test]
fn decrc_without_save_resets_to_defaults() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[10;20H\x1b[1m\x1b8");
    assert_eq!(cursor(&vt), (0, 0));
    assert!(!vt.state().pen().attrs.is_bold());
}

#[test]
fn save_restores_origin_and_autowrap() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[5;20r\x1b[?6h\x1b[?7l\x1b7");
    vt.write(b"\x1b[?6l\x1b[?7h");
    vt.write(b"\x1b8");
    // Restored origin mode binds CUP to the region again.
    vt.write(b"\x1b[1;1H");
    assert_eq!(cursor(&vt), (4, 0));
    // Restored autowrap-off overwrites in place.
    vt.write(b"\x1b[99GAB");
    assert_eq!(cursor(&vt), (4, 79));
}

#[test]
fn save_restores_charset_designations() {
    let (mut vt, log) = term(25, 80);
    // Designate G0 as DEC graphics, save, set back to ASCII, restore.
    vt.write(b"\x1b(0\x1b7\x1b(B");
    vt.write(b"a");
    assert_eq!(log.borrow().putglyphs.last().unwrap().0, vec!['a']);
    vt.write(b"\x1b8a");
    assert_eq!(
        log.borrow().putglyphs.last().unwrap().0,
        vec!['\u{2592}'],
        "restored G0 must map through DEC graphics"
    );
}

#[test]
fn saves_nest_per_buffer() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[2;2H\x1b7\x1b[4;4H\x1b7\x1b[9;9H");
    vt.write(b"\x1b8");
    assert_eq!(cursor(&vt), (3, 3));
    vt.write(b"\x1b8");
    assert_eq!(cursor(&vt), (1, 1));
}

#[test]
fn restore_clears_pending_wrap() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[80G\x1b7A");
    assert_eq!(cursor(&vt), (0, 79));
    vt.write(b"\x1b8B");
    // No wrap: the restored cursor was not in the pending-wrap state.
    assert_eq!(
        vt.screen().get_cell(Position::new(0, 79)).base_char(),
        'B'
    );
}
