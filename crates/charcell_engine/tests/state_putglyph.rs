mod common;

use common::{cursor, glyph_at, term};
use pretty_assertions::assert_eq;

#[test]
fn ascii_placement_advances_cursor() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"ABC");
    let log = log.borrow();
    assert_eq!(log.putglyphs.len(), 3);
    assert_eq!(glyph_at(&log, 0), ('A', 1, 0, 0));
    assert_eq!(glyph_at(&log, 1), ('B', 1, 0, 1));
    assert_eq!(glyph_at(&log, 2), ('C', 1, 0, 2));
    assert_eq!(cursor(&vt), (0, 3));
}

#[test]
fn wide_char_occupies_two_columns() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    // U+FF10 FULLWIDTH DIGIT ZERO
    vt.write("\u{FF10}A".as_bytes());
    let log = log.borrow();
    assert_eq!(glyph_at(&log, 0), ('\u{FF10}', 2, 0, 0));
    assert_eq!(glyph_at(&log, 1), ('A', 1, 0, 2));
}

#[test]
fn combining_mark_joins_previous_cell() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    // 'e' followed by COMBINING ACUTE ACCENT
    vt.write(b"e\xCC\x81Z");
    let log = log.borrow();
    assert_eq!(log.putglyphs.len(), 3);
    assert_eq!(log.putglyphs[0].0, vec!['e']);
    // The combined glyph is re-reported for the same cell.
    assert_eq!(log.putglyphs[1].0, vec!['e', '\u{0301}']);
    assert_eq!((log.putglyphs[1].2, log.putglyphs[1].3), (0, 0));
    assert_eq!(glyph_at(&log, 2), ('Z', 1, 0, 1));
}

#[test]
fn combining_marks_cap_at_cell_capacity() {
    let (mut vt, _log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"A");
    // Seven combining acutes; only five fit beside the base character.
    for _ in 0..7 {
        vt.write("\u{0301}".to_string().as_bytes());
    }
    vt.write(b" ");
    let cell = vt.screen().get_cell(charcell_engine::Position::new(0, 0));
    assert_eq!(cell.chars[0], 'A');
    assert_eq!(cell.char_count(), 6);
    assert_eq!(cell.width, 1);
}

#[test]
fn combining_with_no_preceding_glyph_is_dropped() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write("\u{0301}".to_string().as_bytes());
    assert_eq!(log.borrow().putglyphs.len(), 0);
    assert_eq!(cursor(&vt), (0, 0));
}

#[test]
fn insert_mode_shifts_right() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"AC\x1b[1GB");
    // Without IRM, B overwrites A.
    assert_eq!(common::screen_row(&vt, 0), "BC");

    vt.write(b"\x1b[2J\x1b[H");
    vt.write(b"AC\x1b[1G\x1b[4hB");
    assert_eq!(common::screen_row(&vt, 0), "BAC");
    let log = log.borrow();
    // IRM emits a rightward shift before the glyph.
    let (rect, downward, rightward) = *log.scrollrects.last().unwrap();
    assert_eq!(downward, 0);
    assert_eq!(rightward, -1);
    assert_eq!((rect.start_row, rect.end_row), (0, 1));
}

#[test]
fn rep_repeats_last_glyph() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"a\x1b[2b");
    let log = log.borrow();
    assert_eq!(log.putglyphs.len(), 3);
    assert_eq!(glyph_at(&log, 1), ('a', 1, 0, 1));
    assert_eq!(glyph_at(&log, 2), ('a', 1, 0, 2));
}

#[test]
fn rep_zero_means_one() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"a\x1b[0b");
    assert_eq!(log.borrow().putglyphs.len(), 2);
}

#[test]
fn rep_repeats_combined_glyph() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"e\xCC\x81\x1b[b");
    let log = log.borrow();
    let last = log.putglyphs.last().unwrap();
    assert_eq!(last.0, vec!['e', '\u{0301}']);
    assert_eq!((last.2, last.3), (0, 1));
}

#[test]
fn rep_stops_at_end_of_line() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"a\x1b[1000bb");
    let log = log.borrow();
    // 'a', 79 repeats filling the row, then 'b' wraps.
    assert_eq!(log.putglyphs.len(), 81);
    assert_eq!(glyph_at(&log, 79), ('a', 1, 0, 79));
    assert_eq!(glyph_at(&log, 80), ('b', 1, 1, 0));
}

#[test]
fn protected_flag_rides_on_glyphs() {
    let (mut vt, _log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"A\x1b[1\"qB\x1b[0\"qC");
    let screen = vt.screen();
    assert!(!screen.get_cell(charcell_engine::Position::new(0, 0)).attrs.is_protected());
    assert!(screen.get_cell(charcell_engine::Position::new(0, 1)).attrs.is_protected());
    assert!(!screen.get_cell(charcell_engine::Position::new(0, 2)).attrs.is_protected());
}

#[test]
fn dec_alignment_fills_screen() {
    let (mut vt, _log) = term(4, 5);
    vt.set_utf8(true);
    vt.write(b"\x1b#8");
    for row in 0..4 {
        assert_eq!(common::screen_row(&vt, row), "EEEEE");
    }
    assert_eq!(cursor(&vt), (0, 0));
}

#[test]
fn doublewidth_line_halves_the_row() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b#6");
    vt.write(b"A");
    {
        let log = log.borrow();
        let (chars, _, row, col) = log.putglyphs.last().unwrap().clone();
        assert_eq!((chars[0], row, col), ('A', 0, 0));
    }
    assert!(vt.state().get_lineinfo(0).doublewidth);

    // The line wraps at half the terminal width.
    vt.write(b"\x1b[40G");
    assert_eq!(cursor(&vt), (0, 39));
    vt.write(b"XY");
    assert_eq!(cursor(&vt), (1, 1));
}
