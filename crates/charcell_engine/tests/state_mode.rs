mod common;

use common::{Prop, cursor, screen_row, term};
use charcell_engine::TermProp;
use pretty_assertions::assert_eq;

fn last_prop(log: &common::Log, prop: TermProp) -> Option<Prop> {
    log.termprops
        .iter()
        .rev()
        .find(|(p, _)| *p == prop)
        .map(|(_, v)| v.clone())
}

#[test]
fn insert_replace_mode() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"AC\x1b[G\x1b[4hB\x1b[4l");
    assert_eq!(screen_row(&vt, 0), "BAC");
}

#[test]
fn newline_mode_adds_cr_to_lf() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"abc\ndef");
    assert_eq!(cursor(&vt), (1, 6));

    vt.write(b"\x1b[2J\x1b[H\x1b[20h");
    vt.write(b"abc\ndef");
    assert_eq!(cursor(&vt), (1, 3));
    assert_eq!(screen_row(&vt, 1), "def");
}

#[test]
fn autowrap_mode_off_overwrites_last_column() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[?7l");
    vt.write(b"\x1b[79GABCDE");
    assert_eq!(cursor(&vt), (0, 79));
    assert_eq!(screen_row(&vt, 0).chars().last(), Some('E'));
    assert_eq!(screen_row(&vt, 1), "");
}

#[test]
fn reverse_screen_reports_termprop() {
    let (mut vt, log) = term(25, 80);
    vt.write(b"\x1b[?5h");
    assert_eq!(
        last_prop(&log.borrow(), TermProp::Reverse),
        Some(Prop::Bool(true))
    );
    vt.write(b"\x1b[?5l");
    assert_eq!(
        last_prop(&log.borrow(), TermProp::Reverse),
        Some(Prop::Bool(false))
    );
}

#[test]
fn cursor_visibility_reports_termprop() {
    let (mut vt, log) = term(25, 80);
    vt.write(b"\x1b[?25l");
    assert_eq!(
        last_prop(&log.borrow(), TermProp::CursorVisible),
        Some(Prop::Bool(false))
    );
    vt.write(b"\x1b[?25h");
    assert_eq!(
        last_prop(&log.borrow(), TermProp::CursorVisible),
        Some(Prop::Bool(true))
    );
}

#[test]
fn focus_reporting_mode() {
    let (mut vt, log) = term(25, 80);
    vt.focus_in();
    assert_eq!(vt.take_output(), b"".to_vec());

    vt.write(b"\x1b[?1004h");
    assert_eq!(
        last_prop(&log.borrow(), TermProp::FocusReport),
        Some(Prop::Bool(true))
    );
    vt.focus_in();
    assert_eq!(vt.take_output(), b"\x1b[I".to_vec());
    vt.focus_out();
    assert_eq!(vt.take_output(), b"\x1b[O".to_vec());
}

#[test]
fn altscreen_swap_preserves_primary() {
    let (mut vt, log) = term(25, 80);
    vt.screen_mut().enable_altscreen(true);
    vt.write(b"Main screen");

    vt.write(b"\x1b[?1049h");
    assert_eq!(
        last_prop(&log.borrow(), TermProp::AltScreen),
        Some(Prop::Bool(true))
    );
    assert_eq!(screen_row(&vt, 0), "");
    vt.write(b"\x1b[HAlt screen");
    assert_eq!(screen_row(&vt, 0), "Alt screen");

    vt.write(b"\x1b[?1049l");
    assert_eq!(screen_row(&vt, 0), "Main screen");
}

#[test]
fn altscreen_1049_restores_cursor() {
    let (mut vt, _) = term(25, 80);
    vt.screen_mut().enable_altscreen(true);
    vt.write(b"\x1b[10;20H");
    vt.write(b"\x1b[?1049h\x1b[H");
    assert_eq!(cursor(&vt), (0, 0));
    vt.write(b"\x1b[?1049l");
    assert_eq!(cursor(&vt), (9, 19));
}

#[test]
fn mode_1048_saves_and_restores_cursor() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[10;20H\x1b[?1048h\x1b[H");
    assert_eq!(cursor(&vt), (0, 0));
    vt.write(b"\x1b[?1048l");
    assert_eq!(cursor(&vt), (9, 19));
}

#[test]
fn multiple_modes_in_one_sequence() {
    let (mut vt, log) = term(25, 80);
    vt.write(b"\x1b[?1002;1006h");
    let log = log.borrow();
    assert_eq!(
        last_prop(&log, TermProp::Mouse),
        Some(Prop::Int(2)) // drag tracking
    );
    drop(log);
    vt.write(b"\x1b[?1002$p");
    assert_eq!(vt.take_output(), b"\x1b[?1002;1$y".to_vec());
    vt.write(b"\x1b[?1006$p");
    assert_eq!(vt.take_output(), b"\x1b[?1006;1$y".to_vec());
}

#[test]
fn decrqm_reports_mode_state() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[?7$p");
    assert_eq!(vt.take_output(), b"\x1b[?7;1$y".to_vec());
    vt.write(b"\x1b[?7l\x1b[?7$p");
    assert_eq!(vt.take_output(), b"\x1b[?7;2$y".to_vec());
    vt.write(b"\x1b[?9999$p");
    assert_eq!(vt.take_output(), b"\x1b[?9999;0$y".to_vec());
}

#[test]
fn rqm_reports_ansi_modes() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[4$p");
    assert_eq!(vt.take_output(), b"\x1b[4;2$y".to_vec());
    vt.write(b"\x1b[4h\x1b[4$p");
    assert_eq!(vt.take_output(), b"\x1b[4;1$y".to_vec());
}

#[test]
fn cursor_blink_mode_12() {
    let (mut vt, log) = term(25, 80);
    vt.write(b"\x1b[?12l");
    assert_eq!(
        last_prop(&log.borrow(), TermProp::CursorBlink),
        Some(Prop::Bool(false))
    );
}

#[test]
fn bracketed_paste_mode() {
    let (mut vt, _) = term(25, 80);
    vt.keyboard_start_paste();
    assert_eq!(vt.take_output(), b"".to_vec());
    vt.write(b"\x1b[?2004h");
    vt.keyboard_start_paste();
    assert_eq!(vt.take_output(), b"\x1b[200~".to_vec());
    vt.keyboard_end_paste();
    assert_eq!(vt.take_output(), b"\x1b[201~".to_vec());
}

#[test]
fn origin_mode_set_homes_to_region() {
    let (mut vt, _) = term(25, 80);
    vt.write(b"\x1b[5;20r\x1b[10;10H\x1b[?6h");
    assert_eq!(cursor(&vt), (4, 0));
}
