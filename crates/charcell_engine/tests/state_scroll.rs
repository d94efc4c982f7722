mod common;

use charcell_engine::Rect;
use common::{cursor, term, term_no_scrollrect};
use pretty_assertions::assert_eq;

#[test]
fn linefeed_at_bottom_scrolls() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(&[b'\n'; 24]);
    assert_eq!(cursor(&vt), (24, 0));
    log.borrow_mut().clear();

    vt.write(b"\n");
    let log = log.borrow();
    assert_eq!(log.scrollrects.len(), 1);
    assert_eq!(log.scrollrects[0], (Rect::new(0, 25, 0, 80), 1, 0));
    assert_eq!(cursor(&vt), (24, 0));
}

#[test]
fn index_and_reverse_index() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[25H");
    log.borrow_mut().clear();
    vt.write(b"\x1bD");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(0, 25, 0, 80), 1, 0));

    log.borrow_mut().clear();
    vt.write(b"\x1b[H\x1bM");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(0, 25, 0, 80), -1, 0));
}

#[test]
fn linefeed_in_scroll_region() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[1;10r");
    vt.write(&[b'\n'; 9]);
    assert_eq!(cursor(&vt), (9, 0));
    log.borrow_mut().clear();

    vt.write(b"\n");
    let log = log.borrow();
    assert_eq!(log.scrollrects[0], (Rect::new(0, 10, 0, 80), 1, 0));
    assert_eq!(cursor(&vt), (9, 0));
}

#[test]
fn linefeed_below_scroll_region_does_not_scroll() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[9;10r\x1b[25H");
    log.borrow_mut().clear();
    vt.write(b"\n");
    assert_eq!(log.borrow().scrollrects.len(), 0);
    assert_eq!(cursor(&vt), (24, 0));
}

#[test]
fn scroll_region_with_lr_margins() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[?69h\x1b[3;10r\x1b[10;40s");
    log.borrow_mut().clear();

    vt.write(b"\x1b[10;10H\n");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(2, 10, 9, 40), 1, 0));

    log.borrow_mut().clear();
    vt.write(b"\x1b[3;10H\x1bM");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(2, 10, 9, 40), -1, 0));
}

#[test]
fn scroll_up_and_down_amounts() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);

    vt.write(b"\x1b[S");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(0, 25, 0, 80), 1, 0));

    log.borrow_mut().clear();
    vt.write(b"\x1b[2S");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(0, 25, 0, 80), 2, 0));

    log.borrow_mut().clear();
    vt.write(b"\x1b[100S");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(0, 25, 0, 80), 25, 0));

    log.borrow_mut().clear();
    vt.write(b"\x1b[T");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(0, 25, 0, 80), -1, 0));

    log.borrow_mut().clear();
    vt.write(b"\x1b[100T");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(0, 25, 0, 80), -25, 0));
}

#[test]
fn su_sd_honor_margins() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[5;20r");
    log.borrow_mut().clear();
    vt.write(b"\x1b[S");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(4, 20, 0, 80), 1, 0));

    vt.write(b"\x1b[?69h\x1b[10;40s");
    log.borrow_mut().clear();
    vt.write(b"\x1b[S");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(4, 20, 9, 40), 1, 0));

    // Disabling DECLRMM re-widens the region without clearing the stored
    // margins.
    vt.write(b"\x1b[?69l");
    log.borrow_mut().clear();
    vt.write(b"\x1b[S");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(4, 20, 0, 80), 1, 0));
}

#[test]
fn scroll_up_fallback_is_premove_moverect_erase() {
    let (mut vt, log) = term_no_scrollrect(25, 80);
    vt.set_utf8(true);
    vt.state_mut().enable_premove();

    vt.write(b"\x1b[S");
    {
        let log = log.borrow();
        assert_eq!(log.premoves, vec![Rect::new(0, 1, 0, 80)]);
        assert_eq!(
            log.moverects,
            vec![(Rect::new(0, 24, 0, 80), Rect::new(1, 25, 0, 80))]
        );
        assert_eq!(log.erases, vec![(Rect::new(24, 25, 0, 80), false)]);
    }

    log.borrow_mut().clear();
    vt.write(b"\x1b[2S");
    let log = log.borrow();
    assert_eq!(log.premoves, vec![Rect::new(0, 2, 0, 80)]);
    assert_eq!(
        log.moverects,
        vec![(Rect::new(0, 23, 0, 80), Rect::new(2, 25, 0, 80))]
    );
    assert_eq!(log.erases, vec![(Rect::new(23, 25, 0, 80), false)]);
}

#[test]
fn scroll_down_fallback_is_premove_moverect_erase() {
    let (mut vt, log) = term_no_scrollrect(25, 80);
    vt.set_utf8(true);
    vt.state_mut().enable_premove();

    vt.write(b"\x1b[T");
    let log = log.borrow();
    assert_eq!(log.premoves, vec![Rect::new(24, 25, 0, 80)]);
    assert_eq!(
        log.moverects,
        vec![(Rect::new(1, 25, 0, 80), Rect::new(0, 24, 0, 80))]
    );
    assert_eq!(log.erases, vec![(Rect::new(0, 1, 0, 80), false)]);
}

#[test]
fn premove_requires_opt_in() {
    let (mut vt, log) = term_no_scrollrect(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[S");
    let log = log.borrow();
    assert_eq!(log.premoves.len(), 0);
    assert_eq!(log.moverects.len(), 1);
}

#[test]
fn decstbm_validation() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    // Invalid regions are ignored; these must not scroll a partial region.
    vt.write(b"\x1b[100;105r\x1b[25H");
    log.borrow_mut().clear();
    vt.write(b"\x1bD");
    assert_eq!(log.borrow().scrollrects[0].0, Rect::new(0, 25, 0, 80));

    vt.write(b"\x1b[5;2r\x1b[25H");
    log.borrow_mut().clear();
    vt.write(b"\x1bD");
    assert_eq!(log.borrow().scrollrects[0].0, Rect::new(0, 25, 0, 80));
}

#[test]
fn decstbm_homes_cursor() {
    let (mut vt, _) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[5;5H");
    assert_eq!(cursor(&vt), (4, 4));
    vt.write(b"\x1b[r");
    assert_eq!(cursor(&vt), (0, 0));
}

#[test]
fn insert_delete_lines_emit_region_scrolls() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[5;20r\x1b[10H");
    log.borrow_mut().clear();

    vt.write(b"\x1b[2L");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(9, 20, 0, 80), -2, 0));

    log.borrow_mut().clear();
    vt.write(b"\x1b[3M");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(9, 20, 0, 80), 3, 0));
}

#[test]
fn il_outside_region_is_ignored() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[5;10r\x1b[15H");
    log.borrow_mut().clear();
    vt.write(b"\x1b[L");
    assert_eq!(log.borrow().scrollrects.len(), 0);
}

#[test]
fn ich_dch_shift_within_row() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[4;10H");
    log.borrow_mut().clear();

    vt.write(b"\x1b[3@");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(3, 4, 9, 80), 0, -3));

    log.borrow_mut().clear();
    vt.write(b"\x1b[2P");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(3, 4, 9, 80), 0, 2));
}

#[test]
fn decic_decdc_shift_region_columns() {
    let (mut vt, log) = term(25, 80);
    vt.set_utf8(true);
    vt.write(b"\x1b[5;20r\x1b[1;10H");
    log.borrow_mut().clear();

    vt.write(b"\x1b[2'}");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(4, 20, 9, 80), 0, -2));

    log.borrow_mut().clear();
    vt.write(b"\x1b[2'~");
    assert_eq!(log.borrow().scrollrects[0], (Rect::new(4, 20, 9, 80), 0, 2));
}

#[test]
fn scrolled_content_moves_on_screen() {
    let (mut vt, _) = term(5, 10);
    vt.set_utf8(true);
    vt.write(b"one\r\ntwo\r\nthree");
    vt.write(b"\x1b[S");
    assert_eq!(common::screen_row(&vt, 0), "two");
    assert_eq!(common::screen_row(&vt, 1), "three");
    assert_eq!(common::screen_row(&vt, 4), "");
}
