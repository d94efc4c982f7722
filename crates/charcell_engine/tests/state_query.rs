mod common;

use charcell_engine::Terminal;
use pretty_assertions::assert_eq;

fn query(vt: &mut Terminal, bytes: &[u8]) -> Vec<u8> {
    vt.take_output();
    vt.write(bytes);
    vt.take_output()
}

#[test]
fn device_attributes() {
    let mut vt = Terminal::new(25, 80);
    assert_eq!(query(&mut vt, b"\x1b[c"), b"\x1b[?1;2c".to_vec());
    assert_eq!(query(&mut vt, b"\x1b[0c"), b"\x1b[?1;2c".to_vec());
    assert_eq!(query(&mut vt, b"\x1b[>c"), b"\x1b[>0;100;0c".to_vec());
}

#[test]
fn xtversion() {
    let mut vt = Terminal::new(25, 80);
    assert_eq!(query(&mut vt, b"\x1b[>q"), b"\x1bP>|libvterm(0.3)\x1b\\".to_vec());
}

#[test]
fn device_status_report() {
    let mut vt = Terminal::new(25, 80);
    assert_eq!(query(&mut vt, b"\x1b[5n"), b"\x1b[0n".to_vec());
}

#[test]
fn cursor_position_report() {
    let mut vt = Terminal::new(25, 80);
    assert_eq!(query(&mut vt, b"\x1b[6n"), b"\x1b[1;1R".to_vec());
    assert_eq!(query(&mut vt, b"\x1b[10;10H\x1b[6n"), b"\x1b[10;10R".to_vec());
    assert_eq!(query(&mut vt, b"\x1b[?6n"), b"\x1b[?10;10R".to_vec());
}

#[test]
fn decrqss_sgr() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[1;5;7m");
    assert_eq!(query(&mut vt, b"\x1bP$qm\x1b\\"), b"\x1bP1$r1;5;7m\x1b\\".to_vec());
}

#[test]
fn decrqss_sgr_ansi_colors() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[0;31;42m");
    assert_eq!(query(&mut vt, b"\x1bP$qm\x1b\\"), b"\x1bP1$r31;42m\x1b\\".to_vec());
}

#[test]
fn decrqss_sgr_hibright_colors() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[0;93;104m");
    assert_eq!(query(&mut vt, b"\x1bP$qm\x1b\\"), b"\x1bP1$r93;104m\x1b\\".to_vec());
}

#[test]
fn decrqss_sgr_256_palette() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[0;38:5:56;48:5:78m");
    assert_eq!(
        query(&mut vt, b"\x1bP$qm\x1b\\"),
        b"\x1bP1$r38:5:56;48:5:78m\x1b\\".to_vec()
    );
}

#[test]
fn decrqss_sgr_rgb() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[0;38:2:24:68:112;48:2:13:57:101m");
    assert_eq!(
        query(&mut vt, b"\x1bP$qm\x1b\\"),
        b"\x1bP1$r38:2:24:68:112;48:2:13:57:101m\x1b\\".to_vec()
    );
}

#[test]
fn decrqss_semicolon_color_forms_normalize_to_colons() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[0;38;5;56m");
    assert_eq!(
        query(&mut vt, b"\x1bP$qm\x1b\\"),
        b"\x1bP1$r38:5:56m\x1b\\".to_vec()
    );
}

#[test]
fn decrqss_decstbm_and_decslrm() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[?69h\x1b[3;10r\x1b[10;40s");
    assert_eq!(query(&mut vt, b"\x1bP$qr\x1b\\"), b"\x1bP1$r3;10r\x1b\\".to_vec());
    assert_eq!(query(&mut vt, b"\x1bP$qs\x1b\\"), b"\x1bP1$r10;40s\x1b\\".to_vec());
}

#[test]
fn decrqss_decscusr() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[3 q");
    assert_eq!(query(&mut vt, b"\x1bP$q q\x1b\\"), b"\x1bP1$r3 q\x1b\\".to_vec());
}

#[test]
fn decrqss_decsca() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b[1\"q");
    assert_eq!(query(&mut vt, b"\x1bP$q\"q\x1b\\"), b"\x1bP1$r1\"q\x1b\\".to_vec());
}

#[test]
fn decrqss_unknown_selector() {
    let mut vt = Terminal::new(25, 80);
    assert_eq!(query(&mut vt, b"\x1bP$qz\x1b\\"), b"\x1bP0$r\x1b\\".to_vec());
}

#[test]
fn s8c1t_switches_reply_controls() {
    let mut vt = Terminal::new(25, 80);
    vt.write(b"\x1b G");
    assert_eq!(query(&mut vt, b"\x1b[5n"), b"\x9b0n".to_vec());
    vt.write(b"\x1b F");
    assert_eq!(query(&mut vt, b"\x1b[5n"), b"\x1b[0n".to_vec());
}

#[test]
fn decscusr_reports_termprops() {
    let (mut vt, log) = common::term(25, 80);
    vt.write(b"\x1b[4 q");
    let log = log.borrow();
    let shapes: Vec<&common::Prop> = log
        .termprops
        .iter()
        .filter(|(p, _)| *p == charcell_engine::TermProp::CursorShape)
        .map(|(_, v)| v)
        .collect();
    assert_eq!(shapes.last(), Some(&&common::Prop::Int(2)));
    let blinks: Vec<&common::Prop> = log
        .termprops
        .iter()
        .filter(|(p, _)| *p == charcell_engine::TermProp::CursorBlink)
        .map(|(_, v)| v)
        .collect();
    assert_eq!(blinks.last(), Some(&&common::Prop::Bool(false)));
}
