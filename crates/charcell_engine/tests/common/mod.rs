//! Shared recording callbacks for the engine integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use charcell_engine::{
    Cell, GlyphInfo, LineInfo, Position, PropValue, Rect, ScreenCallbacks, StateCallbacks,
    StateFallbacks, StringFragment, TermProp, Terminal,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    Bool(bool),
    Int(i32),
    Str(String),
}

#[derive(Default)]
pub struct Log {
    pub putglyphs: Vec<(Vec<char>, i8, i32, i32)>,
    pub movecursors: Vec<(Position, Position, bool)>,
    pub scrollrects: Vec<(Rect, i32, i32)>,
    pub moverects: Vec<(Rect, Rect)>,
    pub premoves: Vec<Rect>,
    pub erases: Vec<(Rect, bool)>,
    pub termprops: Vec<(TermProp, Prop)>,
    pub bells: usize,
    pub damages: Vec<Rect>,
    pub sb_pushlines: Vec<(Vec<char>, bool)>,
    pub sb_poplines: usize,
    pub sb_clears: usize,
    pub setlineinfos: Vec<(i32, LineInfo)>,
}

impl Log {
    pub fn clear(&mut self) {
        *self = Log::default();
    }
}

fn record_prop(val: &PropValue<'_>) -> Prop {
    match val {
        PropValue::Bool(b) => Prop::Bool(*b),
        PropValue::Int(n) => Prop::Int(*n),
        PropValue::String(frag) => Prop::Str(String::from_utf8_lossy(frag.bytes).into_owned()),
        PropValue::Color(_) => Prop::Int(-1),
    }
}

/// State-level recorder. `accept_scrollrect` mirrors the two callback sets
/// the tests use: accepting hosts see scrollrect, declining hosts see the
/// premove + moverect + erase fallback.
pub struct StateRecorder {
    pub log: Rc<RefCell<Log>>,
    pub accept_scrollrect: bool,
}

impl StateCallbacks for StateRecorder {
    fn on_putglyph(&mut self, info: &GlyphInfo<'_>, pos: Position) -> bool {
        self.log
            .borrow_mut()
            .putglyphs
            .push((info.chars.to_vec(), info.width, pos.row, pos.col));
        true
    }

    fn on_movecursor(&mut self, pos: Position, oldpos: Position, visible: bool) -> bool {
        self.log.borrow_mut().movecursors.push((pos, oldpos, visible));
        true
    }

    fn on_scrollrect(&mut self, rect: Rect, downward: i32, rightward: i32) -> bool {
        if self.accept_scrollrect {
            self.log.borrow_mut().scrollrects.push((rect, downward, rightward));
        }
        self.accept_scrollrect
    }

    fn on_moverect(&mut self, dest: Rect, src: Rect) -> bool {
        self.log.borrow_mut().moverects.push((dest, src));
        true
    }

    fn on_premove(&mut self, dest: Rect) -> bool {
        self.log.borrow_mut().premoves.push(dest);
        true
    }

    fn on_erase(&mut self, rect: Rect, selective: bool) -> bool {
        self.log.borrow_mut().erases.push((rect, selective));
        true
    }

    fn on_settermprop(&mut self, prop: TermProp, val: PropValue<'_>) -> bool {
        self.log.borrow_mut().termprops.push((prop, record_prop(&val)));
        true
    }

    fn on_bell(&mut self) -> bool {
        self.log.borrow_mut().bells += 1;
        true
    }

    fn on_setlineinfo(&mut self, row: i32, new: LineInfo, _old: LineInfo) -> bool {
        self.log.borrow_mut().setlineinfos.push((row, new));
        true
    }

    fn on_sb_clear(&mut self) -> bool {
        self.log.borrow_mut().sb_clears += 1;
        false
    }
}

/// Screen-level recorder. `store_scrollback` makes pushline take lines and
/// popline answer with a canned "ABCDE" row, like the reference harness.
pub struct ScreenRecorder {
    pub log: Rc<RefCell<Log>>,
    pub store_scrollback: bool,
}

impl ScreenCallbacks for ScreenRecorder {
    fn on_damage(&mut self, rect: Rect) -> bool {
        self.log.borrow_mut().damages.push(rect);
        true
    }

    fn on_moverect(&mut self, dest: Rect, src: Rect) -> bool {
        self.log.borrow_mut().moverects.push((dest, src));
        true
    }

    fn on_movecursor(&mut self, pos: Position, oldpos: Position, visible: bool) -> bool {
        self.log.borrow_mut().movecursors.push((pos, oldpos, visible));
        true
    }

    fn on_settermprop(&mut self, prop: TermProp, val: PropValue<'_>) -> bool {
        self.log.borrow_mut().termprops.push((prop, record_prop(&val)));
        true
    }

    fn on_bell(&mut self) -> bool {
        self.log.borrow_mut().bells += 1;
        true
    }

    fn on_sb_pushline(&mut self, cells: &[Cell], continuation: bool) -> bool {
        if !self.store_scrollback {
            return false;
        }
        let chars: Vec<char> = cells.iter().map(Cell::base_char).collect();
        self.log.borrow_mut().sb_pushlines.push((chars, continuation));
        true
    }

    fn on_sb_popline(&mut self, cells: &mut [Cell], continuation: &mut bool) -> bool {
        if !self.store_scrollback {
            return false;
        }
        self.log.borrow_mut().sb_poplines += 1;
        for (cell, ch) in cells.iter_mut().zip("ABCDE".chars()) {
            cell.chars[0] = ch;
            cell.width = 1;
        }
        *continuation = false;
        true
    }
}

/// Record unrecognized sequences.
#[derive(Default)]
pub struct FallbackLog {
    pub controls: Vec<u8>,
    pub csis: Vec<(Vec<u8>, Vec<i64>, Vec<u8>, u8)>,
    pub oscs: Vec<(i32, Vec<u8>)>,
    pub dcss: Vec<(Vec<u8>, Vec<u8>)>,
    pub apcs: Vec<Vec<u8>>,
    pub pms: Vec<Vec<u8>>,
    pub soss: Vec<Vec<u8>>,
}

pub struct FallbackRecorder {
    pub log: Rc<RefCell<FallbackLog>>,
}

impl StateFallbacks for FallbackRecorder {
    fn on_control(&mut self, byte: u8) -> bool {
        self.log.borrow_mut().controls.push(byte);
        true
    }

    fn on_csi(&mut self, leader: &[u8], args: &[i64], intermed: &[u8], final_byte: u8) -> bool {
        self.log.borrow_mut().csis.push((
            leader.to_vec(),
            args.to_vec(),
            intermed.to_vec(),
            final_byte,
        ));
        true
    }

    fn on_osc(&mut self, command: i32, frag: StringFragment<'_>) -> bool {
        let mut log = self.log.borrow_mut();
        if frag.initial {
            log.oscs.push((command, frag.bytes.to_vec()));
        } else if let Some(last) = log.oscs.last_mut() {
            last.1.extend_from_slice(frag.bytes);
        }
        true
    }

    fn on_dcs(&mut self, command: &[u8], frag: StringFragment<'_>) -> bool {
        let mut log = self.log.borrow_mut();
        if frag.initial {
            log.dcss.push((command.to_vec(), frag.bytes.to_vec()));
        } else if let Some(last) = log.dcss.last_mut() {
            last.1.extend_from_slice(frag.bytes);
        }
        true
    }

    fn on_apc(&mut self, frag: StringFragment<'_>) -> bool {
        push_string(&mut self.log.borrow_mut().apcs, frag);
        true
    }

    fn on_pm(&mut self, frag: StringFragment<'_>) -> bool {
        push_string(&mut self.log.borrow_mut().pms, frag);
        true
    }

    fn on_sos(&mut self, frag: StringFragment<'_>) -> bool {
        push_string(&mut self.log.borrow_mut().soss, frag);
        true
    }
}

fn push_string(store: &mut Vec<Vec<u8>>, frag: StringFragment<'_>) {
    if frag.initial {
        store.push(frag.bytes.to_vec());
    } else if let Some(last) = store.last_mut() {
        last.extend_from_slice(frag.bytes);
    }
}

// --- Construction helpers ---

pub fn term(rows: i32, cols: i32) -> (Terminal, Rc<RefCell<Log>>) {
    term_with(rows, cols, true)
}

pub fn term_no_scrollrect(rows: i32, cols: i32) -> (Terminal, Rc<RefCell<Log>>) {
    term_with(rows, cols, false)
}

fn term_with(rows: i32, cols: i32, accept_scrollrect: bool) -> (Terminal, Rc<RefCell<Log>>) {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut vt = Terminal::new(rows, cols);
    vt.set_state_callbacks(Box::new(StateRecorder {
        log: log.clone(),
        accept_scrollrect,
    }));
    (vt, log)
}

pub fn cursor(vt: &Terminal) -> (i32, i32) {
    let pos = vt.state().cursor_pos();
    (pos.row, pos.col)
}

/// The visible text of one row, trailing whitespace trimmed.
pub fn screen_row(vt: &Terminal, row: i32) -> String {
    let text = vt
        .screen()
        .get_text(Rect::new(row, row + 1, 0, vt.cols()));
    text.trim_end().to_string()
}

pub fn glyph_at(log: &Log, i: usize) -> (char, i8, i32, i32) {
    let (chars, width, row, col) = &log.putglyphs[i];
    (chars[0], *width, *row, *col)
}
