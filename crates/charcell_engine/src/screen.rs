//! The screen model: a cell grid fed by state-machine operations.
//!
//! Maintains the primary and alternate buffers, merges damage rectangles,
//! mirrors the cursor for renderers, and owns the resize logic including
//! cross-resize reflow and the scrollback exchange.

use crate::{
    AttrMask, Cell, DamageSize, GlyphInfo, LineInfo, Palette, Pen, Position, PropValue, Rect,
    SbLine, ScreenCallbacks, Scrollback, State, TermProp,
    state::{ALTSCREEN, PRIMARY},
};

pub struct Screen {
    rows: i32,
    cols: i32,
    cells: [Vec<Cell>; 2],
    lineinfos: [Vec<LineInfo>; 2],
    active: usize,

    altscreen_enabled: bool,
    reflow_enabled: bool,

    damage_merge: DamageSize,
    pending_damage: Option<Rect>,

    cursor: Position,
    cursor_visible: bool,

    // Mirror of the state pen, updated through setpenattr, so erased cells
    // take the right colors.
    pen: Pen,
    palette: Palette,

    callbacks: Option<Box<dyn ScreenCallbacks>>,
}

impl Screen {
    pub fn new(rows: i32, cols: i32) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let size = (rows * cols) as usize;
        let palette = Palette::default();
        let mut pen = Pen::default();
        pen.reset(&palette);
        let blank = Cell::blank(&palette);
        Screen {
            rows,
            cols,
            cells: [vec![blank; size], vec![blank; size]],
            lineinfos: [
                vec![LineInfo::default(); rows as usize],
                vec![LineInfo::default(); rows as usize],
            ],
            active: PRIMARY,
            altscreen_enabled: false,
            reflow_enabled: false,
            damage_merge: DamageSize::Cell,
            pending_damage: None,
            cursor: Position::default(),
            cursor_visible: true,
            pen,
            palette,
            callbacks: None,
        }
    }

    pub fn set_callbacks(&mut self, callbacks: Box<dyn ScreenCallbacks>) {
        self.callbacks = Some(callbacks);
    }

    pub fn clear_callbacks(&mut self) {
        self.callbacks = None;
    }

    pub fn enable_altscreen(&mut self, enabled: bool) {
        self.altscreen_enabled = enabled;
    }

    pub fn enable_reflow(&mut self, enabled: bool) {
        self.reflow_enabled = enabled;
    }

    pub fn set_damage_merge(&mut self, size: DamageSize) {
        self.flush_damage();
        self.damage_merge = size;
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn reset(&mut self, _hard: bool) {
        let blank = Cell::blank(&self.palette);
        for buffer in &mut self.cells {
            buffer.iter_mut().for_each(|c| *c = blank);
        }
        for infos in &mut self.lineinfos {
            infos.iter_mut().for_each(|i| *i = LineInfo::default());
        }
        self.active = PRIMARY;
        self.pending_damage = None;
        self.cursor = Position::default();
        self.pen.reset(&self.palette);
        self.damage(Rect::new(0, self.rows, 0, self.cols));
    }

    fn index(&self, row: i32, col: i32) -> usize {
        (row * self.cols + col) as usize
    }

    fn cell_ref(&mut self, row: i32, col: i32) -> &mut Cell {
        let idx = self.index(row, col);
        &mut self.cells[self.active][idx]
    }

    fn blank_cell(&self) -> Cell {
        Cell {
            fg: self.pen.fg,
            bg: self.pen.bg,
            ..Cell::blank(&self.palette)
        }
    }

    // --- Damage ---

    fn emit_damage(&mut self, rect: Rect) {
        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_damage(rect);
        }
    }

    fn damage(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        match self.damage_merge {
            DamageSize::Cell => self.emit_damage(rect),
            DamageSize::Row => match &mut self.pending_damage {
                Some(pending)
                    if pending.start_row == rect.start_row && pending.end_row == rect.end_row =>
                {
                    pending.expand(&rect);
                }
                Some(_) => {
                    self.flush_damage();
                    self.pending_damage = Some(rect);
                }
                None => self.pending_damage = Some(rect),
            },
            DamageSize::Screen | DamageSize::Scroll => match &mut self.pending_damage {
                Some(pending) => pending.expand(&rect),
                None => self.pending_damage = Some(rect),
            },
        }
    }

    /// Emit any merged damage now.
    pub fn flush_damage(&mut self) {
        if let Some(rect) = self.pending_damage.take() {
            self.emit_damage(rect);
        }
    }

    /// Row-merged damage is reported at the end of each write call.
    pub(crate) fn end_of_write(&mut self) {
        if self.damage_merge == DamageSize::Row {
            self.flush_damage();
        }
    }

    // --- State operation application ---

    pub(crate) fn apply_putglyph(&mut self, info: &GlyphInfo<'_>, pos: Position) {
        if pos.row < 0 || pos.row >= self.rows || pos.col < 0 || pos.col >= self.cols {
            return;
        }
        let mut attrs = self.pen.attrs;
        attrs.set_protected(info.protected);
        attrs.set_dwl(info.dwl);
        attrs.dhl = info.dhl;

        let mut cell = Cell {
            chars: ['\0'; crate::MAX_CHARS_PER_CELL],
            width: info.width,
            attrs,
            fg: self.pen.fg,
            bg: self.pen.bg,
        };
        for (slot, &ch) in cell.chars.iter_mut().zip(info.chars.iter()) {
            *slot = ch;
        }
        *self.cell_ref(pos.row, pos.col) = cell;

        if info.width == 2 && pos.col + 1 < self.cols {
            let half = Cell {
                chars: ['\0'; crate::MAX_CHARS_PER_CELL],
                width: 0,
                attrs,
                fg: self.pen.fg,
                bg: self.pen.bg,
            };
            *self.cell_ref(pos.row, pos.col + 1) = half;
        }

        let end_col = (pos.col + i32::from(info.width).max(1)).min(self.cols);
        self.damage(Rect::row_span(pos.row, pos.col, end_col));
    }

    pub(crate) fn apply_movecursor(&mut self, pos: Position, oldpos: Position, visible: bool) {
        self.cursor = pos;
        self.cursor_visible = visible;
        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_movecursor(pos, oldpos, visible);
        }
    }

    pub(crate) fn apply_erase(&mut self, rect: Rect, selective: bool) {
        let mut rect = rect;
        rect.clip(&Rect::new(0, self.rows, 0, self.cols));
        if rect.is_empty() {
            return;
        }
        let blank = self.blank_cell();
        for row in rect.start_row..rect.end_row {
            for col in rect.start_col..rect.end_col {
                let cell = self.cell_ref(row, col);
                if selective && cell.attrs.is_protected() {
                    continue;
                }
                *cell = blank;
            }
        }
        self.damage(rect);
    }

    pub(crate) fn apply_scrollrect(
        &mut self,
        rect: Rect,
        downward: i32,
        rightward: i32,
        sb: &mut Scrollback,
    ) {
        let mut rect = rect;
        rect.clip(&Rect::new(0, self.rows, 0, self.cols));
        if rect.is_empty() {
            return;
        }
        let downward = downward.clamp(-rect.height(), rect.height());
        let rightward = rightward.clamp(-rect.width(), rect.width());

        // Lines leaving the top of the primary buffer feed the scrollback.
        if self.active == PRIMARY
            && downward > 0
            && rect.start_row == 0
            && rect.start_col == 0
            && rect.end_col == self.cols
        {
            for row in 0..downward {
                self.push_row_to_scrollback(row, sb, false);
            }
        }

        match self.damage_merge {
            DamageSize::Cell => {}
            DamageSize::Scroll => {
                if let Some(pending) = &mut self.pending_damage {
                    if pending.intersects(&rect) {
                        pending.translate(-downward, -rightward);
                        pending.clip(&Rect::new(0, self.rows, 0, self.cols));
                        if pending.is_empty() {
                            self.pending_damage = None;
                        }
                    }
                }
            }
            // Row and screen merges cannot carry damage across a scroll.
            _ => self.flush_damage(),
        }

        if downward.abs() >= rect.height() || rightward.abs() >= rect.width() {
            self.apply_erase(rect, false);
            return;
        }

        let mut src = rect;
        let mut dest = rect;
        if downward > 0 {
            src.start_row += downward;
            dest.end_row -= downward;
        } else {
            src.end_row += downward;
            dest.start_row -= downward;
        }
        if rightward > 0 {
            src.start_col += rightward;
            dest.end_col -= rightward;
        } else {
            src.end_col += rightward;
            dest.start_col -= rightward;
        }

        self.move_cells(dest, src);
        if rightward == 0 && rect.start_col == 0 && rect.end_col == self.cols {
            self.scroll_lineinfo(&rect, downward);
        }

        let moved = if let Some(cb) = self.callbacks.as_mut() {
            cb.on_moverect(dest, src)
        } else {
            false
        };
        if !moved {
            let mut union = dest;
            union.expand(&src);
            self.damage(union);
        }

        let freed = if downward > 0 {
            Rect::new(rect.end_row - downward, rect.end_row, rect.start_col, rect.end_col)
        } else if downward < 0 {
            Rect::new(rect.start_row, rect.start_row - downward, rect.start_col, rect.end_col)
        } else if rightward > 0 {
            Rect::new(rect.start_row, rect.end_row, rect.end_col - rightward, rect.end_col)
        } else {
            Rect::new(rect.start_row, rect.end_row, rect.start_col, rect.start_col - rightward)
        };
        self.apply_erase(freed, false);
    }

    fn move_cells(&mut self, dest: Rect, src: Rect) {
        let cols = self.cols;
        let buffer = &mut self.cells[self.active];
        let row_delta = dest.start_row - src.start_row;
        let col_delta = dest.start_col - src.start_col;

        let rows: Vec<i32> = if row_delta <= 0 {
            (src.start_row..src.end_row).collect()
        } else {
            (src.start_row..src.end_row).rev().collect()
        };
        for src_row in rows {
            let dst_row = src_row + row_delta;
            if col_delta <= 0 {
                for src_col in src.start_col..src.end_col {
                    let from = (src_row * cols + src_col) as usize;
                    let to = (dst_row * cols + src_col + col_delta) as usize;
                    buffer[to] = buffer[from];
                }
            } else {
                for src_col in (src.start_col..src.end_col).rev() {
                    let from = (src_row * cols + src_col) as usize;
                    let to = (dst_row * cols + src_col + col_delta) as usize;
                    buffer[to] = buffer[from];
                }
            }
        }
    }

    fn scroll_lineinfo(&mut self, rect: &Rect, downward: i32) {
        if downward == 0 {
            return;
        }
        let infos = &mut self.lineinfos[self.active];
        let top = rect.start_row as usize;
        let bottom = rect.end_row as usize;
        if downward > 0 {
            let n = (downward as usize).min(bottom - top);
            infos[top..bottom].rotate_left(n);
            for info in &mut infos[bottom - n..bottom] {
                *info = LineInfo::default();
            }
        } else {
            let n = ((-downward) as usize).min(bottom - top);
            infos[top..bottom].rotate_right(n);
            for info in &mut infos[top..top + n] {
                *info = LineInfo::default();
            }
        }
    }

    fn push_row_to_scrollback(&mut self, row: i32, sb: &mut Scrollback, tracked: bool) {
        let start = self.index(row, 0);
        let end = self.index(row, self.cols - 1) + 1;
        let cells: Vec<Cell> = self.cells[PRIMARY][start..end].to_vec();
        let continuation = self.lineinfos[PRIMARY][row as usize].continuation;
        let taken = if let Some(cb) = self.callbacks.as_mut() {
            cb.on_sb_pushline(&cells, continuation)
        } else {
            false
        };
        if !taken {
            sb.push(
                SbLine {
                    cells,
                    continuation,
                },
                tracked,
            );
        }
    }

    /// Ask for a stored line back: host callback first, internal ring
    /// second. Resize-grow pops only take ring lines a shrink pushed.
    fn pop_row_from_scrollback(&mut self, sb: &mut Scrollback) -> Option<SbLine> {
        let mut cells = vec![self.blank_cell(); self.cols as usize];
        let mut continuation = false;
        let from_host = if let Some(cb) = self.callbacks.as_mut() {
            cb.on_sb_popline(&mut cells, &mut continuation)
        } else {
            false
        };
        if from_host {
            return Some(SbLine {
                cells,
                continuation,
            });
        }
        sb.pop(true)
    }

    pub(crate) fn apply_setpenattr(&mut self, attr: crate::PenAttr, val: crate::PenValue) {
        use crate::{Baseline, PenAttr, PenValue, Underline};
        match (attr, val) {
            (PenAttr::Bold, PenValue::Bool(b)) => self.pen.attrs.set_bold(b),
            (PenAttr::Underline, PenValue::Int(n)) => {
                self.pen.attrs.underline = match n {
                    1 => Underline::Single,
                    2 => Underline::Double,
                    3 => Underline::Curly,
                    _ => Underline::Off,
                };
            }
            (PenAttr::Italic, PenValue::Bool(b)) => self.pen.attrs.set_italic(b),
            (PenAttr::Blink, PenValue::Bool(b)) => self.pen.attrs.set_blinking(b),
            (PenAttr::Reverse, PenValue::Bool(b)) => self.pen.attrs.set_reverse(b),
            (PenAttr::Conceal, PenValue::Bool(b)) => self.pen.attrs.set_concealed(b),
            (PenAttr::Strike, PenValue::Bool(b)) => self.pen.attrs.set_crossed_out(b),
            (PenAttr::Font, PenValue::Int(n)) => self.pen.attrs.font = n.clamp(0, 9) as u8,
            (PenAttr::Small, PenValue::Bool(b)) => self.pen.attrs.set_small(b),
            (PenAttr::Baseline, PenValue::Int(n)) => {
                self.pen.attrs.baseline = match n {
                    1 => Baseline::Raise,
                    2 => Baseline::Lower,
                    _ => Baseline::Normal,
                };
            }
            (PenAttr::Foreground, PenValue::Color(c)) => self.pen.fg = c,
            (PenAttr::Background, PenValue::Color(c)) => self.pen.bg = c,
            _ => {}
        }
    }

    pub(crate) fn apply_initpen(&mut self) {
        self.pen.reset(&self.palette);
    }

    pub(crate) fn apply_settermprop(&mut self, prop: TermProp, val: &PropValue<'_>) {
        if prop == TermProp::AltScreen && self.altscreen_enabled {
            let to_alt = val.as_bool().unwrap_or(false);
            let target = if to_alt { ALTSCREEN } else { PRIMARY };
            if target != self.active {
                self.flush_damage();
                self.active = target;
                if to_alt {
                    let blank = self.blank_cell();
                    self.cells[ALTSCREEN].iter_mut().for_each(|c| *c = blank);
                    self.lineinfos[ALTSCREEN]
                        .iter_mut()
                        .for_each(|i| *i = LineInfo::default());
                }
                self.damage(Rect::new(0, self.rows, 0, self.cols));
            }
        }
        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_settermprop(prop, *val);
        }
    }

    pub(crate) fn apply_setlineinfo(&mut self, row: i32, info: LineInfo) {
        if (0..self.rows).contains(&row) {
            self.lineinfos[self.active][row as usize] = info;
        }
    }

    pub(crate) fn apply_bell(&mut self) {
        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_bell();
        }
    }

    pub(crate) fn apply_sb_clear(&mut self, sb: &mut Scrollback) {
        let cleared = if let Some(cb) = self.callbacks.as_mut() {
            cb.on_sb_clear()
        } else {
            false
        };
        if !cleared {
            sb.clear();
        }
    }

    // --- Queries ---

    /// The cell at `pos`, or a zero-filled blank when out of range.
    pub fn get_cell(&self, pos: Position) -> Cell {
        if pos.row < 0 || pos.row >= self.rows || pos.col < 0 || pos.col >= self.cols {
            let mut blank = Cell::blank(&self.palette);
            blank.chars[0] = '\0';
            return blank;
        }
        self.cells[self.active][self.index(pos.row, pos.col)]
    }

    fn extract<F: FnMut(char)>(&self, rect: Rect, mut emit: F) {
        let mut rect = rect;
        rect.clip(&Rect::new(0, self.rows, 0, self.cols));
        for row in rect.start_row..rect.end_row {
            if row > rect.start_row {
                emit('\n');
            }
            let mut pending_blanks = 0;
            for col in rect.start_col..rect.end_col {
                let cell = self.cells[self.active][self.index(row, col)];
                if cell.width == 0 {
                    continue;
                }
                if cell.is_empty() {
                    pending_blanks += 1;
                    continue;
                }
                for _ in 0..pending_blanks {
                    emit(' ');
                }
                pending_blanks = 0;
                for &ch in &cell.chars {
                    if ch == '\0' {
                        break;
                    }
                    emit(ch);
                }
            }
        }
    }

    /// Flatten the rect's code points row-major; rows are separated by a
    /// newline when the rect spans more than one. Trailing blanks on each
    /// row are omitted.
    pub fn get_chars(&self, rect: Rect) -> Vec<char> {
        let mut out = Vec::new();
        self.extract(rect, |c| out.push(c));
        out
    }

    /// Like [`Screen::get_chars`], UTF-8 encoded.
    pub fn get_text(&self, rect: Rect) -> String {
        let mut out = String::new();
        self.extract(rect, |c| out.push(c));
        out
    }

    fn attrs_match(&self, a: &Cell, b: &Cell, mask: AttrMask) -> bool {
        let (aa, ba) = (&a.attrs, &b.attrs);
        if mask.contains(AttrMask::BOLD) && aa.is_bold() != ba.is_bold() {
            return false;
        }
        if mask.contains(AttrMask::UNDERLINE) && aa.underline != ba.underline {
            return false;
        }
        if mask.contains(AttrMask::ITALIC) && aa.is_italic() != ba.is_italic() {
            return false;
        }
        if mask.contains(AttrMask::BLINK) && aa.is_blinking() != ba.is_blinking() {
            return false;
        }
        if mask.contains(AttrMask::REVERSE) && aa.is_reverse() != ba.is_reverse() {
            return false;
        }
        if mask.contains(AttrMask::STRIKE) && aa.is_crossed_out() != ba.is_crossed_out() {
            return false;
        }
        if mask.contains(AttrMask::FONT) && aa.font != ba.font {
            return false;
        }
        if mask.contains(AttrMask::FOREGROUND) && a.fg != b.fg {
            return false;
        }
        if mask.contains(AttrMask::BACKGROUND) && a.bg != b.bg {
            return false;
        }
        if mask.contains(AttrMask::CONCEAL) && aa.is_concealed() != ba.is_concealed() {
            return false;
        }
        if mask.contains(AttrMask::SMALL) && aa.is_small() != ba.is_small() {
            return false;
        }
        if mask.contains(AttrMask::BASELINE) && aa.baseline != ba.baseline {
            return false;
        }
        true
    }

    /// The maximal horizontal run around `pos` whose cells agree on every
    /// attribute selected by `mask`.
    pub fn get_attrs_extent(&self, pos: Position, mask: AttrMask) -> Option<Rect> {
        if pos.row < 0 || pos.row >= self.rows || pos.col < 0 || pos.col >= self.cols {
            return None;
        }
        let target = self.get_cell(pos);
        let mut start_col = pos.col;
        while start_col > 0 {
            let cell = self.get_cell(Position::new(pos.row, start_col - 1));
            if !self.attrs_match(&target, &cell, mask) {
                break;
            }
            start_col -= 1;
        }
        let mut end_col = pos.col + 1;
        while end_col < self.cols {
            let cell = self.get_cell(Position::new(pos.row, end_col));
            if !self.attrs_match(&target, &cell, mask) {
                break;
            }
            end_col += 1;
        }
        Some(Rect::new(pos.row, pos.row + 1, start_col, end_col))
    }

    /// True when every cell from `pos` to the end of the row is empty.
    pub fn is_eol(&self, pos: Position) -> bool {
        if pos.row < 0 || pos.row >= self.rows {
            return true;
        }
        for col in pos.col.max(0)..self.cols {
            if !self.cells[self.active][self.index(pos.row, col)].is_empty() {
                return false;
            }
        }
        true
    }

    // --- Resize ---

    pub(crate) fn resize(
        &mut self,
        new_rows: i32,
        new_cols: i32,
        state: &mut State,
        sb: &mut Scrollback,
    ) {
        let new_rows = new_rows.max(1);
        let new_cols = new_cols.max(1);
        self.flush_damage();

        if new_cols != self.cols {
            if self.reflow_enabled && self.active == PRIMARY {
                self.reflow(new_cols, state, sb);
            } else {
                self.resize_cols_plain(new_cols, state);
            }
        }

        if new_rows != self.rows {
            self.resize_rows(new_rows, state, sb);
        }

        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_resize(new_rows, new_cols);
        }
        self.damage(Rect::new(0, self.rows, 0, self.cols));
    }

    fn resize_cols_plain(&mut self, new_cols: i32, state: &mut State) {
        let blank = self.blank_cell();
        for buffer in &mut self.cells {
            let mut grid = vec![blank; (self.rows * new_cols) as usize];
            for row in 0..self.rows {
                for col in 0..self.cols.min(new_cols) {
                    grid[(row * new_cols + col) as usize] = buffer[(row * self.cols + col) as usize];
                }
            }
            *buffer = grid;
        }
        self.cols = new_cols;
        let _ = state;
    }

    /// Reflow: treat scrollback plus screen as a stream of logical lines,
    /// re-break them at the new width, and redistribute.
    fn reflow(&mut self, new_cols: i32, state: &mut State, sb: &mut Scrollback) {
        let old_cols = self.cols;

        // Rewrap the internal scrollback in place first.
        let stored = sb.take_all();
        let mut logical_sb: Vec<Vec<Cell>> = Vec::new();
        for line in stored {
            if line.continuation && !logical_sb.is_empty() {
                logical_sb.last_mut().unwrap().extend(line.cells);
            } else {
                logical_sb.push(line.cells);
            }
        }
        for mut line in logical_sb {
            strip_trailing_blanks(&mut line);
            let chunks = rewrap_line(&line, new_cols, &self.blank_cell());
            for (i, chunk) in chunks.into_iter().enumerate() {
                sb.push(
                    SbLine {
                        cells: chunk,
                        continuation: i > 0,
                    },
                    false,
                );
            }
        }

        // Collect the used portion of the screen into logical lines.
        let cursor = state.pos;
        let mut last_used = cursor.row;
        for row in (0..self.rows).rev() {
            let start = (row * old_cols) as usize;
            let end = start + old_cols as usize;
            if self.cells[PRIMARY][start..end].iter().any(|c| !c.is_empty()) {
                last_used = last_used.max(row);
                break;
            }
        }

        let mut lines: Vec<Vec<Cell>> = Vec::new();
        let mut line_start_rows: Vec<i32> = Vec::new();
        for row in 0..=last_used {
            let start = (row * old_cols) as usize;
            let end = start + old_cols as usize;
            let cells = self.cells[PRIMARY][start..end].to_vec();
            if self.lineinfos[PRIMARY][row as usize].continuation && !lines.is_empty() {
                lines.last_mut().unwrap().extend(cells);
            } else {
                lines.push(cells);
                line_start_rows.push(row);
            }
        }

        // Locate the cursor as (logical line, cell offset).
        let mut cursor_line = 0;
        let mut cursor_off = 0;
        for (i, &start_row) in line_start_rows.iter().enumerate() {
            let end_row = line_start_rows
                .get(i + 1)
                .copied()
                .unwrap_or(last_used + 1);
            if (start_row..end_row).contains(&cursor.row) {
                cursor_line = i;
                cursor_off = (cursor.row - start_row) * old_cols + cursor.col;
                break;
            }
        }

        // Re-break every logical line at the new width.
        let blank = self.blank_cell();
        let mut chunked: Vec<Vec<Vec<Cell>>> = Vec::with_capacity(lines.len());
        for mut line in lines {
            strip_trailing_blanks(&mut line);
            chunked.push(rewrap_line(&line, new_cols, &blank));
        }

        let total: i32 = chunked.iter().map(|c| c.len() as i32).sum();
        let overflow = (total - self.rows).max(0);

        // Rebuild the grid.
        let mut grid = vec![blank; (self.rows * new_cols) as usize];
        let mut infos = vec![LineInfo::default(); self.rows as usize];
        let mut out_row = -overflow;
        let mut new_cursor = Position::new(0, (cursor.col).min(new_cols - 1));
        for (li, chunks) in chunked.into_iter().enumerate() {
            let line_first_row = out_row;
            for (ci, chunk) in chunks.into_iter().enumerate() {
                if out_row >= 0 && out_row < self.rows {
                    let start = (out_row * new_cols) as usize;
                    grid[start..start + chunk.len().min(new_cols as usize)]
                        .copy_from_slice(&chunk[..chunk.len().min(new_cols as usize)]);
                    infos[out_row as usize].continuation = ci > 0;
                } else if out_row < 0 {
                    // Overflowed the top: back into scrollback.
                    self.push_reflow_overflow(chunk, ci > 0, sb, new_cols);
                }
                out_row += 1;
            }
            if li == cursor_line {
                let row = line_first_row + cursor_off / new_cols;
                new_cursor = Position::new(
                    row.clamp(0, self.rows - 1),
                    (cursor_off % new_cols).clamp(0, new_cols - 1),
                );
            }
        }

        self.cells[PRIMARY] = grid;
        self.lineinfos[PRIMARY] = infos.clone();
        state.lineinfos[PRIMARY] = infos;
        state.pos = new_cursor;
        self.cursor = new_cursor;

        // The alternate buffer keeps its shape without reflowing.
        self.resize_alt_cols(new_cols, blank);
        self.cols = new_cols;
    }

    fn push_reflow_overflow(
        &mut self,
        mut chunk: Vec<Cell>,
        continuation: bool,
        sb: &mut Scrollback,
        width: i32,
    ) {
        chunk.resize(width.max(1) as usize, self.blank_cell());
        let taken = if let Some(cb) = self.callbacks.as_mut() {
            cb.on_sb_pushline(&chunk, continuation)
        } else {
            false
        };
        if !taken {
            sb.push(
                SbLine {
                    cells: chunk,
                    continuation,
                },
                false,
            );
        }
    }

    fn resize_alt_cols(&mut self, new_cols: i32, blank: Cell) {
        let mut grid = vec![blank; (self.rows * new_cols) as usize];
        for row in 0..self.rows {
            for col in 0..self.cols.min(new_cols) {
                grid[(row * new_cols + col) as usize] =
                    self.cells[ALTSCREEN][(row * self.cols + col) as usize];
            }
        }
        self.cells[ALTSCREEN] = grid;
    }

    fn resize_rows(&mut self, new_rows: i32, state: &mut State, sb: &mut Scrollback) {
        let old_rows = self.rows;
        let cols = self.cols;
        let blank = self.blank_cell();
        let cursor = state.pos;

        if new_rows < old_rows && self.active == PRIMARY {
            // Keep bottom content: rows above it leave through the top.
            let mut first_blank = cursor.row + 1;
            for row in (0..old_rows).rev() {
                let start = (row * cols) as usize;
                let end = start + cols as usize;
                if self.cells[PRIMARY][start..end].iter().any(|c| !c.is_empty()) {
                    first_blank = first_blank.max(row + 1);
                    break;
                }
            }
            let pushn = (first_blank - new_rows).max(0);
            for row in 0..pushn {
                self.push_row_to_scrollback(row, sb, true);
            }
            if pushn > 0 {
                self.cells[PRIMARY].drain(..(pushn * cols) as usize);
                self.lineinfos[PRIMARY].drain(..pushn as usize);
                state.lineinfos[PRIMARY].drain(..pushn as usize);
                state.pos.row = (cursor.row - pushn).max(0);
            }
        } else if new_rows > old_rows && self.active == PRIMARY {
            let mut popped = 0;
            while popped < new_rows - old_rows {
                let Some(mut line) = self.pop_row_from_scrollback(sb) else {
                    break;
                };
                line.cells.resize(cols as usize, blank);
                for (i, cell) in line.cells.into_iter().enumerate() {
                    self.cells[PRIMARY].insert(i, cell);
                }
                let info = LineInfo {
                    continuation: line.continuation,
                    ..LineInfo::default()
                };
                self.lineinfos[PRIMARY].insert(0, info);
                state.lineinfos[PRIMARY].insert(0, info);
                popped += 1;
            }
            state.pos.row += popped;
        }

        // Truncate or pad both buffers to the new height.
        for buffer in &mut self.cells {
            buffer.resize((new_rows * cols) as usize, blank);
        }
        for infos in &mut self.lineinfos {
            infos.resize(new_rows as usize, LineInfo::default());
        }

        self.rows = new_rows;
        self.cursor = Position::new(
            state.pos.row.clamp(0, new_rows - 1),
            state.pos.col.clamp(0, cols - 1),
        );
    }
}

fn strip_trailing_blanks(cells: &mut Vec<Cell>) {
    while let Some(last) = cells.last() {
        if last.is_empty() && last.width != 0 {
            cells.pop();
        } else {
            break;
        }
    }
}

/// Break a logical line into row chunks of `cols` cells. A double-width
/// glyph never straddles a chunk boundary; the short chunk pads with a
/// blank instead.
fn rewrap_line(line: &[Cell], cols: i32, blank: &Cell) -> Vec<Vec<Cell>> {
    let cols = cols.max(1) as usize;
    let mut chunks: Vec<Vec<Cell>> = Vec::new();
    let mut current: Vec<Cell> = Vec::with_capacity(cols);
    for cell in line {
        if cell.width == 2 && current.len() + 1 == cols {
            current.push(*blank);
        }
        if current.len() == cols {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(*cell);
    }
    if !current.is_empty() || chunks.is_empty() {
        current.resize(cols, *blank);
        chunks.push(current);
    }
    chunks
}
