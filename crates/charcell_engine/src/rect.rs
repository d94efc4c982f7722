use serde::{Deserialize, Serialize};

use crate::Position;

/// A rectangle of cells, half-open on both axes: `end_row` and `end_col` are
/// exclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub start_row: i32,
    pub end_row: i32,
    pub start_col: i32,
    pub end_col: i32,
}

impl Rect {
    pub fn new(start_row: i32, end_row: i32, start_col: i32, end_col: i32) -> Self {
        Rect {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }

    /// The rectangle covering one single cell.
    pub fn cell(pos: Position) -> Self {
        Rect::new(pos.row, pos.row + 1, pos.col, pos.col + 1)
    }

    /// One row span: `cols` is half-open.
    pub fn row_span(row: i32, start_col: i32, end_col: i32) -> Self {
        Rect::new(row, row + 1, start_col, end_col)
    }

    pub fn height(&self) -> i32 {
        self.end_row - self.start_row
    }

    pub fn width(&self) -> i32 {
        self.end_col - self.start_col
    }

    pub fn is_empty(&self) -> bool {
        self.start_row >= self.end_row || self.start_col >= self.end_col
    }

    pub fn contains(&self, p: Position) -> bool {
        p.row >= self.start_row && p.row < self.end_row && p.col >= self.start_col && p.col < self.end_col
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.start_row >= self.start_row
            && other.start_col >= self.start_col
            && other.end_row <= self.end_row
            && other.end_col <= self.end_col
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.start_row < other.end_row
            && other.start_row < self.end_row
            && self.start_col < other.end_col
            && other.start_col < self.end_col
    }

    /// Grow to the union bounding box of `self` and `other`.
    pub fn expand(&mut self, other: &Rect) {
        if other.start_row < self.start_row {
            self.start_row = other.start_row;
        }
        if other.start_col < self.start_col {
            self.start_col = other.start_col;
        }
        if other.end_row > self.end_row {
            self.end_row = other.end_row;
        }
        if other.end_col > self.end_col {
            self.end_col = other.end_col;
        }
    }

    /// Clip into `bounds`; may leave the rect empty.
    pub fn clip(&mut self, bounds: &Rect) {
        self.start_row = self.start_row.max(bounds.start_row);
        self.start_col = self.start_col.max(bounds.start_col);
        self.end_row = self.end_row.min(bounds.end_row).max(self.start_row);
        self.end_col = self.end_col.min(bounds.end_col).max(self.start_col);
    }

    pub fn translate(&mut self, row_delta: i32, col_delta: i32) {
        self.start_row += row_delta;
        self.end_row += row_delta;
        self.start_col += col_delta;
        self.end_col += col_delta;
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}..{}, {}..{})",
            self.start_row, self.end_row, self.start_col, self.end_col
        )
    }
}
