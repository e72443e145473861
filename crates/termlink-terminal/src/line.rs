//! Fixed-width row of cells

use crate::cell::Cell;
use rkyv::{Archive, Deserialize, Serialize};

/// One screen row. Its length always equals the buffer's column count.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct Line {
    cells: Vec<Cell>,
}

impl Line {
    /// Create a blank line of the given width
    pub fn new(columns: usize) -> Self {
        Self {
            cells: vec![Cell::default(); columns],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn cell_mut(&mut self, column: usize) -> Option<&mut Cell> {
        self.cells.get_mut(column)
    }

    /// Truncate or pad at the end to `columns` cells
    pub fn resize(&mut self, columns: usize) {
        self.cells.resize(columns, Cell::default());
    }

    /// Blank every cell, keeping the width
    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    /// Reuse this line's allocation as a blank line of `columns` cells
    pub fn reset(&mut self, columns: usize) {
        self.cells.clear();
        self.cells.resize(columns, Cell::default());
    }

    /// Shift cells from `column` right by `count`, dropping overflow at the end
    pub fn insert_cells(&mut self, column: usize, count: usize) {
        let width = self.cells.len();
        if column >= width || count == 0 {
            return;
        }
        let count = count.min(width - column);
        self.cells[column..].rotate_right(count);
        self.cells[column..column + count].fill(Cell::default());
    }

    /// Shift cells right of `column` left by `count`, padding at the end
    pub fn delete_cells(&mut self, column: usize, count: usize) {
        let width = self.cells.len();
        if column >= width || count == 0 {
            return;
        }
        let count = count.min(width - column);
        self.cells[column..].rotate_left(count);
        self.cells[width - count..].fill(Cell::default());
    }

    /// Glyphs of this line with trailing blanks trimmed
    pub fn text(&self) -> String {
        let text: String = self.cells.iter().map(|cell| cell.glyph).collect();
        text.trim_end().to_string()
    }
}
