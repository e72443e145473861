//! Scoped, exclusive modifier for a [`ScreenBuffer`](crate::ScreenBuffer)
//!
//! Every edit to the grid happens through a `ScreenTransaction`. The
//! transaction owns the buffer's lock guard, so all edits made through it
//! become visible to snapshots at once when it is dropped.
//!
//! Operations take coordinates as given and fail with
//! [`TerminalError::OutOfRange`] instead of clamping: callers (the
//! interpreter) clamp untrusted values before they get here.

use crate::{buffer::Grid, cell::Cell, format::CellFormat, line::Line, TerminalError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::MutexGuard;

/// Inclusive row range affected by scrolling and line insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollRegion {
    pub fn new(top: usize, bottom: usize) -> Self {
        Self { top, bottom }
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.top && row <= self.bottom
    }
}

pub struct ScreenTransaction<'a> {
    grid: MutexGuard<'a, Grid>,
    dirty: &'a AtomicBool,
    mutated: bool,
}

impl<'a> ScreenTransaction<'a> {
    pub(crate) fn new(grid: MutexGuard<'a, Grid>, dirty: &'a AtomicBool) -> Self {
        Self {
            grid,
            dirty,
            mutated: false,
        }
    }

    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    pub fn columns(&self) -> usize {
        self.grid.columns
    }

    /// Cursor as `(row, column)`
    pub fn cursor(&self) -> (usize, usize) {
        (self.grid.cursor_row, self.grid.cursor_column)
    }

    pub fn has_focus(&self) -> bool {
        self.grid.has_focus
    }

    pub fn cursor_hidden(&self) -> bool {
        self.grid.cursor_hidden
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.grid.lines.get(row).and_then(|line| line.cell(column))
    }

    pub fn line(&self, row: usize) -> Option<&Line> {
        self.grid.lines.get(row)
    }

    /// Glyph under the cursor
    pub fn cursor_character(&self) -> char {
        let (row, column) = self.cursor();
        self.cell(row, column).map_or(' ', |cell| cell.glyph)
    }

    /// Whether this transaction has changed anything yet
    pub fn is_mutated(&self) -> bool {
        self.mutated
    }

    /// Move the cursor. Does not clamp.
    pub fn set_cursor(&mut self, row: usize, column: usize) -> Result<(), TerminalError> {
        self.check_position(row, column)?;
        let grid = &mut *self.grid;
        if grid.cursor_row != row || grid.cursor_column != column {
            grid.cursor_row = row;
            grid.cursor_column = column;
            self.mutated = true;
        }
        Ok(())
    }

    /// Replace the glyph under the cursor without moving it
    pub fn set_cursor_character(&mut self, glyph: char) {
        if let Some(cell) = self.cursor_cell_mut() {
            cell.glyph = glyph;
        }
        self.mutated = true;
    }

    /// Stamp `format` onto the cell under the cursor
    pub fn apply_format(&mut self, format: &CellFormat) {
        if let Some(cell) = self.cursor_cell_mut() {
            format.apply_to(cell);
        }
        self.mutated = true;
    }

    /// Blank the inclusive span from `(start_row, start_column)` to
    /// `(end_row, end_column)` in reading order. The first and last rows may
    /// be partial; rows in between are cleared full width. With a format, its
    /// colors are applied to the blanks; with `None` only glyphs change.
    pub fn erase(
        &mut self,
        start_row: usize,
        start_column: usize,
        end_row: usize,
        end_column: usize,
        format: Option<&CellFormat>,
    ) -> Result<(), TerminalError> {
        self.check_position(start_row, start_column)?;
        self.check_position(end_row, end_column)?;
        if (start_row, start_column) > (end_row, end_column) {
            return Ok(());
        }

        let columns = self.grid.columns;
        for row in start_row..=end_row {
            let first = if row == start_row { start_column } else { 0 };
            let last = if row == end_row { end_column } else { columns - 1 };
            let line = &mut self.grid.lines[row];
            for column in first..=last {
                if let Some(cell) = line.cell_mut(column) {
                    cell.glyph = ' ';
                    if let Some(format) = format {
                        format.apply_colors_to(cell);
                    }
                }
            }
        }
        self.mutated = true;
        Ok(())
    }

    /// Line feed: move down one row, scrolling the region when the cursor
    /// sits on its bottom edge
    pub fn cursor_row_increase_with_scroll(
        &mut self,
        region: Option<ScrollRegion>,
    ) -> Result<(), TerminalError> {
        let region = self.resolve_region(region)?;
        let row = self.grid.cursor_row;
        if row == region.bottom {
            self.scroll_up(1, Some(region))?;
        } else if row + 1 < self.grid.rows {
            self.grid.cursor_row = row + 1;
            self.mutated = true;
        }
        Ok(())
    }

    /// Reverse line feed: move up one row, scrolling the region down when
    /// the cursor sits on its top edge
    pub fn cursor_row_decrease_with_scroll(
        &mut self,
        region: Option<ScrollRegion>,
    ) -> Result<(), TerminalError> {
        let region = self.resolve_region(region)?;
        let row = self.grid.cursor_row;
        if row == region.top {
            self.scroll_down(1, Some(region))?;
        } else if row > 0 {
            self.grid.cursor_row = row - 1;
            self.mutated = true;
        }
        Ok(())
    }

    /// Remove `count` lines at the region top, adding blanks at its bottom.
    ///
    /// Lines leaving a region that starts at row 0 go to scrollback.
    pub fn scroll_up(&mut self, count: usize, region: Option<ScrollRegion>) -> Result<(), TerminalError> {
        let region = self.resolve_region(region)?;
        for _ in 0..count.min(region.height()) {
            let evicted = self.grid.lines.remove(region.top);
            let fresh = self.fresh_line();
            self.grid.lines.insert(region.bottom, fresh);
            if region.top == 0 {
                self.grid.scrollback.push(evicted);
            } else {
                self.grid.scrollback.release(evicted);
            }
        }
        self.mutated = true;
        Ok(())
    }

    /// Remove `count` lines at the region bottom, adding blanks at its top
    pub fn scroll_down(&mut self, count: usize, region: Option<ScrollRegion>) -> Result<(), TerminalError> {
        let region = self.resolve_region(region)?;
        for _ in 0..count.min(region.height()) {
            let evicted = self.grid.lines.remove(region.bottom);
            self.grid.scrollback.release(evicted);
            let fresh = self.fresh_line();
            self.grid.lines.insert(region.top, fresh);
        }
        self.mutated = true;
        Ok(())
    }

    /// Insert blank lines at the cursor row, pushing lines below it out of
    /// the region's bottom. No-op when the cursor is outside the region.
    pub fn insert_lines(&mut self, count: usize, region: Option<ScrollRegion>) -> Result<(), TerminalError> {
        let region = self.resolve_region(region)?;
        let row = self.grid.cursor_row;
        if !region.contains(row) {
            return Ok(());
        }
        for _ in 0..count.min(region.bottom - row + 1) {
            let evicted = self.grid.lines.remove(region.bottom);
            self.grid.scrollback.release(evicted);
            let fresh = self.fresh_line();
            self.grid.lines.insert(row, fresh);
        }
        self.mutated = true;
        Ok(())
    }

    /// Delete lines at the cursor row, pulling lines below it up and adding
    /// blanks at the region's bottom. No-op when the cursor is outside the
    /// region.
    pub fn delete_lines(&mut self, count: usize, region: Option<ScrollRegion>) -> Result<(), TerminalError> {
        let region = self.resolve_region(region)?;
        let row = self.grid.cursor_row;
        if !region.contains(row) {
            return Ok(());
        }
        for _ in 0..count.min(region.bottom - row + 1) {
            let evicted = self.grid.lines.remove(row);
            self.grid.scrollback.release(evicted);
            let fresh = self.fresh_line();
            self.grid.lines.insert(region.bottom, fresh);
        }
        self.mutated = true;
        Ok(())
    }

    /// Shift the cursor line right of the cursor by `count` blank cells
    pub fn insert_cells(&mut self, count: usize) {
        let (row, column) = self.cursor();
        self.grid.lines[row].insert_cells(column, count);
        self.mutated = true;
    }

    /// Remove `count` cells at the cursor, shifting the rest of the line left
    pub fn delete_cells(&mut self, count: usize) {
        let (row, column) = self.cursor();
        self.grid.lines[row].delete_cells(column, count);
        self.mutated = true;
    }

    /// Fill every cell with `glyph` in the default format
    pub fn fill(&mut self, glyph: char) {
        let filled = Cell {
            glyph,
            ..Cell::default()
        };
        for line in &mut self.grid.lines {
            for column in 0..line.len() {
                if let Some(cell) = line.cell_mut(column) {
                    *cell = filled;
                }
            }
        }
        self.mutated = true;
    }

    /// Resize in place.
    ///
    /// Rows are removed from the top (into scrollback) or appended at the
    /// bottom; each line is truncated or padded at its end. The cursor is
    /// clamped into the new bounds and otherwise left alone.
    pub fn resize(&mut self, rows: usize, columns: usize) -> Result<(), TerminalError> {
        if rows == 0 || columns == 0 {
            return Err(TerminalError::SizeError(format!(
                "Invalid terminal size {rows}x{columns}"
            )));
        }

        let grid = &mut *self.grid;
        for line in &mut grid.lines {
            line.resize(columns);
        }

        if rows < grid.rows {
            let surplus = grid.rows - rows;
            let removed: Vec<Line> = grid.lines.drain(..surplus).collect();
            for line in removed {
                grid.scrollback.push(line);
            }
        } else {
            for _ in grid.rows..rows {
                let fresh = grid.scrollback.take_blank_line(columns);
                grid.lines.push(fresh);
            }
        }

        grid.rows = rows;
        grid.columns = columns;
        grid.cursor_row = grid.cursor_row.min(rows - 1);
        grid.cursor_column = grid.cursor_column.min(columns - 1);
        self.mutated = true;
        Ok(())
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        if self.grid.has_focus != has_focus {
            self.grid.has_focus = has_focus;
            self.mutated = true;
        }
    }

    pub fn set_cursor_hidden(&mut self, hidden: bool) {
        if self.grid.cursor_hidden != hidden {
            self.grid.cursor_hidden = hidden;
            self.mutated = true;
        }
    }

    /// Drop all captured history
    pub fn clear_scrollback(&mut self) {
        self.grid.scrollback.clear();
        self.mutated = true;
    }

    fn cursor_cell_mut(&mut self) -> Option<&mut Cell> {
        let (row, column) = self.cursor();
        self.grid
            .lines
            .get_mut(row)
            .and_then(|line| line.cell_mut(column))
    }

    fn fresh_line(&mut self) -> Line {
        let columns = self.grid.columns;
        self.grid.scrollback.take_blank_line(columns)
    }

    fn check_position(&self, row: usize, column: usize) -> Result<(), TerminalError> {
        if row >= self.grid.rows || column >= self.grid.columns {
            return Err(TerminalError::OutOfRange {
                row,
                column,
                rows: self.grid.rows,
                columns: self.grid.columns,
            });
        }
        Ok(())
    }

    fn resolve_region(&self, region: Option<ScrollRegion>) -> Result<ScrollRegion, TerminalError> {
        let rows = self.grid.rows;
        match region {
            None => Ok(ScrollRegion::new(0, rows - 1)),
            Some(region) if region.top <= region.bottom && region.bottom < rows => Ok(region),
            Some(region) => Err(TerminalError::OutOfRange {
                row: region.bottom.max(region.top),
                column: 0,
                rows,
                columns: self.grid.columns,
            }),
        }
    }
}

impl Drop for ScreenTransaction<'_> {
    fn drop(&mut self) {
        // Still holding the lock here; the guard is released after this body
        if self.mutated {
            self.dirty.store(true, Ordering::Release);
        }
    }
}
