//! Screen buffer holding the live character grid
//!
//! The grid sits behind a mutex. Writers go through
//! [`ScreenBuffer::transaction`], readers through [`ScreenBuffer::snapshot`];
//! both hold the lock only for the duration of one batch of edits or one
//! copy, so a render loop never sees half of an escape sequence applied.

use crate::{
    line::Line, scrollback::ScrollbackBuffer, snapshot::ScreenSnapshot,
    transaction::ScreenTransaction, TerminalError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Grid state guarded by the buffer lock
#[derive(Debug)]
pub(crate) struct Grid {
    pub(crate) lines: Vec<Line>,
    pub(crate) rows: usize,
    pub(crate) columns: usize,
    pub(crate) cursor_row: usize,
    pub(crate) cursor_column: usize,
    pub(crate) has_focus: bool,
    pub(crate) cursor_hidden: bool,
    pub(crate) scrollback: ScrollbackBuffer,
    disposed: bool,
}

impl Grid {
    fn new(rows: usize, columns: usize, scrollback: ScrollbackBuffer) -> Self {
        Self {
            lines: (0..rows).map(|_| Line::new(columns)).collect(),
            rows,
            columns,
            cursor_row: 0,
            cursor_column: 0,
            has_focus: false,
            cursor_hidden: false,
            scrollback,
            disposed: false,
        }
    }
}

/// Live terminal grid shared between the input feeder and the renderer
#[derive(Debug)]
pub struct ScreenBuffer {
    grid: Mutex<Grid>,
    dirty: AtomicBool,
}

impl ScreenBuffer {
    /// Create a blank buffer with the default scrollback capacity
    pub fn new(rows: usize, columns: usize) -> Result<Self, TerminalError> {
        Self::with_scrollback(rows, columns, ScrollbackBuffer::default())
    }

    /// Create a blank buffer capturing evicted lines into `scrollback`
    pub fn with_scrollback(
        rows: usize,
        columns: usize,
        scrollback: ScrollbackBuffer,
    ) -> Result<Self, TerminalError> {
        if rows == 0 || columns == 0 {
            return Err(TerminalError::SizeError(format!(
                "Invalid terminal size {rows}x{columns}"
            )));
        }

        debug!("Creating {}x{} screen buffer", rows, columns);
        Ok(Self {
            grid: Mutex::new(Grid::new(rows, columns, scrollback)),
            dirty: AtomicBool::new(true),
        })
    }

    /// Acquire exclusive access for mutation.
    ///
    /// The returned guard releases the lock when dropped and marks the
    /// buffer dirty if any mutating call was made through it.
    pub fn transaction(&self) -> Result<ScreenTransaction<'_>, TerminalError> {
        let grid = self.lock()?;
        Ok(ScreenTransaction::new(grid, &self.dirty))
    }

    /// Deep copy of the grid for rendering. Clears the dirty flag.
    pub fn snapshot(&self) -> Result<ScreenSnapshot, TerminalError> {
        let grid = self.lock()?;
        let snapshot = ScreenSnapshot {
            rows: grid.rows,
            columns: grid.columns,
            lines: grid.lines.clone(),
            cursor_row: grid.cursor_row,
            cursor_column: grid.cursor_column,
            cursor_hidden: grid.cursor_hidden,
            has_focus: grid.has_focus,
            scrollback_len: grid.scrollback.len(),
        };
        self.dirty.store(false, Ordering::Release);
        Ok(snapshot)
    }

    /// Whether anything changed since the last snapshot
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Current `(rows, columns)`
    pub fn dimensions(&self) -> Result<(usize, usize), TerminalError> {
        let grid = self.lock()?;
        Ok((grid.rows, grid.columns))
    }

    pub fn scrollback_len(&self) -> Result<usize, TerminalError> {
        Ok(self.lock()?.scrollback.len())
    }

    /// Copy up to `count` scrollback lines ending `offset` lines before the
    /// newest one, oldest first
    pub fn scrollback_lines(&self, offset: usize, count: usize) -> Result<Vec<Line>, TerminalError> {
        let grid = self.lock()?;
        let mut lines: Vec<Line> = (offset..offset.saturating_add(count))
            .map_while(|index| grid.scrollback.get_from_end(index).cloned())
            .collect();
        lines.reverse();
        Ok(lines)
    }

    /// Tear the buffer down. Later transactions and snapshots fail.
    pub fn dispose(&self) {
        let mut grid = self.grid.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !grid.disposed {
            debug!("Disposing screen buffer");
            grid.disposed = true;
            grid.scrollback.clear();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Grid>, TerminalError> {
        let grid = self
            .grid
            .lock()
            .map_err(|_| TerminalError::InvalidState("screen lock poisoned".to_string()))?;
        if grid.disposed {
            return Err(TerminalError::InvalidState(
                "screen buffer used after disposal".to_string(),
            ));
        }
        Ok(grid)
    }
}
