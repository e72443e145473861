//! Terminal emulation for termlink
//!
//! Provides a VT100-style screen model driven by a hand-written escape
//! sequence interpreter. The screen is only ever mutated through a
//! [`ScreenTransaction`], so a renderer calling [`ScreenBuffer::snapshot`]
//! from another thread never observes a half-applied sequence.

pub mod buffer;
pub mod cell;
pub mod charset;
pub mod color;
pub mod format;
pub mod interpreter;
pub mod line;
pub mod params;
pub mod scrollback;
pub mod snapshot;
pub mod transaction;

pub use buffer::ScreenBuffer;
pub use cell::{Attributes, Cell};
pub use color::{ColorRef, Rgb};
pub use format::CellFormat;
pub use interpreter::{Interpreter, InterpreterEvent, Modes};
pub use line::Line;
pub use scrollback::ScrollbackBuffer;
pub use snapshot::ScreenSnapshot;
pub use transaction::{ScreenTransaction, ScrollRegion};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminalError {
    #[error("Position ({row}, {column}) is outside the {rows}x{columns} grid")]
    OutOfRange {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    #[error("Invalid screen state: {0}")]
    InvalidState(String),

    #[error("Terminal size error: {0}")]
    SizeError(String),

    #[error("Snapshot encoding error: {0}")]
    Encoding(String),
}
