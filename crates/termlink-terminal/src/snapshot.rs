//! Immutable copy of the screen for renderers

use crate::{cell::Cell, line::Line, TerminalError};
use rkyv::{Archive, Deserialize, Serialize};

/// Point-in-time copy of the grid. Owns its cells; nothing in it aliases the
/// live buffer.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct ScreenSnapshot {
    pub rows: usize,
    pub columns: usize,

    /// One line per row, each exactly `columns` cells wide
    pub lines: Vec<Line>,

    pub cursor_row: usize,
    pub cursor_column: usize,
    pub cursor_hidden: bool,
    pub has_focus: bool,

    /// Lines held in scrollback when the snapshot was taken
    pub scrollback_len: usize,
}

impl ScreenSnapshot {
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.lines.get(row).and_then(|line| line.cell(column))
    }

    /// Text of one row with trailing blanks trimmed
    pub fn row_text(&self, row: usize) -> String {
        self.lines.get(row).map(Line::text).unwrap_or_default()
    }

    /// All rows joined by newlines, trailing blank rows dropped
    pub fn text(&self) -> String {
        let rows: Vec<String> = self.lines.iter().map(Line::text).collect();
        let used = rows.iter().rposition(|row| !row.is_empty()).map_or(0, |i| i + 1);
        rows[..used].join("\n")
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, TerminalError> {
        rkyv::to_bytes::<_, 4096>(self)
            .map(|bytes| bytes.to_vec())
            .map_err(|e| TerminalError::Encoding(format!("{e:?}")))
    }

    /// Deserialize from bytes produced by [`ScreenSnapshot::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TerminalError> {
        let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);

        let archived = rkyv::check_archived_root::<Self>(&aligned)
            .map_err(|e| TerminalError::Encoding(format!("{e:?}")))?;

        archived
            .deserialize(&mut rkyv::Infallible)
            .map_err(|e| TerminalError::Encoding(format!("{e:?}")))
    }
}
