//! State of an outstanding local line read

use crate::SessionError;
use tokio::sync::oneshot;

/// Shown in place of each typed character when echo is off
pub(crate) const MASK: char = '•';

pub(crate) type LineReply = oneshot::Sender<Result<String, SessionError>>;

#[derive(Debug)]
pub(crate) struct LocalRead {
    prompt: String,
    echo: bool,
    buffer: String,

    /// Where the prompt starts on screen
    start_row: usize,
    start_column: usize,

    reply: LineReply,
}

impl LocalRead {
    pub(crate) fn new(prompt: &str, echo: bool, start: (usize, usize), reply: LineReply) -> Self {
        Self {
            prompt: prompt.to_string(),
            echo,
            buffer: String::new(),
            start_row: start.0,
            start_column: start.1,
            reply,
        }
    }

    pub(crate) fn start(&self) -> (usize, usize) {
        (self.start_row, self.start_column)
    }

    pub(crate) fn set_start(&mut self, row: usize, column: usize) {
        self.start_row = row;
        self.start_column = column;
    }

    /// Keep the start position inside a resized grid
    pub(crate) fn clamp_start(&mut self, rows: usize, columns: usize) {
        self.start_row = self.start_row.min(rows.saturating_sub(1));
        self.start_column = self.start_column.min(columns.saturating_sub(1));
    }

    pub(crate) fn push(&mut self, c: char) {
        self.buffer.push(c);
    }

    /// Remove the last character; false when there was nothing to remove
    pub(crate) fn pop(&mut self) -> bool {
        self.buffer.pop().is_some()
    }

    /// Prompt followed by the typed text, masked when echo is off
    pub(crate) fn rendered(&self) -> String {
        let mut text = self.prompt.clone();
        if self.echo {
            text.push_str(&self.buffer);
        } else {
            text.extend(std::iter::repeat(MASK).take(self.buffer.chars().count()));
        }
        text
    }

    pub(crate) fn complete(self) {
        // The waiter may have given up; nothing to deliver to then
        let _ = self.reply.send(Ok(self.buffer));
    }

    pub(crate) fn cancel(self) {
        let _ = self.reply.send(Err(SessionError::Cancelled));
    }
}
