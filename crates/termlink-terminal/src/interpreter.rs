//! Escape sequence interpreter
//!
//! A character-at-a-time state machine that turns a terminal output stream
//! into [`ScreenTransaction`] calls. Sequences may be split across any
//! number of [`Interpreter::feed`] calls; partial state is carried in
//! [`State`] until the final byte arrives.
//!
//! Grammar handled here (a VT100 subset, not full ECMA-48):
//!
//! - `ESC [` params intermediates final: control sequences (CSI), with an
//!   optional private marker (`?`, `>`, `=`, `<`) right after the `[`
//! - `ESC ]` text (`BEL` | `ESC \`): operating system commands (OSC)
//! - `ESC (` x, `ESC )` x, `ESC #` x: one trailing byte
//! - `ESC Y` r c: two trailing bytes
//! - `ESC` x: everything else, including `ESC 7` / `ESC 8`
//!
//! Completed sequences are looked up in a dispatch table keyed by the
//! intro, intermediates and final byte (`"[H"`, `"[?h"`, `"(0"`, `"7"`).
//! Unknown keys are ignored. Every sequence runs inside one transaction.

use crate::{
    buffer::ScreenBuffer,
    charset::Charset,
    format::CellFormat,
    params::Params,
    transaction::{ScreenTransaction, ScrollRegion},
    TerminalError,
};
use tracing::trace;

const MAX_PARAM_TEXT: usize = 256;
const MAX_INTERMEDIATES: usize = 4;
const MAX_STRING_TEXT: usize = 4096;
const TAB_WIDTH: usize = 8;

/// Side-channel output produced while interpreting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterEvent {
    /// Reply that must be sent back to the remote end (status reports)
    Transmit(String),

    /// Window title set through OSC 0 or OSC 2
    TitleChanged(String),

    /// BEL received
    Bell,
}

/// Terminal modes toggled by the remote end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    /// DECAWM: wrap to the next row after the last column
    pub autowrap: bool,

    /// IRM: printing shifts the rest of the line right
    pub insert: bool,

    /// DECCKM: cursor keys send `ESC O x` instead of `ESC [ x`
    pub application_cursor_keys: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            autowrap: true,
            insert: false,
            application_cursor_keys: false,
        }
    }
}

/// Parser state carried between characters
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,

    /// `ESC` seen, waiting for the byte that picks the grammar
    CollectingIntro,

    /// Inside `ESC [`
    CollectingParams {
        intro: String,
        params: String,
        intermediates: String,
    },

    /// Fixed-length forms: bytes collected so far and how many are still due
    CollectingTail { chars: String, remaining: usize },

    /// Inside `ESC ]`, waiting for `BEL` or `ESC \`
    StringWait { buffer: String, escape_seen: bool },
}

/// Cursor state stored by `ESC 7` and restored by `ESC 8`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedCursor {
    row: usize,
    column: usize,
    format: CellFormat,
}

#[derive(Debug)]
pub struct Interpreter {
    state: State,
    format: CellFormat,
    modes: Modes,
    saved_cursor: Option<SavedCursor>,
    scroll_region: Option<ScrollRegion>,
    wrap_pending: bool,
    g0: Charset,
    g1: Charset,
    shifted_out: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            format: CellFormat::default(),
            modes: Modes::default(),
            saved_cursor: None,
            scroll_region: None,
            wrap_pending: false,
            g0: Charset::Ascii,
            g1: Charset::Ascii,
            shifted_out: false,
        }
    }

    pub fn modes(&self) -> Modes {
        self.modes
    }

    /// Format that the next printed character will get
    pub fn format(&self) -> CellFormat {
        self.format
    }

    /// Whether the last column was written and the wrap is deferred to the
    /// next printable character
    pub fn is_wrap_pending(&self) -> bool {
        self.wrap_pending
    }

    /// Drop a deferred wrap after the cursor was moved outside the
    /// interpreter
    pub fn clear_wrap_pending(&mut self) {
        self.wrap_pending = false;
    }

    /// Whether no sequence is partially collected
    pub fn is_idle(&self) -> bool {
        self.state == State::Normal
    }

    pub fn scroll_region(&self) -> Option<ScrollRegion> {
        self.scroll_region
    }

    /// Interpret `text`, applying its effects to `screen`
    pub fn feed(
        &mut self,
        screen: &ScreenBuffer,
        text: &str,
    ) -> Result<Vec<InterpreterEvent>, TerminalError> {
        let mut events = Vec::new();
        for c in text.chars() {
            self.advance(screen, c, &mut events)?;
        }
        Ok(events)
    }

    /// Resize the screen and drop state tied to the old geometry
    pub fn resize(
        &mut self,
        screen: &ScreenBuffer,
        rows: usize,
        columns: usize,
    ) -> Result<(), TerminalError> {
        screen.transaction()?.resize(rows, columns)?;
        self.scroll_region = None;
        self.wrap_pending = false;
        Ok(())
    }

    fn advance(
        &mut self,
        screen: &ScreenBuffer,
        c: char,
        events: &mut Vec<InterpreterEvent>,
    ) -> Result<(), TerminalError> {
        match self.state {
            State::Normal => {
                if c == '\x1b' {
                    self.state = State::CollectingIntro;
                } else if is_control(c) {
                    let mut tx = screen.transaction()?;
                    self.execute_control(&mut tx, c, events)?;
                } else {
                    let mut tx = screen.transaction()?;
                    self.print(&mut tx, c)?;
                }
                Ok(())
            }
            State::StringWait { .. } => self.advance_string(c, events),
            _ => self.advance_escape(screen, c, events),
        }
    }

    fn advance_escape(
        &mut self,
        screen: &ScreenBuffer,
        c: char,
        events: &mut Vec<InterpreterEvent>,
    ) -> Result<(), TerminalError> {
        match c {
            // CAN and SUB abort the sequence
            '\x18' | '\x1a' => {
                self.state = State::Normal;
                return Ok(());
            }
            '\x1b' => {
                self.state = State::CollectingIntro;
                return Ok(());
            }
            '\x7f' => return Ok(()),
            c if is_control(c) => {
                // C0 controls take effect without disturbing the sequence
                let mut tx = screen.transaction()?;
                return self.execute_control(&mut tx, c, events);
            }
            _ => {}
        }

        match std::mem::replace(&mut self.state, State::Normal) {
            State::CollectingIntro => match c {
                '[' => {
                    self.state = State::CollectingParams {
                        intro: "[".to_string(),
                        params: String::new(),
                        intermediates: String::new(),
                    };
                }
                ']' => {
                    self.state = State::StringWait {
                        buffer: String::new(),
                        escape_seen: false,
                    };
                }
                '(' | ')' | '#' => {
                    self.state = State::CollectingTail {
                        chars: c.to_string(),
                        remaining: 1,
                    };
                }
                'Y' => {
                    self.state = State::CollectingTail {
                        chars: c.to_string(),
                        remaining: 2,
                    };
                }
                _ => {
                    let key = c.to_string();
                    self.dispatch(screen, &key, &Params::default(), events)?;
                }
            },

            State::CollectingParams {
                mut intro,
                mut params,
                mut intermediates,
            } => match c {
                '0'..='9' | ';' | ':' => {
                    if params.len() < MAX_PARAM_TEXT {
                        params.push(c);
                    }
                    self.state = State::CollectingParams {
                        intro,
                        params,
                        intermediates,
                    };
                }
                '?' | '>' | '=' | '<'
                    if intro.len() == 1 && params.is_empty() && intermediates.is_empty() =>
                {
                    intro.push(c);
                    self.state = State::CollectingParams {
                        intro,
                        params,
                        intermediates,
                    };
                }
                ' '..='/' => {
                    if intermediates.len() < MAX_INTERMEDIATES {
                        intermediates.push(c);
                    }
                    self.state = State::CollectingParams {
                        intro,
                        params,
                        intermediates,
                    };
                }
                _ => {
                    let key = format!("{intro}{intermediates}{c}");
                    self.dispatch(screen, &key, &Params::parse(&params), events)?;
                }
            },

            State::CollectingTail {
                mut chars,
                remaining,
            } => {
                chars.push(c);
                if remaining > 1 {
                    self.state = State::CollectingTail {
                        chars,
                        remaining: remaining - 1,
                    };
                } else {
                    self.dispatch(screen, &chars, &Params::default(), events)?;
                }
            }

            State::Normal | State::StringWait { .. } => {}
        }
        Ok(())
    }

    fn advance_string(
        &mut self,
        c: char,
        events: &mut Vec<InterpreterEvent>,
    ) -> Result<(), TerminalError> {
        let State::StringWait {
            mut buffer,
            escape_seen,
        } = std::mem::replace(&mut self.state, State::Normal)
        else {
            return Ok(());
        };

        if escape_seen {
            if c == '\\' {
                self.dispatch_string(&buffer, events);
                return Ok(());
            }
            // ESC without a following backslash is payload, not a new sequence
            push_bounded(&mut buffer, '\x1b');
        }

        match c {
            '\x07' => self.dispatch_string(&buffer, events),
            '\x1b' => {
                self.state = State::StringWait {
                    buffer,
                    escape_seen: true,
                };
            }
            '\x18' | '\x1a' => {}
            _ => {
                push_bounded(&mut buffer, c);
                self.state = State::StringWait {
                    buffer,
                    escape_seen: false,
                };
            }
        }
        Ok(())
    }

    fn execute_control(
        &mut self,
        tx: &mut ScreenTransaction<'_>,
        c: char,
        events: &mut Vec<InterpreterEvent>,
    ) -> Result<(), TerminalError> {
        let (row, column) = tx.cursor();
        match c {
            '\r' => self.move_cursor(tx, row, 0)?,
            '\n' | '\x0b' | '\x0c' => {
                self.wrap_pending = false;
                tx.cursor_row_increase_with_scroll(self.scroll_region)?;
            }
            '\t' => {
                let next_stop = (column / TAB_WIDTH + 1) * TAB_WIDTH;
                self.move_cursor(tx, row, next_stop)?;
            }
            '\x08' => self.move_cursor(tx, row, column.saturating_sub(1))?,
            '\x0e' => self.shifted_out = true,
            '\x0f' => self.shifted_out = false,
            '\x07' => events.push(InterpreterEvent::Bell),
            _ => trace!("ignoring control character {:#04x}", c as u32),
        }
        Ok(())
    }

    fn print(&mut self, tx: &mut ScreenTransaction<'_>, c: char) -> Result<(), TerminalError> {
        let charset = if self.shifted_out { self.g1 } else { self.g0 };
        let glyph = charset.map(c);

        if self.wrap_pending {
            self.wrap_pending = false;
            let (row, _) = tx.cursor();
            tx.set_cursor(row, 0)?;
            tx.cursor_row_increase_with_scroll(self.scroll_region)?;
        }

        if self.modes.insert {
            tx.insert_cells(1);
        }
        tx.set_cursor_character(glyph);
        tx.apply_format(&self.format);

        let (row, column) = tx.cursor();
        if column + 1 < tx.columns() {
            tx.set_cursor(row, column + 1)?;
        } else if self.modes.autowrap {
            self.wrap_pending = true;
        }
        Ok(())
    }

    /// Clamp a candidate position into the grid and move there
    fn move_cursor(
        &mut self,
        tx: &mut ScreenTransaction<'_>,
        row: usize,
        column: usize,
    ) -> Result<(), TerminalError> {
        self.wrap_pending = false;
        let row = row.min(tx.rows() - 1);
        let column = column.min(tx.columns() - 1);
        tx.set_cursor(row, column)
    }

    fn dispatch(
        &mut self,
        screen: &ScreenBuffer,
        key: &str,
        params: &Params,
        events: &mut Vec<InterpreterEvent>,
    ) -> Result<(), TerminalError> {
        let mut tx = screen.transaction()?;
        let tx = &mut tx;
        let (row, column) = tx.cursor();
        let (rows, columns) = (tx.rows(), tx.columns());
        let region = self.scroll_region;

        match key {
            // Cursor motion
            "[A" => self.move_cursor(tx, row.saturating_sub(params.count(0)), column)?,
            "[B" | "[e" => self.move_cursor(tx, row.saturating_add(params.count(0)), column)?,
            "[C" | "[a" => self.move_cursor(tx, row, column.saturating_add(params.count(0)))?,
            "[D" => self.move_cursor(tx, row, column.saturating_sub(params.count(0)))?,
            "[E" => self.move_cursor(tx, row.saturating_add(params.count(0)), 0)?,
            "[F" => self.move_cursor(tx, row.saturating_sub(params.count(0)), 0)?,
            "[G" | "[`" => self.move_cursor(tx, row, params.count(0) - 1)?,
            "[d" => self.move_cursor(tx, params.count(0) - 1, column)?,
            "[H" | "[f" => self.move_cursor(tx, params.count(0) - 1, params.count(1) - 1)?,

            // Scrolling
            "[r" => {
                let top = params.count(0);
                let bottom = params.get(1).filter(|&n| n > 0).map_or(rows, |n| n as usize).min(rows);
                if top < bottom {
                    self.scroll_region = if top == 1 && bottom == rows {
                        None
                    } else {
                        Some(ScrollRegion::new(top - 1, bottom - 1))
                    };
                    self.move_cursor(tx, 0, 0)?;
                } else {
                    trace!("ignoring invalid scroll region {}..{}", top, bottom);
                }
            }
            "[S" => tx.scroll_up(params.count(0), region)?,
            "[T" => tx.scroll_down(params.count(0), region)?,
            "D" => {
                self.wrap_pending = false;
                tx.cursor_row_increase_with_scroll(region)?;
            }
            "E" => {
                self.wrap_pending = false;
                tx.cursor_row_increase_with_scroll(region)?;
                let (row, _) = tx.cursor();
                tx.set_cursor(row, 0)?;
            }
            "M" => {
                self.wrap_pending = false;
                tx.cursor_row_decrease_with_scroll(region)?;
            }

            // Line and character editing
            "[L" => {
                tx.insert_lines(params.count(0), region)?;
                self.move_cursor(tx, row, 0)?;
            }
            "[M" => {
                tx.delete_lines(params.count(0), region)?;
                self.move_cursor(tx, row, 0)?;
            }
            "[@" => tx.insert_cells(params.count(0)),
            "[P" => tx.delete_cells(params.count(0)),
            "[X" => {
                let end = column.saturating_add(params.count(0) - 1).min(columns - 1);
                tx.erase(row, column, row, end, Some(&self.format))?;
            }
            "[J" => match params.get_or(0, 0) {
                0 => tx.erase(row, column, rows - 1, columns - 1, Some(&self.format))?,
                1 => tx.erase(0, 0, row, column, Some(&self.format))?,
                2 => tx.erase(0, 0, rows - 1, columns - 1, Some(&self.format))?,
                3 => tx.clear_scrollback(),
                mode => trace!("ignoring erase display mode {}", mode),
            },
            "[K" => match params.get_or(0, 0) {
                0 => tx.erase(row, column, row, columns - 1, Some(&self.format))?,
                1 => tx.erase(row, 0, row, column, Some(&self.format))?,
                2 => tx.erase(row, 0, row, columns - 1, Some(&self.format))?,
                mode => trace!("ignoring erase line mode {}", mode),
            },

            // Modes
            "[h" => self.set_ansi_modes(params, true),
            "[l" => self.set_ansi_modes(params, false),
            "[?h" => self.set_private_modes(tx, params, true),
            "[?l" => self.set_private_modes(tx, params, false),

            "[m" => self.format.apply_sgr(params),

            // Reports
            "[n" => match params.get_or(0, 0) {
                5 => events.push(InterpreterEvent::Transmit("\x1b[0n".to_string())),
                6 => events.push(InterpreterEvent::Transmit(format!(
                    "\x1b[{};{}R",
                    row + 1,
                    column + 1
                ))),
                other => trace!("ignoring status request {}", other),
            },
            "[c" => {
                if params.get_or(0, 0) == 0 {
                    events.push(InterpreterEvent::Transmit("\x1b[?1;2c".to_string()));
                }
            }

            // Save and restore
            "7" | "[s" => self.save_cursor(row, column),
            "8" | "[u" => self.restore_cursor(tx)?,

            "c" => self.full_reset(tx)?,
            "#8" => {
                tx.fill('E');
                self.move_cursor(tx, 0, 0)?;
            }
            "=" | ">" => trace!("ignoring keypad mode change"),

            key if key.starts_with('(') || key.starts_with(')') => {
                let designator = key.chars().nth(1).unwrap_or('B');
                match Charset::from_designator(designator) {
                    Some(charset) if key.starts_with('(') => self.g0 = charset,
                    Some(charset) => self.g1 = charset,
                    None => trace!("ignoring unknown charset {:?}", designator),
                }
            }

            key if key.starts_with('Y') => {
                let mut coordinates = key.chars().skip(1).map(|c| (c as usize).saturating_sub(32));
                let target_row = coordinates.next().unwrap_or(0);
                let target_column = coordinates.next().unwrap_or(0);
                self.move_cursor(tx, target_row, target_column)?;
            }

            other => trace!("ignoring unknown sequence ESC {:?}", other),
        }
        Ok(())
    }

    fn dispatch_string(&mut self, payload: &str, events: &mut Vec<InterpreterEvent>) {
        let (command, text) = payload.split_once(';').unwrap_or((payload, ""));
        match command {
            "0" | "2" => events.push(InterpreterEvent::TitleChanged(text.to_string())),
            other => trace!("ignoring operating system command {:?}", other),
        }
    }

    fn set_ansi_modes(&mut self, params: &Params, enabled: bool) {
        for mode in params.iter().flatten() {
            match mode {
                4 => self.modes.insert = enabled,
                other => trace!("ignoring ANSI mode {}", other),
            }
        }
    }

    fn set_private_modes(&mut self, tx: &mut ScreenTransaction<'_>, params: &Params, enabled: bool) {
        for mode in params.iter().flatten() {
            match mode {
                1 => self.modes.application_cursor_keys = enabled,
                7 => {
                    self.modes.autowrap = enabled;
                    if !enabled {
                        self.wrap_pending = false;
                    }
                }
                25 => tx.set_cursor_hidden(!enabled),
                // Blinking cursor, alternate screen, mouse tracking, focus
                // events and bracketed paste are accepted but have no effect
                12 | 47 | 1047 | 1048 | 1049 | 1000..=1006 | 1015 | 2004 => {
                    trace!("ignoring DEC private mode {}", mode)
                }
                other => trace!("ignoring unknown DEC private mode {}", other),
            }
        }
    }

    fn save_cursor(&mut self, row: usize, column: usize) {
        self.saved_cursor = Some(SavedCursor {
            row,
            column,
            format: self.format,
        });
    }

    fn restore_cursor(&mut self, tx: &mut ScreenTransaction<'_>) -> Result<(), TerminalError> {
        match self.saved_cursor {
            Some(saved) => {
                self.format = saved.format;
                self.move_cursor(tx, saved.row, saved.column)
            }
            None => {
                self.format.reset();
                self.move_cursor(tx, 0, 0)
            }
        }
    }

    fn full_reset(&mut self, tx: &mut ScreenTransaction<'_>) -> Result<(), TerminalError> {
        let (rows, columns) = (tx.rows(), tx.columns());
        self.format.reset();
        self.modes = Modes::default();
        self.saved_cursor = None;
        self.scroll_region = None;
        self.g0 = Charset::Ascii;
        self.g1 = Charset::Ascii;
        self.shifted_out = false;
        tx.erase(0, 0, rows - 1, columns - 1, Some(&CellFormat::default()))?;
        tx.set_cursor_hidden(false);
        self.move_cursor(tx, 0, 0)
    }
}

fn is_control(c: char) -> bool {
    c < ' ' || c == '\x7f' || ('\u{80}'..='\u{9f}').contains(&c)
}

fn push_bounded(buffer: &mut String, c: char) {
    if buffer.len() < MAX_STRING_TEXT {
        buffer.push(c);
    }
}
