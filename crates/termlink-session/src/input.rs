//! Key presses and their translation into terminal input

use crate::config::SessionConfig;
use termlink_terminal::Modes;

/// Key identity, independent of any UI toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c))
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            ctrl: true,
            ..Self::char(c)
        }
    }

    pub fn alt(key: Key) -> Self {
        Self {
            alt: true,
            ..Self::new(key)
        }
    }
}

impl From<Key> for KeyPress {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

/// Translates key presses into the text sent to the remote end
pub trait InputMapping: Send + Sync {
    /// `None` when the key has no encoding
    fn map(&self, key: &KeyPress, modes: Modes, config: &SessionConfig) -> Option<String>;
}

/// VT100/xterm key encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct Vt100Mapping;

impl InputMapping for Vt100Mapping {
    fn map(&self, key: &KeyPress, modes: Modes, config: &SessionConfig) -> Option<String> {
        // SS3 prefix for cursor keys in application mode
        let cursor = |final_byte: char| {
            if modes.application_cursor_keys {
                format!("\x1bO{final_byte}")
            } else {
                format!("\x1b[{final_byte}")
            }
        };

        let text = match key.key {
            Key::Char(c) if key.ctrl => control_character(c)?.to_string(),
            Key::Char(c) => c.to_string(),
            Key::Enter => config.written_newline.clone(),
            Key::Backspace => config.backspace.clone(),
            Key::Tab => "\t".to_string(),
            Key::Escape => "\x1b".to_string(),
            Key::Up => cursor('A'),
            Key::Down => cursor('B'),
            Key::Right => cursor('C'),
            Key::Left => cursor('D'),
            Key::Home => cursor('H'),
            Key::End => cursor('F'),
            Key::PageUp => "\x1b[5~".to_string(),
            Key::PageDown => "\x1b[6~".to_string(),
            Key::Insert => "\x1b[2~".to_string(),
            Key::Delete => "\x1b[3~".to_string(),
            Key::F(n) => function_key(n)?.to_string(),
        };

        if key.alt {
            Some(format!("\x1b{text}"))
        } else {
            Some(text)
        }
    }
}

/// Fold Ctrl+key into the C0 range
fn control_character(c: char) -> Option<char> {
    let code = match c {
        'a'..='z' => c as u8 - b'a' + 1,
        'A'..='Z' => c.to_ascii_lowercase() as u8 - b'a' + 1,
        ' ' | '@' | '2' => 0x00,
        '[' => 0x1b,
        '\\' => 0x1c,
        ']' => 0x1d,
        '^' => 0x1e,
        '_' => 0x1f,
        '?' => 0x7f,
        _ => return None,
    };
    Some(code as char)
}

fn function_key(n: u8) -> Option<&'static str> {
    let text = match n {
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        11 => "\x1b[23~",
        12 => "\x1b[24~",
        _ => return None,
    };
    Some(text)
}
