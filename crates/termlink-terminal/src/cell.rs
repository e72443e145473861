//! A single position on the screen grid

use crate::color::ColorRef;
use rkyv::{Archive, Deserialize, Serialize};

/// A single cell in the terminal
#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct Cell {
    /// The character in this cell
    pub glyph: char,

    /// Text attributes
    pub attributes: Attributes,

    /// Foreground color
    pub foreground: ColorRef,

    /// Background color
    pub background: ColorRef,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: ' ',
            attributes: Attributes::default(),
            foreground: ColorRef::DefaultForeground,
            background: ColorRef::DefaultBackground,
        }
    }
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// Text attributes stored on a cell.
///
/// Reverse video is not stored here: it is resolved into swapped colors at
/// the moment a cell is written.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[archive(check_bytes)]
pub struct Attributes {
    pub bold: bool,
    pub underline: bool,
}
