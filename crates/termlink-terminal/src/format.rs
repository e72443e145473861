//! Running SGR (Select Graphic Rendition) state

use crate::cell::{Attributes, Cell};
use crate::color::{ColorRef, Rgb};
use crate::params::Params;
use tracing::trace;

/// Format applied to newly written cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFormat {
    pub foreground: ColorRef,
    pub background: ColorRef,
    pub bold: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            foreground: ColorRef::DefaultForeground,
            background: ColorRef::DefaultBackground,
            bold: false,
            underline: false,
            reverse: false,
        }
    }
}

impl CellFormat {
    /// Reset every attribute and both colors
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Foreground and background after reverse video is applied
    pub fn effective_colors(&self) -> (ColorRef, ColorRef) {
        if self.reverse {
            (self.background, self.foreground)
        } else {
            (self.foreground, self.background)
        }
    }

    /// Stamp colors and attributes onto a cell
    pub fn apply_to(&self, cell: &mut Cell) {
        let (foreground, background) = self.effective_colors();
        cell.foreground = foreground;
        cell.background = background;
        cell.attributes = Attributes {
            bold: self.bold,
            underline: self.underline,
        };
    }

    /// Stamp colors only; attributes are cleared. Used for erased cells.
    pub fn apply_colors_to(&self, cell: &mut Cell) {
        let (foreground, background) = self.effective_colors();
        cell.foreground = foreground;
        cell.background = background;
        cell.attributes = Attributes::default();
    }

    /// Fold an SGR parameter list into this format
    pub fn apply_sgr(&mut self, params: &Params) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let mut index = 0;
        while index < params.len() {
            let code = params.get(index).unwrap_or(0);
            match code {
                0 => self.reset(),
                1 => self.bold = true,
                4 => self.underline = true,
                7 => self.reverse = true,
                22 => self.bold = false,
                24 => self.underline = false,
                27 => self.reverse = false,

                30..=37 => self.foreground = ColorRef::ansi((code - 30) as u8),
                39 => self.foreground = ColorRef::DefaultForeground,
                40..=47 => self.background = ColorRef::ansi((code - 40) as u8),
                49 => self.background = ColorRef::DefaultBackground,
                90..=97 => self.foreground = ColorRef::ansi((code - 90 + 8) as u8),
                100..=107 => self.background = ColorRef::ansi((code - 100 + 8) as u8),

                38 | 48 => {
                    let (color, consumed) = extended_color(params, index + 1);
                    if let Some(color) = color {
                        if code == 38 {
                            self.foreground = color;
                        } else {
                            self.background = color;
                        }
                    }
                    index += consumed;
                }

                other => trace!("ignoring SGR parameter {}", other),
            }
            index += 1;
        }
    }
}

/// Decode `5;n` or `2;r;g;b` starting at `start`.
///
/// Returns the color (if well formed) and the number of parameters consumed.
fn extended_color(params: &Params, start: usize) -> (Option<ColorRef>, usize) {
    match params.get(start) {
        Some(5) => {
            let color = params
                .get(start + 1)
                .filter(|&n| n <= 255)
                .map(|n| ColorRef::Indexed(n as u8));
            (color, 2.min(params.len() - start))
        }
        Some(2) => {
            let channel = |offset: usize| params.get(start + offset).map(|v| v.min(255) as u8);
            let color = match (channel(1), channel(2), channel(3)) {
                (Some(r), Some(g), Some(b)) => Some(ColorRef::nearest(Rgb::new(r, g, b))),
                _ => None,
            };
            (color, 4.min(params.len() - start))
        }
        _ => (None, 1.min(params.len().saturating_sub(start))),
    }
}
