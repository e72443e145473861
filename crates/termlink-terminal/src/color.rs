//! Color references and the 256 + 4 entry palette
//!
//! Cells never store concrete RGB values. They store a [`ColorRef`] which a
//! renderer resolves through a [`Palette`], so theme changes repaint the whole
//! screen without touching the grid.

use rkyv::{Archive, Deserialize, Serialize};

/// Reference into the terminal palette
#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[archive(check_bytes)]
pub enum ColorRef {
    /// Theme foreground for text with no explicit color
    DefaultForeground,

    /// Theme background for cells with no explicit color
    DefaultBackground,

    /// Glyph color under the cursor
    CursorForeground,

    /// Cursor block color
    CursorBackground,

    /// Palette index: 0-15 ANSI, 16-231 color cube, 232-255 grayscale ramp
    Indexed(u8),
}

impl ColorRef {
    pub const BLACK: ColorRef = ColorRef::Indexed(0);
    pub const RED: ColorRef = ColorRef::Indexed(1);
    pub const GREEN: ColorRef = ColorRef::Indexed(2);
    pub const YELLOW: ColorRef = ColorRef::Indexed(3);
    pub const BLUE: ColorRef = ColorRef::Indexed(4);
    pub const MAGENTA: ColorRef = ColorRef::Indexed(5);
    pub const CYAN: ColorRef = ColorRef::Indexed(6);
    pub const WHITE: ColorRef = ColorRef::Indexed(7);

    /// One of the 16 ANSI colors (0-7 normal, 8-15 bright)
    pub fn ansi(index: u8) -> Self {
        ColorRef::Indexed(index & 0x0f)
    }

    /// Color cube entry, each coordinate in `0..=5`
    pub fn cube(r: u8, g: u8, b: u8) -> Option<Self> {
        if r > 5 || g > 5 || b > 5 {
            return None;
        }
        Some(ColorRef::Indexed(16 + 36 * r + 6 * g + b))
    }

    /// Grayscale ramp entry, `step` in `0..=23`
    pub fn grayscale(step: u8) -> Option<Self> {
        if step > 23 {
            return None;
        }
        Some(ColorRef::Indexed(232 + step))
    }

    /// Closest palette entry (cube or grayscale) to an arbitrary RGB value
    pub fn nearest(rgb: Rgb) -> Self {
        let coord = |v: u8| -> u8 {
            // Cube levels are 0, 95, 135, 175, 215, 255
            if v < 48 {
                0
            } else if v < 115 {
                1
            } else {
                ((v as u16 - 35) / 40).min(5) as u8
            }
        };
        let (r, g, b) = (coord(rgb.r), coord(rgb.g), coord(rgb.b));
        let cube_index = 16 + 36 * r + 6 * g + b;

        let average = (rgb.r as u16 + rgb.g as u16 + rgb.b as u16) / 3;
        let step = if average < 8 {
            0
        } else {
            ((average - 8) / 10).min(23) as u8
        };
        let gray_index = 232 + step;

        let cube_distance = rgb.distance(index_to_rgb(cube_index).unwrap_or_default());
        let gray_distance = rgb.distance(index_to_rgb(gray_index).unwrap_or_default());

        if gray_distance < cube_distance {
            ColorRef::Indexed(gray_index)
        } else {
            ColorRef::Indexed(cube_index)
        }
    }
}

/// Concrete 24-bit color
#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[archive(check_bytes)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn distance(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Fixed RGB value of a palette index in the cube or grayscale range.
///
/// Returns `None` for the 16 ANSI colors, which are theme-dependent.
pub fn index_to_rgb(index: u8) -> Option<Rgb> {
    match index {
        0..=15 => None,
        16..=231 => {
            let offset = index - 16;
            let level = |coord: u8| if coord == 0 { 0 } else { 40 * coord + 55 };
            Some(Rgb::new(
                level(offset / 36),
                level((offset / 6) % 6),
                level(offset % 6),
            ))
        }
        232..=255 => {
            let level = 10 * (index - 232) + 8;
            Some(Rgb::new(level, level, level))
        }
    }
}

/// Theme colors used to resolve a [`ColorRef`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub ansi: [Rgb; 16],
    pub foreground: Rgb,
    pub background: Rgb,
    pub cursor_foreground: Rgb,
    pub cursor_background: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            ansi: [
                Rgb::new(0, 0, 0),
                Rgb::new(205, 0, 0),
                Rgb::new(0, 205, 0),
                Rgb::new(205, 205, 0),
                Rgb::new(0, 0, 238),
                Rgb::new(205, 0, 205),
                Rgb::new(0, 205, 205),
                Rgb::new(229, 229, 229),
                Rgb::new(127, 127, 127),
                Rgb::new(255, 0, 0),
                Rgb::new(0, 255, 0),
                Rgb::new(255, 255, 0),
                Rgb::new(92, 92, 255),
                Rgb::new(255, 0, 255),
                Rgb::new(0, 255, 255),
                Rgb::new(255, 255, 255),
            ],
            foreground: Rgb::new(229, 229, 229),
            background: Rgb::new(0, 0, 0),
            cursor_foreground: Rgb::new(0, 0, 0),
            cursor_background: Rgb::new(229, 229, 229),
        }
    }
}

impl Palette {
    /// Resolve a color reference against this theme
    pub fn resolve(&self, color: ColorRef) -> Rgb {
        match color {
            ColorRef::DefaultForeground => self.foreground,
            ColorRef::DefaultBackground => self.background,
            ColorRef::CursorForeground => self.cursor_foreground,
            ColorRef::CursorBackground => self.cursor_background,
            ColorRef::Indexed(index) => {
                index_to_rgb(index).unwrap_or(self.ansi[(index & 0x0f) as usize])
            }
        }
    }
}
