//! G0/G1 character set designation

/// Character set selectable with `ESC ( x` / `ESC ) x`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Ascii,
    /// DEC special graphics (line drawing), designated with `0`
    DecSpecialGraphics,
}

impl Charset {
    /// Charset named by the final byte of a designation sequence
    pub fn from_designator(designator: char) -> Option<Self> {
        match designator {
            'B' | 'A' | '1' | '2' => Some(Charset::Ascii),
            '0' => Some(Charset::DecSpecialGraphics),
            _ => None,
        }
    }

    /// Glyph to store for `c` while this charset is active
    pub fn map(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::DecSpecialGraphics => match c {
                '`' => '◆',
                'a' => '▒',
                'b' => '␉',
                'c' => '␌',
                'd' => '␍',
                'e' => '␊',
                'f' => '°',
                'g' => '±',
                'h' => '␤',
                'i' => '␋',
                'j' => '┘',
                'k' => '┐',
                'l' => '┌',
                'm' => '└',
                'n' => '┼',
                'o' => '⎺',
                'p' => '⎻',
                'q' => '─',
                'r' => '⎼',
                's' => '⎽',
                't' => '├',
                'u' => '┤',
                'v' => '┴',
                'w' => '┬',
                'x' => '│',
                'y' => '≤',
                'z' => '≥',
                '{' => 'π',
                '|' => '≠',
                '}' => '£',
                '~' => '·',
                _ => c,
            },
        }
    }
}
