//! Turning screen snapshots into output for a real terminal

use anyhow::Result;
use crossterm::{
    cursor, queue,
    style::{self, Attribute, Color},
    terminal::{self, ClearType},
};
use std::io::Write;
use termlink_terminal::color::Palette;
use termlink_terminal::{Attributes, Cell, ColorRef, Line, ScreenSnapshot};

/// Plain text of `history` followed by the visible screen
pub fn plain_text(history: &[Line], snapshot: &ScreenSnapshot) -> String {
    let mut text = String::new();
    for line in history {
        text.push_str(&line.text());
        text.push('\n');
    }
    let screen = snapshot.text();
    if !screen.is_empty() {
        text.push_str(&screen);
        text.push('\n');
    }
    text
}

/// Write `history` and the screen as styled lines, for printing to a stream
pub fn write_styled(out: &mut impl Write, history: &[Line], snapshot: &ScreenSnapshot) -> Result<()> {
    let palette = Palette::default();
    let used = (0..snapshot.rows)
        .rposition(|row| !snapshot.row_text(row).is_empty())
        .map_or(0, |row| row + 1);

    for line in history.iter().chain(snapshot.lines.iter().take(used)) {
        write_line(out, line, &palette)?;
        queue!(out, style::SetAttribute(Attribute::Reset), style::ResetColor)?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

/// Repaint the whole terminal with `snapshot`, cursor included
pub fn draw_frame(out: &mut impl Write, snapshot: &ScreenSnapshot) -> Result<()> {
    let palette = Palette::default();
    queue!(out, cursor::Hide, terminal::Clear(ClearType::All))?;

    for (row, line) in snapshot.lines.iter().enumerate() {
        queue!(out, cursor::MoveTo(0, to_u16(row)))?;
        write_line(out, line, &palette)?;
        queue!(out, style::SetAttribute(Attribute::Reset), style::ResetColor)?;
    }

    queue!(
        out,
        cursor::MoveTo(to_u16(snapshot.cursor_column), to_u16(snapshot.cursor_row))
    )?;
    if !snapshot.cursor_hidden {
        queue!(out, cursor::Show)?;
    }

    out.flush()?;
    Ok(())
}

/// Write one line's cells, emitting style changes only where they differ.
/// Trailing blank cells are skipped.
fn write_line(out: &mut impl Write, line: &Line, palette: &Palette) -> Result<()> {
    let cells = line.cells();
    let used = cells
        .iter()
        .rposition(|cell| !cell.is_blank())
        .map_or(0, |column| column + 1);

    let mut pen: Option<Pen> = None;
    for cell in &cells[..used] {
        let next = Pen::of(cell);
        if pen != Some(next) {
            next.apply(out, palette)?;
            pen = Some(next);
        }
        queue!(out, style::Print(cell.glyph))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pen {
    foreground: ColorRef,
    background: ColorRef,
    attributes: Attributes,
}

impl Pen {
    fn of(cell: &Cell) -> Self {
        Self {
            foreground: cell.foreground,
            background: cell.background,
            attributes: cell.attributes,
        }
    }

    fn apply(&self, out: &mut impl Write, palette: &Palette) -> Result<()> {
        queue!(
            out,
            style::SetAttribute(Attribute::Reset),
            style::SetForegroundColor(to_color(self.foreground, palette)),
            style::SetBackgroundColor(to_color(self.background, palette)),
        )?;
        if self.attributes.bold {
            queue!(out, style::SetAttribute(Attribute::Bold))?;
        }
        if self.attributes.underline {
            queue!(out, style::SetAttribute(Attribute::Underlined))?;
        }
        Ok(())
    }
}

/// Palette indices pass through so the host terminal's theme applies;
/// only the cursor colors need resolving
fn to_color(color: ColorRef, palette: &Palette) -> Color {
    match color {
        ColorRef::DefaultForeground | ColorRef::DefaultBackground => Color::Reset,
        ColorRef::Indexed(index) => Color::AnsiValue(index),
        other => {
            let rgb = palette.resolve(other);
            Color::Rgb {
                r: rgb.r,
                g: rgb.g,
                b: rgb.b,
            }
        }
    }
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termlink_terminal::{Interpreter, ScreenBuffer};

    fn snapshot_of(text: &str) -> ScreenSnapshot {
        let screen = ScreenBuffer::new(4, 20).unwrap();
        Interpreter::new().feed(&screen, text).unwrap();
        screen.snapshot().unwrap()
    }

    #[test]
    fn plain_text_skips_trailing_blank_rows() {
        let snapshot = snapshot_of("one\r\n\x1b[1mtwo");
        assert_eq!(plain_text(&[], &snapshot), "one\ntwo\n");
        assert_eq!(plain_text(&[], &snapshot_of("")), "");
    }

    #[test]
    fn styled_output_carries_colors() {
        let snapshot = snapshot_of("\x1b[31mred\x1b[0m plain");
        let mut out = Vec::new();
        write_styled(&mut out, &[], &snapshot).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[38;5;1m"));
        assert!(text.contains("red"));
        assert!(text.contains(" plain"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn frame_places_cursor() {
        let snapshot = snapshot_of("ab\r\ncd");
        let mut out = Vec::new();
        draw_frame(&mut out, &snapshot).unwrap();
        let text = String::from_utf8(out).unwrap();
        // Row 1, column 2 in one-based coordinates
        assert!(text.contains("\x1b[2;3H"));
        assert!(text.ends_with("\x1b[?25h"));
    }
}
