use anyhow::Result;
use similar::{ChangeTag, TextDiff};
use termlink_terminal::{Interpreter, InterpreterEvent, ScreenBuffer, ScreenSnapshot};

/// A screen and interpreter pair for driving the emulator directly
#[derive(Debug)]
pub struct TestScreen {
    pub screen: ScreenBuffer,
    pub interpreter: Interpreter,
}

impl TestScreen {
    pub fn new(rows: usize, columns: usize) -> Result<Self> {
        Ok(Self {
            screen: ScreenBuffer::new(rows, columns)?,
            interpreter: Interpreter::new(),
        })
    }

    pub fn feed(&mut self, text: &str) -> Result<Vec<InterpreterEvent>> {
        Ok(self.interpreter.feed(&self.screen, text)?)
    }

    pub fn snapshot(&self) -> Result<ScreenSnapshot> {
        Ok(self.screen.snapshot()?)
    }

    /// Every row's text, trailing blanks trimmed
    pub fn rows(&self) -> Result<Vec<String>> {
        Ok(screen_rows(&self.snapshot()?))
    }
}

pub fn screen_rows(snapshot: &ScreenSnapshot) -> Vec<String> {
    (0..snapshot.rows).map(|row| snapshot.row_text(row)).collect()
}

pub struct ScreenComparator;

impl Default for ScreenComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenComparator {
    pub fn new() -> Self {
        Self
    }

    /// Compare the top rows of `snapshot` with `expected`; rows past the
    /// end of `expected` must be blank
    pub fn compare_rows(&self, expected: &[&str], snapshot: &ScreenSnapshot) -> Result<()> {
        let actual = screen_rows(snapshot);
        let mut wanted: Vec<String> = expected.iter().map(|row| row.trim_end().to_string()).collect();
        wanted.resize(actual.len().max(wanted.len()), String::new());

        let expected_text = wanted.join("\n");
        let actual_text = actual.join("\n");
        if expected_text == actual_text {
            return Ok(());
        }

        // Generate diff for debugging
        let diff = TextDiff::from_lines(&expected_text, &actual_text);
        let mut diff_output = String::new();
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            diff_output.push_str(&format!("{sign}{change}"));
        }

        anyhow::bail!("Screen mismatch:\n\nDiff:\n{}", diff_output)
    }

    pub fn assert_contains(&self, snapshot: &ScreenSnapshot, needle: &str) -> Result<()> {
        let text = snapshot.text();
        if !text.contains(needle) {
            anyhow::bail!(
                "Screen does not contain expected text:\nExpected to find:\n{}\n\nOn screen:\n{}",
                needle,
                text
            );
        }
        Ok(())
    }
}
