//! RAII guard for the alternate screen used by the live view

use anyhow::Result;
use crossterm::{cursor, execute, terminal};
use std::io;

/// Switches to the alternate screen and hides the cursor; both are undone
/// when dropped.
pub struct ScreenGuard {
    active: bool,
    // Marker to ensure this type is !Send and !Sync
    _marker: std::marker::PhantomData<*const ()>,
}

impl ScreenGuard {
    pub fn acquire() -> Result<Self> {
        execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            terminal::Clear(terminal::ClearType::All),
            cursor::Hide,
        )?;

        Ok(Self {
            active: true,
            _marker: std::marker::PhantomData,
        })
    }

    /// Restore the primary screen now, reporting failures
    pub fn release(&mut self) -> Result<()> {
        if self.active {
            self.active = false;
            execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen)?;
        }
        Ok(())
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        }
    }
}
