//! Session configuration
//!
//! Sessions are configured from a connection profile (`ssh` or `telnet`)
//! with individual fields overridable from a TOML file:
//!
//! ```toml
//! profile = "telnet"
//! rows = 40
//! columns = 120
//! scrollback_lines = 5000
//! local_echo = false
//! ```

use crate::SessionError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use termlink_terminal::scrollback::DEFAULT_SCROLLBACK_LINES;

/// Transport flavour a session is talking to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Profile {
    #[default]
    Ssh,
    Telnet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub rows: usize,
    pub columns: usize,

    /// Lines kept after scrolling off the top; 0 disables capture
    pub scrollback_lines: usize,

    /// Echo transmitted keys onto the local screen
    pub local_echo: bool,

    /// Text sent for the Enter key
    pub written_newline: String,

    /// Text sent for the Backspace key
    pub backspace: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::ssh()
    }
}

impl SessionConfig {
    /// Remote host echoes, Enter sends CR, Backspace sends DEL
    pub fn ssh() -> Self {
        Self {
            rows: 24,
            columns: 80,
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
            local_echo: false,
            written_newline: "\r".to_string(),
            backspace: "\x7f".to_string(),
        }
    }

    /// Line-mode peer: echo locally, Enter sends CR LF, Backspace sends BS
    pub fn telnet() -> Self {
        Self {
            local_echo: true,
            written_newline: "\r\n".to_string(),
            backspace: "\x08".to_string(),
            ..Self::ssh()
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Ssh => Self::ssh(),
            Profile::Telnet => Self::telnet(),
        }
    }

    /// Parse a TOML document: the profile's defaults with the file's fields
    /// applied on top
    pub fn from_toml_str(content: &str) -> Result<Self, SessionError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| SessionError::Config(e.to_string()))?;
        let config = file.apply();
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, SessionError> {
        toml::to_string_pretty(self)
            .map_err(|e| SessionError::Config(format!("Failed to serialize config: {e}")))
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.rows == 0 || self.columns == 0 {
            return Err(SessionError::Config(format!(
                "Invalid terminal size {}x{}",
                self.rows, self.columns
            )));
        }
        if self.written_newline.is_empty() {
            return Err(SessionError::Config(
                "written_newline must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// On-disk shape: every field optional, defaults come from the profile
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    profile: Profile,
    rows: Option<usize>,
    columns: Option<usize>,
    scrollback_lines: Option<usize>,
    local_echo: Option<bool>,
    written_newline: Option<String>,
    backspace: Option<String>,
}

impl ConfigFile {
    fn apply(self) -> SessionConfig {
        let base = SessionConfig::for_profile(self.profile);
        SessionConfig {
            rows: self.rows.unwrap_or(base.rows),
            columns: self.columns.unwrap_or(base.columns),
            scrollback_lines: self.scrollback_lines.unwrap_or(base.scrollback_lines),
            local_echo: self.local_echo.unwrap_or(base.local_echo),
            written_newline: self.written_newline.unwrap_or(base.written_newline),
            backspace: self.backspace.unwrap_or(base.backspace),
        }
    }
}
