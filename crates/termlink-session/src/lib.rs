//! Session orchestration for termlink
//!
//! A [`TerminalSession`] owns one screen and one interpreter, pumps text
//! from an [`InputSource`] into them, sends key presses and status replies
//! to an [`OutputSink`], and runs local line reads (credential prompts)
//! before the remote end takes over the screen.

pub mod config;
pub mod input;
pub mod io;
mod local_read;
pub mod session;

pub use config::{Profile, SessionConfig};
pub use input::{InputMapping, Key, KeyPress, Vt100Mapping};
pub use io::{
    channel_sink, channel_source, ChannelSink, ChannelSource, InputSource, OutputSink,
    ReaderSource, Utf8Decoder, WriterSink,
};
pub use session::{SessionEvent, SessionState, TerminalSession};

use termlink_terminal::TerminalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Operation cancelled: session disconnected")]
    Cancelled,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("A local line read is already pending")]
    ReadPending,

    #[error("Output sink is closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal error: {0}")]
    Terminal(#[from] TerminalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
