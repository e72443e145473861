//! termlink command line

use crate::render;
use crate::screen_guard::ScreenGuard;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    event::{self, Event},
    execute, terminal,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use termlink_session::{
    Profile, ReaderSource, SessionConfig, SessionEvent, TerminalSession, WriterSink,
};
use termlink_terminal::{Line, ScreenSnapshot};
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Redraw cadence of the live view
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "termlink - terminal emulation for captured and live streams")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// TOML session configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Connection profile providing echo and newline defaults
    #[arg(short, long, global = true, value_enum)]
    profile: Option<Profile>,

    /// Screen rows
    #[arg(long, global = true)]
    rows: Option<usize>,

    /// Screen columns
    #[arg(long, global = true)]
    cols: Option<usize>,

    /// Scrollback capacity in lines
    #[arg(long, global = true)]
    scrollback: Option<usize>,

    /// Echo transmitted keys on the local screen
    #[arg(long, global = true)]
    local_echo: Option<bool>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a captured output stream through the emulator and print the
    /// final screen
    Replay {
        /// File holding raw terminal output
        file: PathBuf,

        /// Keep colors and attributes in the printed screen
        #[arg(long)]
        ansi: bool,

        /// Print scrollback above the screen
        #[arg(long)]
        history: bool,
    },

    /// Emulate terminal output arriving on stdin and draw it live
    View,
}

/// Final state of a replayed stream
#[derive(Debug)]
pub struct Replay {
    pub snapshot: ScreenSnapshot,
    pub history: Vec<Line>,
    pub title: Option<String>,
}

pub async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);

    let interactive = matches!(args.command, Command::View);
    let config = session_config(&args, interactive)?;

    match args.command {
        Command::Replay {
            file,
            ansi,
            history,
        } => {
            let replay = replay(&file, config).await?;
            let history = if history { replay.history } else { Vec::new() };

            let mut stdout = io::stdout();
            if ansi {
                render::write_styled(&mut stdout, &history, &replay.snapshot)?;
            } else {
                stdout.write_all(render::plain_text(&history, &replay.snapshot).as_bytes())?;
                stdout.flush()?;
            }
            Ok(())
        }
        Command::View => view(config).await,
    }
}

fn init_logging(level: LogLevel) {
    let level = match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };

    // RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build the session configuration: config file (or profile defaults),
/// then command line overrides. Without an explicit size the live view
/// matches the controlling terminal.
fn session_config(args: &Args, interactive: bool) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SessionConfig::for_profile(args.profile.unwrap_or_default()),
    };

    if let (Some(profile), Some(_)) = (args.profile, &args.config) {
        let base = SessionConfig::for_profile(profile);
        config.local_echo = base.local_echo;
        config.written_newline = base.written_newline;
        config.backspace = base.backspace;
    }

    if interactive && args.rows.is_none() && args.cols.is_none() {
        if let Ok((columns, rows)) = terminal::size() {
            config.rows = usize::from(rows);
            config.columns = usize::from(columns);
        }
    }

    if let Some(rows) = args.rows {
        config.rows = rows;
    }
    if let Some(columns) = args.cols {
        config.columns = columns;
    }
    if let Some(lines) = args.scrollback {
        config.scrollback_lines = lines;
    }
    if let Some(local_echo) = args.local_echo {
        config.local_echo = local_echo;
    }

    config.validate().context("Invalid session configuration")?;
    Ok(config)
}

/// Run the contents of `path` through a session until end of file
pub async fn replay(path: &Path, config: SessionConfig) -> Result<Replay> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let (session, mut events) = TerminalSession::new(config)?;
    session
        .power_on(
            Box::new(ReaderSource::new(file)),
            Box::new(WriterSink::new(tokio::io::sink())),
        )
        .await?;
    if let Err(e) = session.mark_connected() {
        // Short captures may already have ended
        debug!("Replay finished before connecting: {}", e);
    }

    session.wait_disconnected().await;

    let mut title = None;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::TitleChanged(text) = event {
            title = Some(text);
        }
    }

    let history = session.scrollback_lines(0, session.scrollback_len()?)?;
    let snapshot = session.snapshot()?;
    info!(
        "Replayed {} ({} scrollback lines)",
        path.display(),
        history.len()
    );

    Ok(Replay {
        snapshot,
        history,
        title,
    })
}

async fn view(config: SessionConfig) -> Result<()> {
    let (session, mut events) = TerminalSession::new(config)?;
    session
        .power_on(
            Box::new(ReaderSource::new(tokio::io::stdin())),
            Box::new(WriterSink::new(tokio::io::sink())),
        )
        .await?;
    if let Err(e) = session.mark_connected() {
        debug!("Input ended before connecting: {}", e);
    }

    let mut guard = ScreenGuard::acquire()?;

    // Resize events come from the controlling terminal, not from stdin
    let (resize_tx, mut resize_rx) = mpsc::unbounded_channel::<(u16, u16)>();
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let resize_handle = tokio::task::spawn_blocking({
        let mut shutdown_rx = shutdown_tx.subscribe();
        move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                if let Ok(Event::Resize(columns, rows)) = event::read() {
                    let _ = resize_tx.send((columns, rows));
                }
            }
        }
    });

    let result = view_loop(&session, &mut events, &mut resize_rx).await;

    let _ = shutdown_tx.send(());
    let _ = resize_handle.await;
    session.disconnect().await;
    guard.release()?;

    // Leave the final screen on the primary terminal
    let snapshot = session.snapshot()?;
    render::write_styled(&mut io::stdout(), &[], &snapshot)?;

    result
}

async fn view_loop(
    session: &Arc<TerminalSession>,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    resize_rx: &mut mpsc::UnboundedReceiver<(u16, u16)>,
) -> Result<()> {
    let screen = session.screen();
    let mut stdout = io::stdout();
    let mut frames = time::interval(FRAME_INTERVAL);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                if screen.is_dirty() {
                    render::draw_frame(&mut stdout, &screen.snapshot()?)?;
                }
            }

            event = events.recv() => match event {
                Some(SessionEvent::TitleChanged(title)) => {
                    execute!(stdout, terminal::SetTitle(&title))?;
                }
                Some(SessionEvent::Bell) => {
                    stdout.write_all(b"\x07")?;
                    stdout.flush()?;
                }
                Some(SessionEvent::Disconnected) | None => break,
                Some(other) => debug!("Session event: {:?}", other),
            },

            Some((columns, rows)) = resize_rx.recv() => {
                if let Err(e) = session.resize(usize::from(rows), usize::from(columns)) {
                    warn!("Failed to resize session: {}", e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("termlink").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn profile_sets_defaults() {
        let args = parse(&["--profile", "telnet", "replay", "capture.log"]);
        let config = session_config(&args, false).unwrap();
        assert_eq!(config, SessionConfig::telnet());
    }

    #[test]
    fn flags_override_profile() {
        let args = parse(&[
            "replay",
            "capture.log",
            "--rows",
            "10",
            "--cols",
            "40",
            "--scrollback",
            "0",
            "--local-echo",
            "true",
        ]);
        let config = session_config(&args, false).unwrap();
        assert_eq!((config.rows, config.columns), (10, 40));
        assert_eq!(config.scrollback_lines, 0);
        assert!(config.local_echo);
        assert_eq!(config.written_newline, "\r");
    }

    #[test]
    fn zero_size_is_rejected() {
        let args = parse(&["replay", "capture.log", "--rows", "0"]);
        assert!(session_config(&args, false).is_err());
    }

    #[test]
    fn replay_flags_parse() {
        let args = parse(&["replay", "capture.log", "--ansi", "--history"]);
        assert!(matches!(
            args.command,
            Command::Replay {
                ansi: true,
                history: true,
                ..
            }
        ));
        assert!(matches!(parse(&["view"]).command, Command::View));
    }
}
