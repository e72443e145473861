//! Terminal session orchestration
//!
//! Ties one [`ScreenBuffer`] and one [`Interpreter`] to an input source and
//! an output sink. Besides pumping remote output into the screen, the
//! session runs *local line reads*: while a transport is still
//! authenticating it can ask the user for a line of text (user name,
//! password) which is edited on screen and never sent to the remote end.
//!
//! Lock order is local read slot, then interpreter, then screen. No std
//! mutex guard is held across an `.await`.

use crate::{
    config::SessionConfig,
    input::{InputMapping, Key, KeyPress, Vt100Mapping},
    io::{InputSource, OutputSink},
    local_read::LocalRead,
    SessionError,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use termlink_terminal::{
    CellFormat, Interpreter, InterpreterEvent, Line, ScreenBuffer, ScreenSnapshot,
    ScreenTransaction, ScrollbackBuffer, TerminalError,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

/// Session lifecycle: `Off → Connecting → Connected → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Off,
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Off => "off",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Events that can occur in a terminal session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Lifecycle state has changed
    StateChanged(SessionState),

    /// Remote end set the window title
    TitleChanged(String),

    /// Bell from the remote end, or a rejected edit during a local read
    Bell,

    /// Screen was resized
    Resized { rows: usize, columns: usize },

    /// Session has ended; no further events follow
    Disconnected,
}

pub struct TerminalSession {
    config: SessionConfig,
    screen: Arc<ScreenBuffer>,
    interpreter: Mutex<Interpreter>,
    mapping: Box<dyn InputMapping>,

    /// Outstanding local line read, if any
    local_read: Mutex<Option<LocalRead>>,

    state_tx: watch::Sender<SessionState>,

    /// False while a local read holds remote input back
    feeding_tx: watch::Sender<bool>,

    /// Stops the read loop
    shutdown_tx: watch::Sender<bool>,

    sink: tokio::sync::Mutex<Option<Box<dyn OutputSink>>>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl TerminalSession {
    /// Create a session with VT100 key encoding
    pub fn new(
        config: SessionConfig,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        Self::with_mapping(config, Box::new(Vt100Mapping))
    }

    pub fn with_mapping(
        config: SessionConfig,
        mapping: Box<dyn InputMapping>,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        config.validate()?;

        let screen = ScreenBuffer::with_scrollback(
            config.rows,
            config.columns,
            ScrollbackBuffer::new(config.scrollback_lines),
        )?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionState::Off);
        let (feeding_tx, _) = watch::channel(true);
        let (shutdown_tx, _) = watch::channel(false);

        debug!(
            "Creating {}x{} session (local echo: {})",
            config.rows, config.columns, config.local_echo
        );

        let session = Self {
            config,
            screen: Arc::new(screen),
            interpreter: Mutex::new(Interpreter::new()),
            mapping,
            local_read: Mutex::new(None),
            state_tx,
            feeding_tx,
            shutdown_tx,
            sink: tokio::sync::Mutex::new(None),
            event_tx,
        };

        Ok((Arc::new(session), event_rx))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Shared handle to the screen for renderers
    pub fn screen(&self) -> Arc<ScreenBuffer> {
        Arc::clone(&self.screen)
    }

    pub fn snapshot(&self) -> Result<ScreenSnapshot, SessionError> {
        Ok(self.screen.snapshot()?)
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Resolve once the session has disconnected
    pub async fn wait_disconnected(&self) {
        let mut state = self.subscribe_state();
        // The sender lives as long as self, so this cannot fail
        let _ = state
            .wait_for(|state| *state == SessionState::Disconnected)
            .await;
    }

    pub fn is_reading_line(&self) -> bool {
        lock(&self.local_read).map_or(false, |slot| slot.is_some())
    }

    /// Start the read loop and begin connecting
    pub async fn power_on(
        self: &Arc<Self>,
        source: Box<dyn InputSource>,
        sink: Box<dyn OutputSink>,
    ) -> Result<(), SessionError> {
        self.transition(&[SessionState::Off], SessionState::Connecting)?;
        *self.sink.lock().await = Some(sink);

        let session = Arc::clone(self);
        tokio::spawn(session.read_loop(source));

        info!("Session powered on");
        Ok(())
    }

    /// Transport finished setting up; remote output now drives the screen
    pub fn mark_connected(&self) -> Result<(), SessionError> {
        self.transition(&[SessionState::Connecting], SessionState::Connected)?;
        info!("Session connected");
        Ok(())
    }

    /// Interpret a chunk of remote output.
    ///
    /// Fails with [`SessionError::ReadPending`] while a local read owns the
    /// screen.
    pub async fn feed(&self, text: &str) -> Result<(), SessionError> {
        match self.interpret_remote(text)? {
            Some(events) => self.handle_events(events, true).await,
            None => Err(SessionError::ReadPending),
        }
    }

    /// Send text to the remote end, echoing it locally when configured
    pub async fn transmit(&self, text: &str) -> Result<(), SessionError> {
        self.send(text).await?;

        if self.config.local_echo {
            let echo = if text == self.config.written_newline {
                "\r\n"
            } else {
                text
            };
            let events = self.interpret(echo)?;
            self.handle_events(events, false).await?;
        }
        Ok(())
    }

    /// Handle a key from the user: edit the pending local read, or encode
    /// and transmit it
    pub async fn key_press(&self, key: KeyPress) -> Result<(), SessionError> {
        if self.local_key(&key)? {
            return Ok(());
        }

        let modes = lock(&self.interpreter)?.modes();
        match self.mapping.map(&key, modes, &self.config) {
            Some(text) => self.transmit(&text).await,
            None => {
                trace!("No encoding for {:?}", key);
                Ok(())
            }
        }
    }

    /// Show `prompt` and collect one line typed by the user.
    ///
    /// Remote input is held back until the line is finished. With `echo`
    /// off, each typed character shows as a bullet. Fails with
    /// [`SessionError::Cancelled`] if the session disconnects first.
    pub async fn read_line(&self, prompt: &str, echo: bool) -> Result<String, SessionError> {
        let receiver = {
            let mut slot = lock(&self.local_read)?;
            match self.state() {
                SessionState::Connecting | SessionState::Connected => {}
                SessionState::Disconnected => return Err(SessionError::Cancelled),
                SessionState::Off => {
                    return Err(SessionError::InvalidState(
                        "session is not powered on".to_string(),
                    ))
                }
            }
            if slot.is_some() {
                return Err(SessionError::ReadPending);
            }

            let (reply, receiver) = oneshot::channel();
            let start = self.screen.transaction()?.cursor();
            let mut read = LocalRead::new(prompt, echo, start, reply);
            self.draw_local(&mut read)?;
            *slot = Some(read);
            self.feeding_tx.send_replace(false);
            receiver
        };

        debug!("Waiting for local line input");
        receiver.await.unwrap_or(Err(SessionError::Cancelled))
    }

    /// Resize the screen, redrawing a pending local read at its start
    pub fn resize(&self, rows: usize, columns: usize) -> Result<(), SessionError> {
        {
            let mut slot = lock(&self.local_read)?;
            lock(&self.interpreter)?.resize(&self.screen, rows, columns)?;
            if let Some(read) = slot.as_mut() {
                read.clamp_start(rows, columns);
                self.draw_local(read)?;
            }
        }

        debug!("Session resized to {}x{}", rows, columns);
        self.emit(SessionEvent::Resized { rows, columns });
        Ok(())
    }

    pub fn set_focus(&self, has_focus: bool) -> Result<(), SessionError> {
        self.screen.transaction()?.set_focus(has_focus);
        Ok(())
    }

    pub fn scrollback_len(&self) -> Result<usize, SessionError> {
        Ok(self.screen.scrollback_len()?)
    }

    /// Up to `count` history lines ending `offset` lines before the newest,
    /// oldest first
    pub fn scrollback_lines(&self, offset: usize, count: usize) -> Result<Vec<Line>, SessionError> {
        Ok(self.screen.scrollback_lines(offset, count)?)
    }

    /// End the session. Cancels a pending local read, stops the read loop
    /// and closes the sink. Calling it again does nothing.
    pub async fn disconnect(&self) {
        let pending = {
            let mut slot = self
                .local_read
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let previous = self.state_tx.send_replace(SessionState::Disconnected);
            if previous == SessionState::Disconnected {
                return;
            }
            slot.take()
        };

        self.emit(SessionEvent::StateChanged(SessionState::Disconnected));
        self.shutdown_tx.send_replace(true);
        self.feeding_tx.send_replace(true);

        if let Some(read) = pending {
            debug!("Cancelling pending local read");
            read.cancel();
        }

        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                warn!("Failed to close output sink: {}", e);
            }
        }

        info!("Session disconnected");
        self.emit(SessionEvent::Disconnected);
    }

    async fn read_loop(self: Arc<Self>, mut source: Box<dyn InputSource>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut feeding = self.feeding_tx.subscribe();

        loop {
            let chunk = tokio::select! {
                chunk = source.read_chunk() => chunk,
                _ = stopped(&mut shutdown) => break,
            };

            let text = match chunk {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!("Input source reached end of stream");
                    break;
                }
                Err(e) => {
                    warn!("Input source failed: {}", e);
                    break;
                }
            };

            let events = match self
                .interpret_when_idle(&text, &mut feeding, &mut shutdown)
                .await
            {
                Ok(Some(events)) => events,
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopping read loop: {}", e);
                    break;
                }
            };

            if let Err(e) = self.handle_events(events, true).await {
                warn!("Stopping read loop: {}", e);
                break;
            }
        }

        self.disconnect().await;
    }

    /// Wait until no local read owns the screen, then interpret `text`.
    /// None when the session stops first.
    async fn interpret_when_idle(
        &self,
        text: &str,
        feeding: &mut watch::Receiver<bool>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<Vec<InterpreterEvent>>, SessionError> {
        loop {
            tokio::select! {
                ready = resumed(feeding) => {
                    if !ready {
                        return Ok(None);
                    }
                }
                _ = stopped(shutdown) => return Ok(None),
            }

            // A read may have started since feeding was last allowed
            if let Some(events) = self.interpret_remote(text)? {
                return Ok(Some(events));
            }
            trace!("Local read started, holding remote output");
        }
    }

    /// Interpret remote output unless a local read is pending. The slot stays
    /// locked until the text is on screen.
    fn interpret_remote(&self, text: &str) -> Result<Option<Vec<InterpreterEvent>>, SessionError> {
        let slot = lock(&self.local_read)?;
        if slot.is_some() {
            return Ok(None);
        }
        self.interpret(text).map(Some)
    }

    fn interpret(&self, text: &str) -> Result<Vec<InterpreterEvent>, SessionError> {
        let mut interpreter = lock(&self.interpreter)?;
        Ok(interpreter.feed(&self.screen, text)?)
    }

    async fn handle_events(
        &self,
        events: Vec<InterpreterEvent>,
        reply: bool,
    ) -> Result<(), SessionError> {
        for event in events {
            match event {
                InterpreterEvent::Transmit(text) if reply => {
                    if let Err(e) = self.send(&text).await {
                        warn!("Could not send terminal reply: {}", e);
                    }
                }
                InterpreterEvent::Transmit(text) => {
                    trace!("Not replying {:?} to local echo", text);
                }
                InterpreterEvent::TitleChanged(title) => {
                    self.emit(SessionEvent::TitleChanged(title));
                }
                InterpreterEvent::Bell => self.emit(SessionEvent::Bell),
            }
        }
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), SessionError> {
        let mut sink = self.sink.lock().await;
        match sink.as_mut() {
            Some(sink) => sink.transmit(text).await,
            None => Err(SessionError::Closed),
        }
    }

    /// Route a key into the pending local read. False when there is none.
    fn local_key(&self, key: &KeyPress) -> Result<bool, SessionError> {
        let mut slot = lock(&self.local_read)?;
        let Some(read) = slot.as_mut() else {
            return Ok(false);
        };

        match key.key {
            Key::Enter => {
                if let Some(read) = slot.take() {
                    read.complete();
                }
                self.feeding_tx.send_replace(true);

                // Remote output waits on the slot lock until the line ends
                lock(&self.interpreter)?.clear_wrap_pending();
                let mut tx = self.screen.transaction()?;
                let (row, _) = tx.cursor();
                tx.set_cursor(row, 0)?;
                tx.cursor_row_increase_with_scroll(None)?;
                debug!("Local line read completed");
            }
            Key::Backspace => {
                if read.pop() {
                    self.draw_local(read)?;
                } else {
                    self.emit(SessionEvent::Bell);
                }
            }
            Key::Char(c) if !key.ctrl && !key.alt && !c.is_control() => {
                read.push(c);
                self.draw_local(read)?;
            }
            other => trace!("Ignoring {:?} during local read", other),
        }
        Ok(true)
    }

    /// Erase from the read's start position and draw prompt and buffer
    /// again. The start moves up only by the rows the drawing scrolled.
    fn draw_local(&self, read: &mut LocalRead) -> Result<(), SessionError> {
        lock(&self.interpreter)?.clear_wrap_pending();

        let mut tx = self.screen.transaction()?;
        let (start_row, start_column) = read.start();
        let (last_row, last_column) = (tx.rows() - 1, tx.columns() - 1);
        tx.erase(
            start_row,
            start_column,
            last_row,
            last_column,
            Some(&CellFormat::default()),
        )?;
        tx.set_cursor(start_row, start_column)?;

        let mut scrolled = 0;
        let mut wrap_pending = false;
        for c in read.rendered().chars() {
            match c {
                '\r' => {
                    let (row, _) = tx.cursor();
                    tx.set_cursor(row, 0)?;
                    wrap_pending = false;
                }
                '\n' => {
                    scrolled += line_feed(&mut tx)?;
                    wrap_pending = false;
                }
                c if c.is_control() => {}
                c => {
                    if wrap_pending {
                        let (row, _) = tx.cursor();
                        tx.set_cursor(row, 0)?;
                        scrolled += line_feed(&mut tx)?;
                        wrap_pending = false;
                    }
                    tx.set_cursor_character(c);
                    tx.apply_format(&CellFormat::default());

                    let (row, column) = tx.cursor();
                    if column < last_column {
                        tx.set_cursor(row, column + 1)?;
                    } else {
                        wrap_pending = true;
                    }
                }
            }
        }

        read.set_start(start_row.saturating_sub(scrolled), start_column);
        Ok(())
    }

    fn transition(
        &self,
        allowed: &[SessionState],
        to: SessionState,
    ) -> Result<(), SessionError> {
        let mut from = to;
        let changed = self.state_tx.send_if_modified(|state| {
            from = *state;
            if allowed.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        });

        if !changed {
            return Err(SessionError::InvalidState(format!(
                "cannot move from {from} to {to}"
            )));
        }
        debug!("Session state {} -> {}", from, to);
        self.emit(SessionEvent::StateChanged(to));
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.screen.dispose();
    }
}

/// Move the cursor down a row, scrolling the screen from the bottom row.
/// Returns the number of rows scrolled.
fn line_feed(tx: &mut ScreenTransaction<'_>) -> Result<usize, TerminalError> {
    let (row, _) = tx.cursor();
    let scrolled = usize::from(row == tx.rows() - 1);
    tx.cursor_row_increase_with_scroll(None)?;
    Ok(scrolled)
}

/// Resolves once shutdown is requested
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Resolves once feeding is allowed again; false if the session is gone
async fn resumed(feeding: &mut watch::Receiver<bool>) -> bool {
    feeding.wait_for(|feeding| *feeding).await.is_ok()
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, SessionError> {
    mutex
        .lock()
        .map_err(|_| SessionError::InvalidState("session lock poisoned".to_string()))
}
