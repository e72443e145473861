//! Local line reads: prompts typed on the local screen before the remote end
//! drives the terminal

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use termlink_session::{
    channel_sink, channel_source, Key, KeyPress, SessionConfig, SessionError, SessionEvent,
    TerminalSession,
};
use termlink_test_utils::{init_test_logging, wait_until, within};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(2);

struct Harness {
    session: Arc<TerminalSession>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    remote: mpsc::Sender<String>,
    transmitted: mpsc::UnboundedReceiver<String>,
}

async fn powered_on(config: SessionConfig) -> Harness {
    init_test_logging();
    let (session, events) = TerminalSession::new(config).unwrap();
    let (remote, source) = channel_source(16);
    let (sink, transmitted) = channel_sink();
    session
        .power_on(Box::new(source), Box::new(sink))
        .await
        .unwrap();
    Harness {
        session,
        events,
        remote,
        transmitted,
    }
}

fn small_config(rows: usize, columns: usize) -> SessionConfig {
    SessionConfig {
        rows,
        columns,
        ..SessionConfig::ssh()
    }
}

async fn start_read(
    session: &Arc<TerminalSession>,
    prompt: &str,
    echo: bool,
) -> JoinHandle<Result<String, SessionError>> {
    let reader = {
        let session = Arc::clone(session);
        let prompt = prompt.to_string();
        tokio::spawn(async move { session.read_line(&prompt, echo).await })
    };
    wait_until(TIMEOUT, || session.is_reading_line())
        .await
        .unwrap();
    reader
}

async fn type_text(session: &TerminalSession, text: &str) {
    for c in text.chars() {
        session.key_press(KeyPress::char(c)).await.unwrap();
    }
}

fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn row(session: &TerminalSession, row: usize) -> String {
    session.snapshot().unwrap().row_text(row)
}

#[tokio::test]
async fn test_read_line_collects_typed_text() {
    let mut harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;
    session.feed("Connecting to host\r\n").await.unwrap();

    let reader = start_read(session, "login: ", true).await;
    assert_eq!(row(session, 1), "login: ");

    type_text(session, "alice").await;
    assert_eq!(row(session, 1), "login: alice");
    session.key_press(Key::Enter.into()).await.unwrap();

    let line = within(TIMEOUT, reader).await.unwrap().unwrap().unwrap();
    assert_eq!(line, "alice");
    assert!(!session.is_reading_line());

    // Enter moved to the start of the next line
    let snapshot = session.snapshot().unwrap();
    assert_eq!((snapshot.cursor_row, snapshot.cursor_column), (2, 0));

    // Nothing typed during the read reaches the remote end
    assert!(harness.transmitted.try_recv().is_err());
    drain(&mut harness.events);
}

#[tokio::test]
async fn test_enter_on_empty_buffer_returns_empty_line() {
    let harness = powered_on(SessionConfig::ssh()).await;
    let reader = start_read(&harness.session, "login: ", true).await;

    harness.session.key_press(Key::Enter.into()).await.unwrap();
    let line = within(TIMEOUT, reader).await.unwrap().unwrap().unwrap();
    assert_eq!(line, "");
}

#[tokio::test]
async fn test_backspace_on_empty_buffer_rings_bell() {
    let mut harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;
    drain(&mut harness.events);

    let reader = start_read(session, "login: ", true).await;
    session.key_press(Key::Backspace.into()).await.unwrap();
    session.key_press(Key::Backspace.into()).await.unwrap();

    let bells = drain(&mut harness.events)
        .into_iter()
        .filter(|event| *event == SessionEvent::Bell)
        .count();
    assert_eq!(bells, 2);
    assert_eq!(row(session, 0), "login: ");

    // The buffer is still usable afterwards
    type_text(session, "ab").await;
    session.key_press(Key::Backspace.into()).await.unwrap();
    assert_eq!(row(session, 0), "login: a");
    session.key_press(Key::Enter.into()).await.unwrap();
    assert_eq!(within(TIMEOUT, reader).await.unwrap().unwrap().unwrap(), "a");
}

#[tokio::test]
async fn test_password_is_masked() {
    let harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;

    let reader = start_read(session, "Password: ", false).await;
    type_text(session, "hunter2").await;
    assert_eq!(row(session, 0), "Password: •••••••");

    session.key_press(Key::Backspace.into()).await.unwrap();
    assert_eq!(row(session, 0), "Password: ••••••");
    assert!(!session.snapshot().unwrap().text().contains("hunter"));

    session.key_press(Key::Enter.into()).await.unwrap();
    assert_eq!(
        within(TIMEOUT, reader).await.unwrap().unwrap().unwrap(),
        "hunter"
    );
}

#[tokio::test]
async fn test_control_keys_are_ignored_during_read() {
    let harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;

    let reader = start_read(session, "> ", true).await;
    session.key_press(KeyPress::ctrl('c')).await.unwrap();
    session.key_press(Key::Up.into()).await.unwrap();
    session.key_press(Key::Tab.into()).await.unwrap();
    type_text(session, "ok").await;
    session.key_press(Key::Enter.into()).await.unwrap();

    assert_eq!(within(TIMEOUT, reader).await.unwrap().unwrap().unwrap(), "ok");
}

#[tokio::test]
async fn test_remote_output_waits_for_read_to_finish() {
    let harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;

    let reader = start_read(session, "login: ", true).await;
    harness.remote.send("Last login: today\r\n".to_string()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!session.snapshot().unwrap().text().contains("Last login"));

    type_text(session, "bob").await;
    session.key_press(Key::Enter.into()).await.unwrap();
    within(TIMEOUT, reader).await.unwrap().unwrap().unwrap();

    wait_until(TIMEOUT, || row(session, 1) == "Last login: today")
        .await
        .unwrap();
    assert_eq!(row(session, 0), "login: bob");
}

#[tokio::test]
async fn test_second_read_is_rejected_while_pending() {
    let harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;

    let reader = start_read(session, "login: ", true).await;
    let second = session.read_line("again: ", true).await;
    assert!(matches!(second, Err(SessionError::ReadPending)));

    // The first read is unaffected
    assert_eq!(row(session, 0), "login: ");
    session.key_press(Key::Enter.into()).await.unwrap();
    within(TIMEOUT, reader).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_cancels_pending_read_once() {
    let mut harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;

    let reader = start_read(session, "Password: ", false).await;
    type_text(session, "secret").await;

    session.disconnect().await;
    let result = within(TIMEOUT, reader).await.unwrap().unwrap();
    assert!(matches!(result, Err(SessionError::Cancelled)));
    assert!(!session.is_reading_line());

    // A second disconnect changes nothing
    session.disconnect().await;
    let disconnects = drain(&mut harness.events)
        .into_iter()
        .filter(|event| *event == SessionEvent::Disconnected)
        .count();
    assert_eq!(disconnects, 1);

    // New reads are refused outright
    let late = session.read_line("login: ", true).await;
    assert!(matches!(late, Err(SessionError::Cancelled)));
}

#[tokio::test]
async fn test_resize_redraws_read_at_clamped_start() {
    let mut harness = powered_on(small_config(5, 20)).await;
    let session = &harness.session;
    session.feed("a\r\nb\r\nc\r\nd\r\n").await.unwrap();

    let reader = start_read(session, "> ", true).await;
    type_text(session, "abc").await;
    assert_eq!(row(session, 4), "> abc");
    drain(&mut harness.events);

    session.resize(3, 10).unwrap();
    let snapshot = session.snapshot().unwrap();
    assert_eq!((snapshot.rows, snapshot.columns), (3, 10));
    assert_eq!(snapshot.row_text(2), "> abc");
    assert_eq!((snapshot.cursor_row, snapshot.cursor_column), (2, 5));
    assert_eq!(
        drain(&mut harness.events),
        vec![SessionEvent::Resized {
            rows: 3,
            columns: 10
        }]
    );

    // Editing continues from the redrawn position
    session.key_press(Key::Backspace.into()).await.unwrap();
    assert_eq!(row(session, 2), "> ab");
    session.key_press(Key::Enter.into()).await.unwrap();
    assert_eq!(within(TIMEOUT, reader).await.unwrap().unwrap().unwrap(), "ab");
}

#[tokio::test]
async fn test_read_running_off_the_bottom_keeps_prompt() {
    let harness = powered_on(small_config(3, 10)).await;
    let session = &harness.session;
    session.feed("x\r\ny\r\n").await.unwrap();

    let reader = start_read(session, "> ", true).await;
    // Prompt plus 12 characters spans two rows and scrolls once
    type_text(session, "abcdefghijkl").await;
    assert_eq!(row(session, 1), "> abcdefgh");
    assert_eq!(row(session, 2), "ijkl");

    session.key_press(Key::Backspace.into()).await.unwrap();
    session.key_press(Key::Backspace.into()).await.unwrap();
    session.key_press(Key::Backspace.into()).await.unwrap();
    session.key_press(Key::Backspace.into()).await.unwrap();
    assert_eq!(row(session, 1), "> abcdefgh");
    assert_eq!(row(session, 2), "");

    session.key_press(Key::Enter.into()).await.unwrap();
    assert_eq!(
        within(TIMEOUT, reader).await.unwrap().unwrap().unwrap(),
        "abcdefgh"
    );
}

#[tokio::test]
async fn test_multi_line_prompt_stays_in_place() {
    let harness = powered_on(small_config(10, 40)).await;
    let session = &harness.session;

    let reader = start_read(session, "Banner\r\nPassword: ", false).await;
    type_text(session, "abc").await;

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.row_text(0), "Banner");
    assert_eq!(snapshot.row_text(1), "Password: •••");
    assert_eq!(snapshot.row_text(2), "");
    assert_eq!((snapshot.cursor_row, snapshot.cursor_column), (1, 13));

    session.key_press(Key::Backspace.into()).await.unwrap();
    assert_eq!(row(session, 0), "Banner");
    assert_eq!(row(session, 1), "Password: ••");

    session.key_press(Key::Enter.into()).await.unwrap();
    assert_eq!(within(TIMEOUT, reader).await.unwrap().unwrap().unwrap(), "ab");
}

#[tokio::test]
async fn test_read_wraps_when_remote_disabled_autowrap() {
    let harness = powered_on(small_config(6, 10)).await;
    let session = &harness.session;
    session
        .feed("top\r\nkeep1\r\nkeep2\r\n\x1b[?7l")
        .await
        .unwrap();

    let reader = start_read(session, "Password: ", false).await;
    type_text(session, "ab").await;

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.row_text(0), "top");
    assert_eq!(snapshot.row_text(1), "keep1");
    assert_eq!(snapshot.row_text(2), "keep2");
    assert_eq!(snapshot.row_text(3), "Password:");
    assert_eq!(snapshot.row_text(4), "••");

    session.key_press(Key::Enter.into()).await.unwrap();
    within(TIMEOUT, reader).await.unwrap().unwrap().unwrap();
    assert_eq!(row(session, 2), "keep2");
}

#[tokio::test]
async fn test_prompt_survives_unfinished_remote_sequence() {
    let mut harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;
    session.feed("\x1b]0;half a title").await.unwrap();

    let reader = start_read(session, "login: ", true).await;
    assert_eq!(row(session, 0), "login: ");
    type_text(session, "bob").await;
    assert_eq!(row(session, 0), "login: bob");

    session.key_press(Key::Enter.into()).await.unwrap();
    assert_eq!(within(TIMEOUT, reader).await.unwrap().unwrap().unwrap(), "bob");

    // The remote sequence picks up where it left off
    harness.remote.send("\x07ok".to_string()).await.unwrap();
    wait_until(TIMEOUT, || row(session, 1) == "ok").await.unwrap();
    assert_eq!(row(session, 0), "login: bob");
    assert!(drain(&mut harness.events)
        .contains(&SessionEvent::TitleChanged("half a title".to_string())));
}

#[tokio::test]
async fn test_feed_is_refused_during_read() {
    let harness = powered_on(SessionConfig::ssh()).await;
    let session = &harness.session;

    let reader = start_read(session, "login: ", true).await;
    let fed = session.feed("remote text").await;
    assert!(matches!(fed, Err(SessionError::ReadPending)));
    assert_eq!(session.snapshot().unwrap().text(), "login:");

    session.key_press(Key::Enter.into()).await.unwrap();
    within(TIMEOUT, reader).await.unwrap().unwrap().unwrap();
    session.feed("remote text").await.unwrap();
    assert_eq!(row(session, 1), "remote text");
}
