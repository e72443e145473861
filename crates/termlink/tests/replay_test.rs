use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use termlink::cli::replay;
use termlink::render;
use termlink_session::SessionConfig;
use termlink_test_utils::{init_test_logging, strip_ansi, ScreenComparator};

fn capture(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn small_config() -> SessionConfig {
    SessionConfig {
        rows: 4,
        columns: 20,
        ..SessionConfig::ssh()
    }
}

#[tokio::test]
async fn test_replay_renders_final_screen() {
    init_test_logging();
    let file = capture(b"\x1b]2;shell\x07$ ls\r\nsrc  Cargo.toml\r\n$ \x1b[1mdone\x1b[0m");

    let replay = replay(file.path(), small_config()).await.unwrap();
    ScreenComparator::new()
        .compare_rows(&["$ ls", "src  Cargo.toml", "$ done"], &replay.snapshot)
        .unwrap();
    assert_eq!(replay.title.as_deref(), Some("shell"));
    assert!(replay.history.is_empty());
    assert!(replay.snapshot.cell(2, 2).unwrap().attributes.bold);
}

#[tokio::test]
async fn test_replay_collects_history() {
    init_test_logging();
    let lines: Vec<String> = (1..=7).map(|n| format!("line {n}")).collect();
    let file = capture(lines.join("\r\n").as_bytes());

    let replay = replay(file.path(), small_config()).await.unwrap();
    assert_eq!(
        render::plain_text(&replay.history, &replay.snapshot),
        "line 1\nline 2\nline 3\nline 4\nline 5\nline 6\nline 7\n"
    );
    assert_eq!(replay.history.len(), 3);
}

#[tokio::test]
async fn test_replay_handles_split_utf8_and_invalid_bytes() {
    init_test_logging();
    let mut bytes = "┌──┐".as_bytes().to_vec();
    bytes.extend_from_slice(b"\r\nbad \xff byte");
    let file = capture(&bytes);

    let replay = replay(file.path(), small_config()).await.unwrap();
    assert_eq!(replay.snapshot.row_text(0), "┌──┐");
    assert_eq!(replay.snapshot.row_text(1), "bad \u{fffd} byte");
}

#[tokio::test]
async fn test_styled_output_strips_to_plain_text() {
    init_test_logging();
    let file = capture(b"\x1b[32mgreen\x1b[0m and \x1b[4munderlined\x1b[0m");

    let replay = replay(file.path(), small_config()).await.unwrap();
    let mut out = Vec::new();
    render::write_styled(&mut out, &[], &replay.snapshot).unwrap();
    let styled = String::from_utf8(out).unwrap();

    assert_ne!(styled, "green and underlined\n");
    assert_eq!(strip_ansi(&styled), "green and underlined\n");
}

#[tokio::test]
async fn test_replay_missing_file_fails() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let error = replay(&dir.path().join("absent.log"), small_config())
        .await
        .unwrap_err();
    assert!(error.to_string().contains("Failed to open"));
}
