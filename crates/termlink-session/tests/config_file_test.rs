use pretty_assertions::assert_eq;
use std::io::Write;
use termlink_session::{Profile, SessionConfig, SessionError, TerminalSession};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_profile_with_overrides() {
    let file = write_config(
        r#"
        profile = "telnet"
        rows = 30
        columns = 100
        scrollback_lines = 0
        "#,
    );

    let config = SessionConfig::load(file.path()).unwrap();
    assert_eq!(
        config,
        SessionConfig {
            rows: 30,
            columns: 100,
            scrollback_lines: 0,
            ..SessionConfig::for_profile(Profile::Telnet)
        }
    );

    let (session, _events) = TerminalSession::new(config).unwrap();
    let snapshot = session.snapshot().unwrap();
    assert_eq!((snapshot.rows, snapshot.columns), (30, 100));
}

#[test]
fn test_saved_config_loads_back() {
    let config = SessionConfig {
        backspace: "\x08".to_string(),
        ..SessionConfig::ssh()
    };
    let file = write_config(&config.to_toml_string().unwrap());
    assert_eq!(SessionConfig::load(file.path()).unwrap(), config);
}

#[test]
fn test_missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = SessionConfig::load(dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(SessionError::Config(_))));

    let file = write_config("rows = \"many\"");
    assert!(matches!(
        SessionConfig::load(file.path()),
        Err(SessionError::Config(_))
    ));

    let file = write_config("written_newline = \"\"");
    assert!(matches!(
        SessionConfig::load(file.path()),
        Err(SessionError::Config(_))
    ));
}
