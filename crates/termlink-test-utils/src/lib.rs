pub mod io;
pub mod screen;

pub use io::{RecordingSink, ScriptedSource};
pub use screen::{ScreenComparator, TestScreen};

use std::future::Future;
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("termlink=debug,termlink_session=debug,termlink_terminal=info")
            }))
            .with_test_writer()
            .init();
    });
}

/// Remove escape sequences from terminal output
pub fn strip_ansi(text: &str) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes::strip(text)).into_owned()
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> anyhow::Result<()>
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("Condition not met within {:?}", timeout)
}

/// Await `future`, failing the test after `timeout`
pub async fn within<T>(timeout: Duration, future: impl Future<Output = T>) -> anyhow::Result<T> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| anyhow::anyhow!("Timed out after {:?}", timeout))
}
