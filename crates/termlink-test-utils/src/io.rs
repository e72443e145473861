use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use termlink_session::{InputSource, OutputSink, SessionError};
use tokio::sync::Mutex;

/// Source replaying fixed chunks, then either ending or staying open
#[derive(Debug)]
pub struct ScriptedSource {
    chunks: VecDeque<String>,
    hang_at_end: bool,
}

impl ScriptedSource {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            hang_at_end: false,
        }
    }

    /// Never report end of stream once the chunks run out
    pub fn then_hang(mut self) -> Self {
        self.hang_at_end = true;
        self
    }
}

#[async_trait]
impl InputSource for ScriptedSource {
    async fn read_chunk(&mut self) -> Result<Option<String>, SessionError> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.hang_at_end => std::future::pending().await,
            None => Ok(None),
        }
    }
}

/// Sink remembering everything transmitted. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    transmitted: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transmitted(&self) -> Vec<String> {
        self.transmitted.lock().await.clone()
    }

    pub async fn joined(&self) -> String {
        self.transmitted.lock().await.concat()
    }

    /// Everything transmitted with escape sequences removed
    pub async fn plain_text(&self) -> String {
        crate::strip_ansi(&self.joined().await)
    }

    pub async fn is_closed(&self) -> bool {
        *self.closed.lock().await
    }

    pub async fn clear(&self) {
        self.transmitted.lock().await.clear();
    }

    pub async fn wait_for(&self, needle: &str, timeout: Duration) -> Result<String> {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            let joined = self.joined().await;
            if joined.contains(needle) {
                return Ok(joined);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        anyhow::bail!("Timeout waiting for transmission of {:?}", needle)
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn transmit(&mut self, text: &str) -> Result<(), SessionError> {
        if *self.closed.lock().await {
            return Err(SessionError::Closed);
        }
        self.transmitted.lock().await.push(text.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        *self.closed.lock().await = true;
        Ok(())
    }
}
