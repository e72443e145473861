//! Input sources and output sinks
//!
//! The session never touches a transport directly; it reads text chunks
//! from an [`InputSource`] and writes replies and key presses to an
//! [`OutputSink`]. Chunks may end in the middle of an escape sequence.

use crate::SessionError;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

const READ_BUFFER_SIZE: usize = 4096;

#[async_trait]
pub trait InputSource: Send {
    /// Next chunk of terminal output; `None` at end of stream
    async fn read_chunk(&mut self) -> Result<Option<String>, SessionError>;
}

#[async_trait]
pub trait OutputSink: Send {
    async fn transmit(&mut self, text: &str) -> Result<(), SessionError>;

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Source fed through an mpsc channel; ends when every sender is dropped
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<String>,
}

/// Create a source and the sender that feeds it
pub fn channel_source(capacity: usize) -> (mpsc::Sender<String>, ChannelSource) {
    let (sender, receiver) = mpsc::channel(capacity);
    (sender, ChannelSource { receiver })
}

#[async_trait]
impl InputSource for ChannelSource {
    async fn read_chunk(&mut self) -> Result<Option<String>, SessionError> {
        Ok(self.receiver.recv().await)
    }
}

/// Sink forwarding every transmission into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<String>,
}

/// Create a sink and the receiver observing what it transmits
pub fn channel_sink() -> (ChannelSink, mpsc::UnboundedReceiver<String>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelSink { sender }, receiver)
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn transmit(&mut self, text: &str) -> Result<(), SessionError> {
        self.sender
            .send(text.to_string())
            .map_err(|_| SessionError::Closed)
    }
}

/// Incremental UTF-8 decoder.
///
/// Holds back an incomplete trailing sequence until the next call. Invalid
/// bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, input: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(input);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = &bytes[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    if let Ok(valid) = std::str::from_utf8(valid) {
                        text.push_str(valid);
                    }
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    /// Flush at end of stream: a dangling partial sequence becomes U+FFFD
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Source decoding text from any byte stream
pub struct ReaderSource<R> {
    reader: R,
    buffer: Vec<u8>,
    decoder: Utf8Decoder,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0u8; READ_BUFFER_SIZE],
            decoder: Utf8Decoder::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> InputSource for ReaderSource<R> {
    async fn read_chunk(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            let n = self.reader.read(&mut self.buffer).await?;
            if n == 0 {
                let tail = self.decoder.finish();
                return Ok((!tail.is_empty()).then_some(tail));
            }

            // A read holding only part of a multi-byte character yields
            // nothing yet
            let text = self.decoder.decode(&self.buffer[..n]);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
}

/// Sink writing UTF-8 text to any byte stream
pub struct WriterSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputSink for WriterSink<W> {
    async fn transmit(&mut self, text: &str) -> Result<(), SessionError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
