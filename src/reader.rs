//! Stream reader: pulls 1-byte frames off an open port, decodes them to text,
//! rewrites line endings and appends the result to the output sink.

use crate::connection::{CloseEvent, ConnectionEvent};
use crate::port::AsyncSerialPortAdapter;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Bytes consumed per read.
pub const FRAME_SIZE: usize = 1;

/// Append-only destination for decoded text.
pub trait OutputSink: Send + Sync {
    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

/// Writes straight to standard output, flushing every chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_text(&self, text: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

/// Collects everything written, for tests and diagnostics.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }
}

impl OutputSink for MemorySink {
    fn write_text(&self, text: &str) -> std::io::Result<()> {
        self.buffer.lock().push_str(text);
        Ok(())
    }
}

/// Incremental UTF-8 decoder with LF -> CRLF rewriting.
///
/// A multi-byte character arriving one frame at a time is held back until
/// complete; invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame, returning whatever text it completes.
    pub fn push(&mut self, frame: &[u8]) -> String {
        self.pending.extend_from_slice(frame);
        let mut text = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid);
                        }
                        None => {
                            // Incomplete trailing sequence: wait for more frames.
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }

        normalize_line_endings(&text)
    }

    /// Give up on a buffered partial character: it decodes to U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }

    /// Whether bytes of an unfinished character are buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Replace every `\n` with `\r\n`. Nothing else is touched.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace('\n', "\r\n")
}

/// Drives one open connection until it closes or fails.
pub struct StreamReader {
    port: Box<dyn AsyncSerialPortAdapter>,
    sink: Arc<dyn OutputSink>,
    decoder: FrameDecoder,
}

impl StreamReader {
    pub fn new(port: Box<dyn AsyncSerialPortAdapter>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            port,
            sink,
            decoder: FrameDecoder::new(),
        }
    }

    /// Read frames until `close` fires, the port reaches end of stream, or a
    /// read fails. The port is dropped (closed) before this returns.
    pub async fn run(mut self, close: CancellationToken) -> ConnectionEvent {
        let path = self.port.name().to_string();
        let mut frame = [0u8; FRAME_SIZE];

        loop {
            let read = tokio::select! {
                biased;
                _ = close.cancelled() => {
                    debug!(path = %path, "Close requested");
                    return ConnectionEvent::Closed(CloseEvent::new(false, "closed on request"));
                }
                read = self.port.read_bytes(&mut frame) => read,
            };

            match read {
                Ok(0) => {
                    self.flush_pending(&path);
                    return ConnectionEvent::Closed(CloseEvent::new(
                        true,
                        "port reached end of stream",
                    ));
                }
                Ok(n) => {
                    trace!(path = %path, bytes = n, "Frame received");
                    let text = self.decoder.push(&frame[..n]);
                    if text.is_empty() {
                        continue;
                    }
                    if let Err(e) = self.sink.write_text(&text) {
                        error!(path = %path, "Failed to write to output: {e}");
                    }
                }
                Err(e) if e.is_transient() => continue,
                Err(e) => {
                    self.flush_pending(&path);
                    return ConnectionEvent::Error(CloseEvent::new(true, e.to_string()));
                }
            }
        }
    }

    /// The stream ended mid-character; emit what was received.
    fn flush_pending(&mut self, path: &str) {
        let text = self.decoder.finish();
        if text.is_empty() {
            return;
        }
        if let Err(e) = self.sink.write_text(&text) {
            error!(path = %path, "Failed to write to output: {e}");
        }
    }
}
