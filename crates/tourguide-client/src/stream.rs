//! Streaming answer consumption.
//!
//! Chunks are decoded with a UTF-8 decoder that carries incomplete sequences
//! over to the next chunk, appended to one growing buffer, and the whole
//! buffer is re-parsed after every chunk. Each parse yields the complete
//! current display state, never a delta, so the caller replaces the rendered
//! turn wholesale and a marker split across chunks resolves itself once the
//! rest of it arrives.

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tourguide_core::framing::{self, Frame, SOURCES_MARKER};

use crate::error::{ClientError, Result};

// =============================================================================
// UTF-8 Chunk Decoder
// =============================================================================

/// Incremental UTF-8 decoder for arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decode as much of `pending + chunk` as possible.
    ///
    /// A trailing incomplete sequence is held back; invalid bytes become
    /// U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    /// Flush whatever is still held back at end of stream.
    pub fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }

    /// Number of bytes waiting for the rest of their character.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Receiving side of an exchange cancellation flag.
///
/// Cancelling a stream is equivalent to the stream ending: the consumer stops
/// reading and finalizes what it has.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// Wrap a watch receiver; `true` means cancelled.
    #[must_use]
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self(rx)
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once cancellation is requested. Never resolves if the sender
    /// is gone without cancelling.
    pub async fn cancelled(&mut self) {
        if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Stream Consumer
// =============================================================================

/// Accumulates one exchange's streamed body.
#[derive(Debug, Default)]
pub struct StreamConsumer {
    buffer: String,
    marker_seen: bool,
    decoder: Utf8ChunkDecoder,
    chunks: usize,
}

impl StreamConsumer {
    /// Create an empty consumer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk and return the display state of the whole buffer.
    pub fn push(&mut self, chunk: &[u8]) -> Frame {
        self.chunks += 1;
        let text = self.decoder.decode(chunk);
        self.buffer.push_str(&text);

        if !self.marker_seen && self.buffer.contains(SOURCES_MARKER) {
            self.marker_seen = true;
            tracing::debug!(chunks = self.chunks, "Citation trailer started");
        }

        framing::parse(&self.buffer)
    }

    /// End of stream: flush the decoder, re-parse, trim, apply the fallback.
    #[must_use]
    pub fn finish(mut self) -> Frame {
        let tail = self.decoder.finish();
        self.buffer.push_str(&tail);
        framing::parse(&self.buffer).finalize()
    }

    /// Everything decoded so far.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether the citation marker has appeared in the buffer.
    #[must_use]
    pub fn marker_seen(&self) -> bool {
        self.marker_seen
    }

    /// Consume `body` to the end, calling `on_frame` after every chunk.
    ///
    /// Chunks are read strictly in order. Cancellation via `cancel` is
    /// treated as end of stream.
    ///
    /// # Errors
    ///
    /// Returns the first body read error, or the first error from `on_frame`.
    pub async fn drive<S, B, E, F>(
        mut self,
        body: S,
        mut cancel: Option<CancelSignal>,
        mut on_frame: F,
    ) -> Result<Frame>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<ClientError>,
        F: FnMut(&Frame) -> Result<()>,
    {
        let mut body = std::pin::pin!(body);

        loop {
            let next = match cancel.as_mut() {
                Some(signal) => tokio::select! {
                    biased;
                    () = signal.cancelled() => {
                        tracing::info!(chunks = self.chunks, "Stream cancelled, finalizing");
                        None
                    }
                    chunk = body.next() => chunk,
                },
                None => body.next().await,
            };

            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(Into::<ClientError>::into)?;
            let frame = self.push(chunk.as_ref());
            tracing::debug!(
                chunk = self.chunks,
                bytes = chunk.as_ref().len(),
                text_len = frame.text.len(),
                "Stream chunk decoded"
            );
            on_frame(&frame)?;
        }

        Ok(self.finish())
    }
}
