//! # Stream Decoder
//!
//! Turns the raw byte stream of the generation service into ordered text deltas.
//!
//! ## Wire format
//!
//! ```text
//! 0:"Hel"          → delta "Hel"
//! 0:"lo\u00e9"     → delta "loé"
//! e:{"finish":..}  → ignored (unknown prefix)
//! 0:not-json       → dropped, decoding continues
//! ```
//!
//! Byte buffers may split a line (or a UTF-8 code point) anywhere. Only text up
//! to the last newline is parsed; the tail waits for the next buffer. Decoding a
//! stream in one buffer or in any number of pieces yields the same deltas.
//!
//! Lines are split on raw `\n`, not on JSON string boundaries. A producer that
//! emits a raw newline inside a payload breaks that payload in two.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio_stream::Stream;

use crate::errors::{DecodeError, TransportError};

/// Prefix marking a text-delta line
pub const DELTA_PREFIX: &str = "0:";

/// Incremental line decoder
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Decoded text after the last newline seen so far
    buffer: String,

    /// Leading bytes of a code point cut off by a buffer boundary
    pending: Vec<u8>,

    /// Number of `0:` lines dropped because their payload was malformed
    skipped: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte buffer, returning the deltas completed by it
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.decode_utf8(bytes);

        let Some(boundary) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(boundary + 1);
        let processable = std::mem::replace(&mut self.buffer, rest);
        self.parse_lines(&processable)
    }

    /// Flush whatever is buffered at end of stream.
    ///
    /// The last line does not need a trailing newline. An incomplete code point
    /// left over becomes U+FFFD.
    pub fn finish(&mut self) -> Vec<String> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let remaining = std::mem::take(&mut self.buffer);
        self.parse_lines(&remaining)
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes or text still waiting for a newline or more input
    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty() || !self.pending.is_empty()
    }

    fn decode_utf8(&mut self, bytes: &[u8]) {
        let joined;
        let mut rest: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut pending = std::mem::take(&mut self.pending);
            pending.extend_from_slice(bytes);
            joined = pending;
            &joined
        };

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    return;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            self.pending = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn parse_lines(&mut self, text: &str) -> Vec<String> {
        let mut deltas = Vec::new();
        for line in text.split('\n') {
            match decode_line(line) {
                Some(Ok(delta)) => deltas.push(delta),
                Some(Err(err)) => {
                    self.skipped += 1;
                    tracing::debug!(error = %err, "dropping malformed delta line");
                }
                None => {}
            }
        }
        deltas
    }
}

/// Decode a single line.
///
/// Returns `None` for lines without the `0:` prefix.
pub fn decode_line(line: &str) -> Option<Result<String, DecodeError>> {
    let payload = line.strip_prefix(DELTA_PREFIX)?;
    Some(
        serde_json::from_str::<String>(payload).map_err(|source| DecodeError {
            line: line.to_string(),
            source,
        }),
    )
}

/// Decode a complete, already-buffered stream
pub fn decode_all<I, B>(chunks: I) -> Vec<String>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut decoder = StreamDecoder::new();
    let mut deltas = Vec::new();
    for chunk in chunks {
        deltas.extend(decoder.push(chunk.as_ref()));
    }
    deltas.extend(decoder.finish());
    deltas
}

/// Lazy delta sequence over a byte stream.
///
/// Yields every delta in arrival order. When the byte stream ends or fails,
/// buffered text is flushed first, then the transport error (if any) is yielded,
/// then the stream terminates for good.
pub struct DeltaStream<S> {
    inner: S,
    decoder: StreamDecoder,
    ready: VecDeque<String>,
    error: Option<TransportError>,
    finished: bool,
}

impl<S> DeltaStream<S>
where
    S: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: StreamDecoder::new(),
            ready: VecDeque::new(),
            error: None,
            finished: false,
        }
    }

    /// Stop reading the byte stream and flush what is buffered.
    ///
    /// Deltas already decoded are still yielded; nothing after them is.
    pub fn close(&mut self) {
        if !self.finished {
            self.finish();
        }
    }

    pub fn skipped(&self) -> usize {
        self.decoder.skipped()
    }

    fn finish(&mut self) {
        self.finished = true;
        self.ready.extend(self.decoder.finish());
    }
}

impl<S> Stream for DeltaStream<S>
where
    S: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin,
{
    type Item = Result<String, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(delta) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }
            if this.finished {
                return Poll::Ready(this.error.take().map(Err));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => {
                    let deltas = this.decoder.push(&bytes);
                    this.ready.extend(deltas);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.error = Some(err);
                    this.finish();
                }
                Poll::Ready(None) => this.finish(),
            }
        }
    }
}
