//! Byte chunks to text fragments.
//!
//! Chunk boundaries from the transport fall anywhere, including inside a
//! multi-byte UTF-8 sequence. The decoder holds an incomplete tail until
//! the next chunk completes it.

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};

const REPLACEMENT: char = '\u{fffd}';

/// Incremental, lossy UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `pending + chunk` as possible.
    ///
    /// Invalid sequences become U+FFFD; an incomplete trailing sequence is
    /// kept for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::new();
        let mut input = self.pending.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            input = &rest[len..];
                        }
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        let held = input.to_vec();
        self.pending = held;
        out
    }

    /// Flushes held bytes at end of body.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

struct DecodeState<S> {
    inner: std::pin::Pin<Box<S>>,
    decoder: Utf8Decoder,
    done: bool,
}

/// Adapts a byte stream into text fragments.
///
/// Chunks that decode to nothing yield no fragment. The stream ends after
/// the first error.
pub fn decode_stream<S, E>(bytes: S) -> impl Stream<Item = anyhow::Result<String>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<anyhow::Error>,
{
    let state = DecodeState {
        inner: Box::pin(bytes),
        decoder: Utf8Decoder::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        while !state.done {
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let text = state.decoder.decode(&chunk);
                    if !text.is_empty() {
                        return Some((Ok(text), state));
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.done = true;
                    let tail = state.decoder.finish();
                    if !tail.is_empty() {
                        return Some((Ok(tail), state));
                    }
                }
            }
        }
        None
    })
}
