//! Stream assembly: folds response fragments into one growing buffer.
//!
//! The assembler is the only writer of the in-flight response text. Each
//! fragment is appended verbatim and the observer sees the full buffer
//! right after the append, once per fragment, in arrival order.
//!
//! # Usage
//!
//! ```ignore
//! let assembler = StreamAssembler::new();
//! let token = assembler.cancellation_token();
//! let result = assembler
//!     .consume(fragments, |buffer| painter.paint(&render(buffer)))
//!     .await;
//! ```

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Accumulated text of a single in-flight response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    buffer: String,
    active: bool,
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamState {
    /// Creates an active, empty state.
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            active: true,
        }
    }

    /// Appends a fragment and returns the whole buffer.
    pub fn append(&mut self, fragment: &str) -> &str {
        self.buffer.push_str(fragment);
        &self.buffer
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Ends the stream and hands the buffer to the caller.
    pub fn finish(mut self) -> String {
        self.active = false;
        self.buffer
    }
}

/// How a stream that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The transport signalled end-of-data.
    Completed,
    /// The cancellation token fired before end-of-data.
    Cancelled,
}

/// Final buffer of a stream that ended without a read failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledResponse {
    pub text: String,
    pub end: StreamEnd,
}

impl AssembledResponse {
    pub fn was_cancelled(&self) -> bool {
        self.end == StreamEnd::Cancelled
    }
}

/// A read failure in the middle of a stream.
///
/// `partial` is everything received before the failure.
#[derive(Debug, thiserror::Error)]
#[error("response stream failed after {} bytes: {source}", .partial.len())]
pub struct StreamFailure {
    pub partial: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// Consumes one response stream into a [`StreamState`].
#[derive(Debug, Default)]
pub struct StreamAssembler {
    state: StreamState,
    cancel: CancellationToken,
    fragments: usize,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Creates an assembler that stops when `cancel` fires.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            state: StreamState::new(),
            cancel,
            fragments: 0,
        }
    }

    /// Returns a handle that aborts the stream when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drives `stream` to its end, calling `observer` after every fragment.
    ///
    /// Cancellation is checked before every read, so a token cancelled
    /// from inside the observer prevents any further observer call.
    ///
    /// # Errors
    /// Returns [`StreamFailure`] with the partial buffer when the stream
    /// yields an error.
    pub async fn consume<S, F>(
        mut self,
        stream: S,
        mut observer: F,
    ) -> Result<AssembledResponse, StreamFailure>
    where
        S: Stream<Item = anyhow::Result<String>>,
        F: FnMut(&str),
    {
        let mut stream = std::pin::pin!(stream);

        loop {
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                next = stream.next() => Some(next),
            };

            let Some(next) = read else {
                tracing::debug!(fragments = self.fragments, "response stream cancelled");
                return Ok(self.finish(StreamEnd::Cancelled));
            };

            match next {
                Some(Ok(fragment)) => {
                    self.fragments += 1;
                    tracing::trace!(
                        fragment = self.fragments,
                        bytes = fragment.len(),
                        "fragment received"
                    );
                    observer(self.state.append(&fragment));
                }
                Some(Err(source)) => {
                    let partial = self.state.finish();
                    tracing::warn!(
                        fragments = self.fragments,
                        partial_bytes = partial.len(),
                        error = %source,
                        "response stream failed"
                    );
                    return Err(StreamFailure {
                        partial,
                        source: source.into(),
                    });
                }
                None => {
                    tracing::debug!(
                        fragments = self.fragments,
                        bytes = self.state.buffer().len(),
                        "response stream completed"
                    );
                    return Ok(self.finish(StreamEnd::Completed));
                }
            }
        }
    }

    fn finish(self, end: StreamEnd) -> AssembledResponse {
        AssembledResponse {
            text: self.state.finish(),
            end,
        }
    }
}
