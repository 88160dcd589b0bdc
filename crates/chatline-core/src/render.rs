//! Annotated markdown rendering.
//!
//! Splits a response buffer into the markdown document shown as the main
//! body and the callout lines pulled out of it. Rendering is a pure
//! function of the buffer, so it is safe to re-run after every fragment.

use crate::callout::{CalloutKind, leading_marker};

/// Classification of one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderLine {
    Plain(String),
    Callout { marker: String, text: String },
}

/// Classifies a single line (without its `'\n'`).
///
/// A trailing `'\r'` is dropped first so CRLF bodies classify like LF ones.
pub fn classify_line(line: &str) -> RenderLine {
    let line = line.strip_suffix('\r').unwrap_or(line);
    match leading_marker(line) {
        Some((marker, text)) => RenderLine::Callout {
            marker: marker.to_string(),
            text: text.to_string(),
        },
        None => RenderLine::Plain(line.to_string()),
    }
}

/// A callout lifted out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutBlock {
    pub kind: CalloutKind,
    pub marker: String,
    pub text: String,
    /// Zero-based index of the source line.
    pub line: usize,
}

/// Result of rendering a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedResponse {
    /// Plain lines joined with `'\n'`; callout lines contribute nothing.
    pub plain_document: String,
    /// Callouts in source order.
    pub callouts: Vec<CalloutBlock>,
}

impl RenderedResponse {
    pub fn is_empty(&self) -> bool {
        self.plain_document.is_empty() && self.callouts.is_empty()
    }

    fn from_lines<'a>(lines: impl IntoIterator<Item = &'a RenderLine>) -> Self {
        let mut out = Self::default();
        let mut first_plain = true;

        for (index, line) in lines.into_iter().enumerate() {
            match line {
                RenderLine::Plain(text) => {
                    if !first_plain {
                        out.plain_document.push('\n');
                    }
                    first_plain = false;
                    out.plain_document.push_str(text);
                }
                RenderLine::Callout { marker, text } => out.callouts.push(CalloutBlock {
                    kind: CalloutKind::from_marker(marker),
                    marker: marker.clone(),
                    text: text.clone(),
                    line: index,
                }),
            }
        }

        out
    }
}

/// Renders `buffer` into a plain document and its callouts.
pub fn render(buffer: &str) -> RenderedResponse {
    let lines: Vec<RenderLine> = buffer.split('\n').map(classify_line).collect();
    RenderedResponse::from_lines(&lines)
}

/// Renderer that reuses the classification of completed lines.
///
/// Only the text after the last `'\n'` is re-classified on each update.
/// Output is identical to [`render`] for every buffer.
#[derive(Debug, Default)]
pub struct IncrementalRenderer {
    /// Buffer text up to and including the last classified `'\n'`.
    completed: String,
    lines: Vec<RenderLine>,
}

impl IncrementalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `buffer`, classifying only lines completed since the last call.
    pub fn update(&mut self, buffer: &str) -> RenderedResponse {
        if !buffer.starts_with(&self.completed) {
            tracing::trace!("buffer diverged from cached prefix, re-classifying");
            self.clear();
        }

        let fresh = &buffer[self.completed.len()..];
        let (done, tail) = match fresh.rfind('\n') {
            Some(pos) => (&fresh[..pos], &fresh[pos + 1..]),
            None => ("", fresh),
        };

        if fresh.len() != tail.len() {
            self.lines.extend(done.split('\n').map(classify_line));
            self.completed.push_str(&fresh[..=done.len()]);
        }

        let tail = classify_line(tail);
        RenderedResponse::from_lines(self.lines.iter().chain(std::iter::once(&tail)))
    }

    pub fn clear(&mut self) {
        self.completed.clear();
        self.lines.clear();
    }
}
