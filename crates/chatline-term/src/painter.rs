//! Inline repainting of a growing response.
//!
//! The painter owns the bottom of the terminal while a response streams.
//! Each frame is diffed against the previous one and only the changed
//! tail is rewritten, so finished lines stay put and never flicker.
//!
//! Cursor movement counts terminal rows, not lines: a line wider than the
//! terminal soft-wraps and occupies several rows.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveToPreviousLine, Show};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

use crate::style::{StyledLine, Theme};

/// Minimum interval between two unforced repaints (~60 fps).
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Receives successive frames of one response.
pub trait FrameSink {
    /// Offers an intermediate frame. Sinks may skip it.
    ///
    /// # Errors
    /// Returns an error if writing to the terminal fails.
    fn paint(&mut self, lines: &[StyledLine]) -> io::Result<()>;

    /// Shows the final frame and releases the output for other text.
    ///
    /// # Errors
    /// Returns an error if writing to the terminal fails.
    fn finish(&mut self, lines: &[StyledLine]) -> io::Result<()>;
}

/// Repaints frames in place using cursor movement.
pub struct LivePainter<W: Write> {
    out: W,
    theme: Theme,
    /// Terminal columns.
    width: usize,
    /// Terminal rows; lines further up than this cannot be reached.
    height: usize,
    painted: Vec<StyledLine>,
    last_paint: Option<Instant>,
    cursor_hidden: bool,
}

impl<W: Write> LivePainter<W> {
    /// Creates a painter for a terminal of `(columns, rows)`.
    pub fn new(out: W, theme: Theme, (width, height): (usize, usize)) -> Self {
        Self {
            out,
            theme,
            width,
            height: height.max(2),
            painted: Vec::new(),
            last_paint: None,
            cursor_hidden: false,
        }
    }

    /// Paints `lines`, skipping the frame if the previous one was painted
    /// less than [`FRAME_DURATION`] ago and `force` is false.
    ///
    /// Returns whether anything was written.
    ///
    /// # Errors
    /// Returns an error if writing to the terminal fails.
    pub fn paint_frame(&mut self, lines: &[StyledLine], force: bool) -> io::Result<bool> {
        if !force
            && self
                .last_paint
                .is_some_and(|at| at.elapsed() < FRAME_DURATION)
        {
            return Ok(false);
        }

        let common = self
            .painted
            .iter()
            .zip(lines)
            .take_while(|(old, new)| old == new)
            .count();
        if common == self.painted.len() && common == lines.len() {
            self.last_paint = Some(Instant::now());
            return Ok(false);
        }

        // Rows that scrolled out of view are frozen.
        let frozen = self.first_reachable();
        let start = common.max(frozen);
        let up: usize = self.painted[start..].iter().map(|l| self.rows(l)).sum();

        if !self.cursor_hidden {
            queue!(self.out, Hide)?;
            self.cursor_hidden = true;
        }
        if up > 0 {
            let up = u16::try_from(up).unwrap_or(u16::MAX);
            queue!(self.out, MoveToPreviousLine(up))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        for line in lines.iter().skip(start) {
            queue!(self.out, Print(self.theme.paint(line)), Print("\n"))?;
        }
        self.out.flush()?;

        tracing::trace!(
            lines = lines.len(),
            rewritten = lines.len().saturating_sub(start),
            frozen,
            "frame painted"
        );
        self.painted = lines.to_vec();
        self.last_paint = Some(Instant::now());
        Ok(true)
    }

    /// Updates the terminal size used for row accounting.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height.max(2);
    }

    /// Rows `line` occupies once the terminal wraps it.
    fn rows(&self, line: &StyledLine) -> usize {
        if self.width == 0 {
            return 1;
        }
        line.width().div_ceil(self.width).max(1)
    }

    /// Index of the first painted line the cursor can still move back to.
    fn first_reachable(&self) -> usize {
        let reachable = self.height - 1;
        let mut rows = 0;
        for (index, line) in self.painted.iter().enumerate().rev() {
            rows += self.rows(line);
            if rows > reachable {
                return index + 1;
            }
        }
        0
    }

    /// Forgets the last frame so the next paint starts below it.
    pub fn reset(&mut self) {
        self.painted.clear();
        self.last_paint = None;
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for LivePainter<W> {
    fn paint(&mut self, lines: &[StyledLine]) -> io::Result<()> {
        self.paint_frame(lines, false).map(|_| ())
    }

    fn finish(&mut self, lines: &[StyledLine]) -> io::Result<()> {
        self.paint_frame(lines, true)?;
        if self.cursor_hidden {
            queue!(self.out, Show)?;
            self.cursor_hidden = false;
        }
        self.out.flush()?;
        self.reset();
        Ok(())
    }
}

/// Writes only the final frame, as plain text.
///
/// Used when stdout is not a terminal.
pub struct PlainSink<W: Write> {
    out: W,
}

impl<W: Write> PlainSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for PlainSink<W> {
    fn paint(&mut self, _lines: &[StyledLine]) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, lines: &[StyledLine]) -> io::Result<()> {
        for line in lines {
            writeln!(self.out, "{}", line.text().trim_end())?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use crate::style::Style;

    use super::*;

    fn frame(lines: &[&str]) -> Vec<StyledLine> {
        lines
            .iter()
            .map(|l| StyledLine::single(*l, Style::Plain))
            .collect()
    }

    fn output(painter: LivePainter<Vec<u8>>) -> String {
        String::from_utf8(painter.into_inner()).unwrap()
    }

    #[test]
    fn test_first_frame_prints_all_lines() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (80, 24));
        assert!(painter.paint_frame(&frame(&["a", "b"]), true).unwrap());

        let out = output(painter);
        assert!(out.contains("a\nb\n"));
        // Nothing painted yet, so no upward movement.
        assert!(!out.contains("\u{1b}[1F"));
    }

    #[test]
    fn test_only_changed_tail_is_rewritten() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (80, 24));
        painter.paint_frame(&frame(&["keep", "old"]), true).unwrap();
        let before = painter.out.len();

        painter
            .paint_frame(&frame(&["keep", "new", "more"]), true)
            .unwrap();
        let out = output(painter);
        let second = &out[before..];

        assert!(second.contains("\u{1b}[1F"));
        assert!(second.contains("new\nmore\n"));
        assert!(!second.contains("keep"));
    }

    #[test]
    fn test_identical_frame_writes_nothing() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (80, 24));
        painter.paint_frame(&frame(&["same"]), true).unwrap();
        let before = painter.out.len();

        assert!(!painter.paint_frame(&frame(&["same"]), true).unwrap());
        assert_eq!(painter.out.len(), before);
    }

    #[test]
    fn test_unforced_frames_are_coalesced() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (80, 24));
        assert!(painter.paint_frame(&frame(&["a"]), false).unwrap());
        assert!(!painter.paint_frame(&frame(&["ab"]), false).unwrap());
        assert!(painter.paint_frame(&frame(&["abc"]), true).unwrap());
    }

    #[test]
    fn test_scrolled_lines_are_frozen() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (80, 3));
        painter
            .paint_frame(&frame(&["1", "2", "3", "4"]), true)
            .unwrap();
        let before = painter.out.len();

        // Line "1" changed but it is out of reach; only rows from index 2
        // can be rewritten on a 3-row terminal.
        painter
            .paint_frame(&frame(&["X", "2", "3", "5"]), true)
            .unwrap();
        let out = output(painter);
        let second = &out[before..];

        assert!(second.contains("\u{1b}[2F"));
        assert!(second.contains("3\n5\n"));
        assert!(!second.contains('X'));
    }

    #[test]
    fn test_full_width_line_is_one_row() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (4, 24));
        painter.paint_frame(&frame(&["x", "abcd"]), true).unwrap();
        let before = painter.out.len();

        painter.paint_frame(&frame(&["y", "abcd"]), true).unwrap();
        let out = output(painter);
        let second = &out[before..];

        assert!(second.contains("\u{1b}[2F"));
        assert!(!second.contains("\u{1b}[3F"));
        assert!(second.contains("y\nabcd\n"));
    }

    #[test]
    fn test_soft_wrapped_line_counts_every_row() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (4, 24));
        painter
            .paint_frame(&frame(&["top", "abcdefghi"]), true)
            .unwrap();
        let before = painter.out.len();

        painter.paint_frame(&frame(&["top", "z"]), true).unwrap();
        let out = output(painter);
        let second = &out[before..];

        // "abcdefghi" took three rows on a 4-column terminal.
        assert!(second.contains("\u{1b}[3F"));
        assert!(!second.contains("top"));
    }

    #[test]
    fn test_wrapped_rows_count_toward_frozen_region() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (4, 3));
        painter
            .paint_frame(&frame(&["a", "bbbbbb", "c"]), true)
            .unwrap();
        let before = painter.out.len();

        // Only "c" fits in the two reachable rows; "bbbbbb" spans two.
        painter
            .paint_frame(&frame(&["a", "BBBBBB", "d"]), true)
            .unwrap();
        let out = output(painter);
        let second = &out[before..];

        assert!(second.contains("\u{1b}[1F"));
        assert!(second.contains("d\n"));
        assert!(!second.contains('B'));
    }

    #[test]
    fn test_resize_changes_reachable_rows() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (80, 3));
        painter
            .paint_frame(&frame(&["1", "2", "3", "4"]), true)
            .unwrap();
        painter.resize(80, 24);
        let before = painter.out.len();

        painter
            .paint_frame(&frame(&["X", "2", "3", "4"]), true)
            .unwrap();
        let out = output(painter);
        let second = &out[before..];

        assert!(second.contains("\u{1b}[4F"));
        assert!(second.contains("X\n2\n3\n4\n"));
    }

    #[test]
    fn test_finish_resets_for_next_response() {
        let mut painter = LivePainter::new(Vec::new(), Theme::default(), (80, 24));
        painter.paint(&frame(&["first"])).unwrap();
        painter.finish(&frame(&["first", "done"])).unwrap();
        let before = painter.out.len();

        painter.paint_frame(&frame(&["second"]), true).unwrap();
        let out = output(painter);
        assert!(!out[before..].contains("\u{1b}[1F"));
        assert!(out.contains("\u{1b}[?25h"));
    }

    #[test]
    fn test_plain_sink_writes_final_frame_only() {
        let mut sink = PlainSink::new(Vec::new());
        sink.paint(&frame(&["partial"])).unwrap();
        sink.finish(&frame(&["final", "answer"])).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "final\nanswer\n");
    }
}
