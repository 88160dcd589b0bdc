//! Runtime execution modes.
//!
//! - `chat`: interactive line-based REPL
//! - `exec`: one prompt, answer on stdout, notices on stderr
//! - `turn`: one streamed request shared by both

pub mod chat;
pub mod exec;
pub mod turn;

use std::io::{self, IsTerminal, Stdout, Write};

use chatline_core::interrupt;
use chatline_term::{FrameSink, LivePainter, PlainSink, StyledLine, Theme};
use crossterm::cursor::Show;
use crossterm::execute;

const FALLBACK_SIZE: (usize, usize) = (80, 24);

/// Terminal columns and rows, with a fallback when stdout is redirected.
pub fn terminal_size() -> (usize, usize) {
    if !io::stdout().is_terminal() {
        return FALLBACK_SIZE;
    }
    crossterm::terminal::size().map_or(FALLBACK_SIZE, |(cols, rows)| {
        (usize::from(cols), usize::from(rows))
    })
}

/// Output sink for one response on stdout.
///
/// A terminal gets the live painter; anything else only sees the final
/// frame as plain text.
pub fn stdout_sink(theme: Theme) -> Box<dyn FrameSink> {
    if io::stdout().is_terminal() {
        Box::new(TerminalSink {
            painter: LivePainter::new(io::stdout(), theme, terminal_size()),
        })
    } else {
        Box::new(PlainSink::new(io::stdout()))
    }
}

/// Live painter that follows terminal resizes between frames.
struct TerminalSink {
    painter: LivePainter<Stdout>,
}

impl TerminalSink {
    fn refresh_size(&mut self) {
        let (width, height) = terminal_size();
        self.painter.resize(width, height);
    }
}

impl FrameSink for TerminalSink {
    fn paint(&mut self, lines: &[StyledLine]) -> io::Result<()> {
        self.refresh_size();
        self.painter.paint(lines)
    }

    fn finish(&mut self, lines: &[StyledLine]) -> io::Result<()> {
        self.refresh_size();
        self.painter.finish(lines)
    }
}

/// Writes `lines`, with colors when `theme` is given.
pub fn write_lines(out: &mut dyn Write, lines: &[StyledLine], theme: Option<Theme>) -> io::Result<()> {
    for line in lines {
        match theme {
            Some(theme) => writeln!(out, "{}", theme.paint(line))?,
            None => writeln!(out, "{}", line.text().trim_end())?,
        }
    }
    out.flush()
}

/// Makes a forced exit restore the cursor the painter may have hidden.
pub fn install_cursor_restore() {
    interrupt::set_restore_hook(|| {
        let _ = execute!(io::stdout(), Show);
    });
}
