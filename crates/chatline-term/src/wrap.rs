//! Word wrapping for styled spans.
//!
//! Prose collapses whitespace runs and breaks between words. Code spans
//! keep their whitespace and break by display width only. A `'\n'` in any
//! span forces a line break.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::style::{Style, StyledLine, StyledSpan};

/// Width and hanging-indent prefixes for [`wrap_styled_spans`].
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    /// Maximum display width; 0 disables wrapping.
    pub width: usize,
    /// Spans placed before the first line (e.g. a list bullet).
    pub first_prefix: Vec<StyledSpan>,
    /// Spans placed before every continuation line.
    pub rest_prefix: Vec<StyledSpan>,
}

impl WrapOptions {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            first_prefix: vec![],
            rest_prefix: vec![],
        }
    }

    pub fn with_prefixes(
        width: usize,
        first_prefix: Vec<StyledSpan>,
        rest_prefix: Vec<StyledSpan>,
    ) -> Self {
        Self {
            width,
            first_prefix,
            rest_prefix,
        }
    }
}

fn prefix_width(prefix: &[StyledSpan]) -> usize {
    prefix.iter().map(StyledSpan::width).sum()
}

enum Atom<'a> {
    Word(&'a str, Style),
    Space(Style),
    Break,
}

fn atoms(spans: &[StyledSpan]) -> Vec<Atom<'_>> {
    let mut out = Vec::new();
    for span in spans {
        for (i, part) in span.text.split('\n').enumerate() {
            if i > 0 {
                out.push(Atom::Break);
            }
            if span.style.preserves_whitespace() {
                if !part.is_empty() {
                    out.push(Atom::Word(part, span.style));
                }
                continue;
            }
            let mut rest = part;
            while !rest.is_empty() {
                let split = rest.find(char::is_whitespace).unwrap_or(rest.len());
                if split == 0 {
                    let word_start = rest
                        .find(|c: char| !c.is_whitespace())
                        .unwrap_or(rest.len());
                    out.push(Atom::Space(span.style));
                    rest = &rest[word_start..];
                } else {
                    out.push(Atom::Word(&rest[..split], span.style));
                    rest = &rest[split..];
                }
            }
        }
    }
    out
}

struct LineBuilder<'a> {
    opts: &'a WrapOptions,
    lines: Vec<StyledLine>,
    spans: Vec<StyledSpan>,
    used: usize,
    pending_space: Option<Style>,
}

impl<'a> LineBuilder<'a> {
    fn new(opts: &'a WrapOptions) -> Self {
        Self {
            opts,
            lines: Vec::new(),
            spans: Vec::new(),
            used: 0,
            pending_space: None,
        }
    }

    fn on_first_line(&self) -> bool {
        self.lines.is_empty()
    }

    /// Content width available on the current line.
    fn avail(&self) -> usize {
        if self.opts.width == 0 {
            return usize::MAX;
        }
        let prefix = if self.on_first_line() {
            &self.opts.first_prefix
        } else {
            &self.opts.rest_prefix
        };
        self.opts.width.saturating_sub(prefix_width(prefix)).max(1)
    }

    fn push_text(&mut self, text: &str, style: Style) {
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(StyledSpan::new(text, style)),
        }
        self.used += text.width();
    }

    fn flush(&mut self) {
        let prefix = if self.on_first_line() {
            &self.opts.first_prefix
        } else {
            &self.opts.rest_prefix
        };
        let mut spans: Vec<StyledSpan> = prefix
            .iter()
            .filter(|s| !s.text.is_empty())
            .cloned()
            .collect();
        spans.append(&mut self.spans);
        self.lines.push(StyledLine { spans });
        self.used = 0;
        self.pending_space = None;
    }

    fn space(&mut self, style: Style) {
        if self.used > 0 {
            self.pending_space = Some(style);
        }
    }

    fn word(&mut self, word: &str, style: Style) {
        let width = word.width();
        let gap = usize::from(self.pending_space.is_some());

        if self.used + gap + width <= self.avail() {
            if let Some(space_style) = self.pending_space.take() {
                self.push_text(" ", space_style);
            }
            self.push_text(word, style);
            return;
        }

        if self.used > 0 {
            self.flush();
            if width <= self.avail() {
                self.push_text(word, style);
                return;
            }
        }

        // Longer than a whole line: hard-break by display width.
        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if ch_width > 0 && self.used + ch_width > self.avail() && self.used > 0 {
                self.flush();
            }
            let mut buf = [0u8; 4];
            self.push_text(ch.encode_utf8(&mut buf), style);
        }
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if !self.spans.is_empty() || self.lines.is_empty() {
            self.flush();
        }
        self.lines
    }
}

/// Wraps `spans` to `opts.width`, keeping each span's style.
///
/// Always returns at least one line (carrying the first prefix).
pub fn wrap_styled_spans(spans: &[StyledSpan], opts: &WrapOptions) -> Vec<StyledLine> {
    let mut builder = LineBuilder::new(opts);

    for atom in atoms(spans) {
        match atom {
            Atom::Word(word, style) => builder.word(word, style),
            Atom::Space(style) => builder.space(style),
            Atom::Break => builder.flush(),
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[StyledLine]) -> Vec<String> {
        lines.iter().map(StyledLine::text).collect()
    }

    #[test]
    fn test_fits_on_one_line() {
        let spans = vec![StyledSpan::new("hello world", Style::Assistant)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));

        assert_eq!(texts(&lines), vec!["hello world"]);
        assert_eq!(lines[0].spans.len(), 1);
        assert_eq!(lines[0].spans[0].style, Style::Assistant);
    }

    #[test]
    fn test_breaks_between_words() {
        let spans = vec![StyledSpan::new("hello world", Style::Assistant)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(8));
        assert_eq!(texts(&lines), vec!["hello", "world"]);
    }

    #[test]
    fn test_style_survives_break() {
        let spans = vec![
            StyledSpan::new("hello ", Style::Assistant),
            StyledSpan::new("world", Style::Strong),
        ];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(8));

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans, vec![StyledSpan::new("world", Style::Strong)]);
    }

    #[test]
    fn test_collapses_prose_whitespace() {
        let spans = vec![StyledSpan::new("  a \t  b  ", Style::Plain)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(texts(&lines), vec!["a b"]);
    }

    #[test]
    fn test_code_keeps_whitespace() {
        let spans = vec![StyledSpan::new("foo  bar", Style::CodeInline)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(lines[0].spans[0].text, "foo  bar");
    }

    #[test]
    fn test_hard_break() {
        let spans = vec![StyledSpan::new("line1\nline2", Style::Assistant)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(texts(&lines), vec!["line1", "line2"]);
    }

    #[test]
    fn test_hanging_indent() {
        let spans = vec![StyledSpan::new(
            "this is a longer text that should wrap",
            Style::Assistant,
        )];
        let opts = WrapOptions::with_prefixes(
            20,
            vec![StyledSpan::new("• ", Style::ListBullet)],
            vec![StyledSpan::plain("  ")],
        );
        let lines = wrap_styled_spans(&spans, &opts);

        assert!(lines.len() > 1);
        assert_eq!(lines[0].spans[0].text, "• ");
        for line in &lines[1..] {
            assert_eq!(line.spans[0].text, "  ");
        }
        assert!(lines.iter().all(|l| l.width() <= 20));
    }

    #[test]
    fn test_long_word_is_split_by_width() {
        let spans = vec![StyledSpan::new("abcdefghij", Style::Plain)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(4));
        assert_eq!(texts(&lines), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wide_chars_respect_width() {
        let spans = vec![StyledSpan::new("漢字漢字漢字", Style::Plain)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(5));
        assert!(lines.iter().all(|l| l.width() <= 5));
        assert_eq!(lines.iter().map(StyledLine::text).collect::<String>(), "漢字漢字漢字");
    }

    #[test]
    fn test_zero_width_disables_wrapping() {
        let spans = vec![StyledSpan::new("a very long line of words", Style::Plain)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(0));
        assert_eq!(texts(&lines), vec!["a very long line of words"]);
    }

    #[test]
    fn test_empty_input_yields_prefix_line() {
        let opts = WrapOptions::with_prefixes(10, vec![StyledSpan::plain("> ")], vec![]);
        let lines = wrap_styled_spans(&[], &opts);
        assert_eq!(texts(&lines), vec!["> "]);
    }
}
