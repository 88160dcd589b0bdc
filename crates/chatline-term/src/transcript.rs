//! Display lines for transcript entries.
//!
//! Everything here is width-dependent but terminal-agnostic: the painter
//! decides whether the lines get colors.

use chatline_core::render::RenderedResponse;

use crate::callout::callout_lines;
use crate::markdown::render_markdown;
use crate::style::{Style, StyledLine, StyledSpan};
use crate::text::sanitize_for_display;
use crate::wrap::{WrapOptions, wrap_styled_spans};

pub const PROMPT_PREFIX: &str = "you> ";
pub const STREAMING_CURSOR: &str = "▌";

/// Severity of a status notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
    /// Model advisories and other hints.
    Advisory,
}

impl NoticeLevel {
    fn icon(self) -> &'static str {
        match self {
            NoticeLevel::Success => "✓ ",
            NoticeLevel::Error => "✗ ",
            NoticeLevel::Info => "· ",
            NoticeLevel::Advisory => "! ",
        }
    }

    fn style(self) -> Style {
        match self {
            NoticeLevel::Success => Style::NoticeSuccess,
            NoticeLevel::Error => Style::NoticeError,
            NoticeLevel::Info => Style::NoticeInfo,
            NoticeLevel::Advisory => Style::NoticeAdvisory,
        }
    }
}

/// Lines for an assistant response: the markdown body, then callouts.
///
/// While `streaming`, a cursor marks the end of the output. No line
/// is wider than `width`: the cursor moves to its own line when the last
/// line is full.
pub fn assistant_lines(rendered: &RenderedResponse, width: usize, streaming: bool) -> Vec<StyledLine> {
    let mut lines = Vec::new();

    if !rendered.plain_document.trim().is_empty() {
        lines = render_markdown(&rendered.plain_document, width);
    }

    for callout in &rendered.callouts {
        if !lines.is_empty() {
            lines.push(StyledLine::empty());
        }
        lines.extend(callout_lines(callout, width));
    }

    if streaming {
        let cursor = StyledSpan::new(STREAMING_CURSOR, Style::StreamingCursor);
        match lines.last_mut() {
            Some(last)
                if rendered.callouts.is_empty()
                    && (width == 0 || last.width() + cursor.width() <= width) =>
            {
                last.spans.push(cursor);
            }
            _ => lines.push(StyledLine::new(vec![cursor])),
        }
    }

    lines
}

/// Lines for a user message, prefixed like the prompt.
pub fn user_lines(text: &str, width: usize) -> Vec<StyledLine> {
    let opts = WrapOptions::with_prefixes(
        width,
        vec![StyledSpan::new(PROMPT_PREFIX, Style::UserPrefix)],
        vec![StyledSpan::plain(" ".repeat(PROMPT_PREFIX.len()))],
    );
    wrap_styled_spans(&[StyledSpan::new(sanitize_for_display(text), Style::User)], &opts)
}

/// Lines for a one-off status notice.
pub fn notice_lines(level: NoticeLevel, text: &str, width: usize) -> Vec<StyledLine> {
    let style = level.style();
    let opts = WrapOptions::with_prefixes(
        width,
        vec![StyledSpan::new(level.icon(), style)],
        vec![StyledSpan::plain("  ")],
    );
    wrap_styled_spans(&[StyledSpan::new(sanitize_for_display(text), style)], &opts)
}

#[cfg(test)]
mod tests {
    use chatline_core::render::render;

    use super::*;
    use crate::style::Theme;

    fn texts(lines: &[StyledLine]) -> Vec<String> {
        lines.iter().map(StyledLine::text).collect()
    }

    #[test]
    fn test_callouts_trail_the_document() {
        let rendered = render("Intro\n💡 Save often.\nOutro");
        let lines = assistant_lines(&rendered, 40, false);

        assert_eq!(
            texts(&lines),
            vec!["Intro Outro", "", "▌ 💡 Tip", "▌ Save often."]
        );
    }

    #[test]
    fn test_callouts_only() {
        let rendered = render("✅ done\n❗ but check logs");
        let lines = assistant_lines(&rendered, 40, false);
        let text = texts(&lines);

        assert_eq!(text[0], "▌ ✅ Success");
        assert_eq!(text[2], "");
        assert_eq!(text[3], "▌ ❗ Error");
    }

    #[test]
    fn test_streaming_cursor() {
        let lines = assistant_lines(&render("Hel"), 40, true);
        assert_eq!(texts(&lines), vec!["Hel▌"]);
        assert_eq!(lines[0].spans.last().unwrap().style, Style::StreamingCursor);

        let empty = assistant_lines(&render(""), 40, true);
        assert_eq!(texts(&empty), vec![STREAMING_CURSOR]);

        let with_callout = assistant_lines(&render("🔥 hot"), 40, true);
        assert_eq!(texts(&with_callout).last().unwrap(), STREAMING_CURSOR);
    }

    #[test]
    fn test_streaming_cursor_never_overflows_width() {
        let lines = assistant_lines(&render(&"a".repeat(40)), 40, true);
        assert_eq!(texts(&lines), vec!["a".repeat(40), STREAMING_CURSOR.to_string()]);
        assert!(lines.iter().all(|l| l.width() <= 40));

        let lines = assistant_lines(&render(&"a".repeat(39)), 40, true);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width(), 40);
    }

    #[test]
    fn test_escape_sequences_are_not_passed_through() {
        let lines = assistant_lines(&render("hi \x1b[2J\x1b[31mred"), 40, false);
        assert_eq!(texts(&lines), vec!["hi [2J[31mred"]);

        let painted: String = lines.iter().map(|l| Theme::default().paint(l)).collect();
        assert!(!painted.contains("\x1b[2J"));
        assert!(!painted.contains("\x1b[31m"));
    }

    #[test]
    fn test_user_and_notice_text_is_sanitized() {
        assert_eq!(texts(&user_lines("a\tb\x1b[H", 40)), vec!["you> a b[H"]);
        assert_eq!(
            texts(&notice_lines(NoticeLevel::Info, "\x1b]0;title", 40)),
            vec!["· ]0;title"]
        );
    }

        #[test]
    fn test_finished_empty_response_has_no_lines() {
        assert!(assistant_lines(&render(""), 40, false).is_empty());
    }

    #[test]
    fn test_user_lines_prefix() {
        let lines = user_lines("hello there", 40);
        assert_eq!(texts(&lines), vec!["you> hello there"]);
        assert_eq!(lines[0].spans[0].style, Style::UserPrefix);
    }

    #[test]
    fn test_notice_lines() {
        let lines = notice_lines(NoticeLevel::Error, "backend unreachable", 40);
        assert_eq!(texts(&lines), vec!["✗ backend unreachable"]);
        assert!(lines[0].spans.iter().all(|s| s.style == Style::NoticeError));
    }
}
