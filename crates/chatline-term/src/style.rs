//! Styled text model and color themes.
//!
//! Rendering code produces `StyledLine`s tagged with semantic [`Style`]s.
//! A [`Theme`] turns those into terminal colors only when painting, so
//! the same lines can be printed plain when stdout is not a terminal.

use std::fmt::Write as _;

use chatline_core::callout::CalloutKind;
use chatline_core::config::ThemeKind;
use crossterm::style::{Attribute, Color, ContentStyle};
use unicode_width::UnicodeWidthStr;

/// Semantic style identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// No styling.
    Plain,
    /// User message prefix ("you> ").
    UserPrefix,
    User,
    Assistant,
    StreamingCursor,

    // Markdown
    CodeInline,
    CodeBlock,
    CodeFence,
    Emphasis,
    Strong,
    Strikethrough,
    H1,
    H2,
    H3,
    Link,
    LinkUrl,
    BlockQuote,
    ListBullet,
    ListNumber,
    Rule,
    TableBorder,
    TableHeader,

    // Callouts
    CalloutTip,
    CalloutWarning,
    CalloutCritical,
    CalloutSuccess,
    CalloutError,
    CalloutInfo,
    CalloutBody,

    // Status notices
    NoticeSuccess,
    NoticeError,
    NoticeInfo,
    NoticeAdvisory,
}

impl Style {
    /// Header/border style for a callout kind.
    pub fn callout(kind: CalloutKind) -> Self {
        match kind {
            CalloutKind::Tip => Style::CalloutTip,
            CalloutKind::Warning => Style::CalloutWarning,
            CalloutKind::Critical => Style::CalloutCritical,
            CalloutKind::Success => Style::CalloutSuccess,
            CalloutKind::Error => Style::CalloutError,
            CalloutKind::Info => Style::CalloutInfo,
        }
    }

    fn is_code(self) -> bool {
        matches!(self, Style::CodeInline | Style::CodeBlock)
    }

    /// Whether the wrapper must keep this span's whitespace verbatim.
    pub(crate) fn preserves_whitespace(self) -> bool {
        self.is_code()
    }
}

/// A run of text with one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::Plain)
    }

    pub fn width(&self) -> usize {
        self.text.width()
    }
}

/// One display line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn empty() -> Self {
        StyledLine { spans: vec![] }
    }

    pub fn new(spans: Vec<StyledSpan>) -> Self {
        StyledLine { spans }
    }

    /// A line holding a single span.
    pub fn single(text: impl Into<String>, style: Style) -> Self {
        StyledLine {
            spans: vec![StyledSpan::new(text, style)],
        }
    }

    /// Concatenated text without styling.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn width(&self) -> usize {
        self.spans.iter().map(StyledSpan::width).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }
}

/// Maps semantic styles to terminal styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    kind: ThemeKind,
}

impl From<ThemeKind> for Theme {
    fn from(kind: ThemeKind) -> Self {
        Self { kind }
    }
}

fn fg(color: Color) -> ContentStyle {
    ContentStyle {
        foreground_color: Some(color),
        ..ContentStyle::default()
    }
}

fn attrs(mut style: ContentStyle, attributes: &[Attribute]) -> ContentStyle {
    for attribute in attributes {
        style.attributes.set(*attribute);
    }
    style
}

impl Theme {
    pub fn new(kind: ThemeKind) -> Self {
        Self { kind }
    }

    pub fn kind(self) -> ThemeKind {
        self.kind
    }

    /// Switches between dark and light.
    pub fn toggle(&mut self) {
        self.kind = self.kind.toggled();
    }

    /// Terminal style for `style` in this theme.
    pub fn content_style(self, style: Style) -> ContentStyle {
        match self.kind {
            ThemeKind::Dark => dark(style),
            ThemeKind::Light => light(style),
        }
    }

    /// Renders a line with ANSI styling.
    pub fn paint(self, line: &StyledLine) -> String {
        let mut out = String::new();
        for span in &line.spans {
            if span.style == Style::Plain {
                out.push_str(&span.text);
            } else {
                let _ = write!(out, "{}", self.content_style(span.style).apply(&span.text));
            }
        }
        out
    }
}

fn dark(style: Style) -> ContentStyle {
    use Attribute::{Bold, CrossedOut, Dim, Italic, SlowBlink, Underlined};

    match style {
        Style::Plain | Style::Assistant | Style::CalloutBody => ContentStyle::default(),
        Style::UserPrefix => attrs(fg(Color::Blue), &[Bold]),
        Style::User => attrs(ContentStyle::default(), &[Italic]),
        Style::StreamingCursor => attrs(fg(Color::Yellow), &[SlowBlink]),
        Style::CodeInline | Style::CodeBlock => fg(Color::Cyan),
        Style::CodeFence | Style::Rule | Style::TableBorder | Style::LinkUrl => fg(Color::DarkGrey),
        Style::Emphasis => attrs(ContentStyle::default(), &[Italic]),
        Style::Strong | Style::H2 | Style::TableHeader => attrs(ContentStyle::default(), &[Bold]),
        Style::Strikethrough => attrs(ContentStyle::default(), &[CrossedOut]),
        Style::H1 => attrs(ContentStyle::default(), &[Bold, Underlined]),
        Style::H3 => attrs(fg(Color::White), &[Italic]),
        Style::Link => attrs(fg(Color::Cyan), &[Underlined]),
        Style::BlockQuote => attrs(fg(Color::Green), &[Italic]),
        Style::ListBullet | Style::ListNumber => fg(Color::Yellow),
        Style::CalloutTip => attrs(fg(Color::Cyan), &[Bold]),
        Style::CalloutWarning => attrs(fg(Color::Yellow), &[Bold]),
        Style::CalloutCritical => attrs(fg(Color::Magenta), &[Bold]),
        Style::CalloutSuccess | Style::NoticeSuccess => attrs(fg(Color::Green), &[Bold]),
        Style::CalloutError | Style::NoticeError => attrs(fg(Color::Red), &[Bold]),
        Style::CalloutInfo => attrs(fg(Color::Blue), &[Bold]),
        Style::NoticeInfo => attrs(fg(Color::DarkGrey), &[Dim]),
        Style::NoticeAdvisory => attrs(fg(Color::Yellow), &[Italic]),
    }
}

fn light(style: Style) -> ContentStyle {
    use Attribute::{Bold, Italic, Underlined};

    match style {
        Style::UserPrefix => attrs(fg(Color::DarkBlue), &[Bold]),
        Style::StreamingCursor => fg(Color::DarkYellow),
        Style::CodeInline | Style::CodeBlock => fg(Color::DarkMagenta),
        Style::CodeFence | Style::Rule | Style::TableBorder | Style::LinkUrl => fg(Color::Grey),
        Style::H3 => attrs(fg(Color::Black), &[Italic]),
        Style::Link => attrs(fg(Color::DarkBlue), &[Underlined]),
        Style::BlockQuote => attrs(fg(Color::DarkGreen), &[Italic]),
        Style::ListBullet | Style::ListNumber => fg(Color::DarkYellow),
        Style::CalloutTip => attrs(fg(Color::DarkCyan), &[Bold]),
        Style::CalloutWarning => attrs(fg(Color::DarkYellow), &[Bold]),
        Style::CalloutCritical => attrs(fg(Color::DarkMagenta), &[Bold]),
        Style::CalloutSuccess | Style::NoticeSuccess => attrs(fg(Color::DarkGreen), &[Bold]),
        Style::CalloutError | Style::NoticeError => attrs(fg(Color::DarkRed), &[Bold]),
        Style::CalloutInfo => attrs(fg(Color::DarkBlue), &[Bold]),
        Style::NoticeInfo => fg(Color::Grey),
        Style::NoticeAdvisory => attrs(fg(Color::DarkYellow), &[Italic]),
        other => dark(other),
    }
}
