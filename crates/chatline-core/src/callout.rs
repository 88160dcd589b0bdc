//! Callout markers: the emoji alphabet that turns a line into a notice.
//!
//! A callout line starts with one marker symbol, then whitespace, then
//! the body. Recognized markers map to a [`CalloutKind`]; any other
//! emoji-presentation symbol still counts as a marker and falls back to
//! [`CalloutKind::Info`].

use std::fmt;

use unicode_segmentation::UnicodeSegmentation;

const VARIATION_SELECTOR_16: char = '\u{fe0f}';

/// Kind of notice a callout renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalloutKind {
    Tip,
    Warning,
    Critical,
    Success,
    Error,
    Info,
}

/// Recognized markers, without presentation selectors. Lookups strip a
/// trailing U+FE0F first, so `✅` and `✅️` are the same marker.
const MARKERS: &[(&str, CalloutKind)] = &[
    ("💡", CalloutKind::Tip),
    ("⚠", CalloutKind::Warning),
    ("🔥", CalloutKind::Critical),
    ("✅", CalloutKind::Success),
    ("❗", CalloutKind::Error),
    ("ℹ", CalloutKind::Info),
];

fn lookup(marker: &str) -> Option<CalloutKind> {
    let base = marker.strip_suffix(VARIATION_SELECTOR_16).unwrap_or(marker);
    MARKERS
        .iter()
        .find(|(symbol, _)| *symbol == base)
        .map(|(_, kind)| *kind)
}

impl CalloutKind {
    pub const ALL: [CalloutKind; 6] = [
        CalloutKind::Tip,
        CalloutKind::Warning,
        CalloutKind::Critical,
        CalloutKind::Success,
        CalloutKind::Error,
        CalloutKind::Info,
    ];

    /// Maps a marker to its kind. Unknown markers are `Info`.
    pub fn from_marker(marker: &str) -> Self {
        lookup(marker).unwrap_or(CalloutKind::Info)
    }

    /// Canonical emoji for this kind.
    pub fn icon(self) -> &'static str {
        match self {
            CalloutKind::Tip => "💡",
            CalloutKind::Warning => "⚠\u{fe0f}",
            CalloutKind::Critical => "🔥",
            CalloutKind::Success => "✅",
            CalloutKind::Error => "❗",
            CalloutKind::Info => "ℹ\u{fe0f}",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CalloutKind::Tip => "Tip",
            CalloutKind::Warning => "Warning",
            CalloutKind::Critical => "Critical",
            CalloutKind::Success => "Success",
            CalloutKind::Error => "Error",
            CalloutKind::Info => "Info",
        }
    }
}

impl fmt::Display for CalloutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns true if `symbol` is in the recognized marker table.
pub fn is_known_marker(symbol: &str) -> bool {
    lookup(symbol).is_some()
}

/// Returns true if a grapheme cluster can act as a callout marker.
fn is_marker_symbol(grapheme: &str) -> bool {
    if is_known_marker(grapheme) {
        return true;
    }
    let Some(first) = grapheme.chars().next() else {
        return false;
    };
    // Keycaps ("1️⃣") and other ASCII-led clusters are prose.
    if first.is_ascii() {
        return false;
    }
    grapheme.contains(VARIATION_SELECTOR_16) || ('\u{1f300}'..='\u{1faff}').contains(&first)
}

/// Splits a line into `(marker, body)` when it opens with a marker.
///
/// The marker must be the first grapheme cluster and be followed by at
/// least one whitespace character; the body is what follows the
/// whitespace run (possibly empty).
pub fn leading_marker(line: &str) -> Option<(&str, &str)> {
    let first = line.graphemes(true).next()?;
    if !is_marker_symbol(first) {
        return None;
    }

    let rest = &line[first.len()..];
    let body = rest.trim_start();
    if body.len() == rest.len() {
        return None;
    }
    Some((first, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_markers_map_to_kinds() {
        assert_eq!(CalloutKind::from_marker("💡"), CalloutKind::Tip);
        assert_eq!(CalloutKind::from_marker("⚠️"), CalloutKind::Warning);
        assert_eq!(CalloutKind::from_marker("⚠"), CalloutKind::Warning);
        assert_eq!(CalloutKind::from_marker("🔥"), CalloutKind::Critical);
        assert_eq!(CalloutKind::from_marker("✅"), CalloutKind::Success);
        assert_eq!(CalloutKind::from_marker("❗"), CalloutKind::Error);
        assert_eq!(CalloutKind::from_marker("ℹ️"), CalloutKind::Info);
    }

    #[test]
    fn test_emoji_presentation_forms_keep_their_kind() {
        let cases = [
            ("💡\u{fe0f}", CalloutKind::Tip),
            ("⚠\u{fe0f}", CalloutKind::Warning),
            ("🔥\u{fe0f}", CalloutKind::Critical),
            ("✅\u{fe0f}", CalloutKind::Success),
            ("❗\u{fe0f}", CalloutKind::Error),
            ("ℹ\u{fe0f}", CalloutKind::Info),
        ];
        for (marker, kind) in cases {
            assert!(is_known_marker(marker), "{marker:?}");
            assert_eq!(CalloutKind::from_marker(marker), kind, "{marker:?}");
            let line = format!("{marker} body");
            assert_eq!(leading_marker(&line), Some((marker, "body")));
        }
    }

    #[test]
    fn test_unknown_marker_falls_back_to_info() {
        assert_eq!(CalloutKind::from_marker("🦀"), CalloutKind::Info);
        assert_eq!(CalloutKind::from_marker(""), CalloutKind::Info);
        assert_eq!(CalloutKind::from_marker("x"), CalloutKind::Info);
    }

    #[test]
    fn test_icons_round_trip_through_table() {
        for kind in CalloutKind::ALL {
            assert_eq!(CalloutKind::from_marker(kind.icon()), kind);
        }
    }

    #[test]
    fn test_leading_marker_requires_whitespace() {
        assert_eq!(leading_marker("⚠️ warn"), Some(("⚠️", "warn")));
        assert_eq!(leading_marker("⚠️warn"), None);
        assert_eq!(leading_marker("✅"), None);
    }

    #[test]
    fn test_leading_marker_consumes_whitespace_run() {
        assert_eq!(leading_marker("💡 \t  use a cache"), Some(("💡", "use a cache")));
        assert_eq!(leading_marker("🔥 "), Some(("🔥", "")));
    }

    #[test]
    fn test_leading_marker_only_at_line_start() {
        assert_eq!(leading_marker("note: ✅ done"), None);
        assert_eq!(leading_marker(" ✅ done"), None);
    }

    #[test]
    fn test_unrecognized_emoji_is_a_marker() {
        assert_eq!(leading_marker("🦀 ferris"), Some(("🦀", "ferris")));
        assert_eq!(leading_marker("👍🏽 looks good"), Some(("👍🏽", "looks good")));
    }

    #[test]
    fn test_prose_symbols_are_not_markers() {
        for line in [
            "# heading",
            "- item",
            "* item",
            "> quote",
            "1️⃣ first",
            "→ next",
            "✓ checked",
            "é accent",
            "漢 字",
        ] {
            assert_eq!(leading_marker(line), None, "{line:?}");
        }
    }
}
