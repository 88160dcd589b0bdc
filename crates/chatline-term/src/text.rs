//! Text cleanup before display.

use std::borrow::Cow;

/// Columns a tab expands to.
const TAB: &str = "    ";

/// Makes backend text safe to print.
///
/// ESC is removed so escape sequences in a response print as inert text
/// instead of driving the terminal. Tabs become spaces because
/// `unicode-width` counts them as zero columns while terminals jump to the
/// next tab stop, which would throw off wrapping and repaint math.
pub fn sanitize_for_display(s: &str) -> Cow<'_, str> {
    if s.contains('\x1b') || s.contains('\t') {
        Cow::Owned(s.replace('\x1b', "").replace('\t', TAB))
    } else {
        Cow::Borrowed(s)
    }
}
