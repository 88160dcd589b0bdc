use chatline_core::render::CalloutBlock;

use crate::style::{Style, StyledLine, StyledSpan};
use crate::text::sanitize_for_display;
use crate::wrap::{WrapOptions, wrap_styled_spans};

/// Left border drawn on every callout line.
pub const CALLOUT_BORDER: &str = "▌ ";

/// Renders one callout as a bordered notice.
///
/// The header shows the source marker and the kind's label; the body
/// wraps under the same border.
pub fn callout_lines(block: &CalloutBlock, width: usize) -> Vec<StyledLine> {
    let accent = Style::callout(block.kind);
    let border = StyledSpan::new(CALLOUT_BORDER, accent);

    let mut lines = vec![StyledLine::new(vec![
        border.clone(),
        StyledSpan::new(
            format!("{} {}", sanitize_for_display(&block.marker), block.kind.label()),
            accent,
        ),
    ])];

    if !block.text.is_empty() {
        let opts = WrapOptions::with_prefixes(width, vec![border.clone()], vec![border]);
        let body = [StyledSpan::new(sanitize_for_display(&block.text), Style::CalloutBody)];
        lines.extend(wrap_styled_spans(&body, &opts));
    }

    lines
}
