//! Terminal presentation for chatline.
//!
//! Turns rendered responses into styled lines and paints them inline,
//! below the prompt, without taking over the screen.

pub mod callout;
pub mod markdown;
pub mod painter;
pub mod style;
pub mod text;
pub mod transcript;
pub mod wrap;

pub use markdown::render_markdown;
pub use painter::{FRAME_DURATION, FrameSink, LivePainter, PlainSink};
pub use style::{Style, StyledLine, StyledSpan, Theme};
pub use transcript::{NoticeLevel, assistant_lines, notice_lines, user_lines};
