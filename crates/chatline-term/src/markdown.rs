//! Markdown to styled lines.
//!
//! Parses with pulldown-cmark (tables, strikethrough and task lists on)
//! and produces width-wrapped [`StyledLine`]s. Raw HTML is dropped and
//! all text goes through [`sanitize_for_display`], so a response cannot
//! inject terminal control sequences.
//!
//! The input may be an unfinished stream: an unclosed code fence still
//! renders as a code block.

use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};
use unicode_width::UnicodeWidthStr;

use crate::style::{Style, StyledLine, StyledSpan};
use crate::text::sanitize_for_display;
use crate::wrap::{WrapOptions, wrap_styled_spans};

const QUOTE_BAR: &str = "│ ";
const BULLET: &str = "• ";
const CODE_INDENT: &str = "  ";
const RULE_MAX_WIDTH: usize = 40;

/// Renders markdown `text` wrapped to `width` columns.
///
/// Empty input yields one empty line.
pub fn render_markdown(text: &str, width: usize) -> Vec<StyledLine> {
    if text.is_empty() {
        return vec![StyledLine::empty()];
    }

    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut renderer = MarkdownRenderer::new(width);
    for event in Parser::new_ext(text, options) {
        renderer.process_event(event);
    }
    renderer.finish()
}

#[derive(Debug, Clone)]
struct ListState {
    ordered: bool,
    next_number: u64,
    marker_width: usize,
}

#[derive(Debug, Default)]
struct TableState {
    alignments: Vec<Alignment>,
    header: Vec<Vec<StyledSpan>>,
    rows: Vec<Vec<Vec<StyledSpan>>>,
    row: Vec<Vec<StyledSpan>>,
    cell: Vec<StyledSpan>,
}

struct MarkdownRenderer {
    width: usize,
    lines: Vec<StyledLine>,
    spans: Vec<StyledSpan>,
    style_stack: Vec<Style>,
    code_block: Option<Option<String>>,
    list_stack: Vec<ListState>,
    pending_marker: Option<StyledSpan>,
    quote_depth: usize,
    link_urls: Vec<String>,
    table: Option<TableState>,
}

impl MarkdownRenderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            style_stack: vec![Style::Assistant],
            code_block: None,
            list_stack: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
            link_urls: Vec::new(),
            table: None,
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or(Style::Assistant)
    }

    fn push_style(&mut self, style: Style) {
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    /// Inline content goes to the open table cell, if any.
    fn sink(&mut self) -> &mut Vec<StyledSpan> {
        match self.table.as_mut() {
            Some(table) => &mut table.cell,
            None => &mut self.spans,
        }
    }

    fn push_span(&mut self, text: impl Into<String>, style: Style) {
        self.sink().push(StyledSpan::new(text, style));
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(StyledLine::empty());
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                let style = self.current_style();
                self.push_span(sanitize_for_display(&text), style);
            }
            Event::Code(code) | Event::InlineMath(code) | Event::DisplayMath(code) => {
                self.push_span(sanitize_for_display(&code), Style::CodeInline);
            }
            Event::SoftBreak => {
                let style = self.current_style();
                self.push_span(" ", style);
            }
            Event::HardBreak => {
                let style = self.current_style();
                self.push_span("\n", style);
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(marker, Style::ListBullet);
            }
            Event::Rule => {
                self.flush_paragraph();
                let mut spans = self.block_prefix();
                spans.push(StyledSpan::new(
                    "─".repeat(self.width.clamp(1, RULE_MAX_WIDTH)),
                    Style::Rule,
                ));
                self.lines.push(StyledLine::new(spans));
                self.lines.push(StyledLine::empty());
            }
            Event::Html(_) | Event::InlineHtml(_) | Event::FootnoteReference(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.push_style(match level {
                    HeadingLevel::H1 => Style::H1,
                    HeadingLevel::H2 => Style::H2,
                    _ => Style::H3,
                });
            }
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang
                        .split_whitespace()
                        .next()
                        .map(|l| sanitize_for_display(l).into_owned()),
                    CodeBlockKind::Indented => None,
                };
                self.code_block = Some(lang);
                self.push_style(Style::CodeBlock);
            }
            Tag::List(start) => {
                self.flush_paragraph();
                self.list_stack.push(ListState {
                    ordered: start.is_some(),
                    next_number: start.unwrap_or(1),
                    marker_width: BULLET.width(),
                });
            }
            Tag::Item => {
                self.flush_paragraph();
                if let Some(list) = self.list_stack.last_mut() {
                    let marker = if list.ordered {
                        StyledSpan::new(format!("{}. ", list.next_number), Style::ListNumber)
                    } else {
                        StyledSpan::new(BULLET, Style::ListBullet)
                    };
                    list.marker_width = marker.width();
                    self.pending_marker = Some(marker);
                }
            }
            Tag::BlockQuote(_) => {
                self.flush_paragraph();
                self.quote_depth += 1;
                self.push_style(Style::BlockQuote);
            }
            Tag::Emphasis => self.push_style(Style::Emphasis),
            Tag::Strong => self.push_style(Style::Strong),
            Tag::Strikethrough => self.push_style(Style::Strikethrough),
            Tag::Link { dest_url, .. } => {
                self.link_urls.push(sanitize_for_display(&dest_url).into_owned());
                self.push_style(Style::Link);
            }
            Tag::Table(alignments) => {
                self.flush_paragraph();
                self.table = Some(TableState {
                    alignments,
                    ..TableState::default()
                });
            }
            Tag::Paragraph
            | Tag::TableHead
            | Tag::TableRow
            | Tag::TableCell
            | Tag::Image { .. }
            | Tag::HtmlBlock
            | Tag::FootnoteDefinition(_)
            | Tag::MetadataBlock(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Superscript
            | Tag::Subscript => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_paragraph();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_paragraph();
                self.pop_style();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                self.flush_code_block();
                self.pop_style();
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => {
                self.flush_paragraph();
                if let Some(marker) = self.pending_marker.take() {
                    // Empty item: still show its marker.
                    let mut spans = self.block_prefix();
                    spans.push(marker);
                    self.lines.push(StyledLine::new(spans));
                }
                if let Some(list) = self.list_stack.last_mut() {
                    list.next_number += 1;
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_paragraph();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.blank_line();
            }
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_urls.pop() {
                    let shown: String = self.sink().iter().map(|s| s.text.as_str()).collect();
                    if !url.is_empty() && !shown.ends_with(url.as_str()) {
                        self.push_span(format!(" ({url})"), Style::LinkUrl);
                    }
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.flush_table(table);
                    self.blank_line();
                }
            }
            _ => {}
        }
    }

    /// Prefix for lines inside quotes and list items (no marker).
    fn block_prefix(&self) -> Vec<StyledSpan> {
        let mut prefix = Vec::new();
        for _ in 0..self.quote_depth {
            prefix.push(StyledSpan::new(QUOTE_BAR, Style::BlockQuote));
        }
        let indent: usize = self.list_stack.iter().map(|l| l.marker_width).sum();
        if indent > 0 {
            prefix.push(StyledSpan::plain(" ".repeat(indent)));
        }
        prefix
    }

    fn flush_paragraph(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);

        let rest = self.block_prefix();
        let first = match self.pending_marker.take() {
            Some(marker) => {
                let mut first: Vec<StyledSpan> = (0..self.quote_depth)
                    .map(|_| StyledSpan::new(QUOTE_BAR, Style::BlockQuote))
                    .collect();
                let outer: usize = self
                    .list_stack
                    .iter()
                    .rev()
                    .skip(1)
                    .map(|l| l.marker_width)
                    .sum();
                if outer > 0 {
                    first.push(StyledSpan::plain(" ".repeat(outer)));
                }
                first.push(marker);
                first
            }
            None => rest.clone(),
        };

        let opts = WrapOptions::with_prefixes(self.width, first, rest);
        self.lines.extend(wrap_styled_spans(&spans, &opts));
    }

    fn flush_code_block(&mut self) {
        let Some(lang) = self.code_block.take() else {
            return;
        };
        let spans = std::mem::take(&mut self.spans);
        let body: String = spans.iter().map(|s| s.text.as_str()).collect();
        let prefix = self.block_prefix();

        let fence = match lang {
            Some(lang) => format!("```{lang}"),
            None => "```".to_string(),
        };
        let mut open = prefix.clone();
        open.push(StyledSpan::new(fence, Style::CodeFence));
        self.lines.push(StyledLine::new(open));

        let body = body.strip_suffix('\n').unwrap_or(&body);
        if !body.is_empty() {
            for line in body.split('\n') {
                let mut spans = prefix.clone();
                spans.push(StyledSpan::plain(CODE_INDENT));
                spans.push(StyledSpan::new(line, Style::CodeBlock));
                self.lines.push(StyledLine::new(spans));
            }
        }

        let mut close = prefix;
        close.push(StyledSpan::new("```", Style::CodeFence));
        self.lines.push(StyledLine::new(close));
    }

    fn flush_table(&mut self, table: TableState) {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(table.header.len()))
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        let cell_width = |cell: &Vec<StyledSpan>| cell.iter().map(StyledSpan::width).sum::<usize>();
        let mut widths = vec![0usize; columns];
        for row in std::iter::once(&table.header).chain(table.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell_width(cell));
            }
        }

        let prefix = self.block_prefix();
        let render_row = |row: &[Vec<StyledSpan>], header: bool| -> StyledLine {
            let mut spans = prefix.clone();
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    spans.push(StyledSpan::new(" │ ", Style::TableBorder));
                }
                let empty = Vec::new();
                let cell = row.get(i).unwrap_or(&empty);
                let pad = width.saturating_sub(cell_width(cell));
                let (left, right) = match table.alignments.get(i) {
                    Some(Alignment::Right) => (pad, 0),
                    Some(Alignment::Center) => (pad / 2, pad - pad / 2),
                    _ => (0, pad),
                };
                if left > 0 {
                    spans.push(StyledSpan::plain(" ".repeat(left)));
                }
                for span in cell {
                    let style = if header { Style::TableHeader } else { span.style };
                    spans.push(StyledSpan::new(span.text.clone(), style));
                }
                if right > 0 && i + 1 < columns {
                    spans.push(StyledSpan::plain(" ".repeat(right)));
                }
            }
            StyledLine::new(spans)
        };

        if !table.header.is_empty() {
            self.lines.push(render_row(&table.header, true));
            let mut separator = prefix.clone();
            let rule = widths
                .iter()
                .map(|w| "─".repeat(*w))
                .collect::<Vec<_>>()
                .join("─┼─");
            separator.push(StyledSpan::new(rule, Style::TableBorder));
            self.lines.push(StyledLine::new(separator));
        }
        for row in &table.rows {
            self.lines.push(render_row(row, false));
        }
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if self.code_block.is_some() {
            self.flush_code_block();
        } else if let Some(table) = self.table.take() {
            self.flush_table(table);
        } else {
            self.flush_paragraph();
        }

        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(StyledLine::empty());
        }
        self.lines
    }
}
