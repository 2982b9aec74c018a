//! Markdown rendering for the terminal.
//!
//! [`parse_markdown`] turns formatted reply text into display [`Block`]s
//! using `pulldown-cmark`. A [`Renderer`] prints blocks, messages and status
//! lines; [`PlainTextRenderer`] does so with optional ANSI styling.

use std::io::{self, Stdout, Write};

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::types::{Message, Role};

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_RED: &str = "\x1b[31m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_MAGENTA: &str = "\x1b[35m";
const ANSI_CYAN: &str = "\x1b[36m";

const RULE: &str = "────────────────────";

/////////////////////////////////////////// Blocks ///////////////////////////////////////////

/// Inline styling of a run of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub code: bool,
}

impl SpanStyle {
    fn is_plain(&self) -> bool {
        !self.strong && !self.emphasis && !self.code
    }
}

/// A run of text with one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SpanStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Number(u64),
}

/// A display element produced from markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    /// `depth` is zero for a top-level list.
    ListItem {
        depth: usize,
        marker: ListMarker,
        spans: Vec<Span>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    Rule,
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Concatenate the text of `spans`.
pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    style: SpanStyle,
    strong: usize,
    emphasis: usize,
    heading: Option<u8>,
    /// Next number for ordered lists, `None` for bullet lists.
    lists: Vec<Option<u64>>,
    item: Option<(usize, ListMarker)>,
    code: Option<(Option<String>, String)>,
}

impl BlockBuilder {
    fn push_text(&mut self, text: &str, code: bool) {
        if let Some((_, buffer)) = self.code.as_mut() {
            buffer.push_str(text);
            return;
        }
        let style = SpanStyle {
            code,
            ..self.style
        };
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn update_style(&mut self) {
        self.style.strong = self.strong > 0;
        self.style.emphasis = self.emphasis > 0;
    }

    fn flush_item(&mut self) {
        if let Some((depth, marker)) = self.item.take() {
            let spans = std::mem::take(&mut self.spans);
            self.blocks.push(Block::ListItem {
                depth,
                marker,
                spans,
            });
        } else {
            self.flush_paragraph();
        }
    }

    fn flush_paragraph(&mut self) {
        if !self.spans.is_empty() {
            let spans = std::mem::take(&mut self.spans);
            self.blocks.push(Block::Paragraph(spans));
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.item.is_some() && !self.spans.is_empty() {
                    self.push_text(" ", false);
                }
            }
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.heading = Some(heading_level_to_u8(level));
            }
            Tag::List(start) => {
                // An enclosing item is emitted before its nested list, even
                // when it has no text of its own.
                if self.item.is_some() || !self.spans.is_empty() {
                    self.flush_item();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = ListMarker::Number(*next);
                        *next += 1;
                        marker
                    }
                    _ => ListMarker::Bullet,
                };
                self.item = Some((depth, marker));
            }
            Tag::Strong => {
                self.strong += 1;
                self.update_style();
            }
            Tag::Emphasis => {
                self.emphasis += 1;
                self.update_style();
            }
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.code = Some((language, String::new()));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.item.is_none() {
                    self.flush_paragraph();
                }
            }
            TagEnd::Heading(_) => {
                let level = self.heading.take().unwrap_or(1);
                let spans = std::mem::take(&mut self.spans);
                self.blocks.push(Block::Heading { level, spans });
            }
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::Strong => {
                self.strong = self.strong.saturating_sub(1);
                self.update_style();
            }
            TagEnd::Emphasis => {
                self.emphasis = self.emphasis.saturating_sub(1);
                self.update_style();
            }
            TagEnd::CodeBlock => {
                if let Some((language, code)) = self.code.take() {
                    self.blocks.push(Block::CodeBlock { language, code });
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_item();
        self.blocks
    }
}

/// Parse markdown into display blocks.
pub fn parse_markdown(markdown: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(tag) => builder.end(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                builder.push_text(&text, false)
            }
            Event::Code(text) => builder.push_text(&text, true),
            Event::SoftBreak => builder.push_text(" ", false),
            Event::HardBreak => builder.push_text("\n", false),
            Event::Rule => {
                builder.flush_paragraph();
                builder.blocks.push(Block::Rule);
            }
            _ => {}
        }
    }
    builder.finish()
}

///////////////////////////////////////// Formatting /////////////////////////////////////////

fn heading_color(text: &str) -> &'static str {
    if text.starts_with("Warning") {
        ANSI_RED
    } else if text.starts_with("Important") {
        ANSI_YELLOW
    } else {
        ANSI_CYAN
    }
}

fn format_spans(spans: &[Span], use_color: bool) -> String {
    let mut out = String::new();
    for span in spans {
        if !use_color {
            if span.style.code {
                out.push('`');
                out.push_str(&span.text);
                out.push('`');
            } else {
                out.push_str(&span.text);
            }
            continue;
        }
        if span.style.is_plain() {
            out.push_str(&span.text);
            continue;
        }
        if span.style.strong {
            out.push_str(ANSI_BOLD);
        }
        if span.style.emphasis {
            out.push_str(ANSI_ITALIC);
        }
        if span.style.code {
            out.push_str(ANSI_MAGENTA);
        }
        out.push_str(&span.text);
        out.push_str(ANSI_RESET);
    }
    out
}

/// Lay out blocks as terminal text, with ANSI styling when `use_color`.
pub fn format_blocks(blocks: &[Block], use_color: bool) -> String {
    let mut out = String::new();
    let mut previous: Option<&Block> = None;
    for block in blocks {
        if let Some(prev) = previous {
            let in_list = matches!(prev, Block::ListItem { .. })
                && matches!(block, Block::ListItem { .. });
            out.push_str(if in_list { "\n" } else { "\n\n" });
        }
        match block {
            Block::Heading { spans, .. } => {
                let text = spans_text(spans);
                if use_color {
                    out.push_str(ANSI_BOLD);
                    out.push_str(heading_color(&text));
                    out.push_str(&text);
                    out.push_str(ANSI_RESET);
                } else {
                    out.push_str(&text);
                }
            }
            Block::Paragraph(spans) => out.push_str(&format_spans(spans, use_color)),
            Block::ListItem {
                depth,
                marker,
                spans,
            } => {
                out.push_str(&"  ".repeat(*depth));
                match marker {
                    ListMarker::Bullet => out.push_str("• "),
                    ListMarker::Number(n) => out.push_str(&format!("{n}. ")),
                }
                out.push_str(&format_spans(spans, use_color));
            }
            Block::CodeBlock { code, .. } => {
                let body = code
                    .trim_end_matches('\n')
                    .lines()
                    .map(|line| format!("    {line}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                if use_color {
                    out.push_str(ANSI_DIM);
                    out.push_str(&body);
                    out.push_str(ANSI_RESET);
                } else {
                    out.push_str(&body);
                }
            }
            Block::Rule => out.push_str(RULE),
        }
        previous = Some(block);
    }
    out
}

/// Render markdown straight to terminal text.
pub fn render_markdown(markdown: &str, use_color: bool) -> String {
    format_blocks(&parse_markdown(markdown), use_color)
}

////////////////////////////////////////// Renderer //////////////////////////////////////////

/// Trait for displaying chat output.
///
/// The REPL only talks to the screen through this trait.
pub trait Renderer: Send {
    /// Print a user turn, as when replaying a transcript.
    fn print_user(&mut self, message: &Message);

    /// Print an assistant reply. `text` is formatted markdown.
    fn print_assistant(&mut self, text: &str);

    /// Print any message according to its role.
    fn print_message(&mut self, message: &Message) {
        match message.role {
            Role::User => self.print_user(message),
            Role::Assistant => self.print_assistant(&message.text),
        }
    }

    /// Print markdown that is not part of the conversation, such as a guide.
    fn print_markdown(&mut self, markdown: &str);

    /// Called while a request is in flight.
    fn print_pending(&mut self) {}

    fn print_error(&mut self, error: &str);

    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a renderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a renderer on stdout with the given color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            out: io::stdout(),
            use_color,
        }
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer that writes to `out`.
    pub fn to_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Consumes the renderer and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_user(&mut self, message: &Message) {
        let mut line = if self.use_color {
            format!("{ANSI_GREEN}{ANSI_BOLD}you>{ANSI_RESET} {}", message.text)
        } else {
            format!("you> {}", message.text)
        };
        if let Some(image) = &message.image {
            line.push_str(&format!(" [image: {}]", image.name));
        }
        self.write_line(&line);
    }

    fn print_assistant(&mut self, text: &str) {
        let body = render_markdown(text, self.use_color);
        self.write_line(&format!("{body}\n"));
    }

    fn print_markdown(&mut self, markdown: &str) {
        let body = render_markdown(markdown, self.use_color);
        self.write_line(&body);
    }

    fn print_pending(&mut self) {
        if self.use_color {
            self.write_line(&format!("{ANSI_DIM}{ANSI_ITALIC}Thinking...{ANSI_RESET}"));
        } else {
            self.write_line("Thinking...");
        }
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            self.write_line(&format!("{ANSI_RED}Error: {error}{ANSI_RESET}"));
        } else {
            self.write_line(&format!("Error: {error}"));
        }
    }

    fn print_info(&mut self, info: &str) {
        self.write_line(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong(text: &str) -> Span {
        Span {
            text: text.to_string(),
            style: SpanStyle {
                strong: true,
                ..SpanStyle::default()
            },
        }
    }

    #[test]
    fn headings_and_paragraphs() {
        let blocks = parse_markdown("### Warning: hot\n\nRun cool water over it.");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 3,
                    spans: vec![Span::plain("Warning: hot")],
                },
                Block::Paragraph(vec![Span::plain("Run cool water over it.")]),
            ]
        );
    }

    #[test]
    fn ordered_and_bullet_lists() {
        let blocks = parse_markdown("Steps:\n\n1. Cool\n2. Cover\n\n- Rest\n- Ice");
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0], Block::Paragraph(vec![Span::plain("Steps:")]));
        assert_eq!(
            blocks[2],
            Block::ListItem {
                depth: 0,
                marker: ListMarker::Number(2),
                spans: vec![Span::plain("Cover")],
            }
        );
        assert_eq!(
            blocks[3],
            Block::ListItem {
                depth: 0,
                marker: ListMarker::Bullet,
                spans: vec![Span::plain("Rest")],
            }
        );
    }

    #[test]
    fn nested_list_depth() {
        let blocks = parse_markdown("- Signs\n  - redness\n  - swelling\n- Care");
        let depths: Vec<usize> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::ListItem { depth, .. } => Some(*depth),
                _ => None,
            })
            .collect();
        assert_eq!(depths, vec![0, 1, 1, 0]);
    }

    #[test]
    fn item_opening_with_nested_list_keeps_its_marker() {
        let blocks = parse_markdown("1. - redness\n   - swelling\n2. Care");
        assert_eq!(
            blocks,
            vec![
                Block::ListItem {
                    depth: 0,
                    marker: ListMarker::Number(1),
                    spans: vec![],
                },
                Block::ListItem {
                    depth: 1,
                    marker: ListMarker::Bullet,
                    spans: vec![Span::plain("redness")],
                },
                Block::ListItem {
                    depth: 1,
                    marker: ListMarker::Bullet,
                    spans: vec![Span::plain("swelling")],
                },
                Block::ListItem {
                    depth: 0,
                    marker: ListMarker::Number(2),
                    spans: vec![Span::plain("Care")],
                },
            ]
        );
    }

    #[test]
    fn emphasis_spans() {
        let blocks = parse_markdown("Apply **firm pressure** now");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![
                Span::plain("Apply "),
                strong("firm pressure"),
                Span::plain(" now"),
            ])]
        );
    }

    #[test]
    fn code_and_rule() {
        let blocks = parse_markdown("```text\nline one\n```\n\n---\n");
        assert_eq!(
            blocks,
            vec![
                Block::CodeBlock {
                    language: Some("text".to_string()),
                    code: "line one\n".to_string(),
                },
                Block::Rule,
            ]
        );
    }

    #[test]
    fn plain_layout() {
        let text = render_markdown("### Note: rest\n\n1. Sit\n2. Breathe\n\nUse `ice`.", false);
        assert_eq!(text, "Note: rest\n\n1. Sit\n2. Breathe\n\nUse `ice`.");
    }

    #[test]
    fn colored_layout() {
        let text = render_markdown("**Stop**", true);
        assert_eq!(text, format!("{ANSI_BOLD}Stop{ANSI_RESET}"));
        let heading = render_markdown("### Warning: hot", true);
        assert!(heading.starts_with(ANSI_BOLD));
        assert!(heading.contains(ANSI_RED));
    }

    #[test]
    fn renderer_writes_to_writer() {
        let mut renderer = PlainTextRenderer::to_writer(Vec::new(), false);
        renderer.print_message(&Message::user("Help", None, 0));
        renderer.print_message(&Message::assistant("- Rest\n- Ice", 1));
        renderer.print_error("offline");
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "you> Help\n• Rest\n• Ice\n\nError: offline\n");
    }

    #[test]
    fn renderer_default_has_color() {
        assert!(PlainTextRenderer::new().use_color());
        assert!(!PlainTextRenderer::with_color(false).use_color());
    }
}
