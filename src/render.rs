//! Markdown section bodies to styled terminal lines.

use pulldown_cmark::{
    CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag, TagEnd,
};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::warn;

const FALLBACK_THEME: &str = "base16-ocean.dark";

#[derive(Clone, Debug, PartialEq)]
pub struct StyledSegment {
    pub text: String,
    pub style: Style,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedLine {
    pub segments: Vec<StyledSegment>,
    pub plain: String,
}

impl RenderedLine {
    pub fn to_line(&self) -> Line<'static> {
        if self.segments.is_empty() {
            return Line::raw("");
        }
        Line::from(
            self.segments
                .iter()
                .map(|segment| Span::styled(segment.text.clone(), segment.style))
                .collect::<Vec<_>>(),
        )
    }
}

/// Syntax definitions and the colour theme for code blocks.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new(theme_name: &str) -> Self {
        let theme_set = ThemeSet::load_defaults();
        let theme = match theme_set.themes.get(theme_name) {
            Some(theme) => theme.clone(),
            None => {
                warn!(theme_name, "unknown theme, falling back to {FALLBACK_THEME}");
                theme_set
                    .themes
                    .get(FALLBACK_THEME)
                    .or_else(|| theme_set.themes.values().next())
                    .cloned()
                    .unwrap_or_default()
            }
        };
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }
}

#[derive(Default)]
struct InlineStyle {
    emphasis: usize,
    strong: usize,
    strikethrough: usize,
}

impl InlineStyle {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.emphasis > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strong > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.strikethrough > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        style
    }
}

struct ListLevel {
    next_number: Option<u64>,
}

struct BodyRenderer<'a> {
    highlighter: &'a Highlighter,
    lines: Vec<RenderedLine>,
    segments: Vec<StyledSegment>,
    plain: String,
    inline: InlineStyle,
    heading: Option<HeadingLevel>,
    quote_depth: usize,
    lists: Vec<ListLevel>,
    code_lang: Option<String>,
    code_buf: String,
}

impl<'a> BodyRenderer<'a> {
    fn new(highlighter: &'a Highlighter) -> Self {
        Self {
            highlighter,
            lines: Vec::new(),
            segments: Vec::new(),
            plain: String::new(),
            inline: InlineStyle::default(),
            heading: None,
            quote_depth: 0,
            lists: Vec::new(),
            code_lang: None,
            code_buf: String::new(),
        }
    }

    fn finish(mut self) -> Vec<RenderedLine> {
        self.flush(false);
        while self.lines.last().is_some_and(|line| line.plain.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn push(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.plain.push_str(text);
        self.segments.push(StyledSegment {
            text: text.to_string(),
            style,
        });
    }

    fn flush(&mut self, force_empty: bool) {
        if !force_empty && self.segments.is_empty() {
            return;
        }
        self.lines.push(RenderedLine {
            segments: std::mem::take(&mut self.segments),
            plain: std::mem::take(&mut self.plain),
        });
    }

    fn blank_line(&mut self) {
        if self.lines.is_empty() || self.lines.last().is_some_and(|line| line.plain.is_empty()) {
            return;
        }
        self.flush(true);
    }

    fn quote_prefix(&mut self) {
        if self.plain.is_empty() && self.quote_depth > 0 {
            let prefix = "│ ".repeat(self.quote_depth);
            self.push(&prefix, Style::default().fg(Color::DarkGray));
        }
    }

    fn text_style(&self) -> Style {
        match self.heading {
            Some(HeadingLevel::H1) => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            Some(HeadingLevel::H2) => Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
            Some(_) => Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
            None => self.inline.style(),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush(false);
                self.heading = Some(level);
            }
            Tag::BlockQuote(_) => {
                self.flush(false);
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush(false);
                self.code_lang = Some(match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                });
                self.code_buf.clear();
            }
            Tag::List(first) => {
                self.flush(false);
                self.lists.push(ListLevel {
                    next_number: first,
                });
            }
            Tag::Item => {
                self.flush(false);
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(ListLevel {
                        next_number: Some(n),
                    }) => {
                        let bullet = format!("{n}. ");
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.quote_prefix();
                self.push(&format!("{indent}{bullet}"), Style::default().fg(Color::DarkGray));
            }
            Tag::Emphasis => self.inline.emphasis += 1,
            Tag::Strong => self.inline.strong += 1,
            Tag::Strikethrough => self.inline.strikethrough += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush(false);
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush(false);
                self.heading = None;
                self.blank_line();
            }
            TagEnd::BlockQuote => {
                self.flush(false);
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                let lang = self.code_lang.take().unwrap_or_default();
                let code = std::mem::take(&mut self.code_buf);
                self.code_block(&lang, &code);
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush(false);
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush(false),
            TagEnd::Emphasis => self.inline.emphasis = self.inline.emphasis.saturating_sub(1),
            TagEnd::Strong => self.inline.strong = self.inline.strong.saturating_sub(1),
            TagEnd::Strikethrough => {
                self.inline.strikethrough = self.inline.strikethrough.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.code_lang.is_some() {
            self.code_buf.push_str(text);
            return;
        }
        self.quote_prefix();
        self.push(text, self.text_style());
    }

    fn inline_code(&mut self, code: &str) {
        self.quote_prefix();
        self.push(
            code,
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        );
    }

    fn rule(&mut self) {
        self.flush(false);
        self.push(&"─".repeat(48), Style::default().fg(Color::DarkGray));
        self.flush(false);
        self.blank_line();
    }

    fn code_block(&mut self, lang: &str, code: &str) {
        for line in highlight_code(self.highlighter, lang, code) {
            let mut segments = vec![StyledSegment {
                text: "  ".to_string(),
                style: Style::default(),
            }];
            segments.extend(line.segments);
            self.lines.push(RenderedLine {
                segments,
                plain: format!("  {}", line.plain),
            });
        }
    }
}

/// Highlights `code` line by line; unknown languages fall back to plain text.
pub fn highlight_code(highlighter: &Highlighter, lang: &str, code: &str) -> Vec<RenderedLine> {
    let syntax_set = &highlighter.syntax_set;
    let syntax = syntax_set
        .find_syntax_by_token(lang.trim())
        .unwrap_or_else(|| syntax_set.find_syntax_plain_text());
    let mut lines = HighlightLines::new(syntax, &highlighter.theme);

    LinesWithEndings::from(code)
        .map(|line| {
            let clean = line.trim_end_matches(['\n', '\r']);
            let tokens = lines.highlight_line(line, syntax_set).unwrap_or_default();
            let segments = if tokens.is_empty() {
                vec![StyledSegment {
                    text: clean.to_string(),
                    style: Style::default().fg(Color::LightGreen),
                }]
            } else {
                tokens
                    .into_iter()
                    .map(|(syn, token)| StyledSegment {
                        text: token.trim_end_matches(['\n', '\r']).to_string(),
                        style: Style::default().fg(Color::Rgb(
                            syn.foreground.r,
                            syn.foreground.g,
                            syn.foreground.b,
                        )),
                    })
                    .filter(|segment| !segment.text.is_empty())
                    .collect()
            };
            RenderedLine {
                segments,
                plain: clean.to_string(),
            }
        })
        .collect()
}

pub fn render_markdown(source: &str, highlighter: &Highlighter) -> Vec<RenderedLine> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = BodyRenderer::new(highlighter);
    for event in MdParser::new_ext(source, options) {
        match event {
            MdEvent::Start(tag) => renderer.start(tag),
            MdEvent::End(tag) => renderer.end(tag),
            MdEvent::Text(text) | MdEvent::Html(text) | MdEvent::InlineHtml(text) => {
                renderer.text(&text);
            }
            MdEvent::Code(code) => renderer.inline_code(&code),
            MdEvent::SoftBreak => renderer.push(" ", renderer.inline.style()),
            MdEvent::HardBreak => renderer.flush(false),
            MdEvent::Rule => renderer.rule(),
            _ => {}
        }
    }
    renderer.finish()
}

pub fn plain_text(lines: &[RenderedLine]) -> String {
    lines
        .iter()
        .map(|line| line.plain.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
