use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::{Constraint, Layout};
use ratatui::prelude::{Color, Modifier, Rect, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::block::Padding;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use tracing::info;

use crate::catalog::{Catalog, Chapter};
use crate::diff::{TypingState, Verdict};
use crate::gesture::SwipeTracker;
use crate::hint::{HintStore, SwipeHint};
use crate::navigator::{Gesture, Navigator, PendingDirection, SwipeDirection, ViewState};
use crate::render::{
    highlight_code, plain_text, render_markdown, Highlighter, RenderedLine, StyledSegment,
};
use crate::section_id::chapter_key;

const SWIPE_HINT: &str = "tip: swipe or press ←/→ to change section";
const CODE_LANG: &str = "c";

fn usize_to_u16_saturating(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn inset_rect(area: Rect, horizontal: u16, vertical: u16) -> Rect {
    Rect {
        x: area.x.saturating_add(horizontal),
        y: area.y.saturating_add(vertical),
        width: area.width.saturating_sub(horizontal.saturating_mul(2)),
        height: area.height.saturating_sub(vertical.saturating_mul(2)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Reading,
    Typing,
}

pub struct AppOptions {
    pub hint_duration: Duration,
    pub swipe_threshold: u16,
    /// Off for one-shot plain output so it does not consume the hint.
    pub show_hint: bool,
}

pub struct App {
    navigator: Navigator,
    highlighter: Highlighter,

    current: String,
    view: ViewState,
    content: Vec<RenderedLine>,
    backstack: Vec<String>,

    typing: TypingState,
    focus: Focus,

    scroll: u16,
    viewport_height: u16,
    overview_selected: usize,
    menu_selected: Option<usize>,

    swipe: SwipeTracker,
    pending: PendingDirection,
    hint: SwipeHint,
    hint_store: Box<dyn HintStore>,
    show_hint: bool,

    status: String,
}

/// Splits the reference into display lines coloured by verdict. A mistyped
/// line break shows as a red `↵` so it is not invisible.
pub fn verdict_lines(reference: &str, verdicts: &[Verdict]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();

    for (c, verdict) in reference.chars().zip(verdicts.iter().copied()) {
        let style = match verdict {
            Verdict::Untyped => Style::default().fg(Color::Gray),
            Verdict::Correct => Style::default().fg(Color::Green),
            Verdict::Incorrect if c.is_whitespace() => Style::default().bg(Color::Red),
            Verdict::Incorrect => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        };
        if c == '\n' {
            if verdict == Verdict::Incorrect {
                spans.push(Span::styled("↵", Style::default().fg(Color::Red)));
            }
            lines.push(Line::from(std::mem::take(&mut spans)));
        } else {
            spans.push(Span::styled(c.to_string(), style));
        }
    }
    lines.push(Line::from(spans));
    lines
}

/// Row and column of a character caret inside multi-line text.
fn caret_position(text: &str, caret: usize) -> (usize, usize) {
    text.chars()
        .take(caret)
        .fold((0, 0), |(row, col), c| if c == '\n' { (row + 1, 0) } else { (row, col + 1) })
}

pub fn table_of_contents(catalog: &Catalog) -> String {
    let mut out = String::new();
    for chapter in catalog.chapters() {
        out.push_str(&format!("{}  {}\n", chapter.number, chapter.title));
        for section in &chapter.sections {
            out.push_str(&format!("  {:<6}{}\n", section.id.to_string(), section.title));
        }
    }
    out
}

impl App {
    pub fn new(
        navigator: Navigator,
        highlighter: Highlighter,
        hint_store: Box<dyn HintStore>,
        options: AppOptions,
    ) -> Self {
        Self {
            navigator,
            highlighter,
            current: String::new(),
            view: ViewState::Loading,
            content: Vec::new(),
            backstack: Vec::new(),
            typing: TypingState::default(),
            focus: Focus::Reading,
            scroll: 0,
            viewport_height: 1,
            overview_selected: 0,
            menu_selected: None,
            swipe: SwipeTracker::new(options.swipe_threshold),
            pending: PendingDirection::default(),
            hint: SwipeHint::new(options.hint_duration),
            hint_store,
            show_hint: options.show_hint,
            status: String::new(),
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> &str {
        &self.current
    }

    #[cfg(test)]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[cfg(test)]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    #[cfg(test)]
    pub fn typing(&self) -> &TypingState {
        &self.typing
    }

    #[cfg(test)]
    pub fn pending_direction(&self) -> Option<SwipeDirection> {
        self.pending.get()
    }

    #[cfg(test)]
    pub fn hint_visible(&self) -> bool {
        self.hint.is_visible()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn section_content(&self) -> Vec<RenderedLine> {
        let ViewState::SectionReady(cursor) = &self.view else {
            return Vec::new();
        };
        let Some((_, section)) = self.navigator.section_at(*cursor) else {
            return Vec::new();
        };

        let mut lines = render_markdown(&section.body, &self.highlighter);
        lines.push(RenderedLine::default());
        lines.push(RenderedLine {
            segments: vec![StyledSegment {
                text: "Code Practice".to_string(),
                style: Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            }],
            plain: "Code Practice".to_string(),
        });
        lines.push(RenderedLine::default());
        lines.extend(highlight_code(&self.highlighter, CODE_LANG, &section.reference));
        lines
    }

    fn overview_chapter(&self) -> Option<&Chapter> {
        match self.view {
            ViewState::ChapterOverview { chapter } => self.navigator.catalog().chapter(chapter),
            _ => None,
        }
    }

    fn not_found_content(&self) -> Vec<RenderedLine> {
        let ViewState::NotFound(err) = &self.view else {
            return Vec::new();
        };
        let message = format!("Not found: {err}");
        let help = "Press m for the chapter menu or Backspace to go back.";
        vec![
            RenderedLine {
                segments: vec![StyledSegment {
                    text: message.clone(),
                    style: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                }],
                plain: message,
            },
            RenderedLine::default(),
            RenderedLine {
                segments: vec![StyledSegment {
                    text: help.to_string(),
                    style: Style::default().fg(Color::DarkGray),
                }],
                plain: help.to_string(),
            },
        ]
    }

    /// Shows `id`. Everything tied to the previous view is discarded first.
    pub fn route_to(&mut self, id: &str) {
        self.hint.unmount();
        self.swipe.cancel();
        self.pending.clear();

        let view = self.navigator.view(id);
        self.current = id.to_string();
        self.view = view.clone();
        self.scroll = 0;
        self.focus = Focus::Reading;
        self.overview_selected = 0;
        self.menu_selected = None;
        info!(id, view = ?self.view, "routed");

        match view {
            ViewState::SectionReady(cursor) => {
                let reference = self
                    .navigator
                    .section_at(cursor)
                    .map(|(_, section)| section.reference.clone())
                    .unwrap_or_default();
                self.typing.reset(reference);
                self.content = self.section_content();
                if self.show_hint {
                    self.hint.mount(self.hint_store.as_mut(), Instant::now());
                }
            }
            ViewState::ChapterOverview { .. } => {
                self.typing.reset(String::new());
                self.content = self
                    .overview_chapter()
                    .map(|chapter| render_markdown(&chapter.intro, &self.highlighter))
                    .unwrap_or_default();
            }
            ViewState::NotFound(_) => {
                self.typing.reset(String::new());
                self.content = self.not_found_content();
            }
            ViewState::Loading => {
                self.typing.reset(String::new());
                self.content.clear();
            }
        }
    }

    /// Records the current id for Backspace and routes.
    fn visit(&mut self, id: &str) {
        if !self.current.is_empty() {
            self.backstack.push(self.current.clone());
        }
        self.route_to(id);
    }

    pub fn go_back(&mut self) {
        let Some(previous) = self.backstack.pop() else {
            self.status = "Nothing to go back to".to_string();
            return;
        };
        self.route_to(&previous);
    }

    #[cfg(test)]
    pub fn backstack_len(&self) -> usize {
        self.backstack.len()
    }

    pub fn replace_catalog(&mut self, catalog: Catalog) {
        self.navigator = Navigator::new(catalog);
        self.view = ViewState::Loading;
        let current = self.current.clone();
        let scroll = self.scroll;
        self.route_to(&current);
        self.scroll = scroll.min(self.max_scroll());
    }

    pub fn apply_gesture(&mut self, gesture: Gesture) {
        let current = self.current.clone();
        let target = self
            .navigator
            .handle_gesture(&mut self.pending, &current, gesture);
        if let Some(target) = target {
            self.visit(&target.to_string());
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.hint.tick(now);
    }

    fn max_scroll(&self) -> u16 {
        let total = self.content.len();
        let visible = usize::from(self.viewport_height.max(1));
        usize_to_u16_saturating(total.saturating_sub(visible))
    }

    fn scroll_by(&mut self, delta: i32) {
        let next = i32::from(self.scroll).saturating_add(delta).max(0);
        self.scroll = u16::try_from(next).unwrap_or(u16::MAX).min(self.max_scroll());
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollDown => self.scroll_by(1),
            MouseEventKind::ScrollUp => self.scroll_by(-1),
            _ => {
                if let Some(gesture) = self.swipe.on_mouse(event) {
                    self.apply_gesture(gesture);
                }
            }
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent, selected: usize) {
        let count = self.navigator.catalog().chapters().count();
        match key.code {
            KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('q') => self.menu_selected = None,
            KeyCode::Char('j') | KeyCode::Down => {
                self.menu_selected = Some((selected + 1).min(count.saturating_sub(1)));
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.menu_selected = Some(selected.saturating_sub(1));
            }
            KeyCode::Enter => {
                let target = self
                    .navigator
                    .catalog()
                    .chapters()
                    .nth(selected)
                    .map(Chapter::id);
                self.menu_selected = None;
                if let Some(target) = target {
                    self.visit(&target.to_string());
                }
            }
            _ => {}
        }
    }

    fn handle_typing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.focus = Focus::Reading,
            KeyCode::Tab => self.typing.insert_tab(),
            KeyCode::Enter => self.typing.insert_newline(),
            KeyCode::Backspace => self.typing.backspace(),
            KeyCode::Delete => self.typing.delete(),
            KeyCode::Left => self.typing.move_left(),
            KeyCode::Right => self.typing.move_right(),
            KeyCode::Home => self.typing.move_home(),
            KeyCode::End => self.typing.move_end(),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.typing.clear();
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.typing.insert_char(c);
            }
            _ => {}
        }
        if self.typing.summary().is_complete() {
            self.status = "Sample typed without mistakes".to_string();
        }
    }

    fn section_count(&self) -> usize {
        self.overview_chapter().map_or(0, |chapter| chapter.sections.len())
    }

    /// Returns `Ok(true)` when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }
        if let Some(selected) = self.menu_selected {
            self.handle_menu_key(key, selected);
            return Ok(false);
        }
        if self.focus == Focus::Typing {
            self.handle_typing_key(key);
            return Ok(false);
        }

        let in_overview = matches!(self.view, ViewState::ChapterOverview { .. });
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => {
                if in_overview {
                    self.overview_selected =
                        (self.overview_selected + 1).min(self.section_count().saturating_sub(1));
                } else {
                    self.scroll_by(1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if in_overview {
                    self.overview_selected = self.overview_selected.saturating_sub(1);
                } else {
                    self.scroll_by(-1);
                }
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_by(i32::from(self.viewport_height / 2).max(1));
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_by(-(i32::from(self.viewport_height / 2).max(1)));
            }
            KeyCode::Char('g') => self.scroll = 0,
            KeyCode::Char('G') => self.scroll = self.max_scroll(),
            KeyCode::Char('l' | 'n') | KeyCode::Right => self.apply_gesture(Gesture::SwipeLeft),
            KeyCode::Char('h' | 'p') | KeyCode::Left => self.apply_gesture(Gesture::SwipeRight),
            KeyCode::Char('u') => {
                let overview = chapter_key(&self.current).to_string();
                if overview != self.current {
                    self.visit(&overview);
                }
            }
            KeyCode::Char('m') => {
                let selected = chapter_key(&self.current)
                    .parse::<u32>()
                    .ok()
                    .and_then(|n| self.navigator.catalog().chapters().position(|c| c.number == n))
                    .unwrap_or(0);
                self.menu_selected = Some(selected);
            }
            KeyCode::Char('i') | KeyCode::Enter => match self.view {
                ViewState::SectionReady(_) => self.focus = Focus::Typing,
                ViewState::ChapterOverview { .. } => {
                    let target = self
                        .overview_chapter()
                        .and_then(|chapter| chapter.sections.get(self.overview_selected))
                        .map(|section| section.id);
                    if let Some(target) = target {
                        self.visit(&target.to_string());
                    }
                }
                _ => {}
            },
            KeyCode::Backspace => self.go_back(),
            _ => {}
        }

        Ok(false)
    }

    pub fn plain_view(&self) -> String {
        match &self.view {
            ViewState::SectionReady(cursor) => {
                let Some((chapter, section)) = self.navigator.section_at(*cursor) else {
                    return String::new();
                };
                format!(
                    "{} / {} {}\n\n{}",
                    chapter.title,
                    section.id,
                    section.title,
                    plain_text(&self.content)
                )
            }
            ViewState::ChapterOverview { .. } => {
                let Some(chapter) = self.overview_chapter() else {
                    return String::new();
                };
                let mut out = format!("{}  {}\n\n", chapter.number, chapter.title);
                let intro = plain_text(&self.content);
                if !intro.is_empty() {
                    out.push_str(&intro);
                    out.push_str("\n\n");
                }
                for section in &chapter.sections {
                    out.push_str(&format!("  {:<6}{}\n", section.id.to_string(), section.title));
                }
                out
            }
            ViewState::NotFound(_) | ViewState::Loading => plain_text(&self.content),
        }
    }

    pub fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let root = inset_rect(frame.size(), 1, 0);
        let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(root);
        let body = chunks[0];
        let status = inset_rect(chunks[1], 1, 0);

        match self.view {
            ViewState::SectionReady(_) => self.draw_section(frame, body),
            ViewState::ChapterOverview { .. } => self.draw_overview(frame, body),
            ViewState::NotFound(_) | ViewState::Loading => self.draw_content(frame, body, " cread "),
        }

        if let Some(selected) = self.menu_selected {
            self.draw_menu(frame, body, selected);
        }
        self.draw_status(frame, status);
    }

    fn title_for_view(&self) -> String {
        match &self.view {
            ViewState::SectionReady(cursor) => self
                .navigator
                .section_at(*cursor)
                .map(|(_, section)| format!(" {} {} ", section.id, section.title))
                .unwrap_or_default(),
            ViewState::ChapterOverview { .. } => self
                .overview_chapter()
                .map(|chapter| format!(" Chapter {}: {} ", chapter.number, chapter.title))
                .unwrap_or_default(),
            ViewState::NotFound(_) => " not found ".to_string(),
            ViewState::Loading => " loading ".to_string(),
        }
    }

    fn draw_content(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect, title: &str) {
        self.viewport_height = area.height.saturating_sub(1).max(1);
        self.scroll = self.scroll.min(self.max_scroll());

        let lines: Vec<Line> = self.content.iter().map(RenderedLine::to_line).collect();
        let paragraph = Paragraph::new(Text::from(lines))
            .block(
                Block::default()
                    .title(title.to_string())
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .padding(Padding::new(1, 1, 0, 0)),
            )
            .scroll((self.scroll, 0))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_section(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let reference_rows = self.typing.reference().lines().count().max(1);
        let typed_rows = self.typing.typed().split('\n').count().max(1);
        let panel = usize_to_u16_saturating(reference_rows.max(typed_rows) + 2)
            .min(area.height.saturating_div(2).max(3));

        let rows = Layout::vertical([Constraint::Min(3), Constraint::Length(panel)]).split(area);
        let cols = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let title = self.title_for_view();
        self.draw_content(frame, rows[0], &title);

        let border = |active: bool| {
            Style::default().fg(if active { Color::Yellow } else { Color::DarkGray })
        };
        let typing_active = self.focus == Focus::Typing;

        let reference = Paragraph::new(Text::from(verdict_lines(
            self.typing.reference(),
            &self.typing.verdicts(),
        )))
        .block(
            Block::default()
                .title(" Typing Practice ")
                .borders(Borders::ALL)
                .border_style(border(false)),
        );
        frame.render_widget(reference, cols[0]);

        let input_block = Block::default()
            .title(if typing_active {
                " input (Esc to stop) "
            } else {
                " input (i to type) "
            })
            .borders(Borders::ALL)
            .border_style(border(typing_active));
        let inner = input_block.inner(cols[1]);
        let (row, col) = caret_position(self.typing.typed(), self.typing.caret());
        let input_scroll = usize_to_u16_saturating(row)
            .saturating_sub(inner.height.saturating_sub(1));
        let input = Paragraph::new(self.typing.typed().to_string())
            .block(input_block)
            .scroll((input_scroll, 0));
        frame.render_widget(input, cols[1]);

        if typing_active {
            let x = inner
                .x
                .saturating_add(usize_to_u16_saturating(col))
                .min(inner.right().saturating_sub(1));
            let y = inner
                .y
                .saturating_add(usize_to_u16_saturating(row).saturating_sub(input_scroll));
            frame.set_cursor(x, y);
        }
    }

    fn draw_overview(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let intro_rows = usize_to_u16_saturating(self.content.len() + 1)
            .min(area.height.saturating_div(2));
        let rows = Layout::vertical([Constraint::Length(intro_rows), Constraint::Min(1)]).split(area);
        let title = self.title_for_view();
        self.draw_content(frame, rows[0], &title);

        let selected = self.overview_selected;
        let items: Vec<ListItem> = self
            .overview_chapter()
            .map(|chapter| {
                chapter
                    .sections
                    .iter()
                    .enumerate()
                    .map(|(idx, section)| {
                        let marker = if idx == selected { "> " } else { "  " };
                        let mut line =
                            Line::raw(format!("{marker}{:<6}{}", section.id.to_string(), section.title));
                        if idx == selected {
                            line = line.fg(Color::Yellow).bold();
                        }
                        ListItem::new(line)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let list = if items.is_empty() {
            List::new(vec![ListItem::new(Line::raw("  (no sections yet)"))])
        } else {
            List::new(items)
        }
        .block(
            Block::default()
                .title(" Sections ")
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .padding(Padding::new(1, 1, 0, 0)),
        );
        frame.render_widget(list, rows[1]);
    }

    fn draw_menu(&self, frame: &mut ratatui::Frame<'_>, area: Rect, selected: usize) {
        let chapters: Vec<&Chapter> = self.navigator.catalog().chapters().collect();
        let width = area.width.min(48);
        let height = usize_to_u16_saturating(chapters.len() + 2).min(area.height);
        let popup = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        };

        let items: Vec<ListItem> = chapters
            .iter()
            .enumerate()
            .map(|(idx, chapter)| {
                let mut line = Line::raw(format!(" {:>2}  {}", chapter.number, chapter.title));
                if idx == selected {
                    line = line.fg(Color::Yellow).bold();
                }
                ListItem::new(line)
            })
            .collect();

        frame.render_widget(Clear, popup);
        frame.render_widget(
            List::new(items).block(Block::default().title(" Chapters ").borders(Borders::ALL)),
            popup,
        );
    }

    fn draw_status(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut parts = vec![if self.current.is_empty() {
            "-".to_string()
        } else {
            self.current.clone()
        }];

        match self.pending.get() {
            Some(SwipeDirection::Left) => parts.push("→ next".to_string()),
            Some(SwipeDirection::Right) => parts.push("← previous".to_string()),
            None => {}
        }

        if matches!(self.view, ViewState::SectionReady(_)) {
            let summary = self.typing.summary();
            let accuracy = summary
                .accuracy()
                .map_or_else(|| "-".to_string(), |pct| format!("{pct}%"));
            parts.push(format!(
                "typed {}/{} accuracy {accuracy}",
                summary.correct + summary.incorrect,
                summary.total()
            ));
        }

        if self.hint.is_visible() {
            parts.push(SWIPE_HINT.to_string());
        }
        if !self.status.is_empty() {
            parts.push(self.status.clone());
        }

        frame.render_widget(
            Paragraph::new(format!(" {}", parts.join(" | "))).style(Style::default().fg(Color::Gray)),
            area,
        );
    }
}
