//! Chat panel
//!
//! Renders the transcript in arrival order with an input line underneath.
//! Follows the bottom of the transcript whenever its length changes.

use crate::action::Action;
use crate::component::Component;
use crate::model::chat::{ChatMessage, Role};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

pub const SUGGESTED_QUESTIONS: [&str; 3] = [
    "How many faces were detected?",
    "What is the gender ratio?",
    "Which age group is the largest?",
];

pub struct ChatPanel {
    pub input: String,
    /// First transcript line shown
    scroll: usize,
    /// Transcript length seen at the last draw
    seen_messages: usize,
    /// Height of the transcript viewport at the last draw
    viewport: usize,
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatPanel {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            scroll: 0,
            seen_messages: 0,
            viewport: 0,
        }
    }

    /// Clear local state when the active analysis changes
    pub fn reset(&mut self) {
        self.input.clear();
        self.scroll = 0;
        self.seen_messages = 0;
    }

    /// Take the typed question, leaving the input empty
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    /// Recompute the scroll offset for a transcript of `total_lines`
    ///
    /// A change in message count jumps to the bottom; otherwise the offset
    /// is only clamped.
    fn follow(&mut self, message_count: usize, total_lines: usize, viewport: usize) -> usize {
        let max_scroll = total_lines.saturating_sub(viewport);
        if message_count != self.seen_messages {
            self.seen_messages = message_count;
            self.scroll = max_scroll;
        }
        self.scroll = self.scroll.min(max_scroll);
        self.scroll
    }

    pub fn draw_with_messages(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        messages: &[ChatMessage],
        ready: bool,
        pending: bool,
        focused: bool,
    ) {
        let border = if focused { Color::Cyan } else { Color::DarkGray };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);

        // Transcript
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Ask about this analysis ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let inner = block.inner(chunks[0]);
        let width = inner.width.saturating_sub(2) as usize;

        let mut lines = transcript_lines(messages, width);
        if pending {
            lines.push(Line::from(Span::styled(
                "Assistant is thinking...",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        if messages.is_empty() && !pending {
            lines = placeholder_lines(ready);
        }

        self.viewport = inner.height as usize;
        let scroll = self.follow(messages.len(), lines.len(), self.viewport);
        let transcript = Paragraph::new(lines)
            .block(block)
            .scroll((scroll as u16, 0));
        frame.render_widget(transcript, chunks[0]);

        // Input line
        let enabled = ready && !pending;
        let prompt = if !ready {
            Span::styled("Chat opens once the analysis completes", Style::default().fg(Color::DarkGray))
        } else if pending {
            Span::styled("Waiting for the answer...", Style::default().fg(Color::DarkGray))
        } else if focused {
            Span::styled(format!("{}_", self.input), Style::default().fg(Color::White))
        } else {
            Span::raw(self.input.clone())
        };
        let input = Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(if enabled { Color::Cyan } else { Color::DarkGray })),
            prompt,
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
        frame.render_widget(input, chunks[1]);
    }

    /// Visible transcript height from the last draw
    pub fn page_size(&self) -> usize {
        self.viewport.max(1)
    }
}

impl Component for ChatPanel {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Enter => Some(Action::SendMessage),
            KeyCode::Backspace => Some(Action::InputBackspace),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::PageDown => Some(Action::PageDown),
            KeyCode::Up => Some(Action::ScrollUp),
            KeyCode::Down => Some(Action::ScrollDown),
            KeyCode::Char(c @ '1'..='3') if self.input.is_empty() => {
                Some(Action::AskSuggestion(c as usize - '1' as usize))
            }
            KeyCode::Char(c) => Some(Action::InputChar(c)),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::InputChar(c) => self.input.push(c),
            Action::InputBackspace => {
                self.input.pop();
            }
            Action::Paste(text) => self.input.push_str(&text.replace(['\r', '\n'], " ")),
            Action::ScrollUp => self.scroll_up(1),
            Action::ScrollDown => self.scroll_down(1),
            Action::PageUp => self.scroll_up(self.page_size()),
            Action::PageDown => self.scroll_down(self.page_size()),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, _frame: &mut Frame, _area: Rect) -> Result<()> {
        // Needs the transcript, see draw_with_messages
        Ok(())
    }
}

fn placeholder_lines(ready: bool) -> Vec<Line<'static>> {
    if !ready {
        return vec![Line::from(Span::styled(
            "No completed analysis selected.",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines = vec![
        Line::from(Span::styled(
            "Try one of these:",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {} ", i + 1),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(*question),
        ]));
    }
    lines
}

fn transcript_lines(messages: &[ChatMessage], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        let color = match message.role {
            Role::User => Color::Cyan,
            Role::Assistant => Color::Green,
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", message.role.label()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for row in wrap_text(&message.content, width) {
            lines.push(Line::from(format!("  {}", row)));
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Hard-wrap text to a display width, breaking on spaces when possible
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for paragraph in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0;

        for word in paragraph.split(' ') {
            let word_width: usize = word.chars().map(|c| c.width().unwrap_or(0)).sum();
            let sep = usize::from(!row.is_empty());

            if row_width + sep + word_width <= width {
                if sep == 1 {
                    row.push(' ');
                }
                row.push_str(word);
                row_width += sep + word_width;
                continue;
            }

            if !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }

            // Words wider than the row are split by character
            for c in word.chars() {
                let w = c.width().unwrap_or(0);
                if row_width + w > width && !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(c);
                row_width += w;
            }
        }
        rows.push(row);
    }
    rows
}
