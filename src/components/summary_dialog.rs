//! Summary dialog
//!
//! Shows the backend's natural-language summary of the active analysis.

use crate::action::Action;
use crate::component::Component;
use crate::components::chat::wrap_text;
use crate::components::centered_popup;
use crate::model::session::SummaryState;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

#[derive(Default)]
pub struct SummaryDialog {
    pub scroll_offset: usize,
}

impl SummaryDialog {
    pub fn draw_with_summary(&mut self, frame: &mut Frame, area: Rect, summary: Option<&SummaryState>) {
        let width = area.width.saturating_sub(8).clamp(20, 80);
        let height = area.height.saturating_sub(6).clamp(6, 24);
        let popup_area = centered_popup(area, width, height);
        frame.render_widget(Clear, popup_area);

        let text_width = popup_area.width.saturating_sub(4) as usize;
        let mut lines = vec![Line::from("")];
        match summary {
            Some(SummaryState::Ready(text)) => {
                lines.extend(wrap_text(text, text_width).into_iter().map(|row| Line::from(format!(" {}", row))));
            }
            Some(SummaryState::Loading) | None => lines.push(Line::from(Span::styled(
                " Generating summary...",
                Style::default().fg(Color::Yellow),
            ))),
            Some(SummaryState::Unavailable) => lines.push(Line::from(Span::styled(
                " Summary unavailable",
                Style::default().fg(Color::Red),
            ))),
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " Esc/q close  j/k scroll",
            Style::default().fg(Color::DarkGray),
        )));

        let visible = popup_area.height.saturating_sub(2) as usize;
        self.scroll_offset = self.scroll_offset.min(lines.len().saturating_sub(visible));

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .title(" Summary ")
                    .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            )
            .scroll((self.scroll_offset as u16, 0));
        frame.render_widget(paragraph, popup_area);
    }
}

impl Component for SummaryDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => Some(Action::CloseModal),
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll_offset = self.scroll_offset.saturating_add(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        self.draw_with_summary(frame, area, None);
        Ok(())
    }
}
