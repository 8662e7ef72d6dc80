//! Help dialog component
//!
//! Keyboard reference, grouped by panel.

use crate::action::Action;
use crate::component::Component;
use crate::components::centered_popup;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

/// Help dialog showing all keyboard shortcuts
#[derive(Default)]
pub struct HelpDialog {
    pub scroll_offset: usize,
}

impl Component for HelpDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::F(1) => Some(Action::CloseModal),
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll_offset = self.scroll_offset.saturating_add(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
                None
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_add(10);
                None
            }
            KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let dialog_area = centered_popup(area, 60, area.height.saturating_sub(4));

        let content = build_help_content();
        let total = content.len();
        let visible_height = dialog_area.height.saturating_sub(2) as usize;

        // Clamp scroll offset
        let max_scroll = total.saturating_sub(visible_height);
        if self.scroll_offset > max_scroll {
            self.scroll_offset = max_scroll;
        }

        let paragraph = Paragraph::new(content)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Keyboard Shortcuts ")
                    .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .scroll((self.scroll_offset as u16, 0));

        frame.render_widget(Clear, dialog_area);
        frame.render_widget(paragraph, dialog_area);

        // Render scrollbar if content exceeds visible area
        if total > visible_height {
            let mut scrollbar_state =
                ScrollbarState::new(total.saturating_sub(visible_height)).position(self.scroll_offset);

            frame.render_stateful_widget(
                Scrollbar::new(ScrollbarOrientation::VerticalRight)
                    .begin_symbol(Some("↑"))
                    .end_symbol(Some("↓")),
                dialog_area.inner(ratatui::layout::Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }

        Ok(())
    }
}

/// Build the help content with all keyboard shortcuts
fn build_help_content() -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    // Helper to add a section header
    let add_section = |lines: &mut Vec<Line<'static>>, title: &str| {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {} ", title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("  {}", "─".repeat(title.len() + 2)),
            Style::default().fg(Color::DarkGray),
        )));
    };

    // Helper to add a shortcut line
    let add_shortcut = |lines: &mut Vec<Line<'static>>, key: &str, description: &str| {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:12}", key),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(description.to_string(), Style::default().fg(Color::White)),
        ]));
    };

    add_section(&mut lines, "Global");
    add_shortcut(&mut lines, "Tab", "Focus next panel (Images/History/Chat)");
    add_shortcut(&mut lines, "Shift+Tab", "Focus previous panel");
    add_shortcut(&mut lines, "F1", "Show this help");
    add_shortcut(&mut lines, "Ctrl+r", "Refresh history");
    add_shortcut(&mut lines, "Ctrl+s", "Summary of the current analysis");
    add_shortcut(&mut lines, "Esc", "Dismiss error / Quit");
    add_shortcut(&mut lines, "Ctrl+c", "Quit");

    add_section(&mut lines, "Images");
    add_shortcut(&mut lines, "Enter", "Select typed file or folder paths");
    add_shortcut(&mut lines, "paste", "Select pasted or dropped paths");
    add_shortcut(&mut lines, "↑ / ↓", "Move between selected images");
    add_shortcut(&mut lines, "Ctrl+u", "Upload and analyze");
    add_shortcut(&mut lines, "Ctrl+l", "Clear selection");

    add_section(&mut lines, "History");
    add_shortcut(&mut lines, "j / ↓", "Next analysis");
    add_shortcut(&mut lines, "k / ↑", "Previous analysis");
    add_shortcut(&mut lines, "Enter", "Open analysis");
    add_shortcut(&mut lines, "r", "Refresh list");
    add_shortcut(&mut lines, "s", "Summary of the current analysis");

    add_section(&mut lines, "Chat");
    add_shortcut(&mut lines, "Enter", "Send question");
    add_shortcut(&mut lines, "1-3", "Ask a suggested question");
    add_shortcut(&mut lines, "↑ / ↓", "Scroll one line");
    add_shortcut(&mut lines, "PgUp / PgDn", "Scroll one page");

    // Footer
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press q, Esc, or F1 to close",
        Style::default().fg(Color::DarkGray),
    )));

    lines
}
