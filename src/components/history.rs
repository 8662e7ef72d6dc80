//! History sidebar
//!
//! Lists past analyses in the order the server returns them.

use crate::action::Action;
use crate::component::Component;
use crate::model::analysis::AnalysisSummary;
use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

#[derive(Default)]
pub struct HistorySidebar {
    list_state: ListState,
}

impl HistorySidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.list_state.selected()
    }

    /// Id of the highlighted row
    pub fn selected_id<'a>(&self, analyses: &'a [AnalysisSummary]) -> Option<&'a str> {
        self.selected_index()
            .and_then(|i| analyses.get(i))
            .map(|a| a.analysis_id.as_str())
    }

    /// Keep the cursor inside a list of `len` rows
    pub fn clamp(&mut self, len: usize) {
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            None => self.list_state.select(Some(0)),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            Some(_) => {}
        }
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.list_state.select(Some(i));
    }

    pub fn draw_with_history(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        analyses: &[AnalysisSummary],
        active_id: Option<&str>,
        focused: bool,
    ) {
        let border = if focused { Color::Cyan } else { Color::DarkGray };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" History ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        if analyses.is_empty() {
            let empty = Paragraph::new(Line::from(Span::styled(
                "No analyses yet",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        self.clamp(analyses.len());
        let now = Local::now();
        let items: Vec<ListItem> = analyses
            .iter()
            .map(|a| history_item(a, active_id == Some(a.analysis_id.as_str()), &now))
            .collect();

        let highlight = if focused {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let list = List::new(items).block(block).highlight_style(highlight);
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }
}

impl Component for HistorySidebar {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Action::NextItem),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::PrevItem),
            KeyCode::Enter => Some(Action::SelectHighlighted),
            KeyCode::Char('r') => Some(Action::RefreshHistory),
            KeyCode::Char('s') => Some(Action::OpenSummary),
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, _frame: &mut Frame, _area: Rect) -> Result<()> {
        // Needs the analysis list, see draw_with_history
        Ok(())
    }
}

fn history_item(summary: &AnalysisSummary, active: bool, now: &DateTime<Local>) -> ListItem<'static> {
    let date = summary
        .created_at
        .map(|ts| format_relative_date(&ts, now))
        .unwrap_or_else(|| "--:--".to_string());

    let marker = if active { "●" } else { " " };
    let title = Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{} ", summary.status.icon()),
            Style::default().fg(summary.status.color()),
        ),
        Span::styled(date, Style::default().fg(Color::White)),
    ]);
    let detail = Line::from(Span::styled(
        format!("   {} faces · {} images", summary.total_faces, summary.image_count),
        Style::default().fg(Color::DarkGray),
    ));
    ListItem::new(vec![title, detail])
}

/// `HH:MM` for timestamps on the same calendar day as `now`, else `MM/DD`
///
/// The day is decided in `now`'s time zone.
pub fn format_relative_date<Tz: TimeZone>(timestamp: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = timestamp.with_timezone(&now.timezone());
    if local.date_naive() == now.date_naive() {
        local.format("%H:%M").to_string()
    } else {
        local.format("%m/%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::analysis::AnalysisStatus;
    use chrono::FixedOffset;

    fn row(id: &str) -> AnalysisSummary {
        AnalysisSummary {
            analysis_id: id.to_string(),
            status: AnalysisStatus::Completed,
            created_at: None,
            total_faces: 3,
            image_count: 2,
            result: None,
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_same_day_shows_time() {
        let now = utc("2024-05-01T18:00:00Z");
        assert_eq!(format_relative_date(&utc("2024-05-01T09:05:00Z"), &now), "09:05");
    }

    #[test]
    fn test_other_day_shows_month_and_day() {
        let now = utc("2024-05-01T18:00:00Z");
        assert_eq!(format_relative_date(&utc("2024-04-30T23:59:00Z"), &now), "04/30");
        assert_eq!(format_relative_date(&utc("2023-05-01T10:00:00Z"), &now), "05/01");
    }

    #[test]
    fn test_today_is_judged_in_local_zone() {
        // 23:30 UTC on April 30 is already May 1 in UTC+9
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = utc("2024-05-01T03:00:00Z").with_timezone(&tokyo);
        assert_eq!(format_relative_date(&utc("2024-04-30T23:30:00Z"), &now), "08:30");
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut sidebar = HistorySidebar::new();
        sidebar.next(0);
        assert_eq!(sidebar.selected_index(), None);

        sidebar.next(2);
        assert_eq!(sidebar.selected_index(), Some(0));
        sidebar.next(2);
        sidebar.next(2);
        assert_eq!(sidebar.selected_index(), Some(1));
        sidebar.previous(2);
        sidebar.previous(2);
        assert_eq!(sidebar.selected_index(), Some(0));
    }

    #[test]
    fn test_selected_id_follows_server_order() {
        let rows = vec![row("newest"), row("older"), row("oldest")];
        let mut sidebar = HistorySidebar::new();
        sidebar.clamp(rows.len());
        sidebar.next(rows.len());
        assert_eq!(sidebar.selected_id(&rows), Some("older"));
    }

    #[test]
    fn test_clamp_after_list_shrinks() {
        let mut sidebar = HistorySidebar::new();
        sidebar.clamp(5);
        for _ in 0..4 {
            sidebar.next(5);
        }
        sidebar.clamp(2);
        assert_eq!(sidebar.selected_index(), Some(1));
        sidebar.clamp(0);
        assert_eq!(sidebar.selected_index(), None);
    }

    #[test]
    fn test_keys_map_to_actions() {
        let mut sidebar = HistorySidebar::new();
        let key = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
        assert_eq!(sidebar.handle_key_event(key('j')).unwrap(), Some(Action::NextItem));
        assert_eq!(sidebar.handle_key_event(key('r')).unwrap(), Some(Action::RefreshHistory));
        assert_eq!(
            sidebar.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)).unwrap(),
            Some(Action::SelectHighlighted)
        );
    }
}
