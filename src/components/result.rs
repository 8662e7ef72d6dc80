//! Analysis result panel
//!
//! Pure rendering of `(result, status)` into statistic cards.

use crate::model::analysis::{AgeGroupStats, AnalysisResult, AnalysisStatus};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Which branch of the panel to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultView<'a> {
    /// No analysis selected yet
    Empty,
    Pending,
    Processing,
    Failed,
    Completed(Option<&'a AnalysisResult>),
}

impl<'a> ResultView<'a> {
    pub fn classify(result: Option<&'a AnalysisResult>, status: Option<AnalysisStatus>) -> Self {
        match status {
            None => ResultView::Empty,
            Some(AnalysisStatus::Pending) => ResultView::Pending,
            Some(AnalysisStatus::Processing) => ResultView::Processing,
            Some(AnalysisStatus::Failed) => ResultView::Failed,
            Some(AnalysisStatus::Completed) => ResultView::Completed(result),
        }
    }
}

/// Share of `part` in `total` as a percentage rounded to one decimal
///
/// A zero total yields 0 rather than NaN.
pub fn percent(part: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(part) * 1000.0 / f64::from(total)).round() / 10.0
}

/// Percentage text as shown on the cards: `"30.0"`, or `"0"` for no faces
pub fn format_share(share: f64, total: u32) -> String {
    if total == 0 {
        "0".to_string()
    } else {
        format!("{:.1}", share)
    }
}

/// (male %, female %) of the detected faces
pub fn gender_percentages(result: &AnalysisResult) -> (f64, f64) {
    (
        percent(result.gender.male, result.total_faces),
        percent(result.gender.female, result.total_faces),
    )
}

/// The fixed age histogram in display order
pub fn age_buckets(ages: &AgeGroupStats) -> [(&'static str, u32); 4] {
    [
        ("10s", ages.tens),
        ("20s", ages.twenties),
        ("30s", ages.thirties),
        ("40+", ages.forty_plus),
    ]
}

#[derive(Default)]
pub struct ResultPanel {
    spinner_frame: usize,
}

impl ResultPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the processing spinner
    pub fn tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % (SPINNER.len() * 3);
    }

    pub fn draw_with_result(
        &self,
        frame: &mut Frame,
        area: Rect,
        result: Option<&AnalysisResult>,
        status: Option<AnalysisStatus>,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Result ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        match ResultView::classify(result, status) {
            ResultView::Empty => {
                draw_message(frame, area, block, "Upload images to start an analysis", Color::DarkGray)
            }
            ResultView::Pending => {
                draw_message(frame, area, block, "⏳ Waiting for analysis to start", Color::DarkGray)
            }
            ResultView::Processing => {
                let spinner = SPINNER[self.spinner_frame / 3];
                let text = format!("{} Analyzing faces...", spinner);
                draw_message(frame, area, block, &text, Color::Yellow)
            }
            ResultView::Failed => {
                draw_message(frame, area, block, "✗ Analysis failed", Color::Red)
            }
            ResultView::Completed(None) => {
                draw_message(frame, area, block, "No result data available", Color::DarkGray)
            }
            ResultView::Completed(Some(result)) => draw_cards(frame, area, block, result),
        }
    }
}

fn draw_message(frame: &mut Frame, area: Rect, block: Block, text: &str, color: Color) {
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(text.to_string(), Style::default().fg(color))),
    ])
    .alignment(Alignment::Center)
    .block(block);
    frame.render_widget(paragraph, area);
}

fn draw_cards(frame: &mut Frame, area: Rect, block: Block, result: &AnalysisResult) {
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(inner);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(chunks[0]);

    let total = result.total_faces;
    let (male, female) = gender_percentages(result);
    draw_card(frame, cards[0], "Faces", total.to_string(), String::new(), Color::Cyan);
    draw_card(
        frame,
        cards[1],
        "Male",
        format!("{}%", format_share(male, total)),
        format!("{} faces", result.gender.male),
        Color::Blue,
    );
    draw_card(
        frame,
        cards[2],
        "Female",
        format!("{}%", format_share(female, total)),
        format!("{} faces", result.gender.female),
        Color::Magenta,
    );

    let bars: Vec<Bar> = age_buckets(&result.age_group)
        .iter()
        .map(|(label, count)| {
            Bar::default()
                .label(Line::from(*label))
                .value(u64::from(*count))
                .style(Style::default().fg(Color::Green))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().title(" Age groups ").borders(Borders::TOP))
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(2);
    frame.render_widget(chart, chunks[1]);
}

fn draw_card(frame: &mut Frame, area: Rect, title: &str, value: String, detail: String, color: Color) {
    let lines = vec![
        Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(detail, Style::default().fg(Color::DarkGray))),
    ];
    let card = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" {} ", title)),
    );
    frame.render_widget(card, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::analysis::GenderStats;

    #[test]
    fn test_zero_faces_is_zero_not_nan() {
        assert_eq!(percent(0, 0), 0.0);
        assert!(!percent(3, 0).is_nan());
        assert_eq!(format_share(percent(0, 0), 0), "0");
    }

    #[test]
    fn test_percent_rounds_to_one_decimal() {
        assert_eq!(format_share(percent(3, 10), 10), "30.0");
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(2, 3), 66.7);
        assert_eq!(format_share(percent(2, 3), 3), "66.7");
    }

    #[test]
    fn test_gender_percentages() {
        let result = AnalysisResult {
            total_faces: 10,
            gender: GenderStats { male: 3, female: 7 },
            ..Default::default()
        };
        assert_eq!(gender_percentages(&result), (30.0, 70.0));

        let empty = AnalysisResult::default();
        let (male, female) = gender_percentages(&empty);
        assert_eq!(format_share(male, empty.total_faces), "0");
        assert_eq!(format_share(female, empty.total_faces), "0");
    }

    #[test]
    fn test_view_is_keyed_on_status() {
        let result = AnalysisResult::default();
        assert_eq!(ResultView::classify(Some(&result), None), ResultView::Empty);
        assert_eq!(
            ResultView::classify(Some(&result), Some(AnalysisStatus::Pending)),
            ResultView::Pending
        );
        assert_eq!(
            ResultView::classify(None, Some(AnalysisStatus::Processing)),
            ResultView::Processing
        );
        assert_eq!(
            ResultView::classify(Some(&result), Some(AnalysisStatus::Failed)),
            ResultView::Failed
        );
        assert_eq!(
            ResultView::classify(Some(&result), Some(AnalysisStatus::Completed)),
            ResultView::Completed(Some(&result))
        );
    }

    #[test]
    fn test_age_buckets_order() {
        let ages = AgeGroupStats {
            tens: 1,
            twenties: 2,
            thirties: 3,
            forty_plus: 4,
        };
        assert_eq!(
            age_buckets(&ages),
            [("10s", 1), ("20s", 2), ("30s", 3), ("40+", 4)]
        );
    }
}
