//! Setup wizard component
//!
//! First-run configuration: asks for the analysis server URL, checks that
//! it answers, and saves the config.

use crate::action::Action;
use crate::component::Component;
use crate::config::{validate_base_url, Config};
use crate::services::api::ApiClient;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Setup wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Welcome,
    ServerUrl,
    Confirm,
}

impl SetupStep {
    fn next(&self) -> Option<SetupStep> {
        match self {
            SetupStep::Welcome => Some(SetupStep::ServerUrl),
            SetupStep::ServerUrl => Some(SetupStep::Confirm),
            SetupStep::Confirm => None,
        }
    }

    fn prev(&self) -> Option<SetupStep> {
        match self {
            SetupStep::Welcome => None,
            SetupStep::ServerUrl => Some(SetupStep::Welcome),
            SetupStep::Confirm => Some(SetupStep::ServerUrl),
        }
    }

    fn title(&self) -> &str {
        match self {
            SetupStep::Welcome => "Welcome",
            SetupStep::ServerUrl => "Server URL",
            SetupStep::Confirm => "Confirm",
        }
    }

    fn step_number(&self) -> usize {
        match self {
            SetupStep::Welcome => 1,
            SetupStep::ServerUrl => 2,
            SetupStep::Confirm => 3,
        }
    }
}

/// Outcome of probing `GET /health` on the entered URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Healthy(String),
    Unreachable(String),
}

/// Setup wizard component
pub struct SetupComponent {
    pub step: SetupStep,
    /// Config being built
    pub config: Config,
    pub input: String,
    pub error: Option<String>,
    pub reachability: Option<Reachability>,
    pub complete: bool,
    /// Skip the health check (tests run without a server)
    check_reachability: bool,
}

impl Default for SetupComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupComponent {
    pub fn new() -> Self {
        Self {
            step: SetupStep::Welcome,
            config: Config::default(),
            input: String::new(),
            error: None,
            reachability: None,
            complete: false,
            check_reachability: true,
        }
    }

    /// Get the saved config if setup completed successfully
    pub fn get_config(&self) -> Option<&Config> {
        if self.complete {
            Some(&self.config)
        } else {
            None
        }
    }

    fn validate_current_step(&mut self) -> bool {
        self.error = None;

        match self.step {
            SetupStep::Welcome | SetupStep::Confirm => true,
            SetupStep::ServerUrl => match validate_base_url(&self.input) {
                Ok(url) => {
                    self.config.api_base_url = url;
                    true
                }
                Err(e) => {
                    self.error = Some(e);
                    false
                }
            },
        }
    }

    fn advance_step(&mut self) {
        if !self.validate_current_step() {
            return;
        }
        if let Some(next) = self.step.next() {
            if next == SetupStep::Confirm {
                self.reachability = self.check_reachability.then(|| check_health(&self.config.api_base_url));
            }
            self.step = next;
            self.input = match self.step {
                SetupStep::ServerUrl => self.config.api_base_url.clone(),
                _ => String::new(),
            };
        }
    }

    fn go_back(&mut self) {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
            self.error = None;
            self.input = match self.step {
                SetupStep::ServerUrl => self.config.api_base_url.clone(),
                _ => String::new(),
            };
        }
    }

    fn save_config(&mut self) {
        match self.config.save() {
            Ok(()) => {
                tracing::info!(api_base_url = %self.config.api_base_url, "configuration saved");
                self.complete = true;
            }
            Err(e) => {
                self.error = Some(format!("Failed to save config: {}", e));
            }
        }
    }
}

fn check_health(base_url: &str) -> Reachability {
    let result = ApiClient::with_timeouts(base_url, Some(HEALTH_TIMEOUT), HEALTH_TIMEOUT)
        .and_then(|client| client.health());
    match result {
        Ok(health) => Reachability::Healthy(health.status),
        Err(e) => {
            tracing::warn!(base_url, error = %e, "health check failed");
            Reachability::Unreachable(e.to_string())
        }
    }
}

impl Component for SetupComponent {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match self.step {
            SetupStep::Welcome => match key.code {
                KeyCode::Enter => {
                    self.advance_step();
                    Ok(None)
                }
                KeyCode::Esc => Ok(Some(Action::ForceQuit)),
                _ => Ok(None),
            },
            SetupStep::ServerUrl => match key.code {
                KeyCode::Enter => {
                    self.advance_step();
                    Ok(None)
                }
                KeyCode::Esc => {
                    self.go_back();
                    Ok(None)
                }
                KeyCode::Backspace => {
                    self.input.pop();
                    self.error = None;
                    Ok(None)
                }
                KeyCode::Char(c) => {
                    self.input.push(c);
                    self.error = None;
                    Ok(None)
                }
                _ => Ok(None),
            },
            SetupStep::Confirm => match key.code {
                KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.save_config();
                    if self.complete {
                        Ok(Some(Action::SetupConfirm))
                    } else {
                        Ok(None)
                    }
                }
                KeyCode::Char('r') => {
                    self.reachability = Some(check_health(&self.config.api_base_url));
                    Ok(None)
                }
                KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Backspace => {
                    self.go_back();
                    Ok(None)
                }
                _ => Ok(None),
            },
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        frame.render_widget(Clear, area);
        let background = Block::default().style(Style::default().bg(Color::Reset));
        frame.render_widget(background, area);

        let margin = 4;
        let content_area = Rect::new(
            margin,
            margin,
            area.width.saturating_sub(margin * 2),
            area.height.saturating_sub(margin * 2),
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(2), // Progress
                Constraint::Min(10),   // Content
                Constraint::Length(3), // Help
            ])
            .split(content_area);

        let title = Paragraph::new(Line::from(vec![Span::styled(
            " FaceLens Setup ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, chunks[0]);

        let progress = format!("Step {} of 3: {}", self.step.step_number(), self.step.title());
        let progress_widget = Paragraph::new(Line::from(vec![Span::styled(
            progress,
            Style::default().fg(Color::DarkGray),
        )]));
        frame.render_widget(progress_widget, chunks[1]);

        match self.step {
            SetupStep::Welcome => self.draw_welcome(frame, chunks[2]),
            SetupStep::ServerUrl => self.draw_server_url(frame, chunks[2]),
            SetupStep::Confirm => self.draw_confirm(frame, chunks[2]),
        }

        let help_text = match self.step {
            SetupStep::Welcome => " Enter  Continue   Esc  Quit",
            SetupStep::ServerUrl => " Enter  Continue   Esc  Back   Type to edit",
            SetupStep::Confirm => " Enter/y  Save & Continue   r  Check again   Esc/n  Go Back",
        };
        let help = Paragraph::new(Line::from(vec![Span::styled(
            help_text,
            Style::default().fg(Color::DarkGray),
        )]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(help, chunks[3]);

        Ok(())
    }
}

impl SetupComponent {
    fn draw_welcome(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Welcome to FaceLens!",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("Upload photos, get face counts with gender and age breakdowns,"),
            Line::from("and ask questions about the results."),
            Line::from(""),
            Line::from("You will need the address of a running analysis server."),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Press Enter to begin...",
                Style::default().fg(Color::Yellow),
            )]),
        ];

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Welcome ")
                .border_style(Style::default().fg(Color::Green)),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_server_url(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(""),
            Line::from("Enter the base URL of the analysis server:"),
            Line::from(format!("(e.g. {})", crate::config::DEFAULT_API_URL)),
            Line::from(""),
            Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!("{}_", &self.input),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
            ]),
        ];

        if let Some(ref error) = self.error {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![Span::styled(
                format!("Error: {}", error),
                Style::default().fg(Color::Red),
            )]));
        }

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Server URL ")
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect) {
        let config_dir = Config::config_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.facelens".to_string());

        let reachability = match &self.reachability {
            Some(Reachability::Healthy(status)) => Span::styled(
                format!("✓ Server responded ({})", status),
                Style::default().fg(Color::Green),
            ),
            Some(Reachability::Unreachable(e)) => Span::styled(
                format!("✗ {} (you can still save)", e),
                Style::default().fg(Color::Yellow),
            ),
            None => Span::styled("Not checked", Style::default().fg(Color::DarkGray)),
        };

        let mut lines = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Review your configuration:",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Server URL: ", Style::default().fg(Color::Cyan)),
                Span::raw(self.config.api_base_url.clone()),
            ]),
            Line::from(vec![
                Span::styled("Health:     ", Style::default().fg(Color::Cyan)),
                reachability,
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Config will be saved to: ", Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{}/config.json", config_dir)),
            ]),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Press Enter or 'y' to save and continue...",
                Style::default().fg(Color::Yellow),
            )]),
        ];

        if let Some(ref error) = self.error {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![Span::styled(
                format!("Error: {}", error),
                Style::default().fg(Color::Red),
            )]));
        }

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Confirm Configuration ")
                .border_style(Style::default().fg(Color::Green)),
        );
        frame.render_widget(paragraph, area);
    }
}
