//! Root application component
//!
//! The App struct implements the Component trait, acting as the root component
//! that delegates event handling and rendering to child components.
//! Protocol state lives in `Session`; App only routes actions to it, sends
//! the requests it returns, and feeds responses back on every tick.

use crate::action::Action;
use crate::component::Component;
use crate::components::chat::SUGGESTED_QUESTIONS;
use crate::components::{
    calculate_main_layout, ChatPanel, HelpDialog, HistorySidebar, ImageUploader, QuitDialog,
    ResultPanel, SetupComponent, SummaryDialog,
};
use crate::config::{Config, ENV_API_URL};
use crate::model::modal::{Modal, ModalStack};
use crate::model::request::{ApiOutcome, ApiRequest};
use crate::model::session::Session;
use crate::model::ui::{AppMode, Focus};
use crate::services::{ApiClient, FaceApi, RequestRunner};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::sync::Arc;
use std::time::Instant;

// ═══════════════════════════════════════════════════════════════════════════════
// App Struct
// ═══════════════════════════════════════════════════════════════════════════════

/// Main application state - coordinates between components
pub struct App {
    /// Current application mode
    pub mode: AppMode,

    pub config: Config,

    /// Active analysis, transcript, history and request bookkeeping
    pub session: Session,

    /// Modal overlay stack
    pub modals: ModalStack,

    /// Panel receiving keys
    pub focus: Focus,

    /// Background request runner (absent until a server is configured)
    runner: Option<RequestRunner>,

    /// Flag to indicate the app should quit
    pub should_quit: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Child Components
    // ─────────────────────────────────────────────────────────────────────────
    pub uploader: ImageUploader,
    pub result: ResultPanel,
    pub chat: ChatPanel,
    pub history: HistorySidebar,
    pub quit_dialog: QuitDialog,
    pub help_dialog: HelpDialog,
    pub summary_dialog: SummaryDialog,
    pub setup: SetupComponent,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// App Implementation
// ═══════════════════════════════════════════════════════════════════════════════

impl App {
    /// Create a new App instance
    ///
    /// Without a saved config (and no server URL in the environment) the
    /// setup wizard runs first.
    pub fn new() -> App {
        let saved = Config::load();
        let configured = saved.is_some() || std::env::var(ENV_API_URL).is_ok();
        let config = saved.unwrap_or_default().with_env_overrides();

        if !configured {
            tracing::info!("no configuration found, starting setup");
            return Self::create_app(AppMode::Setup, config);
        }

        let mut app = Self::create_app(AppMode::Running, config);
        app.connect();
        app
    }

    /// Running app talking to the given backend
    pub fn with_api(config: Config, api: Arc<dyn FaceApi>) -> App {
        let mut app = Self::create_app(AppMode::Running, config);
        app.runner = Some(RequestRunner::new(api));
        app
    }

    fn create_app(mode: AppMode, config: Config) -> App {
        App {
            mode,
            session: Session::new(config.history_limit, config.poll_interval()),
            config,
            modals: ModalStack::new(),
            focus: Focus::default(),
            runner: None,
            should_quit: false,
            // Components
            uploader: ImageUploader::new(),
            result: ResultPanel::new(),
            chat: ChatPanel::new(),
            history: HistorySidebar::new(),
            quit_dialog: QuitDialog::default(),
            help_dialog: HelpDialog::default(),
            summary_dialog: SummaryDialog::default(),
            setup: SetupComponent::new(),
        }
    }

    /// Build the HTTP client for the configured server
    fn connect(&mut self) {
        match ApiClient::new(&self.config.api_base_url) {
            Ok(client) => {
                tracing::info!(api_base_url = %client.base_url(), "connected");
                self.runner = Some(RequestRunner::new(Arc::new(client)));
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot create HTTP client");
                self.session.error = Some(e.to_string());
            }
        }
    }

    /// Whether chat accepts input right now
    pub fn chat_enabled(&self) -> bool {
        self.session.is_chat_ready() && !self.session.chat_pending
    }

    pub fn in_flight(&self) -> usize {
        self.runner.as_ref().map_or(0, |r| r.in_flight())
    }

    /// Send requests tagged with the current session generation
    fn dispatch(&mut self, requests: Vec<ApiRequest>) {
        if requests.is_empty() {
            return;
        }
        let Some(runner) = self.runner.as_mut() else {
            tracing::warn!(count = requests.len(), "no server configured, dropping requests");
            return;
        };
        let generation = self.session.generation();
        for request in requests {
            runner.spawn(request, generation);
        }
    }

    /// Apply a session operation, resetting per-analysis UI when the
    /// active analysis changes
    fn run_session<F>(&mut self, op: F)
    where
        F: FnOnce(&mut Session) -> Vec<ApiRequest>,
    {
        let before = self.session.generation();
        let requests = op(&mut self.session);
        if self.session.generation() != before {
            self.chat.reset();
        }
        self.dispatch(requests);
    }

    /// Fold every response that arrived since the last tick into the session
    fn drain_responses(&mut self) {
        let events = match self.runner.as_mut() {
            Some(runner) => runner.poll(),
            None => return,
        };
        for event in events {
            if matches!(event.outcome, ApiOutcome::Uploaded(Ok(_))) {
                self.uploader.clear();
            }
            self.run_session(|session| session.apply(event));
        }
    }

    fn ask(&mut self, question: &str) {
        if !self.chat_enabled() {
            return;
        }
        let question = question.to_string();
        self.run_session(|session| session.send_message(&question));
    }

    /// Route an input action to the focused panel, honoring disabled states
    fn route_input(&mut self, action: Action) -> Result<()> {
        match self.focus {
            Focus::Uploader if !self.session.uploading => {
                self.uploader.update(action)?;
            }
            Focus::Chat if self.chat_enabled() => {
                self.chat.update(action)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Convert a bracketed paste into an action
    pub fn handle_paste(&mut self, text: String) -> Option<Action> {
        match self.mode {
            AppMode::Setup => {
                self.setup.input.push_str(text.trim());
                None
            }
            AppMode::Running if self.modals.is_empty() => Some(Action::Paste(text)),
            AppMode::Running => None,
        }
    }

    fn handle_global_key_event(&self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Action::OpenQuitDialog),
                KeyCode::Char('r') => Some(Action::RefreshHistory),
                KeyCode::Char('s') => Some(Action::OpenSummary),
                _ => None,
            };
        }
        match key.code {
            KeyCode::F(1) => Some(Action::OpenHelp),
            KeyCode::Tab => Some(Action::FocusNext),
            KeyCode::BackTab => Some(Action::FocusPrev),
            KeyCode::Esc if self.session.error.is_some() => Some(Action::DismissError),
            KeyCode::Esc => Some(Action::OpenQuitDialog),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Component Implementation
// ═══════════════════════════════════════════════════════════════════════════════

impl Component for App {
    fn init(&mut self) -> Result<()> {
        if self.mode == AppMode::Running {
            let requests = self.session.refresh_history();
            self.dispatch(requests);
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match self.mode {
            AppMode::Setup => self.setup.handle_key_event(key),
            AppMode::Running => {
                if let Some(modal) = self.modals.top().copied() {
                    return self.handle_modal_key_event(modal, key);
                }
                if let Some(action) = self.handle_global_key_event(key) {
                    return Ok(Some(action));
                }
                match self.focus {
                    Focus::Uploader => self.uploader.handle_key_event(key),
                    Focus::History => self.history.handle_key_event(key),
                    Focus::Chat => self.chat.handle_key_event(key),
                }
            }
        }
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            // ─────────────────────────────────────────────────────────────────
            // App Lifecycle
            // ─────────────────────────────────────────────────────────────────
            Action::Tick => {
                self.result.tick();
                self.uploader.poll_thumbnails();
                self.drain_responses();
                let due = self.session.tick(Instant::now());
                self.dispatch(due);
            }
            Action::ForceQuit => {
                self.should_quit = true;
            }
            Action::Resize(_, _) => {}

            // ─────────────────────────────────────────────────────────────────
            // Focus & Navigation
            // ─────────────────────────────────────────────────────────────────
            Action::FocusNext => self.focus = self.focus.next(),
            Action::FocusPrev => self.focus = self.focus.prev(),
            Action::NextItem => match self.focus {
                Focus::Uploader => {
                    self.uploader.update(action)?;
                }
                Focus::History => self.history.next(self.session.history.len()),
                Focus::Chat => {}
            },
            Action::PrevItem => match self.focus {
                Focus::Uploader => {
                    self.uploader.update(action)?;
                }
                Focus::History => self.history.previous(self.session.history.len()),
                Focus::Chat => {}
            },
            Action::ScrollUp | Action::ScrollDown | Action::PageUp | Action::PageDown => {
                self.chat.update(action)?;
            }

            // ─────────────────────────────────────────────────────────────────
            // Text Input (delegate to the focused panel)
            // ─────────────────────────────────────────────────────────────────
            Action::InputChar(_) | Action::InputBackspace | Action::Paste(_) => {
                self.route_input(action)?;
            }

            // ─────────────────────────────────────────────────────────────────
            // Upload
            // ─────────────────────────────────────────────────────────────────
            Action::SelectTypedPaths | Action::ClearFiles => {
                if !self.session.uploading {
                    self.uploader.update(action)?;
                }
            }
            Action::StartUpload => {
                let files = self.uploader.paths();
                self.run_session(|session| session.begin_upload(files));
            }

            // ─────────────────────────────────────────────────────────────────
            // History
            // ─────────────────────────────────────────────────────────────────
            Action::SelectHighlighted => {
                if let Some(id) = self.history.selected_id(&self.session.history).map(str::to_string) {
                    self.run_session(|session| session.select_analysis(&id));
                }
            }
            Action::RefreshHistory => {
                let requests = self.session.refresh_history();
                self.dispatch(requests);
            }

            // ─────────────────────────────────────────────────────────────────
            // Chat
            // ─────────────────────────────────────────────────────────────────
            Action::SendMessage => {
                if self.chat_enabled() {
                    let question = self.chat.take_input();
                    self.ask(&question);
                }
            }
            Action::AskSuggestion(index) => {
                if let Some(question) = SUGGESTED_QUESTIONS.get(index) {
                    self.ask(question);
                }
            }

            // ─────────────────────────────────────────────────────────────────
            // Modals & Banner
            // ─────────────────────────────────────────────────────────────────
            Action::OpenQuitDialog => {
                self.quit_dialog.pending_requests = self.in_flight();
                self.modals.push(Modal::QuitConfirm);
            }
            Action::OpenHelp => {
                self.help_dialog.scroll_offset = 0;
                self.modals.push(Modal::Help);
            }
            Action::OpenSummary => {
                let requests = self.session.request_summary();
                if requests.is_empty() {
                    self.session.error =
                        Some("A summary is available once the analysis has completed".to_string());
                } else {
                    self.summary_dialog.scroll_offset = 0;
                    self.modals.push(Modal::Summary);
                    self.dispatch(requests);
                }
            }
            Action::CloseModal => {
                self.modals.pop();
            }
            Action::DismissError => self.session.dismiss_error(),

            // ─────────────────────────────────────────────────────────────────
            // Setup Wizard
            // ─────────────────────────────────────────────────────────────────
            Action::SetupConfirm => {
                if let Some(config) = self.setup.get_config().cloned() {
                    let config = config.with_env_overrides();
                    self.session = Session::new(config.history_limit, config.poll_interval());
                    self.config = config;
                    self.mode = AppMode::Running;
                    self.connect();
                    self.init()?;
                }
            }
        }

        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        match self.mode {
            AppMode::Setup => self.setup.draw(frame, area)?,
            AppMode::Running => {
                let layout = calculate_main_layout(area, self.session.error.is_some());

                self.history.draw_with_history(
                    frame,
                    layout.history,
                    &self.session.history,
                    self.session.analysis_id.as_deref(),
                    self.focus == Focus::History,
                );
                self.uploader.draw_with_state(
                    frame,
                    layout.uploader,
                    self.session.uploading,
                    self.focus == Focus::Uploader,
                );
                self.result.draw_with_result(
                    frame,
                    layout.result,
                    self.session.result.as_ref(),
                    self.session.status,
                );
                self.chat.draw_with_messages(
                    frame,
                    layout.chat,
                    &self.session.messages,
                    self.session.is_chat_ready(),
                    self.session.chat_pending,
                    self.focus == Focus::Chat,
                );

                if let (Some(banner), Some(error)) = (layout.banner, self.session.error.as_deref()) {
                    draw_error_banner(frame, banner, error);
                }
                self.draw_help_bar(frame, layout.help);

                let modals: Vec<Modal> = self.modals.iter().copied().collect();
                for modal in modals {
                    self.draw_modal(frame, area, modal)?;
                }
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helper Methods
// ═══════════════════════════════════════════════════════════════════════════════

impl App {
    fn handle_modal_key_event(&mut self, modal: Modal, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::ForceQuit));
        }
        match modal {
            Modal::QuitConfirm => self.quit_dialog.handle_key_event(key),
            Modal::Help => self.help_dialog.handle_key_event(key),
            Modal::Summary => self.summary_dialog.handle_key_event(key),
        }
    }

    fn draw_modal(&mut self, frame: &mut Frame, area: Rect, modal: Modal) -> Result<()> {
        match modal {
            Modal::QuitConfirm => self.quit_dialog.draw(frame, area)?,
            Modal::Help => self.help_dialog.draw(frame, area)?,
            Modal::Summary => {
                self.summary_dialog
                    .draw_with_summary(frame, area, self.session.summary.as_ref());
            }
        }
        Ok(())
    }

    fn draw_help_bar(&self, frame: &mut Frame, area: Rect) {
        let key = |k: &str, color: Color| {
            Span::styled(
                format!(" {} ", k),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )
        };

        let mut spans = vec![
            key("Tab", Color::Cyan),
            Span::raw(format!("{} ", self.focus.name())),
        ];
        match self.focus {
            Focus::Uploader => {
                spans.extend([
                    key("Enter", Color::Green),
                    Span::raw("Select "),
                    key("^U", Color::Green),
                    Span::raw("Upload "),
                    key("^L", Color::Yellow),
                    Span::raw("Clear "),
                ]);
            }
            Focus::History => {
                spans.extend([
                    key("j/k", Color::Cyan),
                    Span::raw("Move "),
                    key("Enter", Color::Green),
                    Span::raw("Open "),
                    key("r", Color::Cyan),
                    Span::raw("Refresh "),
                    key("s", Color::Magenta),
                    Span::raw("Summary "),
                ]);
            }
            Focus::Chat => {
                spans.extend([
                    key("Enter", Color::Green),
                    Span::raw("Send "),
                    key("1-3", Color::Yellow),
                    Span::raw("Suggest "),
                    key("PgUp/PgDn", Color::Cyan),
                    Span::raw("Scroll "),
                ]);
            }
        }
        spans.extend([key("F1", Color::White), Span::raw("Help "), key("Esc", Color::Yellow), Span::raw("Quit")]);

        if self.session.status.is_some_and(|s| !s.is_terminal()) {
            let marker = if self.session.is_polling() { "⚙ analyzing" } else { "⏳ waiting" };
            spans.push(Span::styled(format!("  │ {}", marker), Style::default().fg(Color::Yellow)));
        }
        spans.push(Span::styled(
            format!("  │ {}", self.config.api_base_url),
            Style::default().fg(Color::DarkGray),
        ));

        let paragraph = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(paragraph, area);
    }
}

fn draw_error_banner(frame: &mut Frame, area: Rect, error: &str) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" Esc dismiss", Style::default().fg(Color::DarkGray)),
    ]);
    let banner = Paragraph::new(line).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Error "),
    );
    frame.render_widget(banner, area);
}
