//! Image uploader component
//!
//! Collects image files from a typed or pasted path list, keeps a preview
//! for each one, and hands the selection to the session when the user
//! uploads. Previews are revoked before a new selection replaces them.

use crate::action::Action;
use crate::component::Component;
use crate::model::preview::{Preview, PreviewRegistry, Thumbnail};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use image::RgbImage;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::fs;
use std::path::{Path, PathBuf};

/// What the uploader is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploaderState {
    Idle,
    FilesSelected,
    Uploading,
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub preview: Preview,
}

pub struct ImageUploader {
    /// Path list being typed
    pub input: String,
    files: Vec<SelectedFile>,
    registry: PreviewRegistry,
    list_state: ListState,
    /// Paths dropped by the last selection
    skipped: usize,
}

impl Default for ImageUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageUploader {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            files: Vec::new(),
            registry: PreviewRegistry::new(),
            list_state: ListState::default(),
            skipped: 0,
        }
    }

    pub fn state(&self, uploading: bool) -> UploaderState {
        if uploading {
            UploaderState::Uploading
        } else if self.files.is_empty() {
            UploaderState::Idle
        } else {
            UploaderState::FilesSelected
        }
    }

    #[cfg(test)]
    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    /// Paths of the current selection, in selection order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    #[cfg(test)]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    #[cfg(test)]
    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }

    pub fn highlighted(&self) -> Option<&SelectedFile> {
        self.list_state.selected().and_then(|i| self.files.get(i))
    }

    /// Replace the selection with the image files among `paths`
    ///
    /// Directories contribute their direct children. The previous previews
    /// are revoked first, even when nothing in `paths` survives the filter.
    pub fn select_paths(&mut self, paths: Vec<PathBuf>) {
        self.revoke_all();

        let mut skipped = 0;
        for path in expand_paths(paths) {
            if path.is_file() && is_image(&path) {
                let preview = self.registry.create(&path);
                self.files.push(SelectedFile { path, preview });
            } else {
                tracing::debug!(path = %path.display(), "skipping non-image path");
                skipped += 1;
            }
        }

        self.skipped = skipped;
        self.list_state
            .select(if self.files.is_empty() { None } else { Some(0) });
        self.load_highlighted_thumbnail();
        tracing::info!(selected = self.files.len(), skipped, "files selected");
    }

    /// Store thumbnails decoded in the background; called on every tick
    pub fn poll_thumbnails(&mut self) {
        self.registry.poll_thumbnails();
    }

    /// Only the highlighted file is ever decoded
    fn load_highlighted_thumbnail(&mut self) {
        if let Some(url) = self.highlighted().map(|f| f.preview.url.clone()) {
            self.registry.request_thumbnail(&url);
        }
    }

    /// Drop the selection and release every preview
    pub fn clear(&mut self) {
        self.revoke_all();
        self.skipped = 0;
        self.list_state.select(None);
    }

    fn revoke_all(&mut self) {
        if self.files.is_empty() {
            return;
        }
        for file in self.files.drain(..) {
            self.registry.revoke(&file.preview.url);
        }
        tracing::debug!(
            live = self.registry.live_count(),
            revoked = self.registry.revoked_total(),
            "previews revoked"
        );
    }

    fn next(&mut self) {
        if self.files.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.files.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
        self.load_highlighted_thumbnail();
    }

    fn previous(&mut self) {
        if self.files.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.files.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
        self.load_highlighted_thumbnail();
    }

    pub fn draw_with_state(&mut self, frame: &mut Frame, area: Rect, uploading: bool, focused: bool) {
        let state = self.state(uploading);
        let border = if focused { Color::Cyan } else { Color::DarkGray };

        let title = match state {
            UploaderState::Idle => " Images ".to_string(),
            UploaderState::FilesSelected => format!(" Images ({}) ", self.files.len()),
            UploaderState::Uploading => " Images (uploading...) ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title)
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        // Path input
        let input_style = if state == UploaderState::Uploading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let cursor = if focused && state != UploaderState::Uploading { "_" } else { "" };
        let placeholder = self.input.is_empty() && cursor.is_empty();
        let input = Paragraph::new(Line::from(vec![
            Span::styled("path> ", Style::default().fg(Color::Cyan)),
            if placeholder {
                Span::styled("type or paste image paths", Style::default().fg(Color::DarkGray))
            } else {
                Span::styled(format!("{}{}", self.input, cursor), input_style)
            },
        ]));
        frame.render_widget(input, rows[0]);

        // File list beside the highlighted thumbnail
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(26)])
            .split(rows[1]);

        if self.files.is_empty() {
            let hint = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Enter a file or folder path, or paste paths here.",
                    Style::default().fg(Color::DarkGray),
                )),
            ]);
            frame.render_widget(hint, body[0]);
        } else {
            let items: Vec<ListItem> = self
                .files
                .iter()
                .map(|f| ListItem::new(Line::from(vec![Span::raw("  "), Span::raw(f.preview.name.clone())])))
                .collect();
            let list = List::new(items)
                .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                .highlight_symbol("▸ ");
            frame.render_stateful_widget(list, body[0], &mut self.list_state);

            let thumbnail = self
                .highlighted()
                .and_then(|f| self.registry.thumbnail_state(&f.preview.url));
            let muted = Style::default().fg(Color::DarkGray);
            match thumbnail {
                Some(Thumbnail::Ready(img)) => {
                    frame.render_widget(Paragraph::new(thumbnail_lines(img)), body[1]);
                }
                Some(Thumbnail::Loading) => {
                    frame.render_widget(Paragraph::new(Span::styled("loading...", muted)), body[1]);
                }
                Some(Thumbnail::Unavailable) => {
                    frame.render_widget(Paragraph::new(Span::styled("no preview", muted)), body[1]);
                }
                Some(Thumbnail::NotRequested) | None => {}
            }
        }

        // Status line
        let mut status = Vec::new();
        if self.skipped > 0 {
            status.push(Span::styled(
                format!("{} non-image file(s) skipped  ", self.skipped),
                Style::default().fg(Color::Yellow),
            ));
        }
        match state {
            UploaderState::FilesSelected => status.push(Span::styled(
                "Ctrl-U upload  Ctrl-L clear",
                Style::default().fg(Color::DarkGray),
            )),
            UploaderState::Uploading => status.push(Span::styled(
                "Uploading and starting analysis...",
                Style::default().fg(Color::Yellow),
            )),
            UploaderState::Idle => {}
        }
        frame.render_widget(Paragraph::new(Line::from(status)), rows[2]);
    }
}

impl Drop for ImageUploader {
    fn drop(&mut self) {
        self.revoke_all();
    }
}

impl Component for ImageUploader {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            let action = match key.code {
                KeyCode::Char('u') => Some(Action::StartUpload),
                KeyCode::Char('l') => Some(Action::ClearFiles),
                _ => None,
            };
            return Ok(action);
        }

        let action = match key.code {
            KeyCode::Enter => Some(Action::SelectTypedPaths),
            KeyCode::Backspace => Some(Action::InputBackspace),
            KeyCode::Down => Some(Action::NextItem),
            KeyCode::Up => Some(Action::PrevItem),
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
            Action::SelectTypedPaths => {
                let paths = parse_path_list(&self.input);
                if !paths.is_empty() {
                    self.input.clear();
                    self.select_paths(paths);
                }
            }
            Action::Paste(text) => self.select_paths(parse_path_list(&text)),
            Action::ClearFiles => self.clear(),
            Action::NextItem => self.next(),
            Action::PrevItem => self.previous(),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        self.draw_with_state(frame, area, false, true);
        Ok(())
    }
}

/// A file counts as an image when its guessed MIME type is `image/*`
pub fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE)
}

/// Replace each directory with its files, sorted by name
fn expand_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if !path.is_dir() {
            out.push(path);
            continue;
        }
        match fs::read_dir(&path) {
            Ok(entries) => {
                let mut children: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_file())
                    .collect();
                children.sort();
                out.extend(children);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read directory");
                out.push(path);
            }
        }
    }
    out
}

/// Split a typed or pasted path list
///
/// Paths are separated by whitespace or newlines. Single or double quotes
/// group a path containing spaces, and a backslash escapes the next
/// character (the form terminals use when files are dropped on them).
/// `file://` URIs are percent-decoded and a leading `~/` is resolved.
pub fn parse_path_list(text: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut started = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                started = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    started = true;
                }
            }
            (None, c) if c.is_whitespace() => {
                if started {
                    paths.push(resolve_path(&std::mem::take(&mut current)));
                    started = false;
                }
            }
            (None, c) => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        paths.push(resolve_path(&current));
    }
    paths
}

fn resolve_path(raw: &str) -> PathBuf {
    if raw.starts_with("file://") {
        match reqwest::Url::parse(raw).map(|url| url.to_file_path()) {
            Ok(Ok(path)) => return path,
            _ => tracing::debug!(uri = raw, "not a local file uri"),
        }
    }
    let raw = raw.strip_prefix("file://").unwrap_or(raw);
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Render a thumbnail with upper half blocks, two pixel rows per line
fn thumbnail_lines(img: &RgbImage) -> Vec<Line<'static>> {
    let (width, height) = img.dimensions();
    let mut lines = Vec::new();
    for y in (0..height).step_by(2) {
        let spans: Vec<Span> = (0..width)
            .map(|x| {
                let top = img.get_pixel(x, y).0;
                let mut style = Style::default().fg(Color::Rgb(top[0], top[1], top[2]));
                if y + 1 < height {
                    let bottom = img.get_pixel(x, y + 1).0;
                    style = style.bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
                }
                Span::styled("▀", style)
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}
