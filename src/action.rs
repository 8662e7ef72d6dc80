//! Action enum - All possible application actions
//!
//! Components turn key events into Actions; the App routes them to the
//! session and to the components that own the affected state.

use std::fmt;

/// All possible actions in the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ─────────────────────────────────────────────────────────────────────────
    // App Lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    /// Regular tick: drains request outcomes and drives the poll timer
    Tick,
    /// Terminal was resized
    Resize(u16, u16),
    /// Force quit without confirmation
    ForceQuit,

    // ─────────────────────────────────────────────────────────────────────────
    // Focus & Navigation
    // ─────────────────────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    /// Move to next item in the focused list
    NextItem,
    /// Move to previous item in the focused list
    PrevItem,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,

    // ─────────────────────────────────────────────────────────────────────────
    // Text Input
    // ─────────────────────────────────────────────────────────────────────────
    InputChar(char),
    InputBackspace,
    /// Bracketed paste into the focused panel
    Paste(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Upload
    // ─────────────────────────────────────────────────────────────────────────
    /// Select the paths typed into the uploader
    SelectTypedPaths,
    ClearFiles,
    /// Upload the selection and start its analysis
    StartUpload,

    // ─────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────
    /// Open the analysis under the history cursor
    SelectHighlighted,
    RefreshHistory,

    // ─────────────────────────────────────────────────────────────────────────
    // Chat
    // ─────────────────────────────────────────────────────────────────────────
    /// Send the typed question
    SendMessage,
    /// Send one of the suggested questions
    AskSuggestion(usize),

    // ─────────────────────────────────────────────────────────────────────────
    // Modals & Banner
    // ─────────────────────────────────────────────────────────────────────────
    OpenQuitDialog,
    OpenHelp,
    OpenSummary,
    CloseModal,
    DismissError,

    // ─────────────────────────────────────────────────────────────────────────
    // Setup Wizard
    // ─────────────────────────────────────────────────────────────────────────
    /// Confirm setup configuration
    SetupConfirm,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Tick => write!(f, "Tick"),
            Action::Resize(w, h) => write!(f, "Resize({}, {})", w, h),
            Action::ForceQuit => write!(f, "ForceQuit"),
            Action::FocusNext => write!(f, "FocusNext"),
            Action::FocusPrev => write!(f, "FocusPrev"),
            Action::NextItem => write!(f, "NextItem"),
            Action::PrevItem => write!(f, "PrevItem"),
            Action::ScrollUp => write!(f, "ScrollUp"),
            Action::ScrollDown => write!(f, "ScrollDown"),
            Action::PageUp => write!(f, "PageUp"),
            Action::PageDown => write!(f, "PageDown"),
            Action::InputChar(c) => write!(f, "InputChar('{}')", c),
            Action::InputBackspace => write!(f, "InputBackspace"),
            Action::Paste(text) => write!(f, "Paste({} chars)", text.chars().count()),
            Action::SelectTypedPaths => write!(f, "SelectTypedPaths"),
            Action::ClearFiles => write!(f, "ClearFiles"),
            Action::StartUpload => write!(f, "StartUpload"),
            Action::SelectHighlighted => write!(f, "SelectHighlighted"),
            Action::RefreshHistory => write!(f, "RefreshHistory"),
            Action::SendMessage => write!(f, "SendMessage"),
            Action::AskSuggestion(i) => write!(f, "AskSuggestion({})", i),
            Action::OpenQuitDialog => write!(f, "OpenQuitDialog"),
            Action::OpenHelp => write!(f, "OpenHelp"),
            Action::OpenSummary => write!(f, "OpenSummary"),
            Action::CloseModal => write!(f, "CloseModal"),
            Action::DismissError => write!(f, "DismissError"),
            Action::SetupConfirm => write!(f, "SetupConfirm"),
        }
    }
}
