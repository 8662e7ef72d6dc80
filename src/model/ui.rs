//! UI state - presentation state separate from session data

/// Main application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Setup,
    Running,
}

/// Panel receiving keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Uploader,
    History,
    Chat,
}

impl Focus {
    pub fn next(self) -> Focus {
        match self {
            Focus::Uploader => Focus::History,
            Focus::History => Focus::Chat,
            Focus::Chat => Focus::Uploader,
        }
    }

    pub fn prev(self) -> Focus {
        match self {
            Focus::Uploader => Focus::Chat,
            Focus::History => Focus::Uploader,
            Focus::Chat => Focus::History,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Focus::Uploader => "Images",
            Focus::History => "History",
            Focus::Chat => "Chat",
        }
    }
}
