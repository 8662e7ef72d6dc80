//! UI Components
//!
//! Each component encapsulates its own state, event handling, and rendering logic.
//! Components communicate through Actions rather than direct state mutation.

pub mod chat;
pub mod help_dialog;
pub mod history;
pub mod layout;
pub mod quit_dialog;
pub mod result;
pub mod setup;
pub mod summary_dialog;
pub mod uploader;

pub use chat::ChatPanel;
pub use help_dialog::HelpDialog;
pub use history::HistorySidebar;
pub use layout::{calculate_main_layout, centered_popup};
pub use quit_dialog::QuitDialog;
pub use result::ResultPanel;
pub use setup::SetupComponent;
pub use summary_dialog::SummaryDialog;
pub use uploader::ImageUploader;
