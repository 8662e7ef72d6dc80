//! Model layer - centralized state management
//!
//! This module contains all state-related types:
//! - `analysis` / `chat` - records exchanged with the backend
//! - `Session` - the active analysis and its request protocols
//! - `PreviewRegistry` - local previews of selected images
//! - `ModalStack` - Modal overlay management

pub mod analysis;
pub mod chat;
pub mod modal;
pub mod preview;
pub mod request;
pub mod session;
pub mod ui;

