//! External service interactions
//!
//! This module contains services for talking to the analysis backend:
//! - HTTP client and error normalization
//! - Background request execution
//! - Status poll timing

pub mod api;
pub mod poller;
pub mod request_runner;

pub use api::{ApiClient, FaceApi};
pub use request_runner::RequestRunner;
