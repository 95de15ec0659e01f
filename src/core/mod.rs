//! Core application types and state management.
//!
//! This module contains the fundamental types used throughout the backend:
//! - [`App`]: the application facade routing operations to the active engine
//! - [`AppSettings`]: user-adjustable configuration
//! - the request/result struct pair for every operation kind

pub mod settings;
mod state;
pub mod types;

pub use settings::{AppSettings, MAX_CONCURRENCY};
pub use state::App;
pub use types::*;
