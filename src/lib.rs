//! Process-pool job execution core for the ImageFlow desktop application.
//!
//! The UI dispatches image-editing operations here; the actual pixel work is
//! done by external scripts invoked as subprocesses. This crate owns the
//! request/reply envelope, the bounded executor pool, the order-preserving
//! batch dispatcher and the hot swap of the execution backend when the
//! concurrency setting changes.

// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;
pub mod services;

// Public exports for external consumers
pub use crate::core::{App, AppSettings, MAX_CONCURRENCY};
pub use crate::processing::{ExecutorPool, Job, JobOutput, Runner, ScriptExecutor};
pub use crate::utils::{FlowError, FlowResult};
