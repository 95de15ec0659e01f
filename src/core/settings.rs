//! Application settings consumed by the execution core.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard upper bound on simultaneous script processes, shared by the pool,
/// the batch dispatcher and settings normalization.
pub const MAX_CONCURRENCY: usize = 32;

const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 60;

/// User-adjustable settings.
///
/// Changing `max_concurrency` (or the script timeout) triggers a hot swap of
/// the active runner and handler set; see [`crate::core::App::apply_settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Maximum simultaneous script processes, clamped to `[1, 32]` at use.
    pub max_concurrency: usize,
    /// Deadline for a single script invocation, in seconds.
    pub script_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
            script_timeout_secs: DEFAULT_SCRIPT_TIMEOUT_SECS,
        }
    }
}

impl AppSettings {
    /// Returns a copy with every field forced into its valid range.
    pub fn normalized(mut self) -> Self {
        self.max_concurrency = self.max_concurrency.clamp(1, MAX_CONCURRENCY);
        if self.script_timeout_secs == 0 {
            self.script_timeout_secs = DEFAULT_SCRIPT_TIMEOUT_SECS;
        }
        self
    }

    /// The per-invocation script deadline as a [`Duration`].
    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

/// Use 90% of CPUs, minimum of 2, capped at the pool bound.
fn default_concurrency() -> usize {
    ((num_cpus::get() * 9) / 10).clamp(2, MAX_CONCURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_clamps_concurrency_and_timeout() {
        let settings = AppSettings {
            max_concurrency: 0,
            script_timeout_secs: 0,
        }
        .normalized();
        assert_eq!(settings.max_concurrency, 1);
        assert_eq!(settings.script_timeout_secs, DEFAULT_SCRIPT_TIMEOUT_SECS);

        let settings = AppSettings {
            max_concurrency: 1000,
            script_timeout_secs: 5,
        }
        .normalized();
        assert_eq!(settings.max_concurrency, MAX_CONCURRENCY);
        assert_eq!(settings.script_timeout_secs, 5);
    }

    #[test]
    fn default_concurrency_is_in_range() {
        let settings = AppSettings::default();
        assert!(settings.max_concurrency >= 1);
        assert!(settings.max_concurrency <= MAX_CONCURRENCY);
    }
}
