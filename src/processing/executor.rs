//! Single-job executor: one subprocess per call, no internal concurrency.

use std::path::PathBuf;
use std::time::Duration;

use crate::processing::script::{Job, invoke_script};
use crate::utils::{FlowError, FlowResult, find_python};

const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Executes one job per invocation of the envelope protocol.
///
/// Concurrent callers are each given their own subprocess, so the executor
/// is correct under concurrency but provides no bound on simultaneous
/// processes; use [`crate::processing::ExecutorPool`] for that.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    interpreter: PathBuf,
    scripts_dir: PathBuf,
    timeout: Duration,
}

impl ScriptExecutor {
    /// Creates an executor bound to a scripts directory, resolving the
    /// interpreter from the environment.
    pub fn new(scripts_dir: impl Into<PathBuf>) -> FlowResult<Self> {
        let interpreter = find_python()?;
        Self::with_interpreter(interpreter, scripts_dir)
    }

    /// Creates an executor with an explicit interpreter.
    pub fn with_interpreter(
        interpreter: impl Into<PathBuf>,
        scripts_dir: impl Into<PathBuf>,
    ) -> FlowResult<Self> {
        let scripts_dir = scripts_dir.into();
        if !scripts_dir.is_dir() {
            return Err(FlowError::settings(format!(
                "scripts directory not found: {}",
                scripts_dir.display()
            )));
        }
        Ok(Self {
            interpreter: interpreter.into(),
            scripts_dir,
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Runs one job to completion and returns its parsed reply.
    pub async fn execute<J: Job>(&self, job: &J) -> FlowResult<J::Output> {
        invoke_script(&self.interpreter, &self.scripts_dir, job, self.timeout).await
    }

    /// No persistent resources are owned; per-call subprocesses are already
    /// reaped when `execute` returns.
    pub async fn stop(&self) {}
}
