//! Bounded executor pool: a global admission gate over script invocations.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::core::settings::MAX_CONCURRENCY;
use crate::processing::executor::ScriptExecutor;
use crate::processing::script::Job;
use crate::utils::{FlowError, FlowResult};

/// Caps simultaneous in-flight invocations at a fixed slot count shared
/// across *all* callers of this pool, not per batch: two batch calls issued
/// back-to-back can never together exceed the configured limit.
#[derive(Debug)]
pub struct ExecutorPool {
    executor: ScriptExecutor,
    slots: Semaphore,
    max_size: usize,
}

impl ExecutorPool {
    /// Creates a pool of `size` admission slots (clamped to `[1, 32]`),
    /// resolving the interpreter from the environment.
    pub fn new(scripts_dir: impl Into<PathBuf>, size: usize) -> FlowResult<Self> {
        Ok(Self::from_executor(ScriptExecutor::new(scripts_dir)?, size))
    }

    /// Creates a pool with an explicit interpreter.
    pub fn with_interpreter(
        interpreter: impl Into<PathBuf>,
        scripts_dir: impl Into<PathBuf>,
        size: usize,
    ) -> FlowResult<Self> {
        Ok(Self::from_executor(
            ScriptExecutor::with_interpreter(interpreter, scripts_dir)?,
            size,
        ))
    }

    fn from_executor(executor: ScriptExecutor, size: usize) -> Self {
        let size = size.clamp(1, MAX_CONCURRENCY);
        debug!("creating executor pool with {size} slots");
        Self {
            executor,
            slots: Semaphore::new(size),
            max_size: size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.executor.set_timeout(timeout);
    }

    /// Runs one job, blocking until an admission slot is free.
    ///
    /// The slot is held for the full duration of the invocation and released
    /// when the reply (or error) is in hand.
    pub async fn execute<J: Job>(&self, job: &J) -> FlowResult<J::Output> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| FlowError::spawn("executor pool is stopped"))?;
        self.executor.execute(job).await
    }

    /// Drains in-flight work, then closes the admission gate.
    ///
    /// Blocks until every slot has been returned, so no spawned process
    /// survives the stop. Safe to call more than once; later calls return
    /// as soon as the gate is observed closed.
    pub async fn stop(&self) {
        match self.slots.acquire_many(self.max_size as u32).await {
            Ok(all) => {
                self.slots.close();
                drop(all);
                debug!("executor pool stopped ({} slots drained)", self.max_size);
            }
            // Already closed by an earlier stop.
            Err(_) => {}
        }
    }
}
