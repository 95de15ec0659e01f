//! The active runner: single or pooled execution behind one handle.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::processing::executor::ScriptExecutor;
use crate::processing::pool::ExecutorPool;
use crate::processing::script::Job;
use crate::utils::{FlowError, FlowResult, find_python};

enum RunnerKind {
    Single(ScriptExecutor),
    Pool(ExecutorPool),
}

/// Executes jobs either one-at-a-time or through a bounded pool, chosen by
/// the configured concurrency limit.
///
/// The runner tracks its in-flight users through a usage gate: every API
/// call (a single job, or one whole batch dispatch) holds a lease for its
/// duration, and [`Runner::stop`] waits until all leases are released before
/// retiring the underlying executor. This is what lets a hot swap retire the
/// previous runner without disturbing work already dispatched against it.
pub struct Runner {
    kind: RunnerKind,
    /// `true` once stopped; leases are shared reads, stop is the writer.
    gate: RwLock<bool>,
}

/// Marks one in-flight use of a runner. Held for the full duration of a
/// single call or a whole batch; `stop` blocks until every lease is dropped.
pub(crate) struct RunnerLease<'a> {
    _guard: RwLockReadGuard<'a, bool>,
}

impl Runner {
    /// Builds a runner for the given concurrency limit, resolving the
    /// interpreter from the environment. A limit of 1 gets a bare single
    /// executor; anything higher gets a pooled one.
    pub fn new(scripts_dir: impl Into<PathBuf>, max_concurrency: usize) -> FlowResult<Self> {
        let interpreter = find_python()?;
        Self::with_interpreter(interpreter, scripts_dir, max_concurrency)
    }

    /// Builds a runner with an explicit interpreter.
    pub fn with_interpreter(
        interpreter: impl Into<PathBuf>,
        scripts_dir: impl Into<PathBuf>,
        max_concurrency: usize,
    ) -> FlowResult<Self> {
        let kind = if max_concurrency > 1 {
            RunnerKind::Pool(ExecutorPool::with_interpreter(
                interpreter,
                scripts_dir,
                max_concurrency,
            )?)
        } else {
            RunnerKind::Single(ScriptExecutor::with_interpreter(interpreter, scripts_dir)?)
        };
        Ok(Self {
            kind,
            gate: RwLock::new(false),
        })
    }

    /// The number of jobs this runner will execute simultaneously.
    pub fn capacity(&self) -> usize {
        match &self.kind {
            RunnerKind::Single(_) => 1,
            RunnerKind::Pool(pool) => pool.max_size(),
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        match &mut self.kind {
            RunnerKind::Single(executor) => executor.set_timeout(timeout),
            RunnerKind::Pool(pool) => pool.set_timeout(timeout),
        }
    }

    /// Runs one job as its own leased use of this runner.
    pub async fn execute<J: Job>(&self, job: &J) -> FlowResult<J::Output> {
        let _lease = self.lease().await?;
        self.execute_leased(job).await
    }

    /// Takes out a lease covering a multi-job use (one batch dispatch).
    pub(crate) async fn lease(&self) -> FlowResult<RunnerLease<'_>> {
        let guard = self.gate.read().await;
        if *guard {
            return Err(FlowError::spawn("runner is stopped"));
        }
        Ok(RunnerLease { _guard: guard })
    }

    /// Runs one job under a lease the caller already holds.
    ///
    /// Batch workers must use this instead of [`Runner::execute`]: taking a
    /// fresh lease per item would deadlock against a stop already queued
    /// behind the batch's own lease.
    pub(crate) async fn execute_leased<J: Job>(&self, job: &J) -> FlowResult<J::Output> {
        match &self.kind {
            RunnerKind::Single(executor) => executor.execute(job).await,
            RunnerKind::Pool(pool) => pool.execute(job).await,
        }
    }

    /// Retires the runner: waits for every in-flight lease to be released,
    /// marks the runner stopped, then releases executor resources.
    /// Idempotent; a second stop returns once the first has completed.
    pub async fn stop(&self) {
        let mut stopped = self.gate.write().await;
        if *stopped {
            return;
        }
        *stopped = true;
        debug!("stopping runner (capacity {})", self.capacity());
        match &self.kind {
            RunnerKind::Single(executor) => executor.stop().await,
            RunnerKind::Pool(pool) => pool.stop().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::script::testjob::{EchoJob, SH, temp_scripts_dir, write_echo_script};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn capacity_follows_the_concurrency_limit() {
        let dir = temp_scripts_dir("runner-capacity");
        write_echo_script(&dir);

        assert_eq!(Runner::with_interpreter(SH, &dir, 1).unwrap().capacity(), 1);
        assert_eq!(Runner::with_interpreter(SH, &dir, 8).unwrap().capacity(), 8);
    }

    #[tokio::test]
    async fn execute_after_stop_is_rejected() {
        let dir = temp_scripts_dir("runner-stopped");
        write_echo_script(&dir);

        let runner = Runner::with_interpreter(SH, &dir, 2).unwrap();
        runner.stop().await;
        runner.stop().await;

        let err = runner.execute(&EchoJob::new(0)).await.unwrap_err();
        assert!(matches!(err, FlowError::Spawn(_)), "got {err:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_waits_for_leased_users() {
        let dir = temp_scripts_dir("runner-drain");
        write_echo_script(&dir);

        let runner = Arc::new(Runner::with_interpreter(SH, &dir, 2).unwrap());
        let worker = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.execute(&EchoJob::with_delay(0, 300)).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let before = Instant::now();
        runner.stop().await;
        assert!(
            before.elapsed() >= Duration::from_millis(150),
            "stop returned while a lease was outstanding"
        );
        assert!(worker.await.unwrap().unwrap().success);
    }
}
