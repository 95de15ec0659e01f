//! The job envelope: the request/script/reply contract and its invocation.
//!
//! Every operation is one script run: the request serializes to JSON on the
//! child's stdin, the child writes one JSON reply to stdout, stderr is
//! captured for diagnostics. A reply with `success: false` is a normal
//! domain-level outcome, not a protocol failure.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::utils::{FlowError, FlowResult};

/// A request that can be executed as one script invocation.
///
/// Implementors fix which script services the operation and how to fabricate
/// a reply when the invocation fails before the script produced one, so that
/// batch dispatch can always report a full result sequence.
pub trait Job: Serialize + Send + Sync {
    /// The structured reply the script writes to stdout.
    type Output: JobOutput + DeserializeOwned + Send + 'static;

    /// Script file that services this operation kind.
    const SCRIPT: &'static str;

    /// Short operation label used in logs and aggregate batch errors.
    const NAME: &'static str;

    /// Builds the reply reported when no structured reply was produced.
    fn failed_reply(&self, message: String) -> Self::Output;
}

/// Accessors shared by every script reply.
pub trait JobOutput {
    fn success(&self) -> bool;
    fn error(&self) -> Option<&str>;
}

/// Runs one job as one script process and parses its reply.
///
/// Failure modes map onto the error taxonomy: the process could not start
/// ([`FlowError::Spawn`]), it exited non-zero or timed out
/// ([`FlowError::Script`], with stderr attached), or it exited cleanly with
/// an undecodable reply ([`FlowError::Parse`]).
pub(crate) async fn invoke_script<J: Job>(
    interpreter: &Path,
    scripts_dir: &Path,
    job: &J,
    timeout: Duration,
) -> FlowResult<J::Output> {
    let script_path = scripts_dir.join(J::SCRIPT);
    if !script_path.is_file() {
        return Err(FlowError::spawn(format!(
            "script not found: {}",
            script_path.display()
        )));
    }

    let payload = serde_json::to_vec(job)
        .map_err(|e| FlowError::parse(format!("failed to encode {} request: {e}", J::NAME)))?;

    let mut child = Command::new(interpreter)
        .arg(&script_path)
        .env("PYTHONUTF8", "1")
        .env("PYTHONIOENCODING", "utf-8")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| FlowError::spawn(format!("failed to start {}: {e}", J::SCRIPT)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| FlowError::spawn(format!("no stdin pipe for {}", J::SCRIPT)))?;
    stdin
        .write_all(&payload)
        .await
        .map_err(|e| FlowError::script(format!("failed to write request to {}: {e}", J::SCRIPT)))?;
    // Closing stdin signals end-of-request to the script.
    drop(stdin);

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(collected) => collected.map_err(|e| {
            FlowError::script(format!("failed to collect output from {}: {e}", J::SCRIPT))
        })?,
        // Dropping the timed-out child kills it (kill_on_drop).
        Err(_) => {
            return Err(FlowError::script(format!(
                "{} timed out after {}s",
                J::SCRIPT,
                timeout.as_secs_f64()
            )));
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    relay_stderr(J::SCRIPT, &stderr);

    if !output.status.success() {
        return Err(FlowError::script(format!(
            "{} exited with {}: {}",
            J::SCRIPT,
            output.status,
            stderr.trim()
        )));
    }

    let reply: J::Output = serde_json::from_slice(&output.stdout).map_err(|e| {
        FlowError::parse(format!(
            "undecodable reply from {}: {e}; output: {}",
            J::SCRIPT,
            String::from_utf8_lossy(&output.stdout).trim()
        ))
    })?;

    // A failure reply without a message is indistinguishable from a broken
    // script; reject it at the parse edge.
    if !reply.success() && reply.error().is_none_or(|e| e.trim().is_empty()) {
        return Err(FlowError::parse(format!(
            "{} reported failure without an error message",
            J::SCRIPT
        )));
    }

    Ok(reply)
}

/// Forwards script stderr lines to the structured log, keyed by level marker.
fn relay_stderr(script: &str, stderr: &str) {
    for line in stderr.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.contains("INFO") {
            info!("[{script}] {line}");
        } else if line.contains("WARNING") {
            warn!("[{script}] {line}");
        } else {
            error!("[{script}] {line}");
        }
    }
}

#[cfg(test)]
pub(crate) mod testjob {
    //! A stub job backed by `/bin/sh` scripts, shared by the processing tests.

    use super::{Job, JobOutput};
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub const SH: &str = "/bin/sh";

    #[derive(Debug, Clone, Serialize)]
    pub struct EchoJob {
        pub index: usize,
        pub delay_ms: u64,
        pub fail: bool,
    }

    impl EchoJob {
        pub fn new(index: usize) -> Self {
            Self {
                index,
                delay_ms: 0,
                fail: false,
            }
        }

        pub fn with_delay(index: usize, delay_ms: u64) -> Self {
            Self {
                index,
                delay_ms,
                fail: false,
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct EchoReply {
        pub success: bool,
        #[serde(default)]
        pub index: usize,
        #[serde(default)]
        pub error: Option<String>,
    }

    impl JobOutput for EchoReply {
        fn success(&self) -> bool {
            self.success
        }

        fn error(&self) -> Option<&str> {
            self.error.as_deref()
        }
    }

    impl Job for EchoJob {
        type Output = EchoReply;
        const SCRIPT: &'static str = "echo_job.py";
        const NAME: &'static str = "echo";

        fn failed_reply(&self, message: String) -> EchoReply {
            EchoReply {
                success: false,
                index: self.index,
                error: Some(message),
            }
        }
    }

    /// Shell source for the default echo stub: honors `delay_ms`, reports
    /// `fail: true` as a domain failure, echoes the index back.
    pub const ECHO_SCRIPT: &str = r#"#!/bin/sh
in=$(cat)
idx=$(printf '%s' "$in" | sed -n 's/.*"index":\([0-9]*\).*/\1/p')
delay=$(printf '%s' "$in" | sed -n 's/.*"delay_ms":\([0-9]*\).*/\1/p')
if [ -n "$delay" ] && [ "$delay" -gt 0 ]; then
    sleep "$(awk -v ms="$delay" 'BEGIN{printf "%.3f", ms/1000}')"
fi
case "$in" in
*'"fail":true'*)
    printf '{"success":false,"index":%s,"error":"forced failure"}' "${idx:-0}"
    ;;
*)
    printf '{"success":true,"index":%s,"error":null}' "${idx:-0}"
    ;;
esac
"#;

    /// Creates a unique scratch scripts directory for one test.
    pub fn temp_scripts_dir(label: &str) -> PathBuf {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "imageflow-{label}-{}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).expect("failed to create temp scripts dir");
        dir
    }

    pub fn write_script(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).expect("failed to write stub script");
    }

    pub fn write_echo_script(dir: &Path) {
        write_script(dir, EchoJob::SCRIPT, ECHO_SCRIPT);
    }
}
