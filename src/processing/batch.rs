//! Generic batch dispatcher: fans independent jobs over a bounded worker
//! set, preserving result order and isolating per-item failures.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::core::settings::MAX_CONCURRENCY;
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowError;

/// Error string reported for items skipped by a user cancellation.
pub(crate) const CANCELLED_MESSAGE: &str = "operation cancelled";

/// One failing batch item, identified by its request index.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub index: usize,
    pub message: String,
}

/// Dispatches `requests` across at most `clamp(configured, 1, min(32, M))`
/// workers pulling indices from a shared queue, so faster workers naturally
/// pick up more items.
///
/// Always returns one result per request, at the request's index, no matter
/// which worker finished first or which items failed: an item whose
/// invocation fails gets its job's fabricated failure reply. Failures,
/// including domain failures reported by the script, are additionally
/// collected as `(index, message)` pairs for the caller's surfacing policy.
pub(crate) async fn dispatch<J: Job>(
    runner: &Runner,
    requests: &[J],
    configured_workers: usize,
    cancel: &AtomicBool,
) -> (Vec<J::Output>, Vec<BatchFailure>) {
    let n = requests.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    // The whole batch is one leased use of the runner; a concurrent stop
    // (hot swap) waits for it rather than cutting it short.
    let _lease = match runner.lease().await {
        Ok(lease) => lease,
        Err(stopped) => {
            let message = stopped.to_string();
            let results = requests
                .iter()
                .map(|req| req.failed_reply(message.clone()))
                .collect();
            let failures = (0..n)
                .map(|index| BatchFailure {
                    index,
                    message: message.clone(),
                })
                .collect();
            return (results, failures);
        }
    };

    let workers = configured_workers.clamp(1, MAX_CONCURRENCY.min(n));
    debug!("dispatching {n} {} jobs across {workers} workers", J::NAME);

    // Shared work queue, fully populated up front.
    let (tx, rx) = crossbeam_channel::bounded(n);
    for index in 0..n {
        let _ = tx.send(index);
    }
    drop(tx);

    let per_worker = futures::future::join_all((0..workers).map(|_| {
        let queue = rx.clone();
        async move {
            let mut completed = Vec::new();
            while let Ok(index) = queue.try_recv() {
                let request = &requests[index];
                if cancel.load(Ordering::SeqCst) {
                    let message = CANCELLED_MESSAGE.to_string();
                    completed.push((index, request.failed_reply(message.clone()), Some(message)));
                    continue;
                }
                match runner.execute_leased(request).await {
                    Ok(reply) => {
                        let failure = if reply.success() {
                            None
                        } else {
                            Some(reply.error().unwrap_or_default().to_string())
                        };
                        completed.push((index, reply, failure));
                    }
                    Err(protocol) => {
                        let message = protocol.to_string();
                        completed.push((index, request.failed_reply(message.clone()), Some(message)));
                    }
                }
            }
            completed
        }
    }))
    .await;

    // Scatter back to request order; each index was handed to exactly one
    // worker and produced exactly one entry.
    let mut slots: Vec<Option<J::Output>> = Vec::with_capacity(n);
    slots.resize_with(n, || None);
    let mut failures = Vec::new();
    for (index, reply, failure) in per_worker.into_iter().flatten() {
        if let Some(message) = failure {
            failures.push(BatchFailure { index, message });
        }
        slots[index] = Some(reply);
    }
    failures.sort_by_key(|failure| failure.index);

    let results = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| requests[index].failed_reply("job was never dispatched".into()))
        })
        .collect();

    (results, failures)
}

/// Joins item failures into the one aggregate error the convert/compress
/// family returns alongside its results.
pub(crate) fn aggregate_error(op: &str, failures: &[BatchFailure]) -> Option<FlowError> {
    if failures.is_empty() {
        return None;
    }
    let joined = failures
        .iter()
        .map(|failure| format!("{op}[{}]: {}", failure.index, failure.message))
        .collect::<Vec<_>>()
        .join("; ");
    Some(FlowError::batch(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::script::testjob::{EchoJob, SH, temp_scripts_dir, write_echo_script};

    fn runner(dir: &std::path::Path, max_concurrency: usize) -> Runner {
        Runner::with_interpreter(SH, dir, max_concurrency).expect("runner should build")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn results_keep_request_order_under_reversed_delays() {
        let dir = temp_scripts_dir("batch-order");
        write_echo_script(&dir);
        let runner = runner(&dir, 4);

        // Earlier indices sleep longest, so completion order is roughly the
        // reverse of request order.
        let n = 8usize;
        let requests: Vec<EchoJob> = (0..n)
            .map(|i| EchoJob::with_delay(i, ((n - i) as u64) * 40))
            .collect();

        let (results, failures) =
            dispatch(&runner, &requests, 4, &AtomicBool::new(false)).await;
        assert_eq!(results.len(), n);
        assert!(failures.is_empty());
        for (i, reply) in results.iter().enumerate() {
            assert_eq!(reply.index, i, "result {i} out of order");
            assert!(reply.success);
        }
    }

    #[tokio::test]
    async fn empty_batch_short_circuits() {
        let dir = temp_scripts_dir("batch-empty");
        write_echo_script(&dir);
        let runner = runner(&dir, 4);

        let (results, failures) =
            dispatch(&runner, &Vec::<EchoJob>::new(), 4, &AtomicBool::new(false)).await;
        assert!(results.is_empty());
        assert!(failures.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn item_failures_do_not_stop_the_rest() {
        let dir = temp_scripts_dir("batch-isolation");
        write_echo_script(&dir);
        let runner = runner(&dir, 2);

        let requests: Vec<EchoJob> = (0..5)
            .map(|i| EchoJob {
                index: i,
                delay_ms: 0,
                fail: i == 1 || i == 3,
            })
            .collect();

        let (results, failures) =
            dispatch(&runner, &requests, 2, &AtomicBool::new(false)).await;
        assert_eq!(results.len(), 5);
        for (i, reply) in results.iter().enumerate() {
            assert_eq!(reply.index, i);
            if i == 1 || i == 3 {
                assert!(!reply.success);
                assert!(!reply.error.as_deref().unwrap_or_default().is_empty());
            } else {
                assert!(reply.success, "item {i} should not be affected");
            }
        }
        let failing: Vec<usize> = failures.iter().map(|f| f.index).collect();
        assert_eq!(failing, vec![1, 3]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn worker_count_never_exceeds_the_batch_size() {
        let dir = temp_scripts_dir("batch-cap");
        let log = dir.join("overlap.log");
        // Echo stub that logs start/end timestamps so the test can count
        // how many jobs overlapped.
        let body = format!(
            "#!/bin/sh\n\
             cat >/dev/null\n\
             echo \"S $(date +%s%N)\" >> {log}\n\
             sleep 0.2\n\
             echo \"E $(date +%s%N)\" >> {log}\n\
             printf '{{\"success\":true,\"index\":0,\"error\":null}}'\n",
            log = log.display()
        );
        crate::processing::script::testjob::write_script(&dir, EchoJob::SCRIPT, &body);

        // Plenty of configured workers and pool slots, but only 3 jobs.
        let runner = runner(&dir, 8);
        let requests: Vec<EchoJob> = (0..3).map(EchoJob::new).collect();
        let (results, failures) =
            dispatch(&runner, &requests, 8, &AtomicBool::new(false)).await;
        assert_eq!(results.len(), 3);
        assert!(failures.is_empty());

        let content = std::fs::read_to_string(&log).unwrap();
        let mut events: Vec<(u128, i32)> = content
            .lines()
            .filter_map(|line| {
                let (kind, stamp) = line.split_once(' ')?;
                Some((stamp.trim().parse().ok()?, if kind == "S" { 1 } else { -1 }))
            })
            .collect();
        events.sort_by_key(|&(stamp, delta)| (stamp, delta));
        let mut current = 0i32;
        let mut max = 0i32;
        for (_, delta) in events {
            current += delta;
            max = max.max(current);
        }
        assert!(max <= 3, "more workers ran than there were jobs");
    }

    #[tokio::test]
    async fn single_worker_processes_everything_in_order() {
        let dir = temp_scripts_dir("batch-sequential");
        write_echo_script(&dir);
        let runner = runner(&dir, 1);

        let requests: Vec<EchoJob> = (0..5)
            .map(|i| EchoJob::with_delay(i, (5 - i as u64) * 20))
            .collect();
        let (results, failures) =
            dispatch(&runner, &requests, 1, &AtomicBool::new(false)).await;
        assert_eq!(results.len(), 5);
        assert!(failures.is_empty());
        for (i, reply) in results.iter().enumerate() {
            assert_eq!(reply.index, i);
        }
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_items() {
        let dir = temp_scripts_dir("batch-cancel");
        write_echo_script(&dir);
        let runner = runner(&dir, 2);

        let requests: Vec<EchoJob> = (0..4).map(EchoJob::new).collect();
        let (results, failures) =
            dispatch(&runner, &requests, 2, &AtomicBool::new(true)).await;
        assert_eq!(results.len(), 4);
        assert_eq!(failures.len(), 4);
        for reply in &results {
            assert!(!reply.success);
            assert_eq!(reply.error.as_deref(), Some(CANCELLED_MESSAGE));
        }
    }

    #[tokio::test]
    async fn dispatch_against_a_stopped_runner_fails_every_item() {
        let dir = temp_scripts_dir("batch-stopped");
        write_echo_script(&dir);
        let runner = runner(&dir, 2);
        runner.stop().await;

        let requests: Vec<EchoJob> = (0..3).map(EchoJob::new).collect();
        let (results, failures) =
            dispatch(&runner, &requests, 2, &AtomicBool::new(false)).await;
        assert_eq!(results.len(), 3);
        assert_eq!(failures.len(), 3);
        for reply in &results {
            assert!(!reply.success);
        }
    }

    #[test]
    fn aggregate_error_references_failing_indices() {
        let failures = vec![
            BatchFailure {
                index: 1,
                message: "input file not found".into(),
            },
            BatchFailure {
                index: 3,
                message: "forced failure".into(),
            },
        ];
        let err = aggregate_error("convert", &failures).expect("aggregate expected");
        let text = err.to_string();
        assert!(text.contains("convert[1]"), "got {text}");
        assert!(text.contains("convert[3]"), "got {text}");
        assert!(aggregate_error("convert", &[]).is_none());
    }
}
