//! Image property adjustment (rotate, flip, brightness, contrast, ...).

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{error, info, warn};

use crate::core::types::{AdjustRequest, AdjustResult};
use crate::processing::batch;
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowResult;

impl JobOutput for AdjustResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Job for AdjustRequest {
    type Output = AdjustResult;
    const SCRIPT: &'static str = "adjuster.py";
    const NAME: &'static str = "adjust";

    fn failed_reply(&self, message: String) -> AdjustResult {
        AdjustResult {
            success: false,
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            error: Some(message),
        }
    }
}

/// Handles image adjustments.
pub struct AdjusterService {
    runner: Arc<Runner>,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl AdjusterService {
    pub fn new(runner: Arc<Runner>, workers: usize, cancel: Arc<AtomicBool>) -> Self {
        Self {
            runner,
            workers,
            cancel,
        }
    }

    /// Applies adjustments to one image.
    pub async fn adjust(&self, req: &AdjustRequest) -> FlowResult<AdjustResult> {
        info!("adjusting image: {} -> {}", req.input_path, req.output_path);

        let result = self.runner.execute(req).await?;
        if !result.success {
            error!(
                "adjustment failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }

    /// Applies adjustments to multiple images concurrently. Item failures
    /// are visible only through each result's own `success`/`error` fields.
    pub async fn adjust_batch(&self, requests: &[AdjustRequest]) -> Vec<AdjustResult> {
        info!("starting batch adjustment of {} images", requests.len());
        let (results, failures) =
            batch::dispatch(&self.runner, requests, self.workers, &self.cancel).await;
        if !failures.is_empty() {
            warn!("{} of {} adjust jobs failed", failures.len(), requests.len());
        }
        results
    }
}
