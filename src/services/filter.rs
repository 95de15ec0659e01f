//! Filter application (blur, sharpen, grayscale, ...).

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{error, info, warn};

use crate::core::types::{FilterRequest, FilterResult};
use crate::processing::batch;
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowResult;

impl JobOutput for FilterResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Wire shape expected by the filter script ("filter", not "filter_type").
#[derive(Debug, Clone, Serialize)]
struct FilterPayload {
    input_path: String,
    output_path: String,
    filter: String,
    intensity: f64,
}

impl Job for FilterPayload {
    type Output = FilterResult;
    const SCRIPT: &'static str = "filter.py";
    const NAME: &'static str = "filter";

    fn failed_reply(&self, message: String) -> FilterResult {
        FilterResult {
            success: false,
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            error: Some(message),
        }
    }
}

impl From<&FilterRequest> for FilterPayload {
    fn from(req: &FilterRequest) -> Self {
        Self {
            input_path: req.input_path.clone(),
            output_path: req.output_path.clone(),
            filter: req.filter_type.clone(),
            intensity: req.intensity,
        }
    }
}

/// Handles filter application.
pub struct FilterService {
    runner: Arc<Runner>,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl FilterService {
    pub fn new(runner: Arc<Runner>, workers: usize, cancel: Arc<AtomicBool>) -> Self {
        Self {
            runner,
            workers,
            cancel,
        }
    }

    /// Applies a filter to one image.
    pub async fn apply_filter(&self, req: &FilterRequest) -> FlowResult<FilterResult> {
        info!(
            "applying filter to image: {} -> {} (filter: {})",
            req.input_path, req.output_path, req.filter_type
        );

        let payload = FilterPayload::from(req);
        let result = self.runner.execute(&payload).await?;
        if !result.success {
            error!(
                "filter application failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }

    /// Applies filters to multiple images concurrently. Item failures are
    /// visible only through each result's own `success`/`error` fields.
    pub async fn apply_filter_batch(&self, requests: &[FilterRequest]) -> Vec<FilterResult> {
        info!("starting batch filter application for {} images", requests.len());
        let payloads: Vec<FilterPayload> = requests.iter().map(FilterPayload::from).collect();
        let (results, failures) =
            batch::dispatch(&self.runner, &payloads, self.workers, &self.cancel).await;
        if !failures.is_empty() {
            warn!("{} of {} filter jobs failed", failures.len(), requests.len());
        }
        results
    }
}
