//! Image format conversion.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{error, info};

use crate::core::types::{ConvertRequest, ConvertResult};
use crate::processing::batch::{self, aggregate_error};
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::{FlowError, FlowResult};

impl JobOutput for ConvertResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Job for ConvertRequest {
    type Output = ConvertResult;
    const SCRIPT: &'static str = "converter.py";
    const NAME: &'static str = "convert";

    fn failed_reply(&self, message: String) -> ConvertResult {
        ConvertResult {
            success: false,
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            error: Some(message),
        }
    }
}

/// Handles image format conversion.
pub struct ConverterService {
    runner: Arc<Runner>,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl ConverterService {
    pub fn new(runner: Arc<Runner>, workers: usize, cancel: Arc<AtomicBool>) -> Self {
        Self {
            runner,
            workers,
            cancel,
        }
    }

    /// Converts one image to a different format.
    pub async fn convert(&self, req: &ConvertRequest) -> FlowResult<ConvertResult> {
        info!(
            "converting image: {} -> {} (format: {})",
            req.input_path, req.output_path, req.format
        );

        let result = self.runner.execute(req).await?;
        if !result.success {
            error!(
                "conversion failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }

    /// Converts multiple images concurrently.
    ///
    /// Every request gets a result at its own index. Failing items are
    /// additionally joined into one aggregate error.
    pub async fn convert_batch(
        &self,
        requests: &[ConvertRequest],
    ) -> (Vec<ConvertResult>, Option<FlowError>) {
        info!("starting batch conversion of {} images", requests.len());
        let (results, failures) =
            batch::dispatch(&self.runner, requests, self.workers, &self.cancel).await;
        info!("batch conversion completed");
        let aggregate = aggregate_error(ConvertRequest::NAME, &failures);
        (results, aggregate)
    }
}
