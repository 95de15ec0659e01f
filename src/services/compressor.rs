//! Image compression.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{error, info};

use crate::core::types::{CompressRequest, CompressResult};
use crate::processing::batch::{self, aggregate_error};
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::{FlowError, FlowResult};

impl JobOutput for CompressResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Job for CompressRequest {
    type Output = CompressResult;
    const SCRIPT: &'static str = "compressor.py";
    const NAME: &'static str = "compress";

    fn failed_reply(&self, message: String) -> CompressResult {
        CompressResult {
            success: false,
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            error: Some(message),
            ..CompressResult::default()
        }
    }
}

/// Handles image compression.
pub struct CompressorService {
    runner: Arc<Runner>,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl CompressorService {
    pub fn new(runner: Arc<Runner>, workers: usize, cancel: Arc<AtomicBool>) -> Self {
        Self {
            runner,
            workers,
            cancel,
        }
    }

    /// Compresses one image.
    pub async fn compress(&self, req: &CompressRequest) -> FlowResult<CompressResult> {
        info!(
            "compressing image: {} -> {} (level: {})",
            req.input_path, req.output_path, req.level
        );

        let result = self.runner.execute(req).await?;
        if result.success {
            info!(
                "compression completed: {} -> {} bytes ({:.1}%)",
                result.original_size,
                result.compressed_size,
                result.compression_rate * 100.0
            );
        } else {
            error!(
                "compression failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }

    /// Compresses multiple images concurrently; failing items are joined
    /// into one aggregate error alongside the full result sequence.
    pub async fn compress_batch(
        &self,
        requests: &[CompressRequest],
    ) -> (Vec<CompressResult>, Option<FlowError>) {
        info!("starting batch compression of {} images", requests.len());
        let (results, failures) =
            batch::dispatch(&self.runner, requests, self.workers, &self.cancel).await;
        info!("batch compression completed");
        let aggregate = aggregate_error(CompressRequest::NAME, &failures);
        (results, aggregate)
    }
}
