//! GIF frame extraction.

use std::sync::Arc;

use tracing::{error, info};

use crate::core::types::{GifSplitRequest, GifSplitResult};
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowResult;

impl JobOutput for GifSplitResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Job for GifSplitRequest {
    type Output = GifSplitResult;
    const SCRIPT: &'static str = "gif_splitter.py";
    const NAME: &'static str = "gif-split";

    fn failed_reply(&self, message: String) -> GifSplitResult {
        GifSplitResult {
            success: false,
            input_path: self.input_path.clone(),
            output_dir: self.output_dir.clone(),
            error: Some(message),
            ..GifSplitResult::default()
        }
    }
}

/// Handles GIF splitting.
pub struct GifSplitterService {
    runner: Arc<Runner>,
}

impl GifSplitterService {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    /// Splits a GIF into individual frames.
    pub async fn split_gif(&self, req: &GifSplitRequest) -> FlowResult<GifSplitResult> {
        info!(
            "splitting GIF: {} -> {} (frames {}..{})",
            req.input_path, req.output_dir, req.start_frame, req.end_frame
        );

        let result = self.runner.execute(req).await?;
        if result.success {
            info!("GIF split into {} frames", result.frame_count);
        } else {
            error!(
                "GIF split failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }
}
