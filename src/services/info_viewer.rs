//! Image information retrieval.

use std::sync::Arc;

use tracing::{error, info};

use crate::core::types::{InfoRequest, InfoResult};
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowResult;

impl JobOutput for InfoResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Job for InfoRequest {
    type Output = InfoResult;
    const SCRIPT: &'static str = "info_viewer.py";
    const NAME: &'static str = "info";

    fn failed_reply(&self, message: String) -> InfoResult {
        InfoResult {
            success: false,
            input_path: self.input_path.clone(),
            error: Some(message),
            ..InfoResult::default()
        }
    }
}

/// Handles image information requests.
pub struct InfoViewerService {
    runner: Arc<Runner>,
}

impl InfoViewerService {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    /// Reads format, dimensions, EXIF and histogram data for one image.
    pub async fn get_info(&self, req: &InfoRequest) -> FlowResult<InfoResult> {
        info!("getting info for image: {}", req.input_path);

        let result = self.runner.execute(req).await?;
        if result.success {
            info!(
                "info retrieved: {}x{} {}",
                result.width, result.height, result.format
            );
        } else {
            error!(
                "info retrieval failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }
}
