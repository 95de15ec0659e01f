//! PDF generation from image sequences.

use std::sync::Arc;

use tracing::{error, info};

use crate::core::types::{PdfRequest, PdfResult};
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowResult;

impl JobOutput for PdfResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Job for PdfRequest {
    type Output = PdfResult;
    const SCRIPT: &'static str = "pdf_generator.py";
    const NAME: &'static str = "pdf";

    fn failed_reply(&self, message: String) -> PdfResult {
        PdfResult {
            success: false,
            output_path: self.output_path.clone(),
            error: Some(message),
            ..PdfResult::default()
        }
    }
}

/// Handles PDF generation.
pub struct PdfGeneratorService {
    runner: Arc<Runner>,
}

impl PdfGeneratorService {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    /// Builds one PDF from a sequence of images.
    pub async fn generate_pdf(&self, req: &PdfRequest) -> FlowResult<PdfResult> {
        info!(
            "generating PDF from {} images -> {}",
            req.image_paths.len(),
            req.output_path
        );

        let result = self.runner.execute(req).await?;
        if result.success {
            info!(
                "PDF generated: {} pages, {} bytes",
                result.page_count, result.file_size
            );
        } else {
            error!(
                "PDF generation failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }
}
