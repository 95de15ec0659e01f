//! Metadata stripping and EXIF editing.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::core::types::{
    MetadataEditRequest, MetadataEditResult, MetadataStripRequest, MetadataStripResult,
};
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowResult;

impl JobOutput for MetadataStripResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl JobOutput for MetadataEditResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Strip command for the metadata tool; the script multiplexes on `action`.
#[derive(Debug, Clone, Serialize)]
struct StripPayload {
    action: &'static str,
    input_path: String,
    output_path: String,
    overwrite: bool,
}

impl Job for StripPayload {
    type Output = MetadataStripResult;
    const SCRIPT: &'static str = "metadata_tool.py";
    const NAME: &'static str = "metadata-strip";

    fn failed_reply(&self, message: String) -> MetadataStripResult {
        MetadataStripResult {
            success: false,
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            error: Some(message),
        }
    }
}

/// Edit command for the metadata tool.
#[derive(Debug, Clone, Serialize)]
struct EditPayload {
    action: &'static str,
    input_path: String,
    output_path: String,
    exif_data: HashMap<String, serde_json::Value>,
    overwrite: bool,
}

impl Job for EditPayload {
    type Output = MetadataEditResult;
    const SCRIPT: &'static str = "metadata_tool.py";
    const NAME: &'static str = "metadata-edit";

    fn failed_reply(&self, message: String) -> MetadataEditResult {
        MetadataEditResult {
            success: false,
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            error: Some(message),
        }
    }
}

/// Handles metadata operations.
pub struct MetadataService {
    runner: Arc<Runner>,
}

impl MetadataService {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    /// Removes all metadata from one image.
    pub async fn strip_metadata(
        &self,
        req: &MetadataStripRequest,
    ) -> FlowResult<MetadataStripResult> {
        info!(
            "stripping metadata: {} -> {} (overwrite={})",
            req.input_path, req.output_path, req.overwrite
        );

        let payload = StripPayload {
            action: "strip_metadata",
            input_path: req.input_path.clone(),
            output_path: req.output_path.clone(),
            overwrite: req.overwrite,
        };
        let result = self.runner.execute(&payload).await?;
        if !result.success {
            error!(
                "metadata strip failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }

    /// Writes the given EXIF fields into one image.
    pub async fn edit_metadata(&self, req: &MetadataEditRequest) -> FlowResult<MetadataEditResult> {
        info!(
            "editing metadata: {} -> {} ({} fields)",
            req.input_path,
            req.output_path,
            req.exif_data.len()
        );

        let payload = EditPayload {
            action: "edit_metadata",
            input_path: req.input_path.clone(),
            output_path: req.output_path.clone(),
            exif_data: req.exif_data.clone(),
            overwrite: req.overwrite,
        };
        let result = self.runner.execute(&payload).await?;
        if !result.success {
            error!(
                "metadata edit failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }
}
