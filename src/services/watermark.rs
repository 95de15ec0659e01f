//! Watermark application.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{error, info, warn};

use crate::core::types::{WatermarkRequest, WatermarkResult};
use crate::processing::batch;
use crate::processing::runner::Runner;
use crate::processing::script::{Job, JobOutput};
use crate::utils::FlowResult;

impl JobOutput for WatermarkResult {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Wire shape expected by the watermark script; field names differ from the
/// UI-facing request, so the translation happens here at the script edge.
#[derive(Debug, Clone, Serialize)]
struct WatermarkPayload {
    #[serde(rename = "type")]
    watermark_type: String,
    input_path: String,
    output_path: String,
    text: String,
    watermark_path: String,
    position: String,
    opacity: f64,
    watermark_scale: f64,
    font_size: u32,
    font_color: String,
    rotation: i32,
}

impl Job for WatermarkPayload {
    type Output = WatermarkResult;
    const SCRIPT: &'static str = "watermark.py";
    const NAME: &'static str = "watermark";

    fn failed_reply(&self, message: String) -> WatermarkResult {
        WatermarkResult {
            success: false,
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            error: Some(message),
        }
    }
}

impl From<&WatermarkRequest> for WatermarkPayload {
    fn from(req: &WatermarkRequest) -> Self {
        Self {
            watermark_type: req.watermark_type.clone(),
            input_path: req.input_path.clone(),
            output_path: req.output_path.clone(),
            text: req.text.clone(),
            watermark_path: req.image_path.clone(),
            position: normalize_position(&req.position),
            opacity: req.opacity,
            watermark_scale: req.scale,
            font_size: req.font_size,
            font_color: req.font_color.clone(),
            rotation: req.rotation,
        }
    }
}

/// Expands the UI's short position aliases to the names the script expects.
fn normalize_position(position: &str) -> String {
    match position {
        "tl" => "top-left",
        "tc" => "top-center",
        "tr" => "top-right",
        "cl" => "center-left",
        "c" => "center",
        "cr" => "center-right",
        "bl" => "bottom-left",
        "bc" => "bottom-center",
        "br" => "bottom-right",
        other => other,
    }
    .to_string()
}

/// Handles watermark application.
pub struct WatermarkService {
    runner: Arc<Runner>,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl WatermarkService {
    pub fn new(runner: Arc<Runner>, workers: usize, cancel: Arc<AtomicBool>) -> Self {
        Self {
            runner,
            workers,
            cancel,
        }
    }

    /// Adds a watermark to one image.
    pub async fn add_watermark(&self, req: &WatermarkRequest) -> FlowResult<WatermarkResult> {
        info!(
            "adding watermark to image: {} -> {} (type: {})",
            req.input_path, req.output_path, req.watermark_type
        );

        let payload = WatermarkPayload::from(req);
        let result = self.runner.execute(&payload).await?;
        if !result.success {
            error!(
                "watermark application failed: {}",
                result.error.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }

    /// Adds watermarks to multiple images concurrently.
    ///
    /// Item failures are visible only through each result's own
    /// `success`/`error` fields; no aggregate error is produced.
    pub async fn add_watermark_batch(&self, requests: &[WatermarkRequest]) -> Vec<WatermarkResult> {
        info!(
            "starting batch watermark application for {} images",
            requests.len()
        );
        let payloads: Vec<WatermarkPayload> = requests.iter().map(WatermarkPayload::from).collect();
        let (results, failures) =
            batch::dispatch(&self.runner, &payloads, self.workers, &self.cancel).await;
        if !failures.is_empty() {
            warn!(
                "{} of {} watermark jobs failed",
                failures.len(),
                requests.len()
            );
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_aliases_expand() {
        assert_eq!(normalize_position("tl"), "top-left");
        assert_eq!(normalize_position("c"), "center");
        assert_eq!(normalize_position("br"), "bottom-right");
        assert_eq!(normalize_position("bottom-center"), "bottom-center");
    }

    #[test]
    fn payload_uses_the_script_field_names() {
        let req = WatermarkRequest {
            input_path: "in.png".into(),
            output_path: "out.png".into(),
            watermark_type: "text".into(),
            text: "draft".into(),
            position: "br".into(),
            opacity: 0.5,
            ..WatermarkRequest::default()
        };
        let value = serde_json::to_value(WatermarkPayload::from(&req)).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["position"], "bottom-right");
        assert!(value.get("watermark_path").is_some());
        assert!(value.get("image_path").is_none());
    }
}
