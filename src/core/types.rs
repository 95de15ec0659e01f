//! Request and result types for every image operation.
//!
//! One struct pair per operation kind. These are the wire shapes exchanged
//! with both the UI layer and the external scripts: field names are stable
//! and requests serialize losslessly to JSON. Result structs default every
//! field so a script may report a failure with nothing but `success` and
//! `error` populated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request to convert an image to a different format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertRequest {
    pub input_path: String,
    pub output_path: String,
    pub format: String,
    pub quality: u32,
    pub width: u32,
    pub height: u32,
    pub maintain_ar: bool,
    /// Resize mode: "original", "percent", "fixed", "long_edge"
    pub resize_mode: String,
    /// Used when `resize_mode` is "percent"
    pub scale_percent: u32,
    /// Used when `resize_mode` is "long_edge"
    pub long_edge: u32,
    /// Preserve EXIF when possible
    pub keep_metadata: bool,
    /// 0-9 for PNG
    pub compress_level: u32,
    /// Icon sizes for ICO output (16, 32, 64, 128, 256)
    pub ico_sizes: Vec<u32>,
}

/// Result of an image conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertResult {
    pub success: bool,
    pub input_path: String,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to compress an image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressRequest {
    pub input_path: String,
    pub output_path: String,
    /// 1=lossless, 2=light, 3=medium, 4=heavy, 5=extreme
    pub level: u32,
    /// auto, mozjpeg, pngquant, oxipng, pillow
    #[serde(skip_serializing_if = "String::is_empty")]
    pub engine: String,
    /// Best-effort target size; 0 disables
    pub target_size_kb: u32,
    /// Attempt to remove metadata when possible
    pub strip_metadata: bool,
}

/// Result of image compression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressResult {
    pub success: bool,
    pub input_path: String,
    pub output_path: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_rate: f64,
    pub compression_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to build a PDF from a sequence of images.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfRequest {
    pub image_paths: Vec<String>,
    pub output_path: String,
    /// A4, Letter, etc.
    pub page_size: String,
    /// portrait or landscape
    pub layout: String,
    /// Page margin in points
    pub margin: u32,
    /// 0=none, 1-3 JPEG quality
    pub compression_level: u32,
    pub title: String,
    pub author: String,
}

/// Result of PDF generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfResult {
    pub success: bool,
    pub output_path: String,
    pub page_count: u32,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to split an animated GIF into frames.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GifSplitRequest {
    pub input_path: String,
    pub output_dir: String,
    pub start_frame: u32,
    pub end_frame: u32,
    /// Frame output format: png, jpg, etc.
    pub format: String,
}

/// Result of GIF splitting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GifSplitResult {
    pub success: bool,
    pub input_path: String,
    pub output_dir: String,
    pub frame_count: u32,
    pub frame_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request for image information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoRequest {
    pub input_path: String,
}

/// Image information: dimensions, format, EXIF and histogram data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoResult {
    pub success: bool,
    pub input_path: String,
    pub file_name: String,
    pub format: String,
    pub mode: String,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub file_size: u64,
    /// Modification time as a Unix timestamp
    pub modified: i64,
    pub exif: HashMap<String, String>,
    pub metadata: HashMap<String, HashMap<String, String>>,
    pub histogram: HashMap<String, Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to strip all metadata from an image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataStripRequest {
    pub input_path: String,
    pub output_path: String,
    pub overwrite: bool,
}

/// Result of a metadata strip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataStripResult {
    pub success: bool,
    pub input_path: String,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to edit EXIF metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataEditRequest {
    pub input_path: String,
    pub output_path: String,
    pub exif_data: HashMap<String, serde_json::Value>,
    pub overwrite: bool,
}

/// Result of a metadata edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataEditResult {
    pub success: bool,
    pub input_path: String,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to add a text or image watermark.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkRequest {
    pub input_path: String,
    pub output_path: String,
    /// "text" or "image"
    pub watermark_type: String,
    pub text: String,
    /// Watermark source for image watermarks
    pub image_path: String,
    /// Placement: "center", "top-left", ... or the short aliases "c", "tl", ...
    pub position: String,
    /// 0.0 to 1.0
    pub opacity: f64,
    /// Scale factor for image watermarks
    pub scale: f64,
    pub font_size: u32,
    pub font_color: String,
    /// Rotation angle in degrees
    pub rotation: i32,
}

/// Result of watermark application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkResult {
    pub success: bool,
    pub input_path: String,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to adjust image properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustRequest {
    pub input_path: String,
    pub output_path: String,
    /// Rotation angle in degrees
    pub rotate: i32,
    pub flip_h: bool,
    pub flip_v: bool,
    /// -1.0 to 1.0
    pub brightness: f64,
    /// -1.0 to 1.0
    pub contrast: f64,
    /// -1.0 to 1.0
    pub saturation: f64,
    /// -180 to 180
    pub hue: f64,
}

/// Result of image adjustment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustResult {
    pub success: bool,
    pub input_path: String,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to apply a filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub input_path: String,
    pub output_path: String,
    /// blur, sharpen, grayscale, sepia, etc.
    pub filter_type: String,
    /// 0.0 to 1.0
    pub intensity: f64,
}

/// Result of filter application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterResult {
    pub success: bool,
    pub input_path: String,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
