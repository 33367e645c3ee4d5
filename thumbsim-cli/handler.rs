//! Request handling for the compare endpoint.
//!
//! Validates the two uploads, decodes them, runs the comparison pipeline and
//! assembles the JSON document. Any failure aborts the whole request; there
//! are no partial responses.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thumbsim_core::{PipelineConfig, RasterImage, SimError};
use thumbsim_render::{encode_to_data_uri, EncodedTriple, OutputFormat};
use tracing::{debug, warn};

use crate::pipeline::{ComparisonPipeline, ComparisonReport};

pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

pub const SERVICE_NAME: &str = "Image Similarity Checker API";
pub const COMPARE_ENDPOINT: &str = "/api/compare";
pub const HEALTH_ENDPOINT: &str = "/health";

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file, taking the content type from its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(content_type_for_path(path), bytes))
    }

    pub fn is_allowed(&self) -> bool {
        ALLOWED_CONTENT_TYPES.contains(&self.content_type.as_str())
    }
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Request-level failure
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Rejected before any decoding
    UnsupportedMediaType { content_type: String },
    /// Empty or undecodable upload
    InvalidImage { reason: String },
    /// Any failure inside the comparison
    Processing { reason: String },
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::UnsupportedMediaType { .. } | ApiError::InvalidImage { .. } => 400,
            ApiError::Processing { .. } => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { detail: self.to_string() }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::UnsupportedMediaType { .. } => {
                write!(f, "Unsupported file type. Please use JPEG or PNG.")
            }
            ApiError::InvalidImage { reason } => write!(f, "Failed to read image: {}", reason),
            ApiError::Processing { reason } => write!(f, "Error during processing: {}", reason),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SimError> for ApiError {
    fn from(err: SimError) -> Self {
        ApiError::Processing { reason: err.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScores {
    pub overall_similarity: f64,
    pub color_similarity: f64,
    pub structure_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapImages {
    pub heatmap: String,
    pub overlay: String,
    pub comparison: String,
}

impl From<EncodedTriple> for HeatmapImages {
    fn from(triple: EncodedTriple) -> Self {
        Self {
            heatmap: triple.heatmap,
            overlay: triple.overlay,
            comparison: triple.comparison,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmaps {
    pub overall: HeatmapImages,
    pub structure: HeatmapImages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatching {
    pub match_count: usize,
    pub keypoints1_count: usize,
    pub keypoints2_count: usize,
    pub match_score: f64,
    pub match_image: String,
}

/// JSON document returned by the compare endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    pub success: bool,
    pub similarity_scores: SimilarityScores,
    pub heatmaps: Heatmaps,
    pub feature_matching: FeatureMatching,
}

impl CompareResponse {
    pub fn from_report(report: &ComparisonReport, format: OutputFormat) -> Result<Self, SimError> {
        let similarity = &report.similarity;
        let features = &report.features;
        Ok(Self {
            success: true,
            similarity_scores: SimilarityScores {
                overall_similarity: to_percentage(similarity.overall),
                color_similarity: to_percentage(similarity.color),
                structure_similarity: to_percentage(similarity.structure),
            },
            heatmaps: Heatmaps {
                overall: report.overall.encode(format)?.into(),
                structure: report.structure.encode(format)?.into(),
            },
            feature_matching: FeatureMatching {
                match_count: features.match_count(),
                keypoints1_count: features.keypoints1.len(),
                keypoints2_count: features.keypoints2.len(),
                match_score: to_percentage(features.score),
                match_image: encode_to_data_uri(&features.visualization, format)?,
            },
        })
    }

    /// Every embedded image, labelled by its position in the document
    pub fn images(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("overall_heatmap", self.heatmaps.overall.heatmap.as_str()),
            ("overall_overlay", self.heatmaps.overall.overlay.as_str()),
            ("overall_comparison", self.heatmaps.overall.comparison.as_str()),
            ("structure_heatmap", self.heatmaps.structure.heatmap.as_str()),
            ("structure_overlay", self.heatmaps.structure.overlay.as_str()),
            ("structure_comparison", self.heatmaps.structure.comparison.as_str()),
            ("feature_matches", self.feature_matching.match_image.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub compare: String,
    pub health: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

pub fn service_info() -> ServiceInfo {
    ServiceInfo {
        message: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: Endpoints {
            compare: COMPARE_ENDPOINT.to_string(),
            health: HEALTH_ENDPOINT.to_string(),
        },
    }
}

pub fn health() -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
    }
}

/// Fraction to percentage with two decimals
pub fn to_percentage(fraction: f64) -> f64 {
    (fraction * 10000.0).round() / 100.0
}

/// Decode an upload into an RGB raster
pub fn decode_upload(upload: &Upload) -> Result<RasterImage, ApiError> {
    if upload.bytes.is_empty() {
        return Err(ApiError::InvalidImage {
            reason: "empty upload".to_string(),
        });
    }
    let img = image::load_from_memory(&upload.bytes)
        .map_err(|e| ApiError::InvalidImage { reason: e.to_string() })?
        .to_rgb8();
    if img.width() == 0 || img.height() == 0 {
        return Err(ApiError::InvalidImage {
            reason: format!("image has no pixels ({}x{})", img.width(), img.height()),
        });
    }
    Ok(img)
}

/// Serves compare requests with one validated pipeline
#[derive(Debug, Clone)]
pub struct CompareHandler {
    pipeline: ComparisonPipeline,
    format: OutputFormat,
}

impl CompareHandler {
    pub fn new(config: PipelineConfig) -> Result<Self, SimError> {
        Ok(Self {
            pipeline: ComparisonPipeline::new(config)?,
            format: OutputFormat::default(),
        })
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn handle(&self, first: &Upload, second: &Upload) -> Result<CompareResponse, ApiError> {
        for upload in [first, second] {
            if !upload.is_allowed() {
                warn!(content_type = %upload.content_type, "rejected upload");
                return Err(ApiError::UnsupportedMediaType {
                    content_type: upload.content_type.clone(),
                });
            }
        }

        let a = decode_upload(first)?;
        let b = decode_upload(second)?;
        debug!(first = ?a.dimensions(), second = ?b.dimensions(), "uploads decoded");

        let report = self.pipeline.run(&a, &b)?;
        Ok(CompareResponse::from_report(&report, self.format)?)
    }
}

/// Validate, decode and compare two uploads with the given configuration
pub fn compare_uploads(first: &Upload, second: &Upload, config: &PipelineConfig) -> Result<CompareResponse, ApiError> {
    CompareHandler::new(config.clone())?.handle(first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_inference() {
        assert_eq!(content_type_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.gif")), "application/octet-stream");
        assert_eq!(content_type_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_allowed_types() {
        assert!(Upload::new("image/jpg", vec![]).is_allowed());
        assert!(!Upload::new("image/gif", vec![]).is_allowed());
    }

    #[test]
    fn test_status_codes() {
        let unsupported = ApiError::UnsupportedMediaType { content_type: "text/plain".into() };
        assert_eq!(unsupported.status_code(), 400);
        assert_eq!(ApiError::InvalidImage { reason: "x".into() }.status_code(), 400);
        assert_eq!(ApiError::Processing { reason: "x".into() }.status_code(), 500);
    }

    #[test]
    fn test_sim_error_becomes_processing() {
        let err: ApiError = SimError::DimensionMismatch { left: (1, 1), right: (2, 2) }.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.body().detail.contains("Dimension mismatch"));
    }

    #[test]
    fn test_to_percentage() {
        assert_eq!(to_percentage(0.123456), 12.35);
        assert_eq!(to_percentage(1.0), 100.0);
        assert_eq!(to_percentage(0.0), 0.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let upload = Upload::new("image/png", b"definitely not a png".to_vec());
        assert!(matches!(decode_upload(&upload), Err(ApiError::InvalidImage { .. })));
        let empty = Upload::new("image/png", Vec::new());
        assert!(matches!(decode_upload(&empty), Err(ApiError::InvalidImage { .. })));
    }

    #[test]
    fn test_service_info_and_health() {
        let info = service_info();
        assert_eq!(info.endpoints.compare, "/api/compare");
        assert_eq!(info.endpoints.health, "/health");
        assert_eq!(health().status, "healthy");
        let json = serde_json::to_value(health()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "healthy"}));
    }
}
