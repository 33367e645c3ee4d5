use thumbsim_core::OrbConfig;

use crate::config::DetectorConfig;
use crate::detector::FastDetector;
use crate::error::FastResult;

/// Fluent builder for a `FastDetector`
#[derive(Debug, Clone)]
pub struct DetectorBuilder {
    config: DetectorConfig,
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            config: DetectorConfig::new(width, height),
        }
    }

    /// Replace the whole core configuration
    pub fn core(mut self, core: OrbConfig) -> Self {
        self.config.core = core;
        self
    }

    /// Set the FAST threshold (1-127)
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.core.threshold = threshold;
        self
    }

    /// Set the patch size for orientation and descriptors
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.config.core.patch_size = patch_size;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.core.n_threads = n_threads;
        self
    }

    /// Cap the number of keypoints returned per image
    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config.core.max_features = max_features;
        self
    }

    /// Set pyramid depth and the scale ratio between levels
    pub fn pyramid(mut self, n_levels: usize, scale_factor: f32) -> Self {
        self.config.core.n_levels = n_levels;
        self.config.core.scale_factor = scale_factor;
        self
    }

    /// Set the border width excluded from detection
    pub fn edge_threshold(mut self, edge_threshold: usize) -> Self {
        self.config.core.edge_threshold = edge_threshold;
        self
    }

    /// Set the non-maximum suppression (NMS) distance
    pub fn nms_distance(mut self, distance: f32) -> Self {
        self.config.nms_distance = distance;
        self
    }

    /// Build the `FastDetector`
    pub fn build(self) -> FastResult<FastDetector> {
        FastDetector::from_config(self.config)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Create a builder from an existing `DetectorConfig`
    pub fn from_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Convert the builder into a `DetectorConfig`
    pub fn to_config(self) -> DetectorConfig {
        self.config
    }
}
