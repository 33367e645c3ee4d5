use thumbsim_core::OrbConfig;

use crate::builder::DetectorBuilder;
use crate::error::{FastError, FastResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete detector configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Core ORB configuration
    pub core: OrbConfig,
    /// Image dimensions
    pub width: usize,
    pub height: usize,
    /// Minimum spacing between kept keypoints on one level
    pub nms_distance: f32,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
}

impl DetectorConfig {
    /// Create new configuration with default settings
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_core(OrbConfig::default(), width, height)
    }

    /// Wrap an existing core configuration
    pub fn from_core(core: OrbConfig, width: usize, height: usize) -> Self {
        Self {
            core,
            width,
            height,
            nms_distance: 3.0,
            name: None,
        }
    }

    /// Add a name to the configuration
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Convert to DetectorBuilder for further customization
    pub fn to_builder(self) -> DetectorBuilder {
        DetectorBuilder::from_config(self)
    }

    /// Smallest image side the pyramid accepts for a level
    pub fn min_level_size(&self) -> usize {
        self.core.min_image_size()
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "DetectorConfig: {}x{}, threshold={}, max_features={}, levels={}, scale={:.2}, patch={}, edge={}, nms={:.1}",
            self.width,
            self.height,
            self.core.threshold,
            self.core.max_features,
            self.core.n_levels,
            self.core.scale_factor,
            self.core.patch_size,
            self.core.edge_threshold,
            self.nms_distance
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> FastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FastError::InvalidImageSize { width: self.width, height: self.height });
        }
        // 0 would accept every pixel; >127 overflows the signed comparison range
        if self.core.threshold == 0 || self.core.threshold > 127 {
            return Err(FastError::InvalidThreshold(self.core.threshold));
        }
        if self.core.patch_size % 2 == 0 || self.core.patch_size < 3 || self.core.edge_threshold <= self.core.patch_size / 2 {
            return Err(FastError::InvalidPatchSize {
                patch_size: self.core.patch_size,
                edge_threshold: self.core.edge_threshold,
            });
        }
        if self.core.max_features == 0 {
            return Err(FastError::InvalidFeatureBudget(self.core.max_features));
        }
        if self.core.n_levels == 0 || self.core.scale_factor <= 1.0 {
            return Err(FastError::InvalidPyramid {
                n_levels: self.core.n_levels,
                scale_factor: self.core.scale_factor,
            });
        }
        let min_size = self.min_level_size();
        if self.width < min_size || self.height < min_size {
            return Err(FastError::ImageTooSmall { width: self.width, height: self.height, min_size });
        }
        Ok(())
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid_for_canonical_size() {
        let cfg = DetectorConfig::new(800, 600);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.core.max_features, 500);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(
            DetectorConfig::new(0, 100).validate(),
            Err(FastError::InvalidImageSize { .. })
        ));
    }

    #[test]
    fn test_too_small_image() {
        assert!(matches!(
            DetectorConfig::new(40, 40).validate(),
            Err(FastError::ImageTooSmall { min_size: 63, .. })
        ));
    }

    #[test]
    fn test_invalid_threshold() {
        let mut cfg = DetectorConfig::new(100, 100);
        cfg.core.threshold = 0;
        assert!(matches!(cfg.validate(), Err(FastError::InvalidThreshold(0))));
        cfg.core.threshold = 200;
        assert!(matches!(cfg.validate(), Err(FastError::InvalidThreshold(200))));
    }

    #[test]
    fn test_invalid_patch_size() {
        let mut cfg = DetectorConfig::new(100, 100);
        cfg.core.patch_size = 16;
        assert!(matches!(cfg.validate(), Err(FastError::InvalidPatchSize { .. })));

        // Patch radius must fit inside the edge border
        cfg.core.patch_size = 63;
        assert!(matches!(cfg.validate(), Err(FastError::InvalidPatchSize { .. })));
    }

    #[test]
    fn test_invalid_budget_and_pyramid() {
        let mut cfg = DetectorConfig::new(100, 100);
        cfg.core.max_features = 0;
        assert!(matches!(cfg.validate(), Err(FastError::InvalidFeatureBudget(0))));

        let mut cfg = DetectorConfig::new(100, 100);
        cfg.core.scale_factor = 1.0;
        assert!(matches!(cfg.validate(), Err(FastError::InvalidPyramid { .. })));
    }

    #[test]
    fn test_summary() {
        let summary = DetectorConfig::new(800, 600).with_name("canonical").summary();
        assert!(summary.contains("800x600"));
        assert!(summary.contains("max_features=500"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_roundtrip() {
        let cfg = DetectorConfig::new(800, 600).with_name("canonical");
        let parsed = DetectorConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, cfg);
    }
}
