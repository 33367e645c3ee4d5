use crate::error::{SimError, SimResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Canonical comparison resolution (width, height)
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (800, 600);

pub const DEFAULT_SSIM_WINDOW: usize = 7;
pub const DEFAULT_SSIM_K1: f64 = 0.01;
pub const DEFAULT_SSIM_K2: f64 = 0.03;

pub const DEFAULT_CANNY_LOW: f32 = 100.0;
pub const DEFAULT_CANNY_HIGH: f32 = 200.0;

pub const DEFAULT_HUE_BINS: usize = 180;
pub const DEFAULT_SATURATION_BINS: usize = 256;
pub const DEFAULT_VALUE_BINS: usize = 256;
/// Hue, saturation, value
pub const DEFAULT_CHANNEL_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

pub const DEFAULT_MAX_FEATURES: usize = 500;
pub const DEFAULT_GOOD_MATCH_FRACTION: f64 = 0.5;
pub const DEFAULT_MAX_DRAWN_MATCHES: usize = 50;
/// Match ratio, distance score
pub const DEFAULT_MATCH_SCORE_WEIGHTS: [f64; 2] = [0.5, 0.5];
pub const HAMMING_NORMALIZER: f64 = 256.0;

pub const DEFAULT_OVERLAY_ALPHA: f32 = 0.4;

/// Detector parameters for the oriented FAST / rotated BRIEF stage
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbConfig {
    pub threshold: u8,
    pub patch_size: usize,
    pub n_threads: usize,
    pub max_features: usize,
    pub n_levels: usize,
    pub scale_factor: f32,
    pub edge_threshold: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            n_threads: num_cpus::get().max(1),
            max_features: DEFAULT_MAX_FEATURES,
            n_levels: 8,
            scale_factor: 1.2,
            edge_threshold: 31,
        }
    }
}

impl OrbConfig {
    /// Smallest image side the detector accepts: the excluded border on both
    /// sides plus one pixel
    pub fn min_image_size(&self) -> usize {
        2 * self.edge_threshold + 1
    }

    /// Reject parameters the detector or the descriptor cannot run with
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |reason: String| Err(SimError::InvalidConfig { reason });

        // 0 would accept every pixel; >127 overflows the signed comparison range
        if self.threshold == 0 || self.threshold > 127 {
            return invalid(format!("ORB FAST threshold must lie in 1-127, got {}", self.threshold));
        }
        if self.patch_size < 3 || self.patch_size % 2 == 0 {
            return invalid(format!("ORB patch size must be odd and >= 3, got {}", self.patch_size));
        }
        if self.edge_threshold <= self.patch_size / 2 {
            return invalid(format!(
                "ORB edge threshold {} must exceed half the patch size {}",
                self.edge_threshold, self.patch_size
            ));
        }
        if self.max_features == 0 {
            return invalid("ORB feature budget must be non-zero".to_string());
        }
        if self.n_levels == 0 || self.scale_factor <= 1.0 {
            return invalid(format!(
                "ORB pyramid needs >= 1 level and scale factor > 1, got {} levels at {}",
                self.n_levels, self.scale_factor
            ));
        }
        Ok(())
    }
}

/// Every policy constant of one comparison run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    pub target_width: u32,
    pub target_height: u32,
    pub ssim_window: usize,
    pub ssim_k1: f64,
    pub ssim_k2: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hue_bins: usize,
    pub saturation_bins: usize,
    pub value_bins: usize,
    pub channel_weights: [f64; 3],
    pub good_match_fraction: f64,
    pub max_drawn_matches: usize,
    pub match_score_weights: [f64; 2],
    pub overlay_alpha: f32,
    pub orb: OrbConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_SIZE.0,
            target_height: DEFAULT_TARGET_SIZE.1,
            ssim_window: DEFAULT_SSIM_WINDOW,
            ssim_k1: DEFAULT_SSIM_K1,
            ssim_k2: DEFAULT_SSIM_K2,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
            hue_bins: DEFAULT_HUE_BINS,
            saturation_bins: DEFAULT_SATURATION_BINS,
            value_bins: DEFAULT_VALUE_BINS,
            channel_weights: DEFAULT_CHANNEL_WEIGHTS,
            good_match_fraction: DEFAULT_GOOD_MATCH_FRACTION,
            max_drawn_matches: DEFAULT_MAX_DRAWN_MATCHES,
            match_score_weights: DEFAULT_MATCH_SCORE_WEIGHTS,
            overlay_alpha: DEFAULT_OVERLAY_ALPHA,
            orb: OrbConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "PipelineConfig: {}x{}, ssim_window={}, canny=({}, {}), weights=[H:{} S:{} V:{}], orb_features={}, keep={:.0}%",
            self.target_width,
            self.target_height,
            self.ssim_window,
            self.canny_low,
            self.canny_high,
            self.channel_weights[0],
            self.channel_weights[1],
            self.channel_weights[2],
            self.orb.max_features,
            self.good_match_fraction * 100.0
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |reason: String| Err(SimError::InvalidConfig { reason });

        if self.target_width == 0 || self.target_height == 0 {
            return invalid(format!(
                "target size must be non-zero, got {}x{}",
                self.target_width, self.target_height
            ));
        }
        if self.ssim_window < 3 || self.ssim_window % 2 == 0 {
            return invalid(format!("SSIM window must be odd and >= 3, got {}", self.ssim_window));
        }
        let min_dim = self.target_width.min(self.target_height) as usize;
        if self.ssim_window > min_dim {
            return invalid(format!(
                "SSIM window {} exceeds target dimension {}",
                self.ssim_window, min_dim
            ));
        }
        if self.canny_low < 0.0 || self.canny_low >= self.canny_high {
            return invalid(format!(
                "Canny thresholds must satisfy 0 <= low < high, got ({}, {})",
                self.canny_low, self.canny_high
            ));
        }
        if self.hue_bins == 0 || self.saturation_bins == 0 || self.value_bins == 0 {
            return invalid("histogram bin counts must be non-zero".to_string());
        }
        let in_unit = |w: f64| (0.0..=1.0).contains(&w);
        if !self.channel_weights.iter().copied().all(in_unit) {
            return invalid(format!("channel weights must lie in [0, 1], got {:?}", self.channel_weights));
        }
        if !self.match_score_weights.iter().copied().all(in_unit) {
            return invalid(format!(
                "match score weights must lie in [0, 1], got {:?}",
                self.match_score_weights
            ));
        }
        if !in_unit(self.good_match_fraction) {
            return invalid(format!(
                "good match fraction must lie in [0, 1], got {}",
                self.good_match_fraction
            ));
        }
        if !(0.0..=1.0).contains(&self.overlay_alpha) {
            return invalid(format!("overlay alpha must lie in [0, 1], got {}", self.overlay_alpha));
        }
        self.orb.validate()?;
        let min_size = self.orb.min_image_size();
        if min_dim < min_size {
            return invalid(format!(
                "target size {}x{} is below the ORB minimum of {}x{} (2 * edge_threshold + 1)",
                self.target_width, self.target_height, min_size, min_size
            ));
        }
        Ok(())
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
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
