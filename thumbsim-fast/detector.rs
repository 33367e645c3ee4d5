use rayon::prelude::*;
use thumbsim_core::{Keypoint, LumaImage, OrbConfig, PyramidLevel};
use tracing::debug;

use crate::config::DetectorConfig;
use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::pyramid::{ImagePyramid, ScaleLevel};
use crate::refinement::KeypointRefinement;

/// Multi-scale oriented FAST detector capped at a fixed feature budget
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: DetectorConfig,
    scale_levels: Vec<ScaleLevel>,
    level_budgets: Vec<usize>,
    patch_extent: Vec<i32>,
}

impl FastDetector {
    /// Creates a new detector for `width` x `height` images with validation
    pub fn new(cfg: OrbConfig, width: usize, height: usize) -> FastResult<Self> {
        Self::from_config(DetectorConfig::from_core(cfg, width, height))
    }

    pub fn from_config(cfg: DetectorConfig) -> FastResult<Self> {
        cfg.validate()?;

        let scale_levels = ImagePyramid::generate_scale_levels(
            cfg.width,
            cfg.height,
            cfg.core.n_levels,
            cfg.core.scale_factor,
            cfg.min_level_size(),
        );
        let level_budgets =
            Self::features_per_level(cfg.core.max_features, scale_levels.len(), cfg.core.scale_factor);
        let patch_extent = KeypointRefinement::circular_extent(cfg.core.patch_size / 2);

        Ok(Self {
            cfg,
            scale_levels,
            level_budgets,
            patch_extent,
        })
    }

    /// Split `max_features` over the levels in geometric proportion to level
    /// area, finer levels first; the last level takes the remainder.
    pub fn features_per_level(max_features: usize, n_levels: usize, scale_factor: f32) -> Vec<usize> {
        if n_levels == 0 {
            return Vec::new();
        }
        let factor = 1.0 / scale_factor as f64;
        let mut desired = max_features as f64 * (1.0 - factor) / (1.0 - factor.powi(n_levels as i32));

        let mut budgets = Vec::with_capacity(n_levels);
        let mut assigned = 0usize;
        for _ in 0..n_levels - 1 {
            let n = (desired.round() as usize).min(max_features - assigned);
            budgets.push(n);
            assigned += n;
            desired *= factor;
        }
        budgets.push(max_features - assigned);
        budgets
    }

    /// Validates image dimensions before processing
    fn validate_image(&self, img: &LumaImage) -> FastResult<()> {
        let actual = (img.width() as usize, img.height() as usize);
        if actual != (self.cfg.width, self.cfg.height) {
            return Err(FastError::InvalidImageData {
                expected: (self.cfg.width, self.cfg.height),
                actual,
            });
        }
        Ok(())
    }

    /// Build the scale pyramid this detector runs on
    pub fn build_pyramid(&self, img: &LumaImage) -> FastResult<Vec<PyramidLevel>> {
        self.validate_image(img)?;
        Ok(ImagePyramid::build_image_pyramid(img, &self.scale_levels))
    }

    /// Detect keypoints with multi-scale detection
    pub fn detect_keypoints(&self, img: &LumaImage) -> FastResult<Vec<Keypoint>> {
        let pyramid = self.build_pyramid(img)?;
        Ok(self.detect_in_pyramid(&pyramid))
    }

    /// Detect keypoints across a pyramid built by `build_pyramid`. Coordinates
    /// are returned in level-0 space.
    pub fn detect_in_pyramid(&self, pyramid: &[PyramidLevel]) -> Vec<Keypoint> {
        let per_level: Vec<Vec<Keypoint>> = self
            .scale_levels
            .iter()
            .zip(pyramid.iter())
            .zip(self.level_budgets.iter())
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|((scale_level, level), &budget)| {
                self.detect_keypoints_at_scale(&level.image, scale_level, budget)
            })
            .collect();

        let mut keypoints: Vec<Keypoint> = per_level.into_iter().flatten().collect();
        KeypointRefinement::retain_best(&mut keypoints, self.cfg.core.max_features);
        debug!(count = keypoints.len(), levels = pyramid.len(), "oriented FAST detection finished");
        keypoints
    }

    /// Detect, suppress, rank and orient keypoints on one pyramid level
    pub fn detect_keypoints_at_scale(&self, img: &LumaImage, scale_level: &ScaleLevel, budget: usize) -> Vec<Keypoint> {
        if budget == 0 {
            return Vec::new();
        }

        let candidates = CornerDetector::detect_fast9(
            img,
            self.cfg.core.threshold,
            self.cfg.core.edge_threshold,
            scale_level.level,
        );
        let mut keypoints = KeypointRefinement::non_maximum_suppression(&candidates, self.cfg.nms_distance);
        KeypointRefinement::retain_best(&mut keypoints, budget);

        debug!(
            level = scale_level.level,
            candidates = candidates.len(),
            kept = keypoints.len(),
            "pyramid level processed"
        );

        for keypoint in keypoints.iter_mut() {
            keypoint.angle = KeypointRefinement::compute_orientation(
                img,
                keypoint.x as usize,
                keypoint.y as usize,
                &self.patch_extent,
            );
            keypoint.x *= scale_level.scale;
            keypoint.y *= scale_level.scale;
        }

        keypoints
    }

    /// Get scale levels for this detector
    pub fn scale_levels(&self) -> &[ScaleLevel] {
        &self.scale_levels
    }

    /// Get the per-level feature budgets
    pub fn level_budgets(&self) -> &[usize] {
        &self.level_budgets
    }

    /// Get detector configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cfg.width, self.cfg.height)
    }
}
