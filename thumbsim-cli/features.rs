use thumbsim_brief::{retain_best_fraction, BriefGenerator, BruteForceMatcher};
use thumbsim_core::{
    ensure_same_dimensions, to_luma, Descriptor, Keypoint, LumaImage, Match, OrbConfig, PipelineConfig,
    RasterImage, SimResult, HAMMING_NORMALIZER,
};
use thumbsim_fast::DetectorBuilder;
use thumbsim_render::{draw_matches, side_by_side};
use tracing::{debug, warn};

/// Outcome of matching one image pair
#[derive(Debug, Clone)]
pub struct FeatureMatchResult {
    pub keypoints1: Vec<Keypoint>,
    pub keypoints2: Vec<Keypoint>,
    /// Kept matches, best distance first
    pub matches: Vec<Match>,
    /// In [0, 1]
    pub score: f64,
    pub visualization: RasterImage,
}

impl FeatureMatchResult {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// `w0 * match_ratio + w1 * distance_score`, capped at 1.
///
/// `match_ratio` is the match count over the smaller keypoint count and
/// `distance_score` is `1 - min(avg / 256, 1)`; both are 0 when there is
/// nothing to measure.
pub fn match_score(matches: &[Match], keypoints1: usize, keypoints2: usize, weights: [f64; 2]) -> f64 {
    let fewest = keypoints1.min(keypoints2);
    let ratio = if fewest == 0 {
        0.0
    } else {
        matches.len() as f64 / fewest as f64
    };
    let distance_score = if matches.is_empty() {
        0.0
    } else {
        let avg = matches.iter().map(|m| m.distance as f64).sum::<f64>() / matches.len() as f64;
        1.0 - (avg / HAMMING_NORMALIZER).min(1.0)
    };
    (weights[0] * ratio + weights[1] * distance_score).min(1.0)
}

/// Oriented FAST + rotated BRIEF matching between two images
#[derive(Debug, Clone)]
pub struct FeatureMatcher {
    orb: OrbConfig,
    good_match_fraction: f64,
    score_weights: [f64; 2],
    max_drawn: usize,
    matcher: BruteForceMatcher,
}

impl Default for FeatureMatcher {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl FeatureMatcher {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            orb: cfg.orb.clone(),
            good_match_fraction: cfg.good_match_fraction,
            score_weights: cfg.match_score_weights,
            max_drawn: cfg.max_drawn_matches,
            matcher: BruteForceMatcher::new(true),
        }
    }

    pub fn orb_config(&self) -> &OrbConfig {
        &self.orb
    }

    /// Detect keypoints and describe them on one luminance image. An image
    /// smaller than the detector border leaves no pyramid level to search and
    /// yields no keypoints.
    pub fn detect_and_describe(&self, gray: &LumaImage) -> SimResult<(Vec<Keypoint>, Vec<Descriptor>)> {
        let (width, height) = (gray.width() as usize, gray.height() as usize);
        let min_size = self.orb.min_image_size();
        if width < min_size || height < min_size {
            debug!(width, height, min_size, "image below detector minimum, no keypoints");
            return Ok((Vec::new(), Vec::new()));
        }

        let detector = DetectorBuilder::new(width, height).core(self.orb.clone()).build()?;
        let brief = BriefGenerator::new(self.orb.patch_size)?;

        let pyramid = detector.build_pyramid(gray)?;
        let keypoints = detector.detect_in_pyramid(&pyramid);
        let descriptors = brief.generate_descriptors(&pyramid, &keypoints);
        Ok((keypoints, descriptors))
    }

    /// Detect, cross-check match, keep the best fraction, score and draw
    pub fn match_images(&self, a: &RasterImage, b: &RasterImage) -> SimResult<FeatureMatchResult> {
        ensure_same_dimensions(a.dimensions(), b.dimensions())?;
        let gray_a = to_luma(a);
        let gray_b = to_luma(b);

        let (first, second) = rayon::join(|| self.detect_and_describe(&gray_a), || self.detect_and_describe(&gray_b));
        let (keypoints1, descriptors1) = first?;
        let (keypoints2, descriptors2) = second?;

        if descriptors1.is_empty() || descriptors2.is_empty() {
            warn!(
                keypoints1 = keypoints1.len(),
                keypoints2 = keypoints2.len(),
                "no descriptors in at least one image, skipping matching"
            );
            return Ok(FeatureMatchResult {
                keypoints1,
                keypoints2,
                matches: Vec::new(),
                score: 0.0,
                visualization: side_by_side(a, b)?,
            });
        }

        let mut matches = self.matcher.match_descriptors(&descriptors1, &descriptors2);
        let cross_checked = matches.len();
        retain_best_fraction(&mut matches, self.good_match_fraction);

        let score = match_score(&matches, keypoints1.len(), keypoints2.len(), self.score_weights);
        debug!(
            keypoints1 = keypoints1.len(),
            keypoints2 = keypoints2.len(),
            cross_checked,
            kept = matches.len(),
            score,
            "feature matching finished"
        );

        let visualization = draw_matches(a, b, &keypoints1, &keypoints2, &matches, self.max_drawn)?;
        Ok(FeatureMatchResult {
            keypoints1,
            keypoints2,
            matches,
            score,
            visualization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use thumbsim_core::SimError;

    fn create_blocks_image(width: u32, height: u32, shift: u32) -> RasterImage {
        RasterImage::from_fn(width, height, |x, y| {
            let (sx, sy) = (x + shift, y + shift / 2);
            let tone = ((sx / 24) * 37 + (sy / 24) * 53) % 120;
            if (6..18).contains(&(sx % 24)) && (6..18).contains(&(sy % 24)) {
                Rgb([(130 + tone) as u8, 200, 90])
            } else {
                Rgb([20, 30, (20 + tone / 2) as u8])
            }
        })
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            orb: OrbConfig {
                patch_size: 15,
                edge_threshold: 16,
                n_levels: 3,
                max_features: 120,
                ..OrbConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    fn m(distance: u32) -> Match {
        Match { query_idx: 0, train_idx: 0, distance }
    }

    #[test]
    fn test_match_score_formula() {
        let matches = [m(64), m(64)];
        // ratio 2/4, distance score 1 - 64/256
        let score = match_score(&matches, 4, 10, [0.5, 0.5]);
        assert!((score - (0.25 + 0.375)).abs() < 1e-12);
    }

    #[test]
    fn test_match_score_edge_cases() {
        assert_eq!(match_score(&[], 0, 10, [0.5, 0.5]), 0.0);
        assert_eq!(match_score(&[], 10, 10, [0.5, 0.5]), 0.0);
        assert_eq!(match_score(&[m(0), m(0)], 2, 2, [0.5, 0.5]), 1.0);
        assert!(match_score(&[m(0), m(0)], 2, 2, [0.9, 0.9]) <= 1.0);
        assert_eq!(match_score(&[m(300)], 1, 1, [0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_blank_image_short_circuits() {
        let blank = RasterImage::from_pixel(160, 120, Rgb([128, 128, 128]));
        let textured = create_blocks_image(160, 120, 0);
        let result = FeatureMatcher::from_config(&small_config())
            .match_images(&blank, &textured)
            .unwrap();

        assert!(result.keypoints1.is_empty());
        assert_eq!(result.match_count(), 0);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.visualization.dimensions(), (320, 120));
    }

    #[test]
    fn test_image_below_detector_minimum_has_no_keypoints() {
        // Default edge threshold 31 needs at least 63x63
        let matcher = FeatureMatcher::default();
        let tiny = to_luma(&create_blocks_image(60, 60, 0));
        let (keypoints, descriptors) = matcher.detect_and_describe(&tiny).unwrap();
        assert!(keypoints.is_empty());
        assert!(descriptors.is_empty());

        let a = create_blocks_image(60, 60, 0);
        let result = matcher.match_images(&a, &a).unwrap();
        assert_eq!(result.match_count(), 0);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.visualization.dimensions(), (120, 60));
    }

    #[test]
    fn test_self_match_scores_high() {
        let img = create_blocks_image(160, 120, 0);
        let result = FeatureMatcher::from_config(&small_config())
            .match_images(&img, &img)
            .unwrap();

        assert!(!result.keypoints1.is_empty());
        assert_eq!(result.keypoints1.len(), result.keypoints2.len());
        assert!(result.match_count() > 0);
        assert!(result.match_count() <= result.keypoints1.len().min(result.keypoints2.len()));
        assert!(result.matches.iter().all(|m| m.distance == 0));
        assert!(result.score > 0.5 && result.score <= 1.0);
    }

    #[test]
    fn test_self_match_beats_distinct_pair() {
        let matcher = FeatureMatcher::from_config(&small_config());
        let a = create_blocks_image(160, 120, 0);
        let b = RasterImage::from_fn(160, 120, |x, y| {
            Rgb([((x * 13) ^ (y * 7)) as u8, ((x * y) % 251) as u8, 60])
        });
        let same = matcher.match_images(&a, &a).unwrap().score;
        let distinct = matcher.match_images(&a, &b).unwrap().score;
        assert!(same >= distinct);
    }

    #[test]
    fn test_matches_sorted_by_distance() {
        let matcher = FeatureMatcher::from_config(&small_config());
        let result = matcher
            .match_images(&create_blocks_image(160, 120, 0), &create_blocks_image(160, 120, 5))
            .unwrap();
        for pair in result.matches.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert!((0.0..=1.0).contains(&result.score));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let result = FeatureMatcher::default().match_images(
            &create_blocks_image(160, 120, 0),
            &create_blocks_image(120, 160, 0),
        );
        assert!(matches!(result, Err(SimError::DimensionMismatch { .. })));
    }
}
