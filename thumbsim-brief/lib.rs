pub mod matcher;

pub use matcher::{hamming_distance, retain_best_fraction, BruteForceMatcher};

use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thumbsim_core::{Descriptor, Keypoint, LumaImage, PyramidLevel, SimError, SimResult};

const DESCRIPTOR_BITS: usize = 256;

/// Fixed seed so every generator samples the same test pairs
const PATTERN_SEED: u64 = 0x0B1E_F5EE_D0_2011;

/// Gaussian smoothing applied to each level before sampling
pub const SMOOTHING_SIGMA: f32 = 2.0;

/// Steered BRIEF: 256 intensity comparisons rotated by keypoint orientation
pub struct BriefGenerator {
    pattern: Vec<(i32, i32, i32, i32)>,
}

impl BriefGenerator {
    /// Build the sampling pattern for an odd `patch_size` of at least 3
    pub fn new(patch_size: usize) -> SimResult<Self> {
        if patch_size < 3 || patch_size % 2 == 0 {
            return Err(SimError::InvalidConfig {
                reason: format!("BRIEF patch size must be odd and >= 3, got {}", patch_size),
            });
        }

        // Keep pairs inside the patch once rotated
        let extent = ((patch_size / 2) * 4 / 5).max(1) as i32;
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let mut pattern = Vec::with_capacity(DESCRIPTOR_BITS);
        while pattern.len() < DESCRIPTOR_BITS {
            let pair = (
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
            );
            // A pair comparing a point with itself carries no information
            if (pair.0, pair.1) != (pair.2, pair.3) {
                pattern.push(pair);
            }
        }

        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &[(i32, i32, i32, i32)] {
        &self.pattern
    }

    /// Blur every pyramid level once
    pub fn smooth_levels(levels: &[PyramidLevel]) -> Vec<LumaImage> {
        levels
            .par_iter()
            .map(|level| gaussian_blur_f32(&level.image, SMOOTHING_SIGMA))
            .collect()
    }

    /// One descriptor per keypoint, in keypoint order. Keypoints carry
    /// level-0 coordinates and are sampled on their own octave.
    pub fn generate_descriptors(&self, levels: &[PyramidLevel], kps: &[Keypoint]) -> Vec<Descriptor> {
        if levels.is_empty() {
            return Vec::new();
        }
        let smoothed = Self::smooth_levels(levels);
        let last = levels.len() - 1;

        kps.par_iter()
            .map(|kp| {
                let octave = kp.octave.min(last);
                self.describe(&smoothed[octave], levels[octave].scale, kp)
            })
            .collect()
    }

    fn describe(&self, img: &LumaImage, scale: f32, kp: &Keypoint) -> Descriptor {
        let (s, c) = kp.angle.sin_cos();
        let (cx, cy) = (kp.x / scale, kp.y / scale);
        let max_x = (img.width() - 1) as f32;
        let max_y = (img.height() - 1) as f32;
        let sample = |dx: i32, dy: i32| {
            let rx = cx + c * dx as f32 - s * dy as f32;
            let ry = cy + s * dx as f32 + c * dy as f32;
            let x = rx.round().clamp(0.0, max_x) as u32;
            let y = ry.round().clamp(0.0, max_y) as u32;
            img.get_pixel(x, y)[0]
        };

        let mut d = [0u8; DESCRIPTOR_BITS / 8];
        for (i, &(dx1, dy1, dx2, dy2)) in self.pattern.iter().enumerate() {
            let bit = (sample(dx1, dy1) < sample(dx2, dy2)) as u8;
            d[i >> 3] |= bit << (i & 7);
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn level(image: LumaImage, scale: f32) -> PyramidLevel {
        PyramidLevel { image, scale }
    }

    fn textured_image(width: u32, height: u32) -> LumaImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 31 + y * 17) ^ (x * y)) as u8]))
    }

    fn keypoint(x: f32, y: f32, angle: f32) -> Keypoint {
        Keypoint { x, y, angle, response: 1.0, octave: 0 }
    }

    #[test]
    fn test_pattern_is_deterministic_and_full() {
        let a = BriefGenerator::new(31).unwrap();
        let b = BriefGenerator::new(31).unwrap();
        assert_eq!(a.pattern().len(), 256);
        assert_eq!(a.pattern(), b.pattern());
        assert!(a.pattern().iter().all(|&(x1, y1, x2, y2)| (x1, y1) != (x2, y2)));
        assert!(a.pattern().iter().all(|&(x1, y1, x2, y2)| {
            [x1, y1, x2, y2].iter().all(|v| v.abs() <= 12)
        }));
    }

    #[test]
    fn test_rejects_even_or_tiny_patch() {
        assert!(matches!(BriefGenerator::new(30), Err(SimError::InvalidConfig { .. })));
        assert!(BriefGenerator::new(1).is_err());
        assert!(BriefGenerator::new(3).is_ok());
    }

    #[test]
    fn test_uniform_image_gives_zero_descriptor() {
        let generator = BriefGenerator::new(31).unwrap();
        let levels = vec![level(GrayImage::from_pixel(64, 64, Luma([90])), 1.0)];
        let desc = generator.generate_descriptors(&levels, &[keypoint(32.0, 32.0, 0.0)]);
        assert_eq!(desc, vec![[0u8; 32]]);
    }

    #[test]
    fn test_same_point_same_descriptor() {
        let generator = BriefGenerator::new(31).unwrap();
        let levels = vec![level(textured_image(96, 96), 1.0)];
        let kps = [keypoint(48.0, 48.0, 0.3), keypoint(48.0, 48.0, 0.3)];
        let desc = generator.generate_descriptors(&levels, &kps);
        assert_eq!(desc.len(), 2);
        assert_eq!(desc[0], desc[1]);
    }

    #[test]
    fn test_descriptor_uses_keypoint_octave() {
        let generator = BriefGenerator::new(15).unwrap();
        let levels = vec![
            level(textured_image(96, 96), 1.0),
            level(GrayImage::from_pixel(48, 48, Luma([10])), 2.0),
        ];
        let mut kp = keypoint(48.0, 48.0, 0.0);
        kp.octave = 1;
        // The flat second level yields an all-zero descriptor
        let desc = generator.generate_descriptors(&levels, &[kp]);
        assert_eq!(desc[0], [0u8; 32]);
    }

    #[test]
    fn test_no_levels_gives_no_descriptors() {
        let generator = BriefGenerator::new(31).unwrap();
        assert!(generator.generate_descriptors(&[], &[keypoint(1.0, 1.0, 0.0)]).is_empty());
    }

    #[test]
    fn test_border_keypoint_is_clamped() {
        let generator = BriefGenerator::new(31).unwrap();
        let levels = vec![level(textured_image(40, 40), 1.0)];
        let desc = generator.generate_descriptors(&levels, &[keypoint(0.0, 39.0, 1.0)]);
        assert_eq!(desc.len(), 1);
    }
}
