use rayon::prelude::*;
use thumbsim_core::{Keypoint, LumaImage};

use crate::utils::has_arc;

/// Segment-test outcome for one pixel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CornerType {
    Bright,
    Dark,
    None,
}

/// Corner detection algorithms (FAST-9 segment test and Harris ranking)
pub struct CornerDetector;

impl CornerDetector {
    /// FAST circle offsets for corner detection
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Contiguous arc length required by FAST-9
    pub const ARC_LENGTH: u32 = 9;

    pub const HARRIS_BLOCK_SIZE: i32 = 7;
    pub const HARRIS_K: f64 = 0.04;

    /// Smallest border that keeps the FAST circle and the Harris window in bounds
    pub const MIN_BORDER: usize = 3 + (Self::HARRIS_BLOCK_SIZE as usize / 2) + 1;

    /// Run the segment test on every pixel at least `border` pixels from the
    /// edge. Candidates carry their Harris response and the given octave.
    pub fn detect_fast9(img: &LumaImage, threshold: u8, border: usize, octave: usize) -> Vec<Keypoint> {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let border = border.max(Self::MIN_BORDER);
        if width <= 2 * border || height <= 2 * border {
            return Vec::new();
        }
        let raw = img.as_raw();

        (border..height - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row_keypoints = Vec::new();
                for x in border..width - border {
                    if Self::classify(raw, width, x, y, threshold) == CornerType::None {
                        continue;
                    }
                    row_keypoints.push(Keypoint {
                        x: x as f32,
                        y: y as f32,
                        angle: 0.0,
                        response: Self::harris_response(raw, width, height, x, y),
                        octave,
                    });
                }
                row_keypoints
            })
            .collect()
    }

    /// Classify a pixel with the FAST-9 segment test
    pub(crate) fn classify(raw: &[u8], width: usize, x: usize, y: usize, threshold: u8) -> CornerType {
        let center = raw[y * width + x] as i16;
        let t = threshold as i16;
        let sample = |(dx, dy): (i32, i32)| {
            let px = (x as i32 + dx) as usize;
            let py = (y as i32 + dy) as usize;
            raw[py * width + px] as i16
        };

        // Quick rejection on the four compass samples: a 9-arc covers at least two
        let mut compass_bright = 0;
        let mut compass_dark = 0;
        for idx in [0, 4, 8, 12] {
            let q = sample(Self::FAST_OFFSETS[idx]);
            if q > center + t {
                compass_bright += 1;
            } else if q < center - t {
                compass_dark += 1;
            }
        }
        if compass_bright < 2 && compass_dark < 2 {
            return CornerType::None;
        }

        let mut bright: u16 = 0;
        let mut dark: u16 = 0;
        for (i, &offset) in Self::FAST_OFFSETS.iter().enumerate() {
            let q = sample(offset);
            if q > center + t {
                bright |= 1 << i;
            } else if q < center - t {
                dark |= 1 << i;
            }
        }

        if has_arc(bright, Self::ARC_LENGTH) {
            CornerType::Bright
        } else if has_arc(dark, Self::ARC_LENGTH) {
            CornerType::Dark
        } else {
            CornerType::None
        }
    }

    /// Harris corner response `det(M) - k * trace(M)^2` over a
    /// `HARRIS_BLOCK_SIZE` window of Sobel gradients.
    pub fn harris_response(raw: &[u8], width: usize, height: usize, x: usize, y: usize) -> f32 {
        let half = Self::HARRIS_BLOCK_SIZE / 2;
        let reach = (half + 1) as usize;
        if x < reach || y < reach || x + reach >= width || y + reach >= height {
            return 0.0;
        }

        let mut ixx = 0.0f64;
        let mut ixy = 0.0f64;
        let mut iyy = 0.0f64;

        for dy in -half..=half {
            for dx in -half..=half {
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                let (gx, gy) = Self::sobel(raw, width, nx, ny);
                ixx += gx * gx;
                ixy += gx * gy;
                iyy += gy * gy;
            }
        }

        let det = ixx * iyy - ixy * ixy;
        let trace = ixx + iyy;
        (det - Self::HARRIS_K * trace * trace) as f32
    }

    /// 3x3 Sobel gradients; caller guarantees a one-pixel margin
    fn sobel(raw: &[u8], width: usize, x: usize, y: usize) -> (f64, f64) {
        let p = |px: usize, py: usize| raw[py * width + px] as f64;

        let gx = p(x + 1, y - 1) + 2.0 * p(x + 1, y) + p(x + 1, y + 1)
            - p(x - 1, y - 1)
            - 2.0 * p(x - 1, y)
            - p(x - 1, y + 1);

        let gy = p(x - 1, y + 1) + 2.0 * p(x, y + 1) + p(x + 1, y + 1)
            - p(x - 1, y - 1)
            - 2.0 * p(x, y - 1)
            - p(x + 1, y - 1);

        (gx, gy)
    }
}
