use std::collections::HashMap;
use thumbsim_core::{Keypoint, LumaImage};

/// Suppression, ranking and orientation of candidate keypoints
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Non-maximum suppression: keep the strongest response and drop any
    /// candidate closer than `min_distance` to an already accepted point.
    pub fn non_maximum_suppression(keypoints: &[Keypoint], min_distance: f32) -> Vec<Keypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }
        if min_distance <= 0.0 {
            return keypoints.to_vec();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        Self::sort_by_response(&mut sorted_keypoints);

        let min_distance_sq = min_distance * min_distance;
        let cell = |v: f32| (v / min_distance).floor() as i64;

        // Accepted points bucketed by grid cell of side `min_distance`
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        let mut suppressed: Vec<Keypoint> = Vec::new();

        for candidate in sorted_keypoints {
            let (cx, cy) = (cell(candidate.x), cell(candidate.y));
            let mut is_local_max = true;

            'neighbours: for gy in cy - 1..=cy + 1 {
                for gx in cx - 1..=cx + 1 {
                    let Some(bucket) = grid.get(&(gx, gy)) else { continue };
                    for &idx in bucket {
                        let existing = &suppressed[idx];
                        let dx = candidate.x - existing.x;
                        let dy = candidate.y - existing.y;
                        if dx * dx + dy * dy < min_distance_sq {
                            is_local_max = false;
                            break 'neighbours;
                        }
                    }
                }
            }

            if is_local_max {
                grid.entry((cx, cy)).or_default().push(suppressed.len());
                suppressed.push(candidate);
            }
        }

        suppressed
    }

    /// Keep the `n` strongest keypoints, strongest first
    pub fn retain_best(keypoints: &mut Vec<Keypoint>, n: usize) {
        Self::sort_by_response(keypoints);
        keypoints.truncate(n);
    }

    fn sort_by_response(keypoints: &mut [Keypoint]) {
        keypoints.sort_by(|a, b| {
            b.response
                .partial_cmp(&a.response)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Half-widths of the circular patch, one entry per row offset `0..=radius`
    pub fn circular_extent(radius: usize) -> Vec<i32> {
        let r_sq = (radius * radius) as i64;
        (0..=radius as i64)
            .map(|v| (((r_sq - v * v) as f64).sqrt().floor()) as i32)
            .collect()
    }

    /// Orientation by intensity centroid over a circular patch centred on
    /// (`x`, `y`). Samples outside the image are clamped to the border.
    pub fn compute_orientation(img: &LumaImage, x: usize, y: usize, extent: &[i32]) -> f32 {
        let width = img.width() as i32;
        let height = img.height() as i32;
        let raw = img.as_raw();
        let radius = extent.len() as i32 - 1;
        let (cx, cy) = (x as i32, y as i32);

        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -radius..=radius {
            let yy = (cy + dy).clamp(0, height - 1) as usize;
            let half = extent[dy.unsigned_abs() as usize];
            for dx in -half..=half {
                let xx = (cx + dx).clamp(0, width - 1) as usize;
                let val = raw[yy * width as usize + xx] as i64;
                m10 += dx as i64 * val;
                m01 += dy as i64 * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn keypoint(x: f32, y: f32, response: f32) -> Keypoint {
        Keypoint { x, y, angle: 0.0, response, octave: 0 }
    }

    #[test]
    fn test_nms_keeps_strongest_of_cluster() {
        let kps = vec![
            keypoint(10.0, 10.0, 1.0),
            keypoint(11.0, 10.0, 5.0),
            keypoint(10.0, 11.0, 3.0),
            keypoint(50.0, 50.0, 2.0),
        ];
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 3.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].response, 5.0);
        assert_eq!(kept[1].response, 2.0);
    }

    #[test]
    fn test_nms_respects_min_distance() {
        let kps: Vec<Keypoint> = (0..200)
            .map(|i| keypoint((i % 20) as f32 * 1.5, (i / 20) as f32 * 1.5, (i * 7 % 13) as f32))
            .collect();
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 5.0);
        assert!(kept.len() <= kps.len());
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let dx = kept[i].x - kept[j].x;
                let dy = kept[i].y - kept[j].y;
                let distance = (dx * dx + dy * dy).sqrt();
                assert!(distance >= 5.0, "Keypoints too close after NMS: {}", distance);
            }
        }
    }

    #[test]
    fn test_nms_empty() {
        assert!(KeypointRefinement::non_maximum_suppression(&[], 3.0).is_empty());
    }

    #[test]
    fn test_retain_best() {
        let mut kps = vec![keypoint(0.0, 0.0, 1.0), keypoint(1.0, 0.0, 9.0), keypoint(2.0, 0.0, 4.0)];
        KeypointRefinement::retain_best(&mut kps, 2);
        assert_eq!(kps.len(), 2);
        assert_eq!(kps[0].response, 9.0);
        assert_eq!(kps[1].response, 4.0);
    }

    #[test]
    fn test_circular_extent() {
        let extent = KeypointRefinement::circular_extent(3);
        assert_eq!(extent, vec![3, 2, 2, 0]);
    }

    #[test]
    fn test_orientation_points_towards_bright_side() {
        // Bright right half: centroid lies along +x, angle ~ 0
        let img = GrayImage::from_fn(31, 31, |x, _| if x > 15 { Luma([255]) } else { Luma([0]) });
        let extent = KeypointRefinement::circular_extent(7);
        let angle = KeypointRefinement::compute_orientation(&img, 15, 15, &extent);
        assert!(angle.abs() < 1e-3, "angle = {}", angle);

        // Bright bottom half: centroid along +y, angle ~ pi/2
        let img = GrayImage::from_fn(31, 31, |_, y| if y > 15 { Luma([255]) } else { Luma([0]) });
        let angle = KeypointRefinement::compute_orientation(&img, 15, 15, &extent);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-3, "angle = {}", angle);
    }

    #[test]
    fn test_orientation_uniform_is_zero() {
        let img = GrayImage::from_pixel(21, 21, Luma([128]));
        let extent = KeypointRefinement::circular_extent(5);
        assert_eq!(KeypointRefinement::compute_orientation(&img, 10, 10, &extent), 0.0);
    }
}
