use image::Rgb;
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use thumbsim_core::{Keypoint, Match, RasterImage, SimResult};

use crate::compose::side_by_side;

pub const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const ENDPOINT_RADIUS: i32 = 4;

/// Draw up to `max_drawn` matches, in the given order, as connectors between
/// the two images placed side by side. Unmatched keypoints are not drawn.
pub fn draw_matches(
    left: &RasterImage,
    right: &RasterImage,
    left_kps: &[Keypoint],
    right_kps: &[Keypoint],
    matches: &[Match],
    max_drawn: usize,
) -> SimResult<RasterImage> {
    let mut canvas = side_by_side(left, right)?;
    if matches.is_empty() || max_drawn == 0 {
        return Ok(canvas);
    }

    // The right image was scaled to the left height
    let scale = left.height() as f32 / right.height() as f32;
    let offset = left.width() as f32;

    for m in matches.iter().take(max_drawn) {
        let (Some(a), Some(b)) = (left_kps.get(m.query_idx), right_kps.get(m.train_idx)) else {
            continue;
        };
        let start = (a.x, a.y);
        let end = (offset + b.x * scale, b.y * scale);

        draw_line_segment_mut(&mut canvas, start, end, MATCH_COLOR);
        draw_hollow_circle_mut(&mut canvas, (start.0 as i32, start.1 as i32), ENDPOINT_RADIUS, MATCH_COLOR);
        draw_hollow_circle_mut(&mut canvas, (end.0 as i32, end.1 as i32), ENDPOINT_RADIUS, MATCH_COLOR);
    }

    Ok(canvas)
}
