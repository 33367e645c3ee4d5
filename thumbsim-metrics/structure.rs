use imageproc::edges::canny;
use thumbsim_core::{LumaImage, SimResult};

use crate::ssim::{structural_similarity, SsimOutput, SsimParams};

/// Canny hysteresis thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self {
            low: thumbsim_core::DEFAULT_CANNY_LOW,
            high: thumbsim_core::DEFAULT_CANNY_HIGH,
        }
    }
}

/// Binary edge map: 255 on edges, 0 elsewhere
pub fn edge_map(gray: &LumaImage, thresholds: EdgeThresholds) -> LumaImage {
    canny(gray, thresholds.low, thresholds.high)
}

/// SSIM between the edge maps of two luminance images
pub fn edge_similarity(
    a: &LumaImage,
    b: &LumaImage,
    thresholds: EdgeThresholds,
    params: &SsimParams,
) -> SimResult<SsimOutput> {
    let edges_a = edge_map(a, thresholds);
    let edges_b = edge_map(b, thresholds);
    structural_similarity(&edges_a, &edges_b, params)
}
