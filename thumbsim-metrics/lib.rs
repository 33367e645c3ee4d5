//! Image similarity metrics on canonical-size RGB pairs.
//!
//! `CanonicalResizer` brings two arbitrary uploads to one resolution, then
//! `SimilarityEngine` scores them three ways:
//!
//! - overall: SSIM of the luminance images, with a difference map
//! - color: weighted HSV histogram correlation, scalar only
//! - structure: SSIM of the Canny edge maps, with a difference map

pub mod color;
pub mod resize;
pub mod ssim;
pub mod structure;

pub use color::{color_similarity, ColorParams, HsvHistograms};
pub use resize::CanonicalResizer;
pub use ssim::{structural_similarity, SsimOutput, SsimParams};
pub use structure::{edge_map, edge_similarity, EdgeThresholds};

use thumbsim_core::{ensure_same_dimensions, to_luma, PipelineConfig, RasterImage, SimResult, SimilarityResult};
use tracing::{debug, info_span};

/// Computes the three similarity scores of one image pair
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    ssim: SsimParams,
    color: ColorParams,
    edges: EdgeThresholds,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl SimilarityEngine {
    pub fn new(cfg: &PipelineConfig) -> SimResult<Self> {
        cfg.validate()?;
        Ok(Self::from_config(cfg))
    }

    fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            ssim: SsimParams::from_config(cfg),
            color: ColorParams::from_config(cfg),
            edges: EdgeThresholds {
                low: cfg.canny_low,
                high: cfg.canny_high,
            },
        }
    }

    /// Score two images of identical size. The three metrics share no state
    /// and run concurrently.
    pub fn compare(&self, a: &RasterImage, b: &RasterImage) -> SimResult<SimilarityResult> {
        ensure_same_dimensions(a.dimensions(), b.dimensions())?;
        let span = info_span!("similarity", width = a.width(), height = a.height());
        let _guard = span.enter();

        let gray_a = to_luma(a);
        let gray_b = to_luma(b);

        let (overall, (color, structure)) = rayon::join(
            || structural_similarity(&gray_a, &gray_b, &self.ssim),
            || {
                rayon::join(
                    || color_similarity(a, b, &self.color),
                    || edge_similarity(&gray_a, &gray_b, self.edges, &self.ssim),
                )
            },
        );
        let (overall, color, structure) = (overall?, color?, structure?);

        debug!(
            overall = overall.score,
            color,
            structure = structure.score,
            "similarity scores computed"
        );

        Ok(SimilarityResult {
            overall: overall.score,
            color,
            structure: structure.score,
            overall_diff: overall.difference_map()?,
            structure_diff: structure.difference_map()?,
        })
    }
}
