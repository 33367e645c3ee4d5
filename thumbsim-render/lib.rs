pub mod compose;
pub mod encode;
pub mod heatmap;
pub mod matches;

pub use compose::{compose_comparison, hstack, overlay, scale_to_height, side_by_side};
pub use encode::{decode_data_uri, encode_image, encode_to_data_uri, OutputFormat};
pub use heatmap::{render_heatmap, Palette};
pub use matches::draw_matches;

use thumbsim_core::{DifferenceMap, PipelineConfig, RasterImage, SimResult};
use tracing::debug;

/// Heatmap, overlay on the first image, and `a | b | heatmap` composite
#[derive(Debug, Clone)]
pub struct VisualTriple {
    pub heatmap: RasterImage,
    pub overlay: RasterImage,
    pub comparison: RasterImage,
}

/// The same triple as data URIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTriple {
    pub heatmap: String,
    pub overlay: String,
    pub comparison: String,
}

impl VisualTriple {
    pub fn encode(&self, format: OutputFormat) -> SimResult<EncodedTriple> {
        Ok(EncodedTriple {
            heatmap: encode_to_data_uri(&self.heatmap, format)?,
            overlay: encode_to_data_uri(&self.overlay, format)?,
            comparison: encode_to_data_uri(&self.comparison, format)?,
        })
    }
}

/// Turns difference maps into visualizations
#[derive(Debug, Clone)]
pub struct HeatmapRenderer {
    palette: Palette,
    alpha: f32,
}

impl Default for HeatmapRenderer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl HeatmapRenderer {
    pub fn new(palette: Palette, alpha: f32) -> Self {
        Self { palette, alpha }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(Palette::default(), cfg.overlay_alpha)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn render_heatmap(&self, diff: &DifferenceMap) -> RasterImage {
        render_heatmap(diff, &self.palette)
    }

    pub fn render(&self, a: &RasterImage, b: &RasterImage, diff: &DifferenceMap) -> SimResult<VisualTriple> {
        let heatmap = self.render_heatmap(diff);
        let overlay = overlay(a, &heatmap, self.alpha)?;
        let comparison = compose_comparison(a, b, &heatmap)?;
        debug!(
            width = comparison.width(),
            height = comparison.height(),
            mean_difference = diff.mean(),
            "heatmap triple rendered"
        );
        Ok(VisualTriple { heatmap, overlay, comparison })
    }
}
