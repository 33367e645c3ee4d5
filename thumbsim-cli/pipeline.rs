use thumbsim_core::{PipelineConfig, RasterImage, SimResult, SimilarityResult};
use thumbsim_metrics::{CanonicalResizer, SimilarityEngine};
use thumbsim_render::{HeatmapRenderer, VisualTriple};
use tracing::{debug, info, info_span};

use crate::features::{FeatureMatchResult, FeatureMatcher};

/// Everything one comparison produces, before encoding
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub similarity: SimilarityResult,
    pub overall: VisualTriple,
    pub structure: VisualTriple,
    pub features: FeatureMatchResult,
}

/// Resize, score, match and render one image pair
#[derive(Debug, Clone)]
pub struct ComparisonPipeline {
    config: PipelineConfig,
    engine: SimilarityEngine,
    matcher: FeatureMatcher,
    renderer: HeatmapRenderer,
}

impl ComparisonPipeline {
    pub fn new(config: PipelineConfig) -> SimResult<Self> {
        let engine = SimilarityEngine::new(&config)?;
        Ok(Self {
            matcher: FeatureMatcher::from_config(&config),
            renderer: HeatmapRenderer::from_config(&config),
            engine,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, a: &RasterImage, b: &RasterImage) -> SimResult<ComparisonReport> {
        let span = info_span!("compare", first = ?a.dimensions(), second = ?b.dimensions());
        let _guard = span.enter();

        let (a, b) = CanonicalResizer::from_config(&self.config).resize_pair(a, b)?;
        debug!(width = a.width(), height = a.height(), "inputs normalised");

        let (similarity, features) = rayon::join(|| self.engine.compare(&a, &b), || self.matcher.match_images(&a, &b));
        let (similarity, features) = (similarity?, features?);

        let (overall, structure) = rayon::join(
            || self.renderer.render(&a, &b, &similarity.overall_diff),
            || self.renderer.render(&a, &b, &similarity.structure_diff),
        );

        info!(
            overall = similarity.overall,
            color = similarity.color,
            structure = similarity.structure,
            matches = features.match_count(),
            match_score = features.score,
            "comparison finished"
        );

        Ok(ComparisonReport {
            similarity,
            overall: overall?,
            structure: structure?,
            features,
        })
    }
}

/// One-shot comparison with the given configuration
pub fn run_comparison(a: &RasterImage, b: &RasterImage, config: &PipelineConfig) -> SimResult<ComparisonReport> {
    ComparisonPipeline::new(config.clone())?.run(a, b)
}
