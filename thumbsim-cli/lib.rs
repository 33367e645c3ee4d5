//! High-level thumbnail comparison: feature matching, the full pipeline and
//! the compare request handler used by the `thumbsim` binary.

pub mod features;
pub mod handler;
pub mod pipeline;

pub use features::{match_score, FeatureMatchResult, FeatureMatcher};
pub use handler::{
    compare_uploads, health, service_info, ApiError, CompareHandler, CompareResponse, HealthStatus, ServiceInfo,
    Upload,
};
pub use pipeline::{run_comparison, ComparisonPipeline, ComparisonReport};

pub use thumbsim_core::{self, init_thread_pool, PipelineConfig, SimError, SimResult};
pub use thumbsim_render::OutputFormat;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_level` when the variable is unset.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    // A second call keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
