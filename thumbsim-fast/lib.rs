//! Oriented FAST keypoint detection.
//!
//! A `FastDetector` builds a scale pyramid, runs the FAST-9 segment test on
//! every level, ranks candidates by Harris response, suppresses near
//! duplicates and assigns each survivor an intensity-centroid orientation.
//! The per-image feature budget is split across levels geometrically.

pub mod builder;
pub mod config;
pub mod corner_detection;
pub mod detector;
pub mod error;
pub mod pyramid;
pub mod refinement;
pub mod utils;

pub use builder::DetectorBuilder;
pub use config::DetectorConfig;
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use pyramid::ScaleLevel;
