use thumbsim_core::SimError;

#[derive(Debug, Clone, PartialEq)]
pub enum FastError {
    InvalidImageSize { width: usize, height: usize },
    InvalidImageData { expected: (usize, usize), actual: (usize, usize) },
    InvalidThreshold(u8),
    InvalidPatchSize { patch_size: usize, edge_threshold: usize },
    ImageTooSmall { width: usize, height: usize, min_size: usize },
    InvalidFeatureBudget(usize),
    InvalidPyramid { n_levels: usize, scale_factor: f32 },
}

impl std::fmt::Display for FastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FastError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            FastError::InvalidImageData { expected, actual } => {
                write!(
                    f,
                    "Image size mismatch: detector built for {}x{}, got {}x{}",
                    expected.0, expected.1, actual.0, actual.1
                )
            }
            FastError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be 1-127)", t)
            }
            FastError::InvalidPatchSize { patch_size, edge_threshold } => {
                write!(
                    f,
                    "Patch size {} must be odd and fit inside edge threshold {}",
                    patch_size, edge_threshold
                )
            }
            FastError::ImageTooSmall { width, height, min_size } => {
                write!(f, "Image {}x{} too small (minimum {}x{})", width, height, min_size, min_size)
            }
            FastError::InvalidFeatureBudget(n) => {
                write!(f, "Invalid feature budget: {} (must be > 0)", n)
            }
            FastError::InvalidPyramid { n_levels, scale_factor } => {
                write!(
                    f,
                    "Invalid pyramid: {} levels at scale factor {} (need >= 1 level and factor > 1)",
                    n_levels, scale_factor
                )
            }
        }
    }
}

impl std::error::Error for FastError {}

impl From<FastError> for SimError {
    fn from(err: FastError) -> Self {
        match err {
            FastError::InvalidImageData { expected, actual } => SimError::DimensionMismatch {
                left: (expected.0 as u32, expected.1 as u32),
                right: (actual.0 as u32, actual.1 as u32),
            },
            FastError::InvalidImageSize { .. } | FastError::ImageTooSmall { .. } => {
                SimError::InvalidImage { reason: err.to_string() }
            }
            other => SimError::InvalidConfig { reason: other.to_string() },
        }
    }
}

pub type FastResult<T> = Result<T, FastError>;
