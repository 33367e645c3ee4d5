#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    InvalidImage { reason: String },
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
    EncodingError { reason: String },
    InvalidConfig { reason: String },
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidImage { reason } => write!(f, "Invalid image: {}", reason),
            SimError::DimensionMismatch { left, right } => write!(
                f,
                "Dimension mismatch: {}x{} vs {}x{}",
                left.0, left.1, right.0, right.1
            ),
            SimError::EncodingError { reason } => write!(f, "Encoding error: {}", reason),
            SimError::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for SimError {}

impl From<image::ImageError> for SimError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => SimError::EncodingError { reason: e.to_string() },
            image::ImageError::Unsupported(e) => SimError::EncodingError { reason: e.to_string() },
            other => SimError::InvalidImage { reason: other.to_string() },
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
