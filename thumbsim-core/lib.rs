pub mod config;
pub mod error;

pub use config::*;
pub use error::{SimError, SimResult};

/// 3-channel 8-bit raster, RGB order throughout a pipeline run
pub type RasterImage = image::RgbImage;

/// Single-channel 8-bit luminance raster
pub type LumaImage = image::GrayImage;

/// Key-point ≙ FAST corner + orientation (radians), in level-0 coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Harris response used for ranking
    pub response: f32,
    /// Pyramid level the point was detected on
    pub octave: usize,
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

/// One level of a scale pyramid; `scale` maps level coordinates back to level 0
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub image: LumaImage,
    pub scale: f32,
}

/// Pairing of a keypoint in the first image (`query_idx`) with one in the
/// second image (`train_idx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    /// Hamming distance between the two descriptors (0..=256)
    pub distance: u32,
}

/// Per-pixel difference values in [0, 1], row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DifferenceMap {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> SimResult<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidImage {
                reason: format!("difference map must be non-empty, got {}x{}", width, height),
            });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SimError::DimensionMismatch {
                left: (width, height),
                right: (data.len() as u32, 1),
            });
        }
        Ok(Self {
            width,
            height,
            data: data.into_iter().map(|v| v.clamp(0.0, 1.0)).collect(),
        })
    }

    /// Build a map by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> SimResult<Self>
    where
        F: Fn(u32, u32) -> f32,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn mean(&self) -> f32 {
        self.data.iter().map(|&v| v as f64).sum::<f64>() as f32 / self.data.len() as f32
    }
}

/// Aggregate handed from the similarity engine to the renderer.
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    /// Luminance SSIM, clamped to [0, 1]
    pub overall: f64,
    /// Weighted HSV histogram correlation remapped to [0, 1]
    pub color: f64,
    /// SSIM of Canny edge maps, clamped to [0, 1]
    pub structure: f64,
    pub overall_diff: DifferenceMap,
    pub structure_diff: DifferenceMap,
}

/// Fail with `DimensionMismatch` unless both images share pixel dimensions
pub fn ensure_same_dimensions(left: (u32, u32), right: (u32, u32)) -> SimResult<()> {
    if left != right {
        return Err(SimError::DimensionMismatch { left, right });
    }
    Ok(())
}

/// BT.601 luma in 14-bit fixed point (0.299, 0.587, 0.114), rounded the way
/// 8-bit colour-to-gray conversion conventionally is
pub fn to_luma(img: &RasterImage) -> LumaImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    LumaImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let y = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT;
        image::Luma([y as u8])
    })
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
