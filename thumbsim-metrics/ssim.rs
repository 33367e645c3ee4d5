//! Windowed structural similarity over 8-bit luminance images.
//!
//! Local statistics come from a uniform `window x window` mean filter with
//! mirrored borders; variances use the unbiased `N / (N - 1)` normalisation.
//! The scalar score averages the map away from the border, where the window
//! would otherwise see reflected pixels.

use rayon::prelude::*;
use thumbsim_core::{ensure_same_dimensions, DifferenceMap, LumaImage, PipelineConfig, SimError, SimResult};

const DATA_RANGE: f64 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsimParams {
    pub window: usize,
    pub k1: f64,
    pub k2: f64,
}

impl Default for SsimParams {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl SsimParams {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            window: cfg.ssim_window,
            k1: cfg.ssim_k1,
            k2: cfg.ssim_k2,
        }
    }
}

/// Scalar SSIM plus the full per-pixel map
#[derive(Debug, Clone)]
pub struct SsimOutput {
    /// Border-cropped mean of the map, clamped to [0, 1]
    pub score: f64,
    width: u32,
    height: u32,
    map: Vec<f64>,
}

impl SsimOutput {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw SSIM values in [-1, 1], row-major
    pub fn map(&self) -> &[f64] {
        &self.map
    }

    /// `1 - ssim`, clamped to [0, 1]
    pub fn difference_map(&self) -> SimResult<DifferenceMap> {
        DifferenceMap::new(
            self.width,
            self.height,
            self.map.iter().map(|&s| (1.0 - s) as f32).collect(),
        )
    }
}

/// Mirror an out-of-range index back into `0..n` (`d c b a | a b c d | d c b a`)
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let i = i.rem_euclid(period);
    if i >= n as isize {
        (period - 1 - i) as usize
    } else {
        i as usize
    }
}

/// Separable uniform mean filter
fn uniform_filter(src: &[f64], width: usize, height: usize, window: usize) -> Vec<f64> {
    let radius = (window / 2) as isize;
    let norm = 1.0 / window as f64;

    let mut horizontal = vec![0.0; width * height];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let line = &src[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for k in -radius..=radius {
                    acc += line[reflect(x as isize + k, width)];
                }
                *out = acc * norm;
            }
        });

    let mut filtered = vec![0.0; width * height];
    filtered
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for k in -radius..=radius {
                    acc += horizontal[reflect(y as isize + k, height) * width + x];
                }
                *out = acc * norm;
            }
        });

    filtered
}

/// Compare two luminance images of identical size
pub fn structural_similarity(a: &LumaImage, b: &LumaImage, params: &SsimParams) -> SimResult<SsimOutput> {
    ensure_same_dimensions(a.dimensions(), b.dimensions())?;
    let (width, height) = a.dimensions();
    let window = params.window;

    if window < 3 || window % 2 == 0 {
        return Err(SimError::InvalidConfig {
            reason: format!("SSIM window must be odd and >= 3, got {}", window),
        });
    }
    if (width.min(height) as usize) < window {
        return Err(SimError::InvalidImage {
            reason: format!("{}x{} image is smaller than the {}px SSIM window", width, height, window),
        });
    }

    let (w, h) = (width as usize, height as usize);
    let x: Vec<f64> = a.as_raw().iter().map(|&v| v as f64).collect();
    let y: Vec<f64> = b.as_raw().iter().map(|&v| v as f64).collect();
    let xx: Vec<f64> = x.iter().map(|v| v * v).collect();
    let yy: Vec<f64> = y.iter().map(|v| v * v).collect();
    let xy: Vec<f64> = x.iter().zip(&y).map(|(p, q)| p * q).collect();

    let ux = uniform_filter(&x, w, h, window);
    let uy = uniform_filter(&y, w, h, window);
    let uxx = uniform_filter(&xx, w, h, window);
    let uyy = uniform_filter(&yy, w, h, window);
    let uxy = uniform_filter(&xy, w, h, window);

    let np = (window * window) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (params.k1 * DATA_RANGE).powi(2);
    let c2 = (params.k2 * DATA_RANGE).powi(2);

    let map: Vec<f64> = (0..w * h)
        .into_par_iter()
        .map(|i| {
            let (mx, my) = (ux[i], uy[i]);
            let vx = cov_norm * (uxx[i] - mx * mx);
            let vy = cov_norm * (uyy[i] - my * my);
            let vxy = cov_norm * (uxy[i] - mx * my);
            let numerator = (2.0 * mx * my + c1) * (2.0 * vxy + c2);
            let denominator = (mx * mx + my * my + c1) * (vx + vy + c2);
            numerator / denominator
        })
        .collect();

    let pad = (window - 1) / 2;
    let mut sum = 0.0;
    let mut count = 0usize;
    for row in pad..h - pad {
        for col in pad..w - pad {
            sum += map[row * w + col];
            count += 1;
        }
    }
    let score = (sum / count as f64).clamp(0.0, 1.0);

    Ok(SsimOutput { score, width, height, map })
}
