use thumbsim_core::{ensure_same_dimensions, PipelineConfig, RasterImage, SimResult};
use tracing::debug;

/// Channel value ranges of 8-bit HSV: hue is degrees halved
pub const HUE_RANGE: usize = 180;
pub const SATURATION_RANGE: usize = 256;
pub const VALUE_RANGE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct ColorParams {
    /// Hue, saturation, value bin counts
    pub bins: [usize; 3],
    /// Hue, saturation, value correlation weights
    pub weights: [f64; 3],
}

impl Default for ColorParams {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ColorParams {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            bins: [cfg.hue_bins, cfg.saturation_bins, cfg.value_bins],
            weights: cfg.channel_weights,
        }
    }
}

/// Convert one RGB pixel to 8-bit HSV (H in 0..180, S and V in 0..=255)
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    [
        (hue / 2.0).round().min((HUE_RANGE - 1) as f32) as u8,
        saturation.round() as u8,
        max as u8,
    ]
}

/// Per-channel histograms of an image in HSV space
#[derive(Debug, Clone, PartialEq)]
pub struct HsvHistograms {
    pub hue: Vec<f64>,
    pub saturation: Vec<f64>,
    pub value: Vec<f64>,
}

impl HsvHistograms {
    pub fn compute(img: &RasterImage, bins: [usize; 3]) -> Self {
        let mut hue = vec![0.0; bins[0]];
        let mut saturation = vec![0.0; bins[1]];
        let mut value = vec![0.0; bins[2]];

        let bin = |v: u8, n: usize, range: usize| (v as usize * n / range).min(n - 1);
        for pixel in img.pixels() {
            let [h, s, v] = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
            hue[bin(h, bins[0], HUE_RANGE)] += 1.0;
            saturation[bin(s, bins[1], SATURATION_RANGE)] += 1.0;
            value[bin(v, bins[2], VALUE_RANGE)] += 1.0;
        }

        Self { hue, saturation, value }
    }

    pub fn normalize(&mut self) {
        normalize_min_max(&mut self.hue);
        normalize_min_max(&mut self.saturation);
        normalize_min_max(&mut self.value);
    }

    pub fn channels(&self) -> [&[f64]; 3] {
        [&self.hue, &self.saturation, &self.value]
    }
}

/// Rescale to [0, 1]; a constant histogram becomes all zeros
pub fn normalize_min_max(hist: &mut [f64]) {
    let min = hist.iter().copied().fold(f64::INFINITY, f64::min);
    let max = hist.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    for v in hist.iter_mut() {
        *v = if span > f64::EPSILON { (*v - min) / span } else { 0.0 };
    }
}

/// Pearson correlation of two histograms; 1.0 when either has no variance
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 1.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let (mut num, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a[..n].iter().zip(&b[..n]) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        num += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = var_a * var_b;
    if denom.abs() > f64::EPSILON {
        num / denom.sqrt()
    } else {
        1.0
    }
}

/// Weighted HSV histogram correlation mapped from [-1, 1] onto [0, 1]
pub fn color_similarity(a: &RasterImage, b: &RasterImage, params: &ColorParams) -> SimResult<f64> {
    ensure_same_dimensions(a.dimensions(), b.dimensions())?;

    let mut hist_a = HsvHistograms::compute(a, params.bins);
    let mut hist_b = HsvHistograms::compute(b, params.bins);
    hist_a.normalize();
    hist_b.normalize();

    let correlations: Vec<f64> = hist_a
        .channels()
        .iter()
        .zip(hist_b.channels().iter())
        .map(|(x, y)| correlation(x, y))
        .collect();
    let combined: f64 = correlations
        .iter()
        .zip(params.weights.iter())
        .map(|(c, w)| c * w)
        .sum();

    debug!(
        hue = correlations[0],
        saturation = correlations[1],
        value = correlations[2],
        "histogram correlations"
    );

    Ok(((combined + 1.0) / 2.0).clamp(0.0, 1.0))
}
