use image::Rgb;
use thumbsim_core::{DifferenceMap, RasterImage};

/// Classic jet ramp: dark blue -> blue -> cyan -> yellow -> red -> dark red
pub fn jet(x: f32) -> [u8; 3] {
    let x = x.clamp(0.0, 1.0);
    let channel = |centre: f32| ((1.5 - (4.0 * x - centre).abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// 256-entry lookup table from 8-bit intensity to color
#[derive(Debug, Clone)]
pub struct Palette {
    lut: Vec<[u8; 3]>,
}

impl Palette {
    /// Jet reversed, so intensity 0 is dark red and 255 is dark blue
    pub fn inverted_jet() -> Self {
        Self {
            lut: (0..=255u32).map(|i| jet((255 - i) as f32 / 255.0)).collect(),
        }
    }

    pub fn lookup(&self, intensity: u8) -> Rgb<u8> {
        Rgb(self.lut[intensity as usize])
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::inverted_jet()
    }
}

/// `round((1 - d) * 255)`; large differences give low intensities
#[inline]
pub fn difference_to_intensity(d: f32) -> u8 {
    ((1.0 - d.clamp(0.0, 1.0)) * 255.0).round() as u8
}

/// False-color a difference map so large differences render hot
pub fn render_heatmap(diff: &DifferenceMap, palette: &Palette) -> RasterImage {
    let (width, height) = diff.dimensions();
    RasterImage::from_fn(width, height, |x, y| palette.lookup(difference_to_intensity(diff.get(x, y))))
}
