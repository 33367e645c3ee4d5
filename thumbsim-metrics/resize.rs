use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use thumbsim_core::{PipelineConfig, RasterImage, SimError, SimResult};
use tracing::debug;

/// Normalises images to one canonical resolution with area averaging
pub struct CanonicalResizer {
    resizer: Resizer,
    width: u32,
    height: u32,
}

impl CanonicalResizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resizer: Resizer::new(),
            width,
            height,
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(cfg.target_width, cfg.target_height)
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize one RGB image to the target size. A box convolution averages
    /// every source pixel under each destination pixel.
    pub fn resize(&mut self, img: &RasterImage) -> SimResult<RasterImage> {
        let (src_width, src_height) = img.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(SimError::InvalidImage {
                reason: format!("cannot resize an empty {}x{} image", src_width, src_height),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(SimError::InvalidConfig {
                reason: format!("target size must be non-zero, got {}x{}", self.width, self.height),
            });
        }
        if (src_width, src_height) == (self.width, self.height) {
            return Ok(img.clone());
        }

        let src = Image::from_vec_u8(src_width, src_height, img.as_raw().clone(), PixelType::U8x3)
            .map_err(|e| SimError::InvalidImage {
                reason: format!("failed to wrap source buffer: {}", e),
            })?;
        let mut dst = Image::new(self.width, self.height, PixelType::U8x3);

        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box));
        self.resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| SimError::InvalidImage {
                reason: format!("resize failed: {}", e),
            })?;

        debug!(
            from_width = src_width,
            from_height = src_height,
            to_width = self.width,
            to_height = self.height,
            "image resized"
        );

        RasterImage::from_raw(self.width, self.height, dst.into_vec()).ok_or_else(|| SimError::InvalidImage {
            reason: "resized buffer has unexpected length".to_string(),
        })
    }

    /// Resize both images of a comparison pair
    pub fn resize_pair(&mut self, a: &RasterImage, b: &RasterImage) -> SimResult<(RasterImage, RasterImage)> {
        Ok((self.resize(a)?, self.resize(b)?))
    }
}

impl Default for CanonicalResizer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use proptest::prelude::*;

    fn create_test_image(width: u32, height: u32) -> RasterImage {
        RasterImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 128 / (width + height).max(1)) as u8;
            Rgb([r, g, b])
        })
    }

    #[test]
    fn test_default_target_is_canonical() {
        assert_eq!(CanonicalResizer::default().target_size(), (800, 600));
    }

    #[test]
    fn test_resize_to_target() {
        let mut resizer = CanonicalResizer::new(80, 60);
        let out = resizer.resize(&create_test_image(317, 211)).unwrap();
        assert_eq!(out.dimensions(), (80, 60));
    }

    #[test]
    fn test_upscale_to_target() {
        let mut resizer = CanonicalResizer::new(80, 60);
        let out = resizer.resize(&create_test_image(20, 45)).unwrap();
        assert_eq!(out.dimensions(), (80, 60));
    }

    #[test]
    fn test_constant_color_survives_averaging() {
        let mut resizer = CanonicalResizer::new(40, 30);
        let img = RasterImage::from_pixel(123, 77, Rgb([10, 200, 90]));
        let out = resizer.resize(&img).unwrap();
        let close = |a: u8, b: u8| (a as i16 - b as i16).abs() <= 1;
        assert!(out.pixels().all(|p| close(p[0], 10) && close(p[1], 200) && close(p[2], 90)));
    }

    #[test]
    fn test_checkerboard_averages_to_mid_grey() {
        // Every 2x2 output cell covers two black and two 200-level pixels
        let board = RasterImage::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([200, 200, 200])
            }
        });
        let close = |v: u8| (v as i16 - 100).abs() <= 1;

        let out = CanonicalResizer::new(2, 2).resize(&board).unwrap();
        assert!(out.pixels().all(|p| p.0.iter().all(|&v| close(v))), "{:?}", out);

        let out = CanonicalResizer::new(1, 1).resize(&board).unwrap();
        assert!(out.pixels().all(|p| p.0.iter().all(|&v| close(v))), "{:?}", out);
    }

    #[test]
    fn test_same_size_is_identity() {
        let mut resizer = CanonicalResizer::new(64, 48);
        let img = create_test_image(64, 48);
        assert_eq!(resizer.resize(&img).unwrap(), img);
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let mut resizer = CanonicalResizer::new(64, 48);
        let result = resizer.resize(&RasterImage::new(0, 10));
        assert!(matches!(result, Err(SimError::InvalidImage { .. })));
    }

    #[test]
    fn test_resize_pair() {
        let mut resizer = CanonicalResizer::new(32, 24);
        let (a, b) = resizer
            .resize_pair(&create_test_image(100, 10), &create_test_image(7, 300))
            .unwrap();
        assert_eq!(a.dimensions(), b.dimensions());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_output_always_matches_target(w in 1u32..200, h in 1u32..200) {
            let mut resizer = CanonicalResizer::new(50, 40);
            let out = resizer.resize(&create_test_image(w, h)).unwrap();
            prop_assert_eq!(out.dimensions(), (50, 40));
        }
    }
}
