use image::{GrayImage, Luma};
use thumbsim_core::{LumaImage, PyramidLevel};

/// Geometry of one pyramid level; `scale` maps level coordinates to level 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Generate up to `n_levels` scale levels, stopping once a level would be
    /// smaller than `min_size` on either axis.
    pub fn generate_scale_levels(
        width: usize,
        height: usize,
        n_levels: usize,
        scale_factor: f32,
        min_size: usize,
    ) -> Vec<ScaleLevel> {
        let mut levels = Vec::with_capacity(n_levels);
        let mut current_scale = 1.0f32;

        for level in 0..n_levels {
            let scaled_width = ((width as f32) / current_scale).round() as usize;
            let scaled_height = ((height as f32) / current_scale).round() as usize;

            if scaled_width < min_size || scaled_height < min_size {
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });

            current_scale *= scale_factor;
        }

        levels
    }

    /// Build the pyramid; each level is resampled from the one above it
    pub fn build_image_pyramid(img: &LumaImage, scale_levels: &[ScaleLevel]) -> Vec<PyramidLevel> {
        let mut pyramid: Vec<PyramidLevel> = Vec::with_capacity(scale_levels.len());

        for scale_level in scale_levels {
            let image = match pyramid.last() {
                None => img.clone(),
                Some(previous) => Self::downsample_image(
                    &previous.image,
                    scale_level.width as u32,
                    scale_level.height as u32,
                ),
            };
            pyramid.push(PyramidLevel {
                image,
                scale: scale_level.scale,
            });
        }

        pyramid
    }

    /// Downsample image using bilinear interpolation at pixel centres
    fn downsample_image(img: &LumaImage, target_width: u32, target_height: u32) -> LumaImage {
        let x_ratio = img.width() as f32 / target_width as f32;
        let y_ratio = img.height() as f32 / target_height as f32;

        GrayImage::from_fn(target_width, target_height, |x, y| {
            let src_x = ((x as f32 + 0.5) * x_ratio - 0.5).max(0.0);
            let src_y = ((y as f32 + 0.5) * y_ratio - 0.5).max(0.0);
            let value = Self::bilinear_sample(img, src_x, src_y);
            Luma([value.round().clamp(0.0, 255.0) as u8])
        })
    }

    /// Sample image at fractional coordinates using bilinear interpolation
    fn bilinear_sample(img: &LumaImage, x: f32, y: f32) -> f32 {
        let width = img.width();
        let height = img.height();
        let x1 = (x.floor() as u32).min(width - 1);
        let y1 = (y.floor() as u32).min(height - 1);
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let p11 = img.get_pixel(x1, y1)[0] as f32;
        let p12 = img.get_pixel(x2, y1)[0] as f32;
        let p21 = img.get_pixel(x1, y2)[0] as f32;
        let p22 = img.get_pixel(x2, y2)[0] as f32;

        let interpolated_top = p11 * (1.0 - fx) + p12 * fx;
        let interpolated_bottom = p21 * (1.0 - fx) + p22 * fx;

        interpolated_top * (1.0 - fy) + interpolated_bottom * fy
    }
}
