use image::imageops::{self, FilterType};
use image::Rgb;
use thumbsim_core::{RasterImage, SimError, SimResult};

fn ensure_non_empty(img: &RasterImage, what: &str) -> SimResult<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(SimError::InvalidImage {
            reason: format!("{} is empty ({}x{})", what, img.width(), img.height()),
        });
    }
    Ok(())
}

/// Alpha-blend `heatmap` over `base`: `base * (1 - alpha) + heatmap * alpha`.
/// The heatmap is resized to the base dimensions first when they differ.
pub fn overlay(base: &RasterImage, heatmap: &RasterImage, alpha: f32) -> SimResult<RasterImage> {
    ensure_non_empty(base, "overlay base")?;
    ensure_non_empty(heatmap, "overlay heatmap")?;
    if !(0.0..=1.0).contains(&alpha) {
        return Err(SimError::InvalidConfig {
            reason: format!("overlay alpha must lie in [0, 1], got {}", alpha),
        });
    }

    let resized;
    let heatmap = if heatmap.dimensions() != base.dimensions() {
        resized = imageops::resize(heatmap, base.width(), base.height(), FilterType::Triangle);
        &resized
    } else {
        heatmap
    };

    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(heatmap.pixels()) {
        for c in 0..3 {
            let blended = dst[c] as f32 * (1.0 - alpha) + src[c] as f32 * alpha;
            dst[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

/// Scale to `height`, keeping the aspect ratio (`width = floor(w * height / h)`)
pub fn scale_to_height(img: &RasterImage, height: u32) -> RasterImage {
    if img.height() == height {
        return img.clone();
    }
    let width = ((img.width() as u64 * height as u64) / img.height().max(1) as u64).max(1) as u32;
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Concatenate left to right; shorter images are padded with black below
pub fn hstack(images: &[&RasterImage]) -> RasterImage {
    let width: u32 = images.iter().map(|img| img.width()).sum();
    let height = images.iter().map(|img| img.height()).max().unwrap_or(0);

    let mut canvas = RasterImage::from_pixel(width, height, Rgb([0, 0, 0]));
    let mut offset = 0i64;
    for img in images {
        imageops::replace(&mut canvas, *img, offset, 0);
        offset += img.width() as i64;
    }
    canvas
}

/// Two images side by side, the second scaled to the first's height
pub fn side_by_side(left: &RasterImage, right: &RasterImage) -> SimResult<RasterImage> {
    ensure_non_empty(left, "left image")?;
    ensure_non_empty(right, "right image")?;
    let right = scale_to_height(right, left.height());
    Ok(hstack(&[left, &right]))
}

/// `a | b | heatmap`, with `b` and the heatmap scaled to `a`'s height
pub fn compose_comparison(a: &RasterImage, b: &RasterImage, heatmap: &RasterImage) -> SimResult<RasterImage> {
    ensure_non_empty(a, "first image")?;
    ensure_non_empty(b, "second image")?;
    ensure_non_empty(heatmap, "heatmap")?;

    let height = a.height();
    let b = scale_to_height(b, height);
    let heatmap = scale_to_height(heatmap, height);
    Ok(hstack(&[a, &b, &heatmap]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RasterImage {
        RasterImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn test_overlay_blends() {
        let base = solid(4, 4, [100, 0, 200]);
        let heat = solid(4, 4, [200, 100, 0]);
        let out = overlay(&base, &heat, 0.4).unwrap();
        assert_eq!(out.get_pixel(1, 1), &Rgb([140, 40, 120]));
    }

    #[test]
    fn test_overlay_alpha_extremes() {
        let base = solid(3, 3, [10, 20, 30]);
        let heat = solid(3, 3, [200, 210, 220]);
        assert_eq!(overlay(&base, &heat, 0.0).unwrap(), base);
        assert_eq!(overlay(&base, &heat, 1.0).unwrap(), heat);
    }

    #[test]
    fn test_overlay_resizes_heatmap() {
        let base = solid(40, 30, [0, 0, 0]);
        let heat = solid(10, 10, [250, 250, 250]);
        let out = overlay(&base, &heat, 0.5).unwrap();
        assert_eq!(out.dimensions(), (40, 30));
        assert_eq!(out.get_pixel(20, 15), &Rgb([125, 125, 125]));
    }

    #[test]
    fn test_overlay_rejects_bad_alpha() {
        let img = solid(2, 2, [0, 0, 0]);
        assert!(matches!(overlay(&img, &img, 1.5), Err(SimError::InvalidConfig { .. })));
    }

    #[test]
    fn test_scale_to_height_keeps_aspect() {
        let img = solid(90, 30, [1, 2, 3]);
        assert_eq!(scale_to_height(&img, 60).dimensions(), (180, 60));
        assert_eq!(scale_to_height(&solid(10, 3, [0, 0, 0]), 2).dimensions(), (6, 2));
    }

    #[test]
    fn test_comparison_layout() {
        let a = solid(80, 60, [255, 0, 0]);
        let b = solid(40, 30, [0, 255, 0]);
        let heat = solid(100, 120, [0, 0, 255]);
        let out = compose_comparison(&a, &b, &heat).unwrap();

        assert_eq!(out.dimensions(), (80 + 80 + 50, 60));
        assert_eq!(out.get_pixel(10, 10), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(100, 10), &Rgb([0, 255, 0]));
        assert_eq!(out.get_pixel(200, 10), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_side_by_side() {
        let out = side_by_side(&solid(20, 10, [9, 9, 9]), &solid(20, 10, [7, 7, 7])).unwrap();
        assert_eq!(out.dimensions(), (40, 10));
        assert_eq!(out.get_pixel(25, 5), &Rgb([7, 7, 7]));
    }

    #[test]
    fn test_hstack_pads_shorter_images() {
        let out = hstack(&[&solid(2, 4, [5, 5, 5]), &solid(3, 2, [6, 6, 6])]);
        assert_eq!(out.dimensions(), (5, 4));
        assert_eq!(out.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let empty = RasterImage::new(0, 0);
        let img = solid(4, 4, [0, 0, 0]);
        assert!(matches!(compose_comparison(&empty, &img, &img), Err(SimError::InvalidImage { .. })));
        assert!(matches!(side_by_side(&img, &empty), Err(SimError::InvalidImage { .. })));
    }
}
