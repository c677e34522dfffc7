//! Image loading and preprocessing for the sweep
//!
//! Steps are applied in a fixed order: resize to the target height,
//! optional histogram equalization, rescale to `[0, img_scale]`, optional
//! featurewise centering.

use crate::error::{HeatsweepError, Result};
use image::imageops::FilterType;
use ndarray::Array2;
use std::path::Path;

const EQUALIZE_BINS: usize = 256;

/// Preprocessing options for full mammogram images
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    /// Target height after resizing; width scales to preserve aspect ratio
    pub img_height: u32,
    /// Pixel values are rescaled to `[0, img_scale]`
    pub img_scale: f32,
    pub equalize_hist: bool,
    pub featurewise_center: bool,
    pub featurewise_mean: f32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            img_height: 4096,
            img_scale: 255.0,
            equalize_hist: false,
            featurewise_center: false,
            featurewise_mean: 71.8,
        }
    }
}

/// Loads a mammogram PNG and applies the preprocessing pipeline
///
/// The image is decoded as 16-bit grayscale (8-bit PNGs widen losslessly),
/// resized so its height equals `img_height`, and returned as a
/// `(height, width)` array of f32 pixels.
pub fn load_preprocessed(path: &Path, opts: &PreprocessOptions) -> Result<Array2<f32>> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let plane = resize_to_height(&gray, opts.img_height)?;
    Ok(preprocess_plane(plane, opts))
}

/// Resizes to the target height and converts to a normalized f32 plane
fn resize_to_height(gray: &image::ImageBuffer<image::Luma<u16>, Vec<u16>>, img_height: u32) -> Result<Array2<f32>> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return Err(HeatsweepError::SweepError("image has zero extent".to_string()));
    }
    let target_w = ((w as u64 * img_height as u64) / h as u64).max(1) as u32;
    let resized = image::imageops::resize(gray, target_w, img_height, FilterType::Lanczos3);

    let (rw, rh) = resized.dimensions();
    let mut plane = Array2::zeros((rh as usize, rw as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        plane[[y as usize, x as usize]] = pixel.0[0] as f32 / u16::MAX as f32;
    }
    Ok(plane)
}

/// Applies equalization, rescaling, and centering to a normalized plane
///
/// Expects pixels in `[0, 1]`; exposed separately so tests can exercise the
/// numeric steps without PNG fixtures.
pub fn preprocess_plane(mut plane: Array2<f32>, opts: &PreprocessOptions) -> Array2<f32> {
    if opts.equalize_hist {
        equalize_histogram(&mut plane);
    }
    plane.mapv_inplace(|v| v * opts.img_scale);
    if opts.featurewise_center {
        plane.mapv_inplace(|v| v - opts.featurewise_mean);
    }
    plane
}

/// In-place 256-bin histogram equalization over `[0, 1]` pixels
fn equalize_histogram(plane: &mut Array2<f32>) {
    let total = plane.len();
    if total == 0 {
        return;
    }

    let mut histogram = [0usize; EQUALIZE_BINS];
    for &v in plane.iter() {
        histogram[bin_index(v)] += 1;
    }

    // CDF remap, anchored at the first occupied bin so the darkest
    // occupied level maps to 0.
    let mut cdf = [0usize; EQUALIZE_BINS];
    let mut running = 0usize;
    for (i, &count) in histogram.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }
    let cdf_min = cdf
        .iter()
        .copied()
        .find(|&c| c > 0)
        .unwrap_or(0);
    if cdf_min == total {
        // Flat image; nothing to equalize.
        return;
    }

    let denom = (total - cdf_min) as f32;
    plane.mapv_inplace(|v| (cdf[bin_index(v)] - cdf_min) as f32 / denom);
}

fn bin_index(v: f32) -> usize {
    ((v * (EQUALIZE_BINS - 1) as f32).round() as usize).min(EQUALIZE_BINS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use ndarray::array;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = ImageBuffer::from_fn(width, height, |x, _| Luma([(x * 997 % 65536) as u16]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_resizes_to_target_height() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "img.png", 40, 80);
        let opts = PreprocessOptions {
            img_height: 40,
            ..Default::default()
        };

        let plane = load_preprocessed(&path, &opts).unwrap();
        // Height 80 -> 40 halves the width too.
        assert_eq!(plane.dim(), (40, 20));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let opts = PreprocessOptions::default();
        assert!(load_preprocessed(Path::new("/nonexistent/img.png"), &opts).is_err());
    }

    #[test]
    fn test_rescale_to_img_scale() {
        let plane = array![[0.0f32, 0.5], [1.0, 0.25]];
        let opts = PreprocessOptions {
            img_scale: 255.0,
            ..Default::default()
        };

        let out = preprocess_plane(plane, &opts);
        assert_eq!(out[[0, 1]], 127.5);
        assert_eq!(out[[1, 0]], 255.0);
    }

    #[test]
    fn test_featurewise_center() {
        let plane = array![[0.0f32, 1.0]];
        let opts = PreprocessOptions {
            img_scale: 100.0,
            featurewise_center: true,
            featurewise_mean: 40.0,
            ..Default::default()
        };

        let out = preprocess_plane(plane, &opts);
        assert_eq!(out[[0, 0]], -40.0);
        assert_eq!(out[[0, 1]], 60.0);
    }

    #[test]
    fn test_equalize_histogram_spreads_values() {
        // Two levels, three quarters dark: equalization pushes the bright
        // level to full range and keeps the dark level at zero.
        let mut plane = Array2::from_elem((2, 2), 0.1f32);
        plane[[1, 1]] = 0.2;
        equalize_histogram(&mut plane);
        assert_eq!(plane[[0, 0]], 0.0);
        assert!((plane[[1, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_equalize_flat_image_is_noop() {
        let mut plane = Array2::from_elem((3, 3), 0.5f32);
        let before = plane.clone();
        equalize_histogram(&mut plane);
        assert_eq!(plane, before);
    }

    #[test]
    fn test_equalize_preserves_ordering() {
        let mut plane = array![[0.0f32, 0.3, 0.6, 0.9]];
        equalize_histogram(&mut plane);
        for pair in plane
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .windows(2)
        {
            assert!(pair[0] <= pair[1]);
        }
        assert!(plane.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
