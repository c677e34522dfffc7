//! Sliding-window sweep over full mammogram images
//!
//! Walks every `patch_size` window at `stride` steps, classifies patches in
//! batches on a worker pool, and assembles the per-patch probabilities into
//! a [`ProbHeatmap`].

use crate::error::{HeatsweepError, Result};
use crate::manifest::CaseLabel;
use crate::model::PatchClassifier;
use crate::preprocess::{load_preprocessed, PreprocessOptions};
use crate::types::{BreastSide, CaseScore, MammoView, ProbHeatmap};
use log::debug;
use ndarray::{s, Array2};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Sweep configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub patch_size: u32,
    pub stride: u32,
    pub batch_size: usize,
    /// Number of parallel scoring workers
    pub workers: usize,
    pub preprocess: PreprocessOptions,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            patch_size: 256,
            stride: 8,
            batch_size: 128,
            workers: 1,
            preprocess: PreprocessOptions::default(),
        }
    }
}

impl SweepConfig {
    fn validate(&self) -> Result<()> {
        if self.patch_size == 0 {
            return Err(HeatsweepError::SweepError(
                "patch size must be positive".to_string(),
            ));
        }
        if self.stride == 0 {
            return Err(HeatsweepError::SweepError(
                "stride must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(HeatsweepError::SweepError(
                "batch size must be positive".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(HeatsweepError::SweepError(
                "worker count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Constructs the conventional view image path: `{patient}_{side}_{view}.png`
pub fn view_filename(
    img_folder: &Path,
    patient_id: &str,
    side: BreastSide,
    view: MammoView,
) -> PathBuf {
    img_folder.join(format!(
        "{}_{}_{}.png",
        patient_id,
        side.letter(),
        view.short_str()
    ))
}

/// Heatmap grid dimensions for an image of `height` x `width` pixels
///
/// # Errors
///
/// Returns an error if the image is smaller than one patch in either
/// dimension.
pub fn heatmap_grid(
    height: usize,
    width: usize,
    patch_size: usize,
    stride: usize,
) -> Result<(usize, usize)> {
    if height < patch_size || width < patch_size {
        return Err(HeatsweepError::SweepError(format!(
            "image {}x{} is smaller than the {}px patch",
            height, width, patch_size
        )));
    }
    let rows = (height - patch_size) / stride + 1;
    let cols = (width - patch_size) / stride + 1;
    Ok((rows, cols))
}

/// Sweeps view images with a patch classifier
pub struct Sweeper<'a> {
    classifier: &'a dyn PatchClassifier,
    config: SweepConfig,
    pool: rayon::ThreadPool,
}

impl<'a> Sweeper<'a> {
    /// Creates a sweeper with its own worker pool
    pub fn new(classifier: &'a dyn PatchClassifier, config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| HeatsweepError::SweepError(e.to_string()))?;
        Ok(Self {
            classifier,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweeps a preprocessed image plane into a probability heatmap
    pub fn sweep_plane(&self, plane: &Array2<f32>) -> Result<ProbHeatmap> {
        let (height, width) = plane.dim();
        let patch = self.config.patch_size as usize;
        let stride = self.config.stride as usize;
        let (rows, cols) = heatmap_grid(height, width, patch, stride)?;

        let mut offsets = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                offsets.push((r * stride, c * stride));
            }
        }

        let classifier = self.classifier;
        let batches: Vec<Array2<f32>> = self.pool.install(|| {
            offsets
                .par_chunks(self.config.batch_size)
                .map(|chunk| {
                    let patches: Vec<_> = chunk
                        .iter()
                        .map(|&(r, c)| plane.slice(s![r..r + patch, c..c + patch]))
                        .collect();
                    classifier.predict(&patches)
                })
                .collect::<Result<_>>()
        })?;

        let classes = self.classifier.num_classes();
        let mut data = Vec::with_capacity(rows * cols * classes);
        for batch in &batches {
            data.extend(batch.iter().copied());
        }
        ProbHeatmap::new(rows, cols, classes, data)
    }

    /// Scores a single view image, or returns `None` if the file is absent
    pub fn score_view(
        &self,
        img_folder: &Path,
        patient_id: &str,
        side: BreastSide,
        view: MammoView,
    ) -> Result<Option<ProbHeatmap>> {
        let path = view_filename(img_folder, patient_id, side, view);
        if !path.is_file() {
            debug!("No {} image for {} {}: {}", view, patient_id, side, path.display());
            return Ok(None);
        }
        let plane = load_preprocessed(&path, &self.config.preprocess)?;
        self.sweep_plane(&plane).map(Some)
    }

    /// Scores both standard views for one manifest case
    pub fn score_case(&self, img_folder: &Path, label: &CaseLabel) -> Result<CaseScore> {
        let cc = self.score_view(img_folder, &label.patient_id, label.side, MammoView::Cc)?;
        let mlo = self.score_view(img_folder, &label.patient_id, label.side, MammoView::Mlo)?;
        Ok(CaseScore {
            patient_id: label.patient_id.clone(),
            side: label.side,
            cancer: label.cancer,
            cc,
            mlo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Checkpoint, LinearPatchClassifier};
    use image::{ImageBuffer, Luma};
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn test_classifier(dir: &TempDir) -> LinearPatchClassifier {
        let checkpoint = Checkpoint {
            net: "vgg19".to_string(),
            pool_grid: 2,
            classes: vec!["background".to_string(), "malignant".to_string()],
            weights: vec![vec![0.0; 4], vec![0.1; 4]],
            bias: vec![0.0, 0.0],
        };
        let path = dir.path().join("state.json");
        fs::write(&path, serde_json::to_string(&checkpoint).unwrap()).unwrap();
        LinearPatchClassifier::from_checkpoint(&path, "vgg19").unwrap()
    }

    fn small_config() -> SweepConfig {
        SweepConfig {
            patch_size: 8,
            stride: 4,
            batch_size: 3,
            workers: 2,
            preprocess: PreprocessOptions {
                img_height: 32,
                ..Default::default()
            },
        }
    }

    fn write_view_png(folder: &Path, patient: &str, side: &str, view: &str) {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(24, 32, |x, y| Luma([((x + y) * 800) as u16]));
        img.save(folder.join(format!("{}_{}_{}.png", patient, side, view)))
            .unwrap();
    }

    #[test]
    fn test_view_filename_convention() {
        let path = view_filename(
            Path::new("/data/imgs"),
            "P001",
            BreastSide::L,
            MammoView::Cc,
        );
        assert_eq!(path, PathBuf::from("/data/imgs/P001_L_CC.png"));

        let path = view_filename(Path::new("imgs"), "case-7", BreastSide::R, MammoView::Mlo);
        assert_eq!(path, PathBuf::from("imgs/case-7_R_MLO.png"));
    }

    #[rstest]
    #[case(256, 256, 256, 8, (1, 1))]
    #[case(264, 256, 256, 8, (2, 1))]
    #[case(4096, 3328, 256, 8, (481, 385))]
    #[case(9, 9, 8, 4, (1, 1))]
    fn test_heatmap_grid(
        #[case] h: usize,
        #[case] w: usize,
        #[case] patch: usize,
        #[case] stride: usize,
        #[case] expected: (usize, usize),
    ) {
        assert_eq!(heatmap_grid(h, w, patch, stride).unwrap(), expected);
    }

    #[test]
    fn test_heatmap_grid_image_too_small() {
        assert!(heatmap_grid(100, 255, 256, 8).is_err());
        assert!(heatmap_grid(255, 100, 256, 8).is_err());
    }

    #[test]
    fn test_config_validation() {
        let classifier_dir = TempDir::new().unwrap();
        let classifier = test_classifier(&classifier_dir);

        for bad in [
            SweepConfig {
                patch_size: 0,
                ..small_config()
            },
            SweepConfig {
                stride: 0,
                ..small_config()
            },
            SweepConfig {
                batch_size: 0,
                ..small_config()
            },
            SweepConfig {
                workers: 0,
                ..small_config()
            },
        ] {
            assert!(Sweeper::new(&classifier, bad).is_err());
        }
    }

    #[test]
    fn test_sweep_plane_dimensions_and_probs() {
        let classifier_dir = TempDir::new().unwrap();
        let classifier = test_classifier(&classifier_dir);
        let sweeper = Sweeper::new(&classifier, small_config()).unwrap();

        let plane = Array2::from_shape_fn((32, 24), |(r, c)| (r + c) as f32);
        let heatmap = sweeper.sweep_plane(&plane).unwrap();

        assert_eq!(heatmap.rows(), 7);
        assert_eq!(heatmap.cols(), 5);
        assert_eq!(heatmap.num_classes(), 2);
        for r in 0..heatmap.rows() {
            for c in 0..heatmap.cols() {
                let cell = heatmap.cell(r, c);
                let sum: f32 = cell.iter().sum();
                assert!((sum - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_sweep_plane_batch_order_is_stable() {
        let classifier_dir = TempDir::new().unwrap();
        let classifier = test_classifier(&classifier_dir);

        // Same sweep with different batch sizes and worker counts must
        // produce identical heatmaps.
        let plane = Array2::from_shape_fn((32, 32), |(r, c)| ((r * 31 + c * 17) % 256) as f32);
        let serial = Sweeper::new(
            &classifier,
            SweepConfig {
                batch_size: 1,
                workers: 1,
                ..small_config()
            },
        )
        .unwrap()
        .sweep_plane(&plane)
        .unwrap();
        let parallel = Sweeper::new(
            &classifier,
            SweepConfig {
                batch_size: 5,
                workers: 4,
                ..small_config()
            },
        )
        .unwrap()
        .sweep_plane(&plane)
        .unwrap();

        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_sweep_plane_too_small() {
        let classifier_dir = TempDir::new().unwrap();
        let classifier = test_classifier(&classifier_dir);
        let sweeper = Sweeper::new(&classifier, small_config()).unwrap();

        let plane = Array2::zeros((4, 4));
        assert!(sweeper.sweep_plane(&plane).is_err());
    }

    #[test]
    fn test_score_view_missing_file_is_none() {
        let classifier_dir = TempDir::new().unwrap();
        let classifier = test_classifier(&classifier_dir);
        let sweeper = Sweeper::new(&classifier, small_config()).unwrap();

        let img_dir = TempDir::new().unwrap();
        let result = sweeper
            .score_view(img_dir.path(), "P001", BreastSide::L, MammoView::Cc)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_score_case_mixed_views() {
        let classifier_dir = TempDir::new().unwrap();
        let classifier = test_classifier(&classifier_dir);
        let sweeper = Sweeper::new(&classifier, small_config()).unwrap();

        let img_dir = TempDir::new().unwrap();
        write_view_png(img_dir.path(), "P001", "L", "CC");
        // No MLO image for this case.

        let label = CaseLabel {
            patient_id: "P001".to_string(),
            side: BreastSide::L,
            cancer: Some(1),
        };
        let score = sweeper.score_case(img_dir.path(), &label).unwrap();

        assert_eq!(score.patient_id, "P001");
        assert_eq!(score.cancer, Some(1));
        assert!(score.cc.is_some());
        assert!(score.mlo.is_none());
        assert_eq!(score.views_scored(), 1);
    }
}
