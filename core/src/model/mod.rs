//! Patch classifier backends
//!
//! The sweep only talks to [`PatchClassifier`], so the model backend can be
//! swapped without touching the sliding-window logic. The bundled backend is
//! a linear softmax classifier over mean-pooled patch features, restored
//! from a JSON checkpoint.

use crate::error::{HeatsweepError, Result};
use log::info;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Batch patch classifier
///
/// Implementations must be shareable across scoring workers.
pub trait PatchClassifier: Send + Sync {
    /// Architecture name recorded in the checkpoint (e.g. "vgg19")
    fn net_name(&self) -> &str;

    /// Class names in output order
    fn class_names(&self) -> &[String];

    fn num_classes(&self) -> usize {
        self.class_names().len()
    }

    /// Classifies a batch of patches
    ///
    /// Returns one probability row per patch, in input order. Each row is
    /// finite and sums to 1.
    fn predict(&self, patches: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>>;
}

/// Serialized checkpoint for the linear backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Architecture name the checkpoint was trained as
    pub net: String,
    /// Patches are mean-pooled to a `pool_grid` x `pool_grid` feature map
    pub pool_grid: usize,
    /// Class names in output order
    pub classes: Vec<String>,
    /// Per-class weight rows, each of length `pool_grid * pool_grid`
    pub weights: Vec<Vec<f32>>,
    /// Per-class bias terms
    pub bias: Vec<f32>,
}

impl Checkpoint {
    /// Reads a checkpoint from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let checkpoint: Checkpoint = serde_json::from_reader(BufReader::new(file))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    fn validate(&self) -> Result<()> {
        if self.pool_grid == 0 {
            return Err(HeatsweepError::CheckpointError(
                "pool_grid must be positive".to_string(),
            ));
        }
        if self.classes.len() < 2 {
            return Err(HeatsweepError::CheckpointError(format!(
                "checkpoint has {} classes, need at least 2",
                self.classes.len()
            )));
        }
        if self.weights.len() != self.classes.len() {
            return Err(HeatsweepError::CheckpointError(format!(
                "{} weight rows for {} classes",
                self.weights.len(),
                self.classes.len()
            )));
        }
        if self.bias.len() != self.classes.len() {
            return Err(HeatsweepError::CheckpointError(format!(
                "{} bias terms for {} classes",
                self.bias.len(),
                self.classes.len()
            )));
        }
        let features = self.pool_grid * self.pool_grid;
        for (i, row) in self.weights.iter().enumerate() {
            if row.len() != features {
                return Err(HeatsweepError::CheckpointError(format!(
                    "weight row {} has {} values, expected {}",
                    i,
                    row.len(),
                    features
                )));
            }
        }
        Ok(())
    }
}

/// Linear softmax classifier over mean-pooled patch features
#[derive(Debug)]
pub struct LinearPatchClassifier {
    net: String,
    pool_grid: usize,
    classes: Vec<String>,
    /// classes x features
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl LinearPatchClassifier {
    /// Restores a classifier from a checkpoint file
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint is unreadable, malformed, or its
    /// recorded net name does not match `expected_net`.
    pub fn from_checkpoint(path: &Path, expected_net: &str) -> Result<Self> {
        info!("Load patch classifier: {}", path.display());
        let checkpoint = Checkpoint::load(path)?;
        if checkpoint.net != expected_net {
            return Err(HeatsweepError::CheckpointError(format!(
                "checkpoint net is {:?}, expected {:?}",
                checkpoint.net, expected_net
            )));
        }
        Self::from_parts(checkpoint)
    }

    fn from_parts(checkpoint: Checkpoint) -> Result<Self> {
        let features = checkpoint.pool_grid * checkpoint.pool_grid;
        let flat: Vec<f32> = checkpoint.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((checkpoint.classes.len(), features), flat)
            .map_err(|e| HeatsweepError::CheckpointError(e.to_string()))?;
        Ok(Self {
            net: checkpoint.net,
            pool_grid: checkpoint.pool_grid,
            classes: checkpoint.classes,
            weights,
            bias: Array1::from_vec(checkpoint.bias),
        })
    }

    /// Mean-pools a patch to the checkpoint's `pool_grid` feature vector
    fn pool_features(&self, patch: &ArrayView2<'_, f32>) -> Result<Array1<f32>> {
        let (h, w) = patch.dim();
        if h < self.pool_grid || w < self.pool_grid {
            return Err(HeatsweepError::SweepError(format!(
                "patch {}x{} is smaller than the {}x{} pooling grid",
                h, w, self.pool_grid, self.pool_grid
            )));
        }
        let g = self.pool_grid;
        let mut features = Array1::zeros(g * g);
        for gr in 0..g {
            let r0 = gr * h / g;
            let r1 = (gr + 1) * h / g;
            for gc in 0..g {
                let c0 = gc * w / g;
                let c1 = (gc + 1) * w / g;
                let cell = patch.slice(ndarray::s![r0..r1, c0..c1]);
                features[gr * g + gc] = cell.mean().unwrap_or(0.0);
            }
        }
        Ok(features)
    }
}

impl PatchClassifier for LinearPatchClassifier {
    fn net_name(&self) -> &str {
        &self.net
    }

    fn class_names(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, patches: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>> {
        let mut probs = Array2::zeros((patches.len(), self.classes.len()));
        for (i, patch) in patches.iter().enumerate() {
            let features = self.pool_features(patch)?;
            let logits = self.weights.dot(&features) + &self.bias;
            probs.row_mut(i).assign(&softmax(&logits));
        }
        Ok(probs)
    }
}

/// Numerically stable softmax
fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}
