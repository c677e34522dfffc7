use crate::error::{HeatsweepError, Result};
use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

/// Probability heatmap produced by sweeping one view image
///
/// A row-major grid of per-patch class probability vectors. Cell `(r, c)`
/// holds the classifier output for the patch whose top-left corner sits at
/// `(r * stride, c * stride)` in the preprocessed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbHeatmap {
    rows: usize,
    cols: usize,
    classes: usize,
    data: Vec<f32>,
}

impl ProbHeatmap {
    /// Creates a heatmap from a flat row-major buffer
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != rows * cols * classes`.
    pub fn new(rows: usize, cols: usize, classes: usize, data: Vec<f32>) -> Result<Self> {
        let expected = rows * cols * classes;
        if data.len() != expected {
            return Err(HeatsweepError::SweepError(format!(
                "heatmap buffer has {} values, expected {}x{}x{} = {}",
                data.len(),
                rows,
                cols,
                classes,
                expected
            )));
        }
        Ok(Self {
            rows,
            cols,
            classes,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn num_classes(&self) -> usize {
        self.classes
    }

    /// Probability vector for the patch at grid cell `(row, col)`
    pub fn cell(&self, row: usize, col: usize) -> &[f32] {
        let start = (row * self.cols + col) * self.classes;
        &self.data[start..start + self.classes]
    }

    /// Borrowed `(rows, cols, classes)` view of the underlying buffer
    pub fn view(&self) -> ArrayView3<'_, f32> {
        ArrayView3::from_shape((self.rows, self.cols, self.classes), &self.data)
            .expect("shape checked at construction")
    }

    /// Maximum probability of the given class over the whole grid
    ///
    /// Returns `None` if the class index is out of range or the grid is empty.
    pub fn max_class_prob(&self, class: usize) -> Option<f32> {
        if class >= self.classes || self.data.is_empty() {
            return None;
        }
        self.data
            .iter()
            .skip(class)
            .step_by(self.classes)
            .copied()
            .reduce(f32::max)
    }
}
