use super::{BreastSide, ProbHeatmap};
use serde::{Deserialize, Serialize};

/// Scored result for one `(patient, side)` case
///
/// `cc`/`mlo` are `None` when the corresponding view image was not found
/// on disk; an absent view is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseScore {
    pub patient_id: String,
    pub side: BreastSide,
    pub cancer: Option<u8>,
    pub cc: Option<ProbHeatmap>,
    pub mlo: Option<ProbHeatmap>,
}

impl CaseScore {
    /// Number of views that were actually scored
    pub fn views_scored(&self) -> usize {
        self.cc.is_some() as usize + self.mlo.is_some() as usize
    }
}

/// Provenance metadata recorded alongside the scored cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub net: String,
    pub random_seed: u64,
    pub workers: usize,
    pub img_height: u32,
    pub img_scale: f32,
    pub equalize_hist: bool,
    pub featurewise_center: bool,
    pub featurewise_mean: f32,
    pub patch_size: u32,
    pub stride: u32,
    pub batch_size: usize,
}

/// Complete serialized output of one sweep run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub metadata: RunMetadata,
    pub cases: Vec<CaseScore>,
}
