pub mod report;

use crate::error::{HeatsweepError, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Environment variable holding the run's random seed (provenance only)
pub const RANDOM_SEED_VAR: &str = "RANDOM_SEED";
/// Environment variable holding the scoring parallelism degree
pub const NUM_GPU_DEVICES_VAR: &str = "NUM_GPU_DEVICES";

pub const DEFAULT_RANDOM_SEED: u64 = 12345;
pub const DEFAULT_WORKERS: usize = 1;

/// Command-line arguments for heatsweep
#[derive(Parser, Debug)]
#[command(name = "heatsweep")]
#[command(about = "Sweep mammograms with a patch classifier to produce probability heatmaps")]
#[command(version)]
pub struct Cli {
    /// Directory containing full mammogram PNGs named {patient}_{side}_{view}.png
    #[arg(value_name = "IMG_FOLDER")]
    pub img_folder: PathBuf,

    /// Patch classifier checkpoint file
    #[arg(value_name = "DL_STATE")]
    pub dl_state: PathBuf,

    /// Target image height after resizing
    #[arg(long, default_value_t = 4096)]
    pub img_height: u32,

    /// Pixel rescale ceiling
    #[arg(long, default_value_t = 255.0)]
    pub img_scale: f32,

    /// Apply histogram equalization before rescaling
    #[arg(long, overrides_with = "no_equalize_hist")]
    equalize_hist: bool,

    #[arg(long, hide = true)]
    no_equalize_hist: bool,

    /// Subtract the featurewise mean from pixels
    #[arg(long, overrides_with = "no_featurewise_center")]
    featurewise_center: bool,

    #[arg(long, hide = true)]
    no_featurewise_center: bool,

    /// Featurewise mean used for centering
    #[arg(long, default_value_t = 71.8)]
    pub featurewise_mean: f32,

    /// Expected classifier architecture name
    #[arg(long, default_value = "vgg19")]
    pub net: String,

    /// Number of patches scored per batch
    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Patch side length in pixels
    #[arg(long, default_value_t = 256)]
    pub patch_size: u32,

    /// Sliding-window step in pixels
    #[arg(long, default_value_t = 8)]
    pub stride: u32,

    /// Patient/side manifest CSV
    #[arg(long, default_value = "./full_img/pat.csv")]
    pub pat_csv: PathBuf,

    /// Optional patient-id list CSV to restrict the manifest
    #[arg(long, overrides_with = "no_pat_list")]
    pat_list: Option<PathBuf>,

    #[arg(long, hide = true)]
    no_pat_list: bool,

    /// Output path for the serialized heatmaps
    #[arg(long, default_value = "./output/prob_heatmap.json")]
    pub out: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Effective histogram-equalization setting after flag negation
    pub fn equalize_hist(&self) -> bool {
        self.equalize_hist && !self.no_equalize_hist
    }

    /// Effective featurewise-centering setting after flag negation
    pub fn featurewise_center(&self) -> bool {
        self.featurewise_center && !self.no_featurewise_center
    }

    /// Effective patient-list path; `--no-pat-list` clears it
    pub fn pat_list(&self) -> Option<&Path> {
        if self.no_pat_list {
            None
        } else {
            self.pat_list.as_deref()
        }
    }
}

/// Reads the run seed from `RANDOM_SEED`
pub fn random_seed_from_env() -> Result<u64> {
    parse_env(RANDOM_SEED_VAR, DEFAULT_RANDOM_SEED)
}

/// Reads the worker count from `NUM_GPU_DEVICES`
///
/// Kept under its historical name: runs that previously replicated the
/// model across devices set this to the desired parallelism.
pub fn workers_from_env() -> Result<usize> {
    let workers: usize = parse_env(NUM_GPU_DEVICES_VAR, DEFAULT_WORKERS)?;
    if workers == 0 {
        return Err(HeatsweepError::SweepError(format!(
            "{} must be positive",
            NUM_GPU_DEVICES_VAR
        )));
    }
    Ok(workers)
}

fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> Result<T> {
    match std::env::var(var) {
        Ok(value) => value.parse().map_err(|_| {
            HeatsweepError::SweepError(format!("invalid {} value: {:?}", var, value))
        }),
        Err(_) => Ok(default),
    }
}
