pub mod cli;
pub mod error;
pub mod manifest;
pub mod model;
pub mod output;
pub mod preprocess;
pub mod sweep;
pub mod types;

pub use cli::report::TextReport;
pub use error::{HeatsweepError, Result};
pub use manifest::{load_patient_list, CaseLabel, PatientManifest};
pub use model::{Checkpoint, LinearPatchClassifier, PatchClassifier};
pub use preprocess::PreprocessOptions;
pub use sweep::{SweepConfig, Sweeper};
pub use types::*;
