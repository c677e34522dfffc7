mod case;
mod enums;
mod heatmap;

pub use case::{CaseScore, RunMetadata, RunOutput};
pub use enums::{BreastSide, MammoView, STANDARD_VIEWS};
pub use heatmap::ProbHeatmap;
