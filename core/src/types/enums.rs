use serde::{Deserialize, Serialize};
use std::fmt;

/// Breast side (laterality) for a manifest case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreastSide {
    L,
    R,
}

impl BreastSide {
    /// Returns the single-letter form used in image filenames
    pub fn letter(&self) -> &'static str {
        match self {
            BreastSide::L => "L",
            BreastSide::R => "R",
        }
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            BreastSide::L => "left",
            BreastSide::R => "right",
        }
    }

    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            BreastSide::L => BreastSide::R,
            BreastSide::R => BreastSide::L,
        }
    }

    /// Parses a side from a manifest string
    ///
    /// Accepts single letters ("L", "r") and full words ("left", "RIGHT").
    /// Returns `None` for anything else; the manifest loader turns that
    /// into a hard error.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "l" | "left" => Some(BreastSide::L),
            "r" | "right" => Some(BreastSide::R),
            _ => None,
        }
    }
}

impl fmt::Display for BreastSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Mammographic view orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MammoView {
    /// Craniocaudal
    Cc,
    /// Mediolateral-oblique
    Mlo,
}

impl MammoView {
    /// Returns the uppercase form used in image filenames
    pub fn short_str(&self) -> &'static str {
        match self {
            MammoView::Cc => "CC",
            MammoView::Mlo => "MLO",
        }
    }
}

impl fmt::Display for MammoView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_str())
    }
}

/// The two views swept for every case
pub const STANDARD_VIEWS: [MammoView; 2] = [MammoView::Cc, MammoView::Mlo];
