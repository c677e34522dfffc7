use crate::error::{HeatsweepError, Result};
use crate::types::BreastSide;
use log::info;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Raw manifest row as it appears in the CSV
#[derive(Debug, Deserialize)]
struct ManifestRow {
    patient_id: String,
    side: String,
    cancer: Option<u8>,
}

/// Cancer label for one `(patient, side)` case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLabel {
    pub patient_id: String,
    pub side: BreastSide,
    pub cancer: Option<u8>,
}

/// Patient/side manifest loaded from `pat.csv`
///
/// Cases are keyed by `(patient_id, side)`, sorted, and deduplicated:
/// when a key appears more than once the first row wins.
#[derive(Debug, Clone, Default)]
pub struct PatientManifest {
    cases: Vec<CaseLabel>,
}

impl PatientManifest {
    /// Loads a manifest from a CSV file with header `patient_id,side,cancer`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a row fails to parse,
    /// or a `side` value is not recognized.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut index: BTreeMap<(String, BreastSide), Option<u8>> = BTreeMap::new();

        for row in reader.deserialize() {
            let row: ManifestRow = row?;
            let side = BreastSide::parse(&row.side).ok_or_else(|| {
                HeatsweepError::ManifestError(format!(
                    "unrecognized side {:?} for patient {}",
                    row.side, row.patient_id
                ))
            })?;
            // First occurrence wins for duplicate keys.
            index.entry((row.patient_id, side)).or_insert(row.cancer);
        }

        let cases = index
            .into_iter()
            .map(|((patient_id, side), cancer)| CaseLabel {
                patient_id,
                side,
                cancer,
            })
            .collect();
        Ok(Self { cases })
    }

    /// Restricts the manifest to the given patient ids
    ///
    /// Every listed id must have at least one case in the manifest;
    /// unknown ids are an error rather than a silent no-op.
    pub fn retain_patients(&mut self, patient_ids: &[String]) -> Result<()> {
        for id in patient_ids {
            if !self.cases.iter().any(|c| &c.patient_id == id) {
                return Err(HeatsweepError::ManifestError(format!(
                    "patient id {:?} not found in manifest",
                    id
                )));
            }
        }
        self.cases
            .retain(|c| patient_ids.iter().any(|id| id == &c.patient_id));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Iterates cases in sorted `(patient_id, side)` order
    pub fn iter(&self) -> impl Iterator<Item = &CaseLabel> {
        self.cases.iter()
    }
}

/// Reads a patient-id list from a single-column CSV file with a header row
pub fn load_patient_list(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(id) = record.get(0) {
            let id = id.trim();
            if !id.is_empty() {
                ids.push(id.to_string());
            }
        }
    }
    info!("Read {} patient IDs", ids.len());
    Ok(ids)
}
