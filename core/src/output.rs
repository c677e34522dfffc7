use crate::error::Result;
use crate::types::RunOutput;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Writes the run output as JSON to the given path
///
/// The parent directory must already exist; a missing directory fails the
/// run like any other I/O error.
pub fn write_output(path: &Path, output: &RunOutput) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), output)?;
    Ok(())
}

/// Reads a previously written run output
pub fn read_output(path: &Path) -> Result<RunOutput> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
