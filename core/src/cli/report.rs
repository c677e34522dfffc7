use crate::types::RunOutput;
use std::fmt;

/// Text report summarizing a completed sweep run
pub struct TextReport<'a> {
    output: &'a RunOutput,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(output: &'a RunOutput) -> Self {
        Self { output }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.output.metadata;
        let cases = &self.output.cases;
        let views_scored: usize = cases.iter().map(|c| c.views_scored()).sum();
        let views_missing = cases.len() * 2 - views_scored;
        let with_label = cases.iter().filter(|c| c.cancer.is_some()).count();

        writeln!(f, "Heatmap Sweep Summary")?;
        writeln!(f, "=====================")?;
        writeln!(f)?;
        writeln!(f, "Net:            {}", meta.net)?;
        writeln!(f, "Patch size:     {}", meta.patch_size)?;
        writeln!(f, "Stride:         {}", meta.stride)?;
        writeln!(f, "Batch size:     {}", meta.batch_size)?;
        writeln!(f, "Workers:        {}", meta.workers)?;
        writeln!(f, "Random seed:    {}", meta.random_seed)?;
        writeln!(f)?;
        writeln!(f, "Cases scored:   {}", cases.len())?;
        writeln!(f, "Views scored:   {}", views_scored)?;
        writeln!(f, "Views missing:  {}", views_missing)?;
        writeln!(f, "Labeled cases:  {}", with_label)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BreastSide, CaseScore, ProbHeatmap, RunMetadata};

    #[test]
    fn test_text_report_format() {
        let output = RunOutput {
            metadata: RunMetadata {
                net: "vgg19".to_string(),
                random_seed: 12345,
                workers: 2,
                img_height: 4096,
                img_scale: 255.0,
                equalize_hist: false,
                featurewise_center: false,
                featurewise_mean: 71.8,
                patch_size: 256,
                stride: 8,
                batch_size: 128,
            },
            cases: vec![
                CaseScore {
                    patient_id: "P001".to_string(),
                    side: BreastSide::L,
                    cancer: Some(1),
                    cc: Some(ProbHeatmap::new(1, 1, 2, vec![0.5, 0.5]).unwrap()),
                    mlo: None,
                },
                CaseScore {
                    patient_id: "P002".to_string(),
                    side: BreastSide::R,
                    cancer: None,
                    cc: None,
                    mlo: None,
                },
            ],
        };

        let report = format!("{}", TextReport::new(&output));
        assert!(report.contains("Heatmap Sweep Summary"));
        assert!(report.contains("Net:            vgg19"));
        assert!(report.contains("Cases scored:   2"));
        assert!(report.contains("Views scored:   1"));
        assert!(report.contains("Views missing:  3"));
        assert!(report.contains("Labeled cases:  1"));
    }
}
