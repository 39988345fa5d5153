use tracing::info;

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::extract::{ExtractionReport, run_extract};
use crate::merge::{MergeReport, run_merge};
use crate::splits::{SplitReport, run_split};
use crate::verify::{VerificationReport, run_verify};

/// Reports of every stage of one full run.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// Extract stage outcome.
    pub extraction: ExtractionReport,
    /// Merge stage outcome.
    pub merge: MergeReport,
    /// Split stage outcome.
    pub split: SplitReport,
    /// Verify stage outcome.
    pub verification: VerificationReport,
}

/// Run extract, merge, split, and verify in order; the first error aborts the run.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    info!(seed = config.seed, "[bugsplit:run] starting pipeline");

    let extraction = run_extract(config)?;
    info!(
        extracted = extraction.extracted.len(),
        failed = extraction.failed.len(),
        "[bugsplit:run] extract finished"
    );

    let merge = run_merge(config)?;
    info!(
        rows = merge.total_rows,
        threshold = merge.threshold,
        "[bugsplit:run] merge finished"
    );

    let split = run_split(config)?;
    info!(
        files = split.files.len(),
        oversampled = split.oversampled.len(),
        "[bugsplit:run] split finished"
    );

    let verification = run_verify(config)?;
    info!(
        balanced = verification.balanced(),
        "[bugsplit:run] verify finished"
    );

    Ok(PipelineReport {
        extraction,
        merge,
        split,
        verification,
    })
}
