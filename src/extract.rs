//! JSON → per-source CSV extraction stage.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::constants::files::EXTRACTED_SUFFIX;
use crate::errors::PipelineError;
use crate::source::{BugSource, JsonDumpSource, SourceTable};
use crate::transport::tabular::write_rows;
use crate::types::SourceId;

/// Outcome of extracting one source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedSource {
    /// Source name.
    pub source: SourceId,
    /// Written `<Source>_data.csv`.
    pub output: PathBuf,
    /// Rows written.
    pub rows: usize,
    /// Malformed units skipped while parsing.
    pub skipped_units: usize,
}

/// Outcome of the whole extraction stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Sources written, in configured order.
    pub extracted: Vec<ExtractedSource>,
    /// Sources that failed, with the error message.
    pub failed: Vec<(SourceId, String)>,
}

/// Path of the extracted CSV for `source` inside `dir`.
pub fn extracted_path(dir: &Path, source: &str) -> PathBuf {
    dir.join(format!("{source}{EXTRACTED_SUFFIX}"))
}

/// Load one source and write its rows to `output`.
pub fn extract_source(
    source: &dyn BugSource,
    output: &Path,
) -> Result<ExtractedSource, PipelineError> {
    let SourceTable {
        source: source_id,
        records,
        skipped,
    } = source.load()?;
    write_rows(output, &records)?;
    info!(
        source = %source_id,
        rows = records.len(),
        skipped = skipped.len(),
        "[bugsplit:extract] wrote {}",
        output.display()
    );
    Ok(ExtractedSource {
        source: source_id,
        output: output.to_path_buf(),
        rows: records.len(),
        skipped_units: skipped.len(),
    })
}

/// Extract every source into `output_dir`.
///
/// A failing source is logged and skipped; the stage fails only when no
/// source could be extracted.
pub fn extract_all(
    sources: &[Box<dyn BugSource>],
    output_dir: &Path,
) -> Result<ExtractionReport, PipelineError> {
    let mut report = ExtractionReport::default();
    for source in sources {
        let output = extracted_path(output_dir, source.id());
        match extract_source(source.as_ref(), &output) {
            Ok(extracted) => report.extracted.push(extracted),
            Err(err) => {
                warn!(
                    source = %source.id(),
                    "[bugsplit:extract] source skipped: {err}"
                );
                report.failed.push((source.id().to_string(), err.to_string()));
            }
        }
    }
    if report.extracted.is_empty() {
        return Err(PipelineError::no_valid_data(
            "extract",
            format!("none of {} sources could be extracted", sources.len()),
        ));
    }
    Ok(report)
}

/// Extract the configured sources from `layout.raw_dir` into `layout.extracted_dir`.
pub fn run_extract(config: &PipelineConfig) -> Result<ExtractionReport, PipelineError> {
    let sources: Vec<Box<dyn BugSource>> = config
        .sources
        .iter()
        .map(|id| {
            Box::new(JsonDumpSource::in_dir(&config.layout.raw_dir, id.clone()))
                as Box<dyn BugSource>
        })
        .collect();
    info!(
        sources = sources.len(),
        "[bugsplit:extract] extracting from {}",
        config.layout.raw_dir.display()
    );
    extract_all(&sources, &config.layout.extracted_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BugRecord;
    use crate::source::InMemorySource;
    use crate::transport::tabular::read_rows;
    use tempfile::tempdir;

    #[test]
    fn extract_all_skips_failing_sources() {
        let temp = tempdir().unwrap();
        let sources: Vec<Box<dyn BugSource>> = vec![
            Box::new(InMemorySource::new(
                "KDE",
                vec![BugRecord {
                    short_desc: "Panel crash".into(),
                    days_resolution: "3".into(),
                    ..BugRecord::default()
                }],
            )),
            Box::new(InMemorySource::new("W3C", Vec::new())),
        ];

        let report = extract_all(&sources, temp.path()).unwrap();
        assert_eq!(report.extracted.len(), 1);
        assert_eq!(report.extracted[0].source, "KDE");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "W3C");

        let rows: Vec<BugRecord> = read_rows(&temp.path().join("KDE_data.csv")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].short_desc, "Panel crash");
        assert!(!temp.path().join("W3C_data.csv").exists());
    }

    #[test]
    fn extract_all_fails_when_every_source_fails() {
        let temp = tempdir().unwrap();
        let sources: Vec<Box<dyn BugSource>> =
            vec![Box::new(JsonDumpSource::in_dir(temp.path(), "Eclipse"))];
        let err = extract_all(&sources, temp.path()).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidData { stage: "extract", .. }));
    }
}
