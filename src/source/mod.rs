//! Bug-record sources.
//!
//! Ownership model:
//! - `BugSource` is the extractor-facing interface that yields one source's rows.
//! - `JsonDumpSource` reads a raw tracker dump from disk.
//! - `InMemorySource` serves prebuilt rows for tests and small datasets.

use std::sync::Arc;

use crate::data::BugRecord;
use crate::errors::PipelineError;
use crate::types::SourceId;

/// JSON dump parsing and attribute extraction.
pub mod json_dump;

pub use json_dump::{JsonDumpSource, MalformedLine};

/// Ordered rows for one named source, plus the units skipped while reading it.
#[derive(Clone, Debug, Default)]
pub struct SourceTable {
    /// Source the rows belong to.
    pub source: SourceId,
    /// Extracted rows, in input order.
    pub records: Vec<BugRecord>,
    /// Input units that failed to parse and were skipped.
    pub skipped: Vec<MalformedLine>,
}

/// Extractor-facing source interface.
///
/// For a fixed input state, `load` must return the same rows in the same order.
pub trait BugSource {
    /// Stable source identifier used in file names and the `source` column.
    fn id(&self) -> &str;
    /// Read and flatten every record of this source.
    ///
    /// Unparseable units are skipped and reported in `SourceTable::skipped`;
    /// a source that yields no records at all fails with `NoValidData`.
    fn load(&self) -> Result<SourceTable, PipelineError>;
}

/// In-memory source for tests and small datasets.
pub struct InMemorySource {
    id: SourceId,
    records: Arc<Vec<BugRecord>>,
}

impl InMemorySource {
    /// Create an in-memory source from prebuilt rows.
    pub fn new(id: impl Into<SourceId>, records: Vec<BugRecord>) -> Self {
        Self {
            id: id.into(),
            records: Arc::new(records),
        }
    }
}

impl BugSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn load(&self) -> Result<SourceTable, PipelineError> {
        if self.records.is_empty() {
            return Err(PipelineError::no_valid_data(
                "extract",
                format!("source '{}' holds no records", self.id),
            ));
        }
        Ok(SourceTable {
            source: self.id.clone(),
            records: self.records.as_ref().clone(),
            skipped: Vec::new(),
        })
    }
}
