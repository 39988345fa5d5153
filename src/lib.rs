#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runner behind the `bugsplit` binary.
pub mod apps;
/// Per-source cleaning transforms: text, missing values, duplicates, coercion.
pub mod clean;
/// Pipeline configuration and directory layout.
pub mod config;
/// Centralized constants used across stages.
pub mod constants;
/// Record, label, and row types.
pub mod data;
/// JSON dump to per-source CSV extraction.
pub mod extract;
mod hash;
/// Cell-count and training-size heuristics.
pub mod heuristics;
/// Cleaning, global labeling, and merging of extracted tables.
pub mod merge;
/// Aggregate metrics helpers.
pub mod metrics;
/// Full extract, merge, split, verify run.
pub mod pipeline;
/// Seeded random streams.
pub mod rng;
/// Seeded per-cell sampling.
pub mod sampler;
/// Bug-record source traits and built-in sources.
pub mod source;
/// Balanced split construction and persistence.
pub mod splits;
/// Filesystem and tabular transports.
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;
/// Balance checks over written splits.
pub mod verify;

mod errors;

pub use clean::{CleaningReport, TextCleaner};
pub use config::{CleaningVariant, MissingValueStrategy, PipelineConfig, PipelineLayout};
pub use data::{BugRecord, LabeledRecord, ResolutionLabel};
pub use errors::PipelineError;
pub use extract::{ExtractionReport, run_extract};
pub use merge::{MergeReport, run_merge};
pub use pipeline::{PipelineReport, run_pipeline};
pub use source::{BugSource, InMemorySource, JsonDumpSource};
pub use splits::{BalancedSplits, SplitLabel, SplitReport, run_split};
pub use types::SourceId;
pub use verify::{VerificationReport, run_verify};
