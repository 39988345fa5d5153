//! Filesystem and tabular transports used by the stages.

/// Filesystem discovery and path helpers.
pub mod fs;
/// Delimited-text (CSV) readers and writers.
pub mod tabular;
