/// Column names shared by every tabular file the pipeline reads or writes.
pub mod columns {
    /// Bug title.
    pub const SHORT_DESC: &str = "short_desc";
    /// Product the bug was filed against.
    pub const PRODUCT: &str = "product";
    /// Tracker priority (for example `P3`).
    pub const PRIORITY: &str = "priority";
    /// Tracker severity (for example `major`).
    pub const BUG_SEVERITY: &str = "bug_severity";
    /// Days between report and resolution.
    pub const DAYS_RESOLUTION: &str = "days_resolution";
    /// Concatenated comment bodies.
    pub const COMMENTS: &str = "comments";
    /// Provenance tag injected by the merger.
    pub const SOURCE: &str = "source";
    /// Binary resolution-time label.
    pub const LABEL: &str = "label";
    /// Header of every labeled file (per-source, merged, and split outputs).
    pub const LABELED_HEADER: [&str; 8] = [
        SHORT_DESC,
        PRODUCT,
        PRIORITY,
        BUG_SEVERITY,
        DAYS_RESOLUTION,
        COMMENTS,
        SOURCE,
        LABEL,
    ];
}

/// Constants used while reading raw JSON dumps.
pub mod extract {
    /// Top-level object holding the bug fields.
    pub const BUG_KEY: &str = "bug";
    /// Array of comment objects under the bug.
    pub const LONG_DESC_KEY: &str = "long_desc";
    /// Comment body field inside each `long_desc` element.
    pub const COMMENT_TEXT_KEY: &str = "thetext";
    /// Separator placed between consecutive comment bodies.
    pub const COMMENT_SEPARATOR: &str = "\n\n";
    /// Suffix of raw dump files (`<Source>_original.json`).
    pub const RAW_FILE_SUFFIX: &str = "_original.json";
}

/// Constants used by the merge/clean stage.
pub mod merge {
    /// Literal written into text cells that stay missing under the conservative strategy.
    pub const UNKNOWN_VALUE: &str = "Unknown";
    /// Fill value for numeric columns other than `days_resolution`.
    pub const NUMERIC_FILL_VALUE: &str = "0";
    /// Share of missing fields above which the aggressive strategy drops a row.
    pub const AGGRESSIVE_MISSING_SHARE: f64 = 0.5;
    /// Cell spellings read as missing values.
    pub const MISSING_TOKENS: &[&str] = &[
        "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    ];
}

/// Constants used by the balanced splitter and verifier.
pub mod splits {
    /// Stream-key prefix for validation/test cell draws.
    pub const STREAM_VALIDATION_TEST: &str = "validation_test";
    /// Stream-key prefix for the per-cell validation/test partition shuffle.
    pub const STREAM_PARTITION: &str = "partition";
    /// Stream-key prefix for training cell draws.
    pub const STREAM_TRAIN: &str = "train";
    /// Stream-key prefix for the final whole-split shuffle.
    pub const STREAM_SHUFFLE: &str = "shuffle";
}

/// File and directory names of the working-directory layout.
pub mod files {
    /// Default directory holding `<Source>_original.json` dumps.
    pub const DEFAULT_RAW_DIR: &str = "Dataset";
    /// Default directory for extracted per-source CSVs.
    pub const DEFAULT_EXTRACTED_DIR: &str = "csv_output_from_json";
    /// Default directory for cleaned and labeled CSVs.
    pub const DEFAULT_PROCESSED_DIR: &str = "processed_labeled_datasets";
    /// Default directory for balanced split CSVs.
    pub const DEFAULT_BALANCED_DIR: &str = "balanced_datasets";
    /// Suffix of extracted per-source CSVs (`<Source>_data.csv`).
    pub const EXTRACTED_SUFFIX: &str = "_data.csv";
    /// Suffix of per-source labeled CSVs.
    pub const PROCESSED_SUFFIX: &str = "_processed_labeled.csv";
    /// Merged labeled table.
    pub const MERGED_FILENAME: &str = "merged_processed_labeled.csv";
    /// Per-source summary statistics.
    pub const STATISTICS_FILENAME: &str = "dataset_statistics.csv";
    /// Fixed validation split.
    pub const VALIDATION_FILENAME: &str = "balanced_validation.csv";
    /// Fixed test split.
    pub const TEST_FILENAME: &str = "balanced_test.csv";
    /// Prefix of sized training splits (`balanced_train_<size>.csv`).
    pub const TRAIN_PREFIX: &str = "balanced_train_";
    /// Extension shared by every tabular output.
    pub const CSV_EXTENSION: &str = ".csv";
}

/// Defaults for [`crate::config::PipelineConfig`].
pub mod defaults {
    /// Seed governing every sampling, shuffling, and splitting step.
    pub const SEED: u64 = 42;
    /// Floor applied to the smallest (source, label) population.
    pub const MIN_CELL_FLOOR: usize = 500;
    /// Quantile used for both local imputation and the global label threshold.
    pub const LABEL_QUANTILE: f64 = 0.75;
    /// Draw/population ratio above which an oversampled cell is reported.
    pub const OVERSAMPLE_WARN_RATIO: f64 = 1.0;
    /// Training sizes requested when none are configured.
    pub const REQUESTED_SIZES: [usize; 4] = [1000, 2000, 5000, 10000];
    /// Sources excluded from balancing for insufficient volume.
    pub const DENYLIST: [&str; 2] = ["W3C", "OpenXchange"];
    /// Sources extracted when none are configured.
    pub const SOURCES: [&str; 11] = [
        "Eclipse",
        "FreeDesktop",
        "Gentoo",
        "KDE",
        "LibreOffice",
        "LiveCode",
        "NetBeans",
        "Novell",
        "OpenOffice",
        "OpenXchange",
        "W3C",
    ];
}

/// Constants used by stable hashing.
pub mod hash {
    /// FNV-1a 64-bit offset basis.
    pub const FNV1A64_OFFSET: u64 = 0xcbf29ce484222325;
    /// FNV-1a 64-bit prime.
    pub const FNV1A64_PRIME: u64 = 0x100000001b3;
}
