use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use crate::config::{CleaningVariant, MissingValueStrategy, PipelineConfig, PipelineLayout};
use crate::errors::PipelineError;
use crate::extract::{ExtractionReport, run_extract};
use crate::heuristics::format_usize_with_commas;
use crate::merge::{MergeReport, run_merge};
use crate::pipeline::run_pipeline;
use crate::splits::{SplitReport, run_split};
use crate::verify::{VerificationReport, run_verify};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Conservative,
    Aggressive,
}

impl From<StrategyArg> for MissingValueStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Conservative => MissingValueStrategy::Conservative,
            StrategyArg::Aggressive => MissingValueStrategy::Aggressive,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CleaningArg {
    Basic,
    Strict,
}

impl From<CleaningArg> for CleaningVariant {
    fn from(value: CleaningArg) -> Self {
        match value {
            CleaningArg::Basic => CleaningVariant::Basic,
            CleaningArg::Strict => CleaningVariant::Strict,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "bugsplit",
    version,
    disable_help_subcommand = true,
    about = "Build balanced bug resolution-time datasets",
    long_about = "Extract bug reports from tracker JSON dumps, clean and label them against one global resolution-time threshold, and write source- and label-balanced validation, test, and training splits.",
    after_help = "Directories resolve in order by explicit flag, --root, --config file, then defaults relative to the working directory. Set RUST_LOG to change log verbosity."
)]
struct BugsplitCli {
    #[command(subcommand)]
    command: StageCommand,
    #[command(flatten)]
    options: PipelineArgs,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum StageCommand {
    /// Convert `<Source>_original.json` dumps into `<Source>_data.csv` tables
    Extract,
    /// Clean, label, and merge the extracted tables
    Merge,
    /// Write balanced validation, test, and training splits
    Split,
    /// Check label and source balance of the written splits
    Verify,
    /// Run every stage in order, stopping at the first failure
    Run,
}

#[derive(Debug, Default, Args)]
struct PipelineArgs {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "JSON config file; absent fields keep their defaults"
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Root for the default directory layout"
    )]
    root: Option<PathBuf>,
    #[arg(long, global = true, help = "Seed for every sampling and shuffling step")]
    seed: Option<u64>,
    #[arg(long, global = true, value_enum, help = "Missing-value strategy")]
    strategy: Option<StrategyArg>,
    #[arg(long, global = true, value_enum, help = "Text cleaning variant")]
    cleaning: Option<CleaningArg>,
    #[arg(
        long = "source",
        global = true,
        value_name = "NAME",
        help = "Source to extract, repeat as needed in order"
    )]
    sources: Vec<String>,
    #[arg(
        long = "deny",
        global = true,
        value_name = "NAME",
        conflicts_with = "no_denylist",
        help = "Source excluded from balancing, repeat as needed"
    )]
    deny: Vec<String>,
    #[arg(
        long = "no-denylist",
        global = true,
        help = "Balance every source, including the default denylist"
    )]
    no_denylist: bool,
    #[arg(
        long = "min-cell-floor",
        global = true,
        value_parser = parse_positive_usize,
        help = "Lower bound for the per-cell population target"
    )]
    min_cell_floor: Option<usize>,
    #[arg(
        long = "size",
        global = true,
        value_name = "ROWS",
        value_parser = parse_positive_usize,
        help = "Requested training size, repeat as needed"
    )]
    sizes: Vec<usize>,
    #[arg(long = "raw-dir", global = true, value_name = "DIR")]
    raw_dir: Option<PathBuf>,
    #[arg(long = "extracted-dir", global = true, value_name = "DIR")]
    extracted_dir: Option<PathBuf>,
    #[arg(long = "processed-dir", global = true, value_name = "DIR")]
    processed_dir: Option<PathBuf>,
    #[arg(long = "balanced-dir", global = true, value_name = "DIR")]
    balanced_dir: Option<PathBuf>,
}

impl PipelineArgs {
    fn into_config(self) -> Result<PipelineConfig, PipelineError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(root) = &self.root {
            config.layout = PipelineLayout::rooted_at(root);
        }
        config.seed = self.seed.unwrap_or(config.seed);
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        if let Some(cleaning) = self.cleaning {
            config.cleaning = cleaning.into();
        }
        if !self.sources.is_empty() {
            config.sources = self.sources;
        }
        if self.no_denylist {
            config.denylist.clear();
        } else if !self.deny.is_empty() {
            config.denylist = self.deny;
        }
        config.min_cell_floor = self.min_cell_floor.unwrap_or(config.min_cell_floor);
        if !self.sizes.is_empty() {
            config.requested_sizes = self.sizes;
        }
        let layout = &mut config.layout;
        for (flag, slot) in [
            (self.raw_dir, &mut layout.raw_dir),
            (self.extracted_dir, &mut layout.extracted_dir),
            (self.processed_dir, &mut layout.processed_dir),
            (self.balanced_dir, &mut layout.balanced_dir),
        ] {
            if let Some(dir) = flag {
                *slot = dir;
            }
        }
        config.validated()
    }
}

/// Entry point for the `bugsplit` binary.
///
/// `args_iter` excludes the program name.
pub fn run_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let Some(cli) =
        parse_cli::<BugsplitCli, _>(std::iter::once("bugsplit".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    let config = cli.options.into_config()?;

    match cli.command {
        StageCommand::Extract => print_extraction(&run_extract(&config)?),
        StageCommand::Merge => print_merge(&run_merge(&config)?),
        StageCommand::Split => print_split(&run_split(&config)?),
        StageCommand::Verify => print_verification(&run_verify(&config)?),
        StageCommand::Run => {
            let report = run_pipeline(&config)?;
            print_extraction(&report.extraction);
            print_merge(&report.merge);
            print_split(&report.split);
            print_verification(&report.verification);
        }
    }
    Ok(())
}

fn print_extraction(report: &ExtractionReport) {
    for source in &report.extracted {
        println!(
            "extract {}: {} rows -> {}",
            source.source,
            format_usize_with_commas(source.rows),
            source.output.display()
        );
    }
    for (source, reason) in &report.failed {
        println!("extract {source}: skipped ({reason})");
    }
}

fn print_merge(report: &MergeReport) {
    println!(
        "merge: {} rows, threshold {:.2} days -> {}",
        format_usize_with_commas(report.total_rows),
        report.threshold,
        report.merged_path.display()
    );
}

fn print_split(report: &SplitReport) {
    println!(
        "split: floor {}, max size {}, dropped {:?}, {} oversampled cells",
        report.floor,
        format_usize_with_commas(report.sizes.max),
        report.sizes.dropped,
        report.oversampled.len()
    );
    for (path, rows) in &report.files {
        println!("  {} rows -> {}", format_usize_with_commas(*rows), path.display());
    }
}

fn print_verification(report: &VerificationReport) {
    for check in &report.checks {
        let status = if check.balanced { "balanced" } else { "IMBALANCED" };
        println!("verify {}: {status}", check.path.display());
    }
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
