//! Annoprep: housekeeping for image annotation datasets.
//!
//! Annoprep keeps an image directory numbered `1.jpg, 2.jpg, ...` without
//! gaps, and flattens a directory of Pascal VOC annotation files into a
//! single table that is split into train and test CSV artifacts.
//!
//! # Modules
//!
//! - [`sequence`]: Contiguity checks and gap-closing renumbering
//! - [`annotation`]: VOC parsing and flattening into table rows
//! - [`split`]: Seeded train/test split and CSV artifacts
//! - [`audit`]: Read-only dataset checks (over-labelled files, rotated boxes)
//! - [`prefix`]: Provenance prefix stripping for paired directories
//! - [`listing`], [`setops`]: Directory listing and order-preserving set algebra
//! - [`error`]: Error types for annoprep operations

pub mod annotation;
pub mod audit;
pub mod error;
pub mod listing;
pub mod prefix;
pub mod sequence;
pub mod setops;
pub mod split;

use std::fmt::Display;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::AnnoprepError;

/// The annoprep CLI application.
#[derive(Parser)]
#[command(name = "annoprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check that image file names are consecutive integers.
    Check(CheckArgs),
    /// Rename images so their names become consecutive integers.
    Renumber(RenumberArgs),
    /// Flatten VOC annotations into full, train and test CSV tables.
    Flatten(FlattenArgs),
    /// List annotation files with more than one object.
    Overlabeled(OverlabeledArgs),
    /// List Label Studio tasks whose bounding box is rotated.
    Rotated(RotatedArgs),
    /// Strip `<prefix>-` from file names in paired dataset directories.
    StripPrefix(StripPrefixArgs),
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// Image directory to check.
    dir: PathBuf,

    /// First expected number.
    #[arg(long, default_value_t = 1)]
    start: u64,

    /// Image file extension, without the dot.
    #[arg(long = "ext", default_value = sequence::DEFAULT_EXTENSION)]
    extension: String,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the renumber subcommand.
#[derive(clap::Args)]
struct RenumberArgs {
    /// Image directory to renumber in place.
    dir: PathBuf,

    /// Number given to the first file.
    #[arg(long, default_value_t = 1)]
    start: u64,

    /// Image file extension, without the dot.
    #[arg(long = "ext", default_value = sequence::DEFAULT_EXTENSION)]
    extension: String,

    /// Print the planned renames without touching the directory.
    #[arg(long)]
    dry_run: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the flatten subcommand.
#[derive(clap::Args)]
struct FlattenArgs {
    /// Directory of VOC `.xml` annotation files.
    input: PathBuf,

    /// Directory the CSV artifacts are written to.
    #[arg(long)]
    out_dir: PathBuf,

    /// Base name of the artifacts (`<name>.csv`, `<name>_train.csv`, `<name>_test.csv`).
    #[arg(long)]
    name: String,

    /// Fraction of rows sampled into the training table.
    #[arg(long, default_value_t = split::DEFAULT_TRAIN_FRACTION)]
    train_fraction: f64,

    /// Seed for the train/test sample.
    #[arg(long, default_value_t = split::DEFAULT_SEED, conflicts_with = "unseeded")]
    seed: u64,

    /// Draw the sample from OS randomness (not reproducible).
    #[arg(long)]
    unseeded: bool,

    /// What to do with annotation files that cannot be parsed.
    #[arg(long, value_enum, default_value_t = annotation::MalformedFilePolicy::Abort)]
    on_malformed: annotation::MalformedFilePolicy,

    /// What to do with labels that have no integer code.
    #[arg(long, value_enum, default_value_t = annotation::UnmappedLabelPolicy::Passthrough)]
    unmapped_labels: annotation::UnmappedLabelPolicy,

    /// Replace artifacts left by a previous run.
    #[arg(long)]
    overwrite: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the overlabeled subcommand.
#[derive(clap::Args)]
struct OverlabeledArgs {
    /// Directory of VOC `.xml` annotation files.
    dir: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the rotated subcommand.
#[derive(clap::Args)]
struct RotatedArgs {
    /// Label Studio JSON export.
    input: PathBuf,

    /// Start listing at this task id.
    #[arg(long)]
    start: Option<String>,

    /// List at most this many ids.
    #[arg(long)]
    limit: Option<usize>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the strip-prefix subcommand.
#[derive(clap::Args)]
struct StripPrefixArgs {
    /// Dataset root holding the paired subdirectories.
    root: PathBuf,

    /// Subdirectory to process (repeatable; defaults to Annotations and images).
    #[arg(long = "subdir")]
    subdirs: Vec<String>,

    /// Print the planned renames without touching the directories.
    #[arg(long)]
    dry_run: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the annoprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), AnnoprepError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Renumber(args)) => run_renumber(args),
        Some(Commands::Flatten(args)) => run_flatten(args),
        Some(Commands::Overlabeled(args)) => run_overlabeled(args),
        Some(Commands::Rotated(args)) => run_rotated(args),
        Some(Commands::StripPrefix(args)) => run_strip_prefix(args),
        None => {
            println!("annoprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Housekeeping for image annotation datasets.");
            println!();
            println!("Run 'annoprep --help' for usage information.");
            Ok(())
        }
    }
}

/// Print a report as text or pretty JSON.
fn emit<R: Serialize + Display>(report: &R, output: &str) -> Result<(), AnnoprepError> {
    match output {
        "text" => {
            print!("{}", report);
            Ok(())
        }
        "json" => {
            let json = serde_json::to_string_pretty(report).map_err(AnnoprepError::ReportJson)?;
            println!("{}", json);
            Ok(())
        }
        other => check_output(other),
    }
}

/// Reject an unknown output format before any work is done.
fn check_output(output: &str) -> Result<(), AnnoprepError> {
    match output {
        "text" | "json" => Ok(()),
        other => Err(AnnoprepError::UnsupportedOutput(format!(
            "'{}' (supported: text, json)",
            other
        ))),
    }
}

fn run_check(args: CheckArgs) -> Result<(), AnnoprepError> {
    check_output(&args.output)?;
    let report = sequence::check_contiguity(&args.dir, args.start, &args.extension)?;
    emit(&report, &args.output)?;

    if report.contiguous {
        Ok(())
    } else {
        Err(AnnoprepError::NotContiguous {
            dir: args.dir,
            start: args.start,
        })
    }
}

fn run_renumber(args: RenumberArgs) -> Result<(), AnnoprepError> {
    check_output(&args.output)?;
    let opts = sequence::RenumberOptions {
        start: args.start,
        extension: args.extension,
        dry_run: args.dry_run,
    };

    let report = sequence::renumber(&args.dir, &opts)?;
    emit(&report, &args.output)?;

    if report.is_failed() {
        Err(AnnoprepError::RenumberFailed {
            dir: args.dir,
            report: Box::new(report),
        })
    } else {
        Ok(())
    }
}

/// Everything a flatten run produced.
#[derive(Serialize)]
struct FlattenSummary {
    report: annotation::FlattenReport,
    seed: Option<u64>,
    train_fraction: f64,
    train_rows: usize,
    test_rows: usize,
    artifacts: split::ArtifactPaths,
}

impl Display for FlattenSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.report)?;
        let seed = match self.seed {
            Some(seed) => seed.to_string(),
            None => "unseeded".to_string(),
        };
        writeln!(
            f,
            "Split {} row(s): {} train, {} test (fraction {}, seed {})",
            self.report.rows, self.train_rows, self.test_rows, self.train_fraction, seed
        )?;
        writeln!(f, "  {}", self.artifacts.full.display())?;
        writeln!(f, "  {}", self.artifacts.train.display())?;
        writeln!(f, "  {}", self.artifacts.validation.display())
    }
}

fn run_flatten(args: FlattenArgs) -> Result<(), AnnoprepError> {
    check_output(&args.output)?;
    let split_opts = split::SplitOptions {
        fraction: args.train_fraction,
        seed: if args.unseeded { None } else { Some(args.seed) },
    };
    split::validate_split_options(&split_opts)?;

    let opts = annotation::FlattenOptions {
        malformed: args.on_malformed,
        unmapped_labels: args.unmapped_labels,
    };
    let output = match annotation::flatten(&args.input, &opts) {
        Ok(output) => output,
        Err(AnnoprepError::FlattenFailed {
            dir,
            failed_files,
            report,
        }) => {
            emit(&report, &args.output)?;
            return Err(AnnoprepError::FlattenFailed {
                dir,
                failed_files,
                report,
            });
        }
        Err(err) => return Err(err),
    };

    let subsets = split::split_rows(&output.records, &split_opts)?;
    let artifacts = split::write_artifacts(
        &args.out_dir,
        &args.name,
        &output.records,
        &subsets,
        args.overwrite,
    )?;

    let summary = FlattenSummary {
        report: output.report,
        seed: split_opts.seed,
        train_fraction: split_opts.fraction,
        train_rows: subsets.train.len(),
        test_rows: subsets.validation.len(),
        artifacts,
    };
    emit(&summary, &args.output)
}

fn run_overlabeled(args: OverlabeledArgs) -> Result<(), AnnoprepError> {
    check_output(&args.output)?;
    let report = audit::find_overlabeled(&args.dir)?;
    emit(&report, &args.output)
}

fn run_rotated(args: RotatedArgs) -> Result<(), AnnoprepError> {
    check_output(&args.output)?;
    let query = audit::RotatedQuery {
        start: args.start,
        limit: args.limit,
    };
    let report = audit::find_rotated(&args.input, &query)?;
    emit(&report, &args.output)
}

fn run_strip_prefix(args: StripPrefixArgs) -> Result<(), AnnoprepError> {
    check_output(&args.output)?;
    let mut opts = prefix::PrefixOptions {
        dry_run: args.dry_run,
        ..Default::default()
    };
    if !args.subdirs.is_empty() {
        opts.subdirs = args.subdirs;
    }

    let report = prefix::strip_prefixes(&args.root, &opts)?;
    emit(&report, &args.output)
}
