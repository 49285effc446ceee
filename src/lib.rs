//! Labelprep: annotation aggregation and stratified train/val splitting.
//!
//! Labelprep prepares labeled object-detection data for training. It merges
//! per-source JSON-lines label files into one corpus, then partitions the
//! images of that corpus into training and validation sets that keep class
//! proportions even, never split an image's boxes across sides, and honor
//! caller-supplied "must train" / "must validate" lists.
//!
//! # Modules
//!
//! - [`annotation`]: record types, JSON-lines I/O and the `MLTable` descriptor
//! - [`paths`]: basename and upsampled-copy matching over image references
//! - [`aggregate`]: merging label files into one corpus
//! - [`split`]: the stratified group splitter
//! - [`stage`]: corpus directory in, train/val directories out
//! - [`stats`]: class distribution across a split
//! - [`error`]: error types for labelprep operations

pub mod aggregate;
pub mod annotation;
pub mod error;
pub mod paths;
pub mod split;
pub mod stage;
pub mod stats;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::LabelPrepError;

/// The labelprep CLI application.
#[derive(Parser)]
#[command(name = "labelprep")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Merge per-source label files into one annotation corpus.
    Aggregate(AggregateArgs),
    /// Split an annotation corpus into training and validation corpora.
    Split(SplitArgs),
}

/// Arguments for the aggregate subcommand.
#[derive(clap::Args)]
struct AggregateArgs {
    /// Directory containing the images.
    #[arg(long, env = "LABELPREP_IMAGE_DIR")]
    image_dir: PathBuf,

    /// Directory containing the per-source *.jsonl label files.
    #[arg(long, env = "LABELPREP_LABEL_DIR")]
    label_dir: PathBuf,

    /// Prefix written in front of every image file name.
    #[arg(long, env = "LABELPREP_ABSOLUTE_PREFIX")]
    absolute_prefix: String,

    /// Directory receiving annotations.jsonl and MLTable.
    #[arg(long, env = "LABELPREP_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Keep only the first 20 records (true/false).
    #[arg(long, env = "LABELPREP_FAST_TRAINING", default_value = "false")]
    fast_training: String,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    /// Directory containing the aggregated corpus.
    #[arg(long, env = "LABELPREP_INPUT_DIR")]
    input_dir: PathBuf,

    /// Directory receiving the training corpus.
    #[arg(long, env = "LABELPREP_TRAIN_OUTPUT_DIR")]
    train_output_dir: PathBuf,

    /// Directory receiving the validation corpus.
    #[arg(long, env = "LABELPREP_VAL_OUTPUT_DIR")]
    val_output_dir: PathBuf,

    /// Use the stratified group splitter (true/false).
    #[arg(long, env = "LABELPREP_USE_STRATIFIED_SPLIT", default_value = "true")]
    use_stratified_split: String,

    /// Number of folds; 1/n of the data seeds the validation set.
    #[arg(long, env = "LABELPREP_N_SPLITS", default_value_t = split::DEFAULT_N_SPLITS)]
    n_splits: usize,

    /// Files that must be in training, separated by ';' (e.g. "32.jpg;33.jpg").
    #[arg(long, env = "LABELPREP_MANDATORY_TRAIN")]
    mandatory_train: Option<String>,

    /// Files that must be in validation, separated by ';'.
    #[arg(long, env = "LABELPREP_MANDATORY_VAL")]
    mandatory_val: Option<String>,

    /// Do not copy files of rare classes into validation.
    #[arg(long)]
    no_rare_to_val: bool,

    /// Seed for the fold shuffle.
    #[arg(long, env = "LABELPREP_SEED", default_value_t = split::DEFAULT_SEED)]
    seed: u64,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the labelprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelPrepError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Aggregate(args)) => run_aggregate(args),
        Some(Commands::Split(args)) => run_split(args),
        None => {
            println!("labelprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation aggregation and stratified train/val splitting.");
            println!();
            println!("Run 'labelprep --help' for usage information.");
            Ok(())
        }
    }
}

/// Parses a boolean flag value the way pipeline configs spell them.
///
/// Accepts `yes/true/t/y/1` and `no/false/f/n/0`, case-insensitively.
pub fn parse_bool_flag(value: &str) -> Result<bool, LabelPrepError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err(LabelPrepError::InvalidFlag {
            value: value.to_string(),
        }),
    }
}

/// Execute the aggregate subcommand.
fn run_aggregate(args: AggregateArgs) -> Result<(), LabelPrepError> {
    let opts = aggregate::AggregateOptions {
        image_dir: args.image_dir,
        label_dir: args.label_dir,
        absolute_prefix: args.absolute_prefix,
        output_dir: args.output_dir,
        is_fast_training: parse_bool_flag(&args.fast_training)?,
    };
    let output_dir = opts.output_dir.clone();
    let report = aggregate::Aggregator::new(opts).run()?;

    match args.output.as_str() {
        "json" => print_json(&report)?,
        _ => {
            println!(
                "Aggregated {} record(s) from {} file(s) into {}",
                report.records,
                report.files_read,
                output_dir.display()
            );
            if report.lines_skipped > 0 {
                println!("Skipped {} malformed line(s)", report.lines_skipped);
            }
        }
    }

    Ok(())
}

/// Execute the split subcommand.
fn run_split(args: SplitArgs) -> Result<(), LabelPrepError> {
    let opts = stage::StageOptions {
        use_stratified_split: parse_bool_flag(&args.use_stratified_split)?,
        split: split::SplitOptions {
            n_splits: args.n_splits,
            add_rare_to_val: !args.no_rare_to_val,
            mandatory_train_filenames: args
                .mandatory_train
                .as_deref()
                .map(stage::parse_mandatory_list)
                .unwrap_or_default(),
            mandatory_val_filenames: args
                .mandatory_val
                .as_deref()
                .map(stage::parse_mandatory_list)
                .unwrap_or_default(),
            seed: args.seed,
        },
    };

    let outcome = stage::split_corpus_dir(
        &args.input_dir,
        &args.train_output_dir,
        &args.val_output_dir,
        &opts,
    )?;

    match args.output.as_str() {
        "json" => print_json(&outcome)?,
        _ => {
            if !outcome.stratified {
                println!(
                    "Copied {} file(s) to {}; validation corpus left empty",
                    outcome.copied_files,
                    args.train_output_dir.display()
                );
                return Ok(());
            }
            println!(
                "Split complete: {} training record(s), {} validation record(s)",
                outcome.train_records, outcome.val_records
            );
            if let Some(result) = &outcome.split {
                if !result.rare_classes.is_empty() {
                    let rare: Vec<&str> = result.rare_classes.iter().map(String::as_str).collect();
                    println!("Rare classes: {}", rare.join(", "));
                }
                let overlap = result.overlap();
                if !overlap.is_empty() {
                    println!("Files on both sides: {}", overlap.len());
                }
            }
            if let Some(distribution) = &outcome.distribution {
                print!("{}", distribution);
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), LabelPrepError> {
    let json = serde_json::to_string_pretty(value).map_err(LabelPrepError::ReportJson)?;
    println!("{json}");
    Ok(())
}
