//! simile: CLI for visual-descriptor extraction, similarity ranking,
//! and weight optimization.
//!
//! Three subcommands cover the workflow:
//!
//! - `features`: extract descriptors for every image in a directory
//!   and emit them as CSV
//! - `rank`: order a directory's images by similarity to a reference
//!   image
//! - `optimize`: exhaustively search the weight grid by leave-one-out
//!   cross-validation over a labeled directory
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin simile -- rank reference.png corpus/
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use simile_pipeline::{ExtractionConfig, FeatureVector, FormatTag};
use simile_rank::{
    DatasetEntry, HistogramDistance, OptimizationOutcome, SearchObserver, WeightGrid,
    WeightProfile, grid_search, rank,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Image similarity search and weight optimization.
#[derive(Parser)]
#[command(name = "simile", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract visual descriptors for every image in a directory.
    Features {
        /// Directory to scan recursively for images.
        directory: PathBuf,

        /// Write the CSV here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractOpts,
    },

    /// Rank a directory's images by similarity to a reference image.
    Rank {
        /// Reference image to compare against.
        reference: PathBuf,

        /// Directory to scan recursively for candidate images.
        directory: PathBuf,

        /// Histogram distance to use.
        #[arg(long, value_enum, default_value_t = Distance::Bhattacharyya)]
        distance: Distance,

        /// Use the enhanced score (quadrants, moments, texture) with a
        /// weight profile adapted to the reference image.
        #[arg(long)]
        enhanced: bool,

        /// Only print the best N matches.
        #[arg(long)]
        top: Option<usize>,

        /// Full weight profile as a JSON string.
        ///
        /// When provided, overrides both the fixed default profile and
        /// adaptive selection.
        #[arg(long)]
        profile_json: Option<String>,

        #[command(flatten)]
        extract: ExtractOpts,
    },

    /// Search the weight grid by leave-one-out cross-validation.
    ///
    /// Category labels come from filenames: the stem with trailing
    /// digits removed, so `cat1.png` and `cat2.png` share a category.
    Optimize {
        /// Directory of labeled images.
        directory: PathBuf,

        /// Neighbors considered per query (accuracy@k).
        #[arg(long, default_value_t = 2, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        k: usize,

        /// Histogram distance to use.
        #[arg(long, value_enum, default_value_t = Distance::Bhattacharyya)]
        distance: Distance,

        /// Write the winning weights report here as well as stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the outcome as JSON instead of the text report.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        extract: ExtractOpts,
    },
}

/// Extraction flags shared by every subcommand.
#[derive(Args)]
struct ExtractOpts {
    /// Apply a 3x3 mean filter before gradient computation.
    #[arg(long)]
    smooth: bool,

    /// High hysteresis threshold on normalized gradient magnitude.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_EDGE_THRESHOLD)]
    edge_threshold: f32,
}

impl ExtractOpts {
    fn config(&self) -> ExtractionConfig {
        ExtractionConfig {
            smooth: self.smooth,
            edge_threshold: self.edge_threshold,
        }
    }
}

/// Histogram distance selection.
#[derive(Clone, Copy, ValueEnum)]
enum Distance {
    /// L2 norm of bin differences.
    Euclidean,
    /// Negative log of the Bhattacharyya coefficient.
    Bhattacharyya,
    /// Hellinger distance.
    Hellinger,
    /// Chi-square statistic.
    ChiSquare,
    /// 1-D earth mover's distance.
    EarthMover,
}

impl Distance {
    const fn to_rank(self) -> HistogramDistance {
        match self {
            Self::Euclidean => HistogramDistance::Euclidean,
            Self::Bhattacharyya => HistogramDistance::Bhattacharyya,
            Self::Hellinger => HistogramDistance::Hellinger,
            Self::ChiSquare => HistogramDistance::ChiSquare,
            Self::EarthMover => HistogramDistance::EarthMover,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Features {
            directory,
            out,
            extract,
        } => run_features(&directory, out.as_deref(), &extract.config()),
        Command::Rank {
            reference,
            directory,
            distance,
            enhanced,
            top,
            profile_json,
            extract,
        } => run_rank(
            &reference,
            &directory,
            distance.to_rank(),
            enhanced,
            top,
            profile_json.as_deref(),
            &extract.config(),
        ),
        Command::Optimize {
            directory,
            k,
            distance,
            out,
            json,
            extract,
        } => run_optimize(
            &directory,
            k,
            distance.to_rank(),
            out.as_deref(),
            json,
            &extract.config(),
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Map a file extension to its decode tag; `None` means skip the file.
fn tag_for_path(path: &Path) -> Option<FormatTag> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pgm" => Some(FormatTag::Grayscale),
        "ppm" | "png" | "jpg" | "jpeg" | "bmp" => Some(FormatTag::Color),
        _ => None,
    }
}

/// Recursively collect image files in deterministic filename order.
fn scan_images(directory: &Path) -> Result<Vec<(PathBuf, FormatTag)>, String> {
    if !directory.is_dir() {
        return Err(format!("{} is not a directory", directory.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        match tag_for_path(&path) {
            Some(tag) => files.push((path, tag)),
            None => debug!(path = %path.display(), "skipping non-image file"),
        }
    }

    if files.is_empty() {
        return Err(format!("no images found under {}", directory.display()));
    }
    Ok(files)
}

/// Extract features for every scanned file in parallel.
///
/// Unreadable or undecodable files are logged and skipped rather than
/// failing the whole run.
fn load_dataset(
    files: &[(PathBuf, FormatTag)],
    config: &ExtractionConfig,
) -> Result<Vec<DatasetEntry>, String> {
    let bar = progress_bar(files.len() as u64, "extracting");
    let entries: Vec<DatasetEntry> = files
        .par_iter()
        .filter_map(|(path, tag)| {
            let result = std::fs::read(path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    simile_pipeline::extract_from_bytes(&bytes, *tag, config)
                        .map_err(|e| e.to_string())
                });
            bar.inc(1);
            match result {
                Ok(features) => {
                    let name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default()
                        .to_owned();
                    Some(DatasetEntry::new(name, features))
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping image");
                    None
                }
            }
        })
        .collect();
    bar.finish_and_clear();

    if entries.is_empty() {
        return Err("no images could be decoded".to_owned());
    }
    info!(images = entries.len(), "dataset loaded");
    Ok(entries)
}

/// Extract features for one file.
fn load_one(path: &Path, config: &ExtractionConfig) -> Result<FeatureVector, String> {
    let tag = tag_for_path(path)
        .ok_or_else(|| format!("{}: unsupported image format", path.display()))?;
    let bytes =
        std::fs::read(path).map_err(|e| format!("error reading {}: {e}", path.display()))?;
    simile_pipeline::extract_from_bytes(&bytes, tag, config)
        .map_err(|e| format!("error decoding {}: {e}", path.display()))
}

fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({eta})")
    {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar
}

fn run_features(
    directory: &Path,
    out: Option<&Path>,
    config: &ExtractionConfig,
) -> Result<(), String> {
    let files = scan_images(directory)?;
    let dataset = load_dataset(&files, config)?;

    let csv = dataset_csv(&dataset);
    match out {
        Some(path) => {
            std::fs::write(path, &csv)
                .map_err(|e| format!("error writing {}: {e}", path.display()))?;
            info!(path = %path.display(), rows = dataset.len(), "features written");
        }
        None => print!("{csv}"),
    }
    Ok(())
}

/// Render the dataset as CSV, one row per image.
fn dataset_csv(dataset: &[DatasetEntry]) -> String {
    let mut csv = String::new();
    csv.push_str("name,width,height,gradient_norm,edge_density,ratio_r,ratio_g,ratio_b,is_color");
    for bin in 0..simile_pipeline::Histogram::BINS {
        let _ = write!(csv, ",hist_{bin}");
    }
    csv.push('\n');

    for entry in dataset {
        let f = &entry.features;
        let _ = write!(
            csv,
            "{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
            entry.filename,
            f.width,
            f.height,
            f.gradient_norm_mean,
            f.edge_density,
            f.color_ratios[0],
            f.color_ratios[1],
            f.color_ratios[2],
            u8::from(f.is_color),
        );
        for &bin in f.histogram.bins() {
            let _ = write!(csv, ",{bin:.6}");
        }
        csv.push('\n');
    }
    csv
}

fn run_rank(
    reference: &Path,
    directory: &Path,
    distance: HistogramDistance,
    enhanced: bool,
    top: Option<usize>,
    profile_json: Option<&str>,
    config: &ExtractionConfig,
) -> Result<(), String> {
    let reference_features = load_one(reference, config)?;
    let files = scan_images(directory)?;
    let dataset = load_dataset(&files, config)?;

    let profile = match profile_json {
        Some(json) => serde_json::from_str::<WeightProfile>(json)
            .map_err(|e| format!("error parsing --profile-json: {e}"))?,
        None if enhanced => WeightProfile::adaptive(&reference_features),
        None => WeightProfile::default(),
    };

    let candidates: Vec<FeatureVector> =
        dataset.iter().map(|entry| entry.features.clone()).collect();
    let ranked = rank(&reference_features, &candidates, distance, &profile, enhanced);

    let shown = top.unwrap_or(ranked.len()).min(ranked.len());
    println!("Reference: {}", reference.display());
    println!("{:>4}  {:>12}  File", "Rank", "Score");
    for (position, scored) in ranked.iter().take(shown).enumerate() {
        println!(
            "{:>4}  {:>12.6}  {}",
            position + 1,
            scored.score,
            dataset[scored.index].filename,
        );
    }
    Ok(())
}

/// Progress reporting for the grid search, backed by an indicatif bar.
struct BarObserver {
    bar: ProgressBar,
}

impl SearchObserver for BarObserver {
    fn combination_done(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }
}

fn run_optimize(
    directory: &Path,
    k: usize,
    distance: HistogramDistance,
    out: Option<&Path>,
    json: bool,
    config: &ExtractionConfig,
) -> Result<(), String> {
    let files = scan_images(directory)?;
    let dataset = load_dataset(&files, config)?;

    let grid = WeightGrid::default();
    let observer = BarObserver {
        bar: progress_bar(grid.combination_count() as u64, "searching"),
    };
    let outcome = grid_search(&dataset, &grid, k, distance, &observer)
        .map_err(|e| format!("optimization failed: {e}"))?;
    observer.bar.finish_and_clear();

    let report = if json {
        serde_json::to_string_pretty(&outcome)
            .map_err(|e| format!("error serializing outcome: {e}"))?
    } else {
        outcome_report(&outcome, k, dataset.len())
    };
    println!("{report}");

    if let Some(path) = out {
        std::fs::write(path, format!("{report}\n"))
            .map_err(|e| format!("error writing {}: {e}", path.display()))?;
        info!(path = %path.display(), "weights report written");
    }
    Ok(())
}

/// Human-readable report of the winning weight combination.
fn outcome_report(outcome: &OptimizationOutcome, k: usize, images: usize) -> String {
    let p = &outcome.profile;
    let mut report = String::new();
    let _ = writeln!(
        report,
        "Best of {} combinations (accuracy@{k} = {:.6} over {images} images)",
        outcome.combinations, outcome.accuracy,
    );
    let _ = writeln!(report, "mean pairwise score: {:.6}", outcome.mean_score);
    for (name, value) in [
        ("hist_global", p.hist_global),
        ("red", p.red),
        ("green", p.green),
        ("blue", p.blue),
        ("gradient_norm", p.gradient_norm),
        ("contour", p.contour),
        ("color_mismatch", p.color_mismatch),
    ] {
        let _ = writeln!(report, "{name:<16} {value:.6}");
    }
    report
}
