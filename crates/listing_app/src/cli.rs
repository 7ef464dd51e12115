use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use engine_logging::{engine_error, LogDestination};
use listing_engine::{normalize_markup_file, normalize_raw_file, NormalizeReport, NormalizeSettings};
use log::LevelFilter;

/// Normalize press-release listing captures into candidate envelopes.
#[derive(Debug, Parser)]
#[command(name = "listing-normalize", version)]
pub struct Cli {
    /// Raw capture files (`raw_signal.v0` JSON) to normalize.
    #[arg(value_name = "RAW_PATH", required_unless_present = "html")]
    pub raw_paths: Vec<PathBuf>,

    /// Output directory; defaults to `normalized/` beside each raw directory.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Override the reference-link href pattern (case-insensitive regex).
    #[arg(long)]
    pub href_pattern: Option<String>,

    /// Override the class token marking date containers.
    #[arg(long)]
    pub date_marker: Option<String>,

    /// Normalize a plain markup file instead of a raw capture.
    #[arg(long, conflicts_with = "raw_paths", requires = "fetched_at")]
    pub html: Option<PathBuf>,

    /// Source id for `--html` input.
    #[arg(long, env = "MARKET_INTEL_SOURCE_ID", default_value = "fidelity_press")]
    pub source_id: String,

    /// Fetch timestamp recorded for `--html` input.
    #[arg(long)]
    pub fetched_at: Option<String>,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log only to `--log-file`, not the terminal.
    #[arg(short, long, requires = "log_file")]
    pub quiet: bool,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn settings(&self) -> NormalizeSettings {
        NormalizeSettings {
            out_dir: self.out_dir.clone(),
            href_pattern: self.href_pattern.clone(),
            date_marker: self.date_marker.clone(),
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match (&self.log_file, self.quiet) {
            (Some(path), true) => LogDestination::File(path.clone()),
            (Some(path), false) => LogDestination::Both(path.clone()),
            (None, _) => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Run every requested normalization. Each file is attempted even if an
/// earlier one failed; the run fails if any did.
pub fn run(cli: &Cli) -> Result<Vec<NormalizeReport>> {
    let settings = cli.settings();

    if let Some(html) = &cli.html {
        let fetched_at = cli
            .fetched_at
            .as_deref()
            .context("--fetched-at is required with --html")?;
        let report = normalize_markup_file(html, &cli.source_id, fetched_at, &settings)
            .with_context(|| format!("normalizing {}", html.display()))?;
        return Ok(vec![report]);
    }

    let mut reports = Vec::with_capacity(cli.raw_paths.len());
    let mut failures = 0usize;
    for raw_path in &cli.raw_paths {
        match normalize_raw_file(raw_path, &settings) {
            Ok(report) => reports.push(report),
            Err(err) => {
                engine_error!("Failed to normalize {}: {}", raw_path.display(), err);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} captures failed to normalize", cli.raw_paths.len());
    }
    Ok(reports)
}
