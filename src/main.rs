//! `macro-regimes` — batch regime inference from the command line.
use anyhow::{Context, Result};
use clap::Parser;
use macro_regimes::{
    config::RegimeConfig,
    hmm::DecodeAlgorithm,
    pipeline::{init_tracing, run_from_files},
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "macro-regimes", version, about = "Gaussian HMM macro regime inference")]
struct Cli {
    /// TOML configuration file; defaults apply to every omitted key
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Monthly macro indicator panel (CSV)
    #[arg(long = "macro")]
    macro_panel: Option<PathBuf>,

    /// Monthly sector returns panel (CSV)
    #[arg(long)]
    returns: Option<PathBuf>,

    /// Output directory for artifacts
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Random seed for initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Smallest number of regimes to fit
    #[arg(long)]
    k_min: Option<usize>,

    /// Largest number of regimes to fit
    #[arg(long)]
    k_max: Option<usize>,

    /// Decoding algorithm: max_posterior or viterbi
    #[arg(long)]
    decode: Option<DecodeAlgorithm>,

    /// Fit regime counts one after another instead of in parallel
    #[arg(long)]
    serial: bool,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<RegimeConfig> {
        let mut config = match &self.config {
            Some(path) => RegimeConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => RegimeConfig::default(),
        };
        if let Some(path) = self.macro_panel {
            config.macro_panel_path = Some(path);
        }
        if let Some(path) = self.returns {
            config.returns_panel_path = Some(path);
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(k) = self.k_min {
            config.regime_count_range.0 = k;
        }
        if let Some(k) = self.k_max {
            config.regime_count_range.1 = k;
        }
        if let Some(algorithm) = self.decode {
            config.decode_algorithm = algorithm;
        }
        if self.serial {
            config.parallel = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.into_config()?;
    let outcome = run_from_files(&config)?;

    for failure in &outcome.result.report.failures {
        warn!(k = failure.k, stage = %failure.stage, "{}", failure.error);
    }
    info!(
        run = %outcome.run,
        fitted = outcome.result.report.successes.len(),
        failed = outcome.result.report.failures.len(),
        files = outcome.written.len(),
        "run complete"
    );
    Ok(())
}
