
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use basma_rs::config::Config;
use basma_rs::{distractors, easiness, extract, longform, targets};

#[derive(Parser)]
#[command(name = "basma", version, about = "BASMA easiness computation pipeline")]
struct Cli {
    /// Path to the pipeline configuration file.
    #[arg(long, global = true, default_value = "config/config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract features from the lexicon sources (stage 1).
    Extract,
    /// Compute per-word easiness scores (stage 2).
    Easiness,
    /// Select the best Easy/Medium/Hard word per concept (stage 3).
    Targets,
    /// Emit all qualifying words per category in long form (stage 4).
    Longform,
    /// Fill distractor columns on the targets table (stage 5).
    Distractors,
    /// Run all stages in order.
    Pipeline {
        /// Reuse existing intermediate files instead of running extraction.
        #[arg(long)]
        skip_extract: bool,
    },
}

fn run_pipeline(config: &Config, skip_extract: bool) -> Result<()> {
    let mut steps: Vec<(&str, fn(&Config) -> Result<()>)> = Vec::new();
    if skip_extract {
        info!("skipping extraction, reusing intermediate files");
    } else {
        steps.push(("extract", extract::run));
    }
    steps.push(("easiness", easiness::run));
    steps.push(("targets", targets::run));
    steps.push(("longform", longform::run));
    steps.push(("distractors", distractors::run));

    let total = steps.len();
    for (i, (name, step)) in steps.into_iter().enumerate() {
        info!(step = i + 1, total, name, "running stage");
        step(config)?;
    }

    // Report which configured outputs actually exist.
    let out = &config.files.output;
    let outputs = [
        ("easiness", &out.easiness),
        ("targets", &out.targets),
        ("targets_all_long", &out.targets_all_long),
        ("targets_all_triplets", &out.targets_all_triplets),
        ("targets_with_distractors", &out.targets_with_distractors),
    ];
    for (name, path) in outputs {
        let path = config.resolve(path);
        if path.exists() {
            info!(name, path = %path.display(), "output ready");
        } else {
            warn!(name, path = %path.display(), "output missing");
        }
    }
    info!("pipeline completed");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!(config = %cli.config.display(), "loaded configuration");

    match cli.command {
        Command::Extract => extract::run(&config),
        Command::Easiness => easiness::run(&config),
        Command::Targets => targets::run(&config),
        Command::Longform => longform::run(&config),
        Command::Distractors => distractors::run(&config),
        Command::Pipeline { skip_extract } => run_pipeline(&config, skip_extract),
    }
}
