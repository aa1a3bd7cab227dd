use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trace_for_guess::config::Config;
use trace_for_guess::pipeline::BatchRunner;

/// Bias-correct TraCE-21ka output for LPJ-GUESS.
#[derive(Parser)]
#[command(name = "trace_for_guess")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, default_value = "./config.json")]
    config: PathBuf,

    /// Number of worker threads (all cores by default).
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    info!(config = %cli.config.display(), "loaded configuration");

    let runner = BatchRunner::new(config);
    let outputs = match cli.threads {
        Some(threads) => runner.process_with_threads(threads)?,
        None => runner.process()?,
    };

    for output in &outputs {
        info!(job = output.job.as_str(), files = output.files.len(), "done");
    }

    Ok(())
}
