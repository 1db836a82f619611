use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use thesis_mining::{
    analyzer::ThesisAnalyzer,
    config::{Config, LogFormat},
    llm::Provider,
    output::OutputWriter,
    pipeline::{load_chunks, Pipeline},
};

/// Argument mining over "Cristianismo Basico" (John Stott).
#[derive(Debug, Parser)]
#[command(name = "thesis-mining", version, about)]
struct Args {
    /// JSON array of chunks produced by the chunker [default: <output-dir>/chunks/chunks.json]
    #[arg(long, value_name = "FILE")]
    chunks: Option<PathBuf>,

    /// Output directory (overrides OUTPUT_DIR)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// LLM backend: ollama, openai or anthropic (overrides LLM_PROVIDER)
    #[arg(long, value_name = "PROVIDER")]
    provider: Option<Provider>,

    /// Re-analyze every chunk, ignoring per-chapter results from earlier runs
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = %config.llm.provider,
        "Thesis mining starting..."
    );

    let chunks_path = args
        .chunks
        .clone()
        .unwrap_or_else(|| config.output.chunks_file());
    let chunks = match load_chunks(&chunks_path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to load chunks");
            return Err(e.into());
        }
    };

    let analyzer = match ThesisAnalyzer::from_config(&config) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "Failed to initialize LLM clients");
            return Err(e.into());
        }
    };

    let writer = match OutputWriter::new(&config.output) {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "Failed to prepare output directory");
            return Err(e.into());
        }
    };

    let pipeline = Pipeline::new(analyzer, writer).with_cache(!args.no_cache);

    match pipeline.run(&chunks).await {
        Ok(book) => {
            info!(
                theses = book.theses.len(),
                chains = book.chains.len(),
                citations = book.citations.len(),
                "Run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Pipeline aborted");
            Err(e.into())
        }
    }
}

/// Environment configuration with CLI overrides applied, then validated.
fn load_config(args: &Args) -> Result<Config, thesis_mining::AppError> {
    let mut config = Config::load_env()?;
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }
    if let Some(dir) = &args.output_dir {
        config.output.output_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
