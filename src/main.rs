use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use chessprep::cmd;
use chessprep::envconfig::PipelineConfig;

#[derive(Parser)]
#[command(name = "chessprep")]
#[command(version)]
#[command(about = "Download, convert and stage the chess-piece detection model", long_about = None)]
struct Cli {
    /// Root of the Android project tree (defaults to CHESSPREP_ROOT or ".")
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: check, acquire, convert, validate, stage
    Run,
    /// Report which conversion toolchains are installed
    Check,
    /// Download the detection model into the work directory
    Acquire,
    /// Convert a local model file to TFLite
    Convert { input: PathBuf },
    /// Validate a TFLite file and copy it into the app assets
    Stage { input: PathBuf },
    /// Write the class-label manifest into the app assets
    Labels,
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match cli.root {
        Some(root) => PipelineConfig::for_root(root),
        None => PipelineConfig::from_env(),
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd::run(&config).await,
        Commands::Check => cmd::check().await,
        Commands::Acquire => cmd::acquire(&config).await,
        Commands::Convert { input } => cmd::convert(&config, input).await,
        Commands::Stage { input } => cmd::stage(&config, input).await,
        Commands::Labels => cmd::labels(&config).await,
        Commands::Version => cmd::version().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
