use arraymemo::Commands;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arraymemo")]
#[command(about = "Run array tasks, reusing cached sub-task results", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    arraymemo_utils::tracing::init(cli.verbose)
        .map_err(|e| eyre::eyre!("failed to initialize logging: {e}"))?;

    let config = match &cli.config {
        Some(path) => arraymemo_config::ConfigLoader::load_from(path)?,
        None => arraymemo_config::ConfigLoader::load()?,
    };

    cli.command.execute(config).await
}
