use std::path::PathBuf;

use clap::{Parser, Subcommand};
use recall::config::Config;
use recall_cli::App;
use recall_cli::commands::{ConfigCommand, MemoryCommand, StatsCommand};
use recall_cli::error::CliResult;
use recall_cli::output::OutputFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recall-cli")]
#[command(about = "Recall CLI - Management tool for long-term memory snapshots")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'd', global = true, help = "Path to data directory")]
    pub data_dir: Option<PathBuf>,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Memory management commands")]
    Memory(MemoryCommand),

    #[clap(about = "Show memory statistics")]
    Stats(StatsCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let (config, config_source) = Config::load_with_source(cli.config.as_deref())?;

    match &cli.command {
        Command::Config(cmd) => cmd.execute(&config, config_source.as_deref(), format).await,
        Command::Memory(cmd) => {
            let app = App::open(config, cli.data_dir.as_deref()).await?;
            cmd.execute(&app, format).await
        }
        Command::Stats(cmd) => {
            let app = App::open(config, cli.data_dir.as_deref()).await?;
            cmd.execute(&app, format).await
        }
    }
}
