mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::*;
use tidemark_core::{init_logging, load_env_file, LoggingConfig};
use tidemark_migrate::DEFAULT_MIGRATIONS_DIR;

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(version, about = "Apply ordered SQL migrations to a PostgreSQL database")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Include the emitting module in each log line
    #[arg(long, global = true)]
    log_target: bool,

    /// Environment file to load when DB_USER is not already set (default: .env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every migration in order and list the resulting tables
    Run {
        /// Directory holding the .sql migration files
        #[arg(long, default_value = DEFAULT_MIGRATIONS_DIR)]
        migrations_dir: PathBuf,
    },

    /// List the migrations a run would apply, without connecting
    List {
        /// Directory holding the .sql migration files
        #[arg(long, default_value = DEFAULT_MIGRATIONS_DIR)]
        migrations_dir: PathBuf,
    },

    /// Test the database connection and suggest fixes on failure
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    // Before logging, so RUST_LOG can come from the file
    let loaded = load_env_file(cli.env_file.as_deref())?;

    let logging = LoggingConfig::default()
        .with_level(cli.log_level)
        .with_json(cli.json_logs)
        .with_target(cli.log_target);
    init_logging(logging).map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

    if let Some(path) = loaded {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Commands::Run { migrations_dir } => {
            migrate::run(&migrations_dir).await?;
        }
        Commands::List { migrations_dir } => {
            migrate::list(&migrations_dir).await?;
        }
        Commands::Check => {
            check::run().await?;
        }
    }

    Ok(())
}
