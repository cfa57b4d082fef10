use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use qstatw::StatusClient;
use qstatw::cli::{report, tui};
use qstatw::config::AppConfig;
use qstatw::core::Usage;
use qstatw::logging::{self, LogConfig};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "qstatw")]
#[command(about = "Monitor PBS/Torque jobs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: /etc/qstatw/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Watch {
        /// Seconds between refreshes
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Print all jobs as a JSON array
    Json {
        #[arg(long)]
        pretty: bool,
    },
    /// Print the active batch server address
    Server,
    /// Print per-host core occupancy
    Usage {
        /// Read jobs from a file written by `qstatw json` instead of querying
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

#[derive(Args, Serialize)]
struct Overrides {
    /// Auth daemon socket
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(short = 'a', long = "auth", global = true)]
    auth_socket: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[arg(short, long, global = true)]
    verbose: bool,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[arg(long, global = true)]
    json_logs: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(skip)]
    refresh_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Commands::Watch { interval: None });

    if let Commands::Watch { interval } = &command {
        cli.overrides.refresh_secs = *interval;
    }

    let config = AppConfig::new(cli.config.as_deref(), Some(&cli.overrides))
        .context("Failed to load configuration")?;

    match command {
        Commands::Watch { .. } => run_watch(config).await,
        Commands::Json { pretty } => run_json(config, pretty).await,
        Commands::Server => run_server(config).await,
        Commands::Usage { from } => run_usage(config, from).await,
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    logging::init(LogConfig {
        json: config.json_logs,
        verbose: config.verbose,
        file: config.log_file.clone(),
    })
}

async fn run_watch(config: AppConfig) -> Result<()> {
    // The dashboard owns the terminal; only log when there is somewhere else to write.
    if config.log_file.is_some() {
        init_logging(&config)?;
    }

    let client = StatusClient::from_config(&config)?;
    tui::run(Box::new(client), config.refresh_interval()).await
}

async fn run_json(config: AppConfig, pretty: bool) -> Result<()> {
    init_logging(&config)?;

    let report = StatusClient::from_config(&config)?.query().await?;
    report::write_json(&mut io::stdout().lock(), &report.jobs, pretty)
}

async fn run_server(config: AppConfig) -> Result<()> {
    init_logging(&config)?;

    let server = StatusClient::from_config(&config)?.active_server().await?;
    report::write_server(&mut io::stdout().lock(), &server)
}

async fn run_usage(config: AppConfig, from: Option<PathBuf>) -> Result<()> {
    init_logging(&config)?;

    let jobs = match from {
        Some(path) => report::read_json(&path)?,
        None => StatusClient::from_config(&config)?.query().await?.jobs,
    };

    let stdout = io::stdout();
    let color = stdout.is_terminal();
    report::write_usage(&mut stdout.lock(), &Usage::from_jobs(&jobs), color)
}
