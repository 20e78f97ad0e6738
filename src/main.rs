use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{self, AsyncBufRead, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use abuse_guard::config::GuardConfig;
use abuse_guard::gatekeeper::Gatekeeper;
use abuse_guard::moderation::{ContentFilter, DisallowedTokenSet};
use abuse_guard::replay;

#[derive(Debug, Parser)]
#[command(name = "abuse-guard", version, about = "Admission control and chat moderation")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the word filter over each argument
    Check {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Feed connection and chat events through the gatekeeper
    Replay {
        /// Event file; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    info!("Starting Abuse Guard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => GuardConfig::from_file(path)?,
        None => GuardConfig::from_env()?,
    };
    info!(max = config.limiter.max, "Configuration loaded");

    match cli.command {
        Command::Check { text } => check(&config, &text),
        Command::Replay { file } => replay_events(&config, file).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_thread_ids(true).init();
    }
}

fn check(config: &GuardConfig, inputs: &[String]) -> anyhow::Result<ExitCode> {
    let filter = ContentFilter::new(DisallowedTokenSet::from_config(&config.filter)?);

    let mut flagged = false;
    for input in inputs {
        match filter.first_match(input) {
            Some(token) => {
                flagged = true;
                println!("flagged ({}): {}", token, input);
            }
            None => println!("clean: {}", input),
        }
    }

    Ok(if flagged {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn replay_events(config: &GuardConfig, file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let gate = Gatekeeper::from_config(config)?;
    gate.start();

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match file {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let result = tokio::select! {
        result = replay::run(&gate, reader, io::stdout()) => Some(result),
        _ = shutdown_signal() => None,
    };
    gate.shutdown().await;

    if let Some(summary) = result {
        let summary = summary?;
        info!(
            events = summary.events,
            rejected = summary.rejected,
            flagged = summary.flagged,
            invalid = summary.invalid,
            "Replay finished"
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping");
        }
    }
}
