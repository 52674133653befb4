// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Pattern Memory CLI
//!
//! The `pmem` binary records classified task outcomes and answers
//! best-practice queries.
//!
//! - **Default mode**: commands delegate to the daemon if it answers `/health`,
//!   otherwise they build the services in-process against a durable store
//! - **Daemon mode**: `pmem --daemon` (or `pmem serve`) runs the HTTP API in
//!   the foreground
//!
//! ## Commands
//!
//! - `pmem learn` - classify and record a task result
//! - `pmem link` - link a SUCCESS pattern to the FAILURE it remedies
//! - `pmem query best-practices|stats|get|remedies`
//! - `pmem decay` - run one decay pass
//! - `pmem daemon start|stop|status`
//! - `pmem config show|validate|generate`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use pattern_memory::commands::{
    self, ConfigCommand, DaemonCommand, DecayArgs, LearnArgs, LinkArgs, QueryCommand,
};
use pattern_memory::daemon;
use pattern_memory_cortex::domain::config::PatternMemoryConfig;

/// Pattern Memory - learn from classified task outcomes
#[derive(Parser)]
#[command(name = "pmem")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Run the HTTP daemon in the foreground
    #[arg(long, global = true)]
    daemon: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "PMEM_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, global = true, env = "PMEM_PORT", default_value = "8600")]
    port: u16,

    /// HTTP API host
    #[arg(long, global = true, env = "PMEM_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "PMEM_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "PMEM_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a task result and record it
    #[command(name = "learn")]
    Learn(LearnArgs),

    /// Create or reinforce a SUCCESS → FAILURE link
    #[command(name = "link")]
    Link(LinkArgs),

    /// Query stored patterns
    #[command(name = "query")]
    Query {
        #[command(subcommand)]
        command: QueryCommand,
    },

    /// Run one decay pass
    #[command(name = "decay")]
    Decay(DecayArgs),

    /// Manage daemon lifecycle
    #[command(name = "daemon")]
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Run the HTTP daemon in the foreground (same as --daemon)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let serving = cli.daemon || matches!(cli.command, Some(Commands::Serve));
    // Config errors surface later with context; logging falls back to defaults
    let observability = PatternMemoryConfig::load_or_default(cli.config.clone())
        .map(|config| config.spec.observability)
        .unwrap_or_default();
    // The daemon logs at the configured level unless --log-level is given
    let level = if serving && cli.log_level == "warn" {
        observability.log_level.as_str()
    } else {
        cli.log_level.as_str()
    };
    let json = cli.log_json || observability.log_format.eq_ignore_ascii_case("json");
    init_logging(level, json)?;

    if cli.daemon {
        info!("Starting pattern memory in daemon mode");
        return daemon::start_daemon(cli.config, cli.host, cli.port).await;
    }

    match cli.command {
        Some(Commands::Learn(args)) => commands::learn::handle_command(args, cli.config, &cli.host, cli.port).await,
        Some(Commands::Link(args)) => commands::link::handle_command(args, cli.config, &cli.host, cli.port).await,
        Some(Commands::Query { command }) => {
            commands::query::handle_command(command, cli.config, &cli.host, cli.port).await
        }
        Some(Commands::Decay(args)) => commands::decay::handle_command(args, cli.config, &cli.host, cli.port).await,
        Some(Commands::Daemon { command }) => {
            commands::daemon::handle_command(command, cli.config, &cli.host, cli.port).await
        }
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Serve) => {
            info!("Starting pattern memory in daemon mode");
            daemon::start_daemon(cli.config, cli.host, cli.port).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
