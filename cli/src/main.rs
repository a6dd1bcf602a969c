// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Fellowship CLI
//!
//! The `fellowship` binary plans repair workflows across independent service
//! agents, builds signed provenance logs for them and audits those logs.
//!
//! ## Commands
//!
//! - `fellowship plan|build TICKET` - Preview or build a ticket's workflow
//! - `fellowship audit LOG` - Re-verify a provenance log
//! - `fellowship feedback AGENT_ID RATING` - Update an agent's trust score
//! - `fellowship contract privacy|receipt|verify` - Data-sharing contracts
//! - `fellowship agents list|register` - Agent registry
//! - `fellowship config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use fellowship::commands::{self, AgentsCommand, ConfigCommand, ContractCommand};
use fellowship::embedded::EmbeddedServices;
use fellowship_core::domain::config::FellowshipConfig;

/// Fellowship - verifiable repair workflows across service agents
#[derive(Parser)]
#[command(name = "fellowship")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "FELLOWSHIP_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(long, global = true, env = "FELLOWSHIP_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview agent selection and cost for a ticket, without signing
    Plan {
        #[arg(value_name = "TICKET")]
        ticket: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Build the signed provenance log for a ticket
    Build {
        #[arg(value_name = "TICKET")]
        ticket: PathBuf,

        /// Write the log here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Re-verify every signature in a provenance log
    Audit {
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Earlier logs checked for double billing (repeatable)
        #[arg(long = "history", value_name = "LOG")]
        history: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Submit a rating in [0, 1] for an agent
    Feedback {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,

        #[arg(value_name = "RATING")]
        rating: f64,

        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Data-sharing contracts and receipts
    #[command(name = "contract")]
    Contract {
        #[command(subcommand)]
        command: ContractCommand,
    },

    /// Agent registry
    #[command(name = "agents")]
    Agents {
        #[command(subcommand)]
        command: AgentsCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .or_else(|| configured_log_level(cli.config.as_deref()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level)?;

    let command = match cli.command {
        Some(command) => command,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    };

    if let Commands::Config { command } = command {
        return commands::config::handle_command(command, cli.config);
    }

    let services = EmbeddedServices::new(cli.config)?;
    match command {
        Commands::Plan { ticket, json } => commands::ticket::plan(&services, ticket, json).await,
        Commands::Build { ticket, output } => {
            commands::ticket::build(&services, ticket, output).await
        }
        Commands::Audit { log, history, json } => {
            if !commands::audit::audit(&services, log, history, json).await? {
                std::process::exit(2);
            }
            Ok(())
        }
        Commands::Feedback {
            agent_id,
            rating,
            comment,
        } => commands::feedback::submit(&services, agent_id, rating, comment).await,
        Commands::Contract { command } => {
            commands::contract::handle_command(&services, command).await
        }
        Commands::Agents { command } => commands::agents::handle_command(&services, command).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Log level from the config file, if one is found and parses.
fn configured_log_level(config_path: Option<&Path>) -> Option<String> {
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(FellowshipConfig::discover_config)?;
    FellowshipConfig::from_yaml_file(path)
        .ok()
        .map(|c| c.spec.observability.log_level)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
