// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use fellowship_core::domain::agent::Agent;
use fellowship_core::domain::repository::AgentDirectory;

use crate::embedded::EmbeddedServices;

#[derive(Subcommand)]
pub enum AgentsCommand {
    /// List agents in the registry
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register an agent from a JSON record
    Register {
        /// Path to the agent JSON record
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub async fn handle_command(services: &EmbeddedServices, command: AgentsCommand) -> Result<()> {
    match command {
        AgentsCommand::List { json } => list_agents(services, json).await,
        AgentsCommand::Register { file } => register_agent(services, file).await,
    }
}

async fn list_agents(services: &EmbeddedServices, json: bool) -> Result<()> {
    let agents = services.directory().list_agents().await?;
    if json {
        return super::write_json(&agents, None);
    }

    if agents.is_empty() {
        println!("{}", "No agents found".yellow());
        return Ok(());
    }

    println!("{} agents found:", agents.len());
    println!(
        "{:<38} {:<24} {:<18} {:<28} {:>6}",
        "ID", "NAME", "LOCATION", "CAPABILITIES", "TRUST"
    );
    for agent in agents {
        println!(
            "{:<38} {:<24} {:<18} {:<28} {:>6.3}",
            agent.id.to_string(),
            agent.name.bold(),
            agent.location,
            agent.capabilities.join(","),
            agent.trust_score
        );
    }
    Ok(())
}

async fn register_agent(services: &EmbeddedServices, file: PathBuf) -> Result<()> {
    let agent: Agent = super::read_json(&file)?;
    let registered = services
        .registration()
        .register(agent)
        .await
        .context("Registration rejected")?;
    services.persist_registry().await?;

    println!(
        "{}",
        format!("✓ Agent registered: {} ({})", registered.name, registered.id).green()
    );
    println!("  Wallet: {}", registered.wallet_address);
    Ok(())
}
