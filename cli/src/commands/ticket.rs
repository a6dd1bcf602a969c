// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Ticket commands: plan (unsigned preview) and build (signed provenance log)

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use fellowship_core::domain::ticket::Ticket;

use crate::embedded::EmbeddedServices;

pub fn read_ticket(path: &Path) -> Result<Ticket> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read ticket {:?}", path))?;
    Ticket::from_json(&content).with_context(|| format!("Invalid ticket {:?}", path))
}

pub async fn plan(services: &EmbeddedServices, ticket: PathBuf, json: bool) -> Result<()> {
    let ticket = read_ticket(&ticket)?;
    let preview = services
        .planner()
        .plan(&ticket)
        .await
        .context("Planning failed")?;

    if json {
        return super::write_json(&preview, None);
    }

    println!("{} {}", "Plan for ticket".bold(), preview.ticket_id.bold());
    println!("{:<12} {:<38} {:<24} {:>10}", "ROLE", "AGENT ID", "NAME", "COST");
    for hop in &preview.hops {
        let agent = hop.agent.agent();
        let name = if hop.agent.is_synthetic() {
            agent.name.yellow().to_string()
        } else {
            agent.name.clone()
        };
        println!(
            "{:<12} {:<38} {:<24} {:>10.2}",
            hop.role.to_string(),
            agent.id.to_string(),
            name,
            agent.cost_per_task
        );
    }
    println!("{:>87.2}", preview.total_cost);
    print_flags(preview.policy_flags.iter().map(|f| f.message.as_str()));
    Ok(())
}

pub async fn build(
    services: &EmbeddedServices,
    ticket: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let ticket = read_ticket(&ticket)?;
    let graph = services
        .builder()
        .build(&ticket)
        .await
        .context("Provenance build failed")?;

    super::write_json(&graph, output.as_deref())?;
    if let Some(path) = &output {
        println!(
            "{}",
            format!(
                "✓ Provenance log for {} written to {} ({} hops)",
                graph.ticket_id,
                path.display(),
                graph.nodes.len()
            )
            .green()
        );
        print_flags(graph.policy_flags.iter().map(|f| f.message.as_str()));
    }
    Ok(())
}

pub(crate) fn print_flags<'a>(flags: impl Iterator<Item = &'a str>) {
    let flags: Vec<&str> = flags.collect();
    if flags.is_empty() {
        return;
    }
    println!();
    println!("{}", "Policy flags:".yellow().bold());
    for flag in flags {
        println!("  ⚠ {}", flag);
    }
}
