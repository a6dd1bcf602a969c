// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use fellowship_core::domain::provenance::ProvenanceGraph;
use fellowship_core::infrastructure::signing::VerificationOutcome;

use crate::embedded::EmbeddedServices;

/// Re-verify a provenance log against the agent registry. Earlier logs in
/// `history` feed the double-billing check.
pub async fn audit(
    services: &EmbeddedServices,
    log: PathBuf,
    history: Vec<PathBuf>,
    json: bool,
) -> Result<bool> {
    let graph: ProvenanceGraph = super::read_json(&log)?;
    let history = history
        .iter()
        .map(super::read_json::<ProvenanceGraph>)
        .collect::<Result<Vec<_>>>()?;

    let report = services
        .auditor()
        .audit(&graph, &history)
        .await
        .context("Audit failed")?;
    if json {
        super::write_json(&report, None)?;
        return Ok(report.is_clean());
    }

    println!("{} {}", "Audit of ticket".bold(), report.ticket_id.bold());
    for hop in &report.hops {
        let status = match &hop.verification {
            VerificationOutcome::Valid => "valid".green(),
            VerificationOutcome::Invalid(_) => "INVALID".red().bold(),
            VerificationOutcome::Skipped(_) => "skipped".yellow(),
        };
        println!("  {:<9} {:<40} {}", status, hop.step_id, hop.timestamp.dimmed());
        if let VerificationOutcome::Invalid(reason) | VerificationOutcome::Skipped(reason) =
            &hop.verification
        {
            println!("            {}", reason.dimmed());
        }
        if !hop.contract_intact {
            println!("            {}", "contract hash mismatch".red());
        }
    }
    println!();
    println!(
        "valid: {}  invalid: {}  skipped: {}  total cost: {:.2}",
        report.valid, report.invalid, report.skipped, report.total_cost
    );
    for step in &report.duplicate_step_ids {
        println!("{} duplicate step {}", "⚠".yellow(), step);
    }
    for agent in &report.double_billed_agents {
        println!("{} agent {} billed this ticket more than once", "⚠".yellow(), agent);
    }
    for agent in &report.impersonation_suspects {
        println!("{} agent {} has hops that fail verification", "✗".red(), agent);
    }
    for agent in &report.unattributed_agents {
        println!("{} agent {} has no registered public key", "⚠".yellow(), agent);
    }
    if !report.edges_consistent {
        println!("{} edges do not match consecutive hops", "✗".red());
    }

    if report.is_clean() {
        println!("{}", "✓ Log verified".green());
    } else {
        println!("{}", "✗ Log has findings".red());
    }
    Ok(report.is_clean())
}
