// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;

use fellowship_core::domain::agent::AgentId;

use crate::embedded::EmbeddedServices;

pub async fn submit(
    services: &EmbeddedServices,
    agent_id: String,
    rating: f64,
    comment: String,
) -> Result<()> {
    let update = services
        .feedback()
        .submit(&AgentId::new(agent_id), rating, comment)
        .await
        .context("Feedback rejected")?;
    services.persist_registry().await?;

    println!(
        "{}",
        format!(
            "✓ Trust score for {}: {:.3} → {:.3}",
            update.agent_id, update.old_score, update.new_score
        )
        .green()
    );
    println!("{}", "Recent feedback:".bold());
    for entry in &update.recent_feedback {
        println!(
            "  {:.2}  {}  {}",
            entry.rating,
            entry.submitted_at.format("%Y-%m-%d %H:%M"),
            entry.comment
        );
    }
    Ok(())
}
