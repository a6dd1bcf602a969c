// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Data-sharing contract commands
//!
//! Commands: privacy, receipt, verify

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use fellowship_core::application::receipt::{Receipt, ReceiptService};
use fellowship_core::domain::agent::AgentId;
use fellowship_core::domain::contract::DataContract;
use fellowship_core::domain::repository::AgentDirectory;
use fellowship_core::infrastructure::signing::VerificationOutcome;

use crate::embedded::EmbeddedServices;

#[derive(Subcommand)]
pub enum ContractCommand {
    /// Privacy contract for a customer/agent location pair
    Privacy {
        #[arg(long)]
        customer_location: String,

        #[arg(long)]
        agent_location: String,
    },

    /// Signed task receipt with its receipt contract
    Receipt {
        #[arg(long)]
        agent_id: String,

        #[arg(long)]
        ticket_id: String,

        /// Task data the agent attests to
        #[arg(long)]
        data: String,

        /// Data field shared with the agent (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Check a contract's hash, or a receipt's hash and signature
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub async fn handle_command(services: &EmbeddedServices, command: ContractCommand) -> Result<()> {
    match command {
        ContractCommand::Privacy {
            customer_location,
            agent_location,
        } => {
            let contract =
                services
                    .contracts()
                    .build_privacy(&customer_location, &agent_location, Utc::now());
            super::write_json(&contract, None)
        }
        ContractCommand::Receipt {
            agent_id,
            ticket_id,
            data,
            fields,
        } => {
            let agent = services
                .directory()
                .find_by_id(&AgentId::new(agent_id.clone()))
                .await?
                .ok_or_else(|| anyhow!("Unknown agent '{}'", agent_id))?;
            let receipt = services
                .receipts()
                .issue(&agent, &ticket_id, &data, &fields)
                .context("Failed to sign receipt")?;
            super::write_json(&receipt, None)
        }
        ContractCommand::Verify { file } => verify(file),
    }
}

fn verify(file: PathBuf) -> Result<()> {
    let value: serde_json::Value = super::read_json(&file)?;
    let outcome = if value.get("signature").is_some() && value.get("contract").is_some() {
        let receipt: Receipt = serde_json::from_value(value).context("Not a receipt")?;
        ReceiptService::verify(&receipt)
    } else {
        let contract: DataContract = serde_json::from_value(value).context("Not a contract")?;
        if contract.verify_integrity() {
            VerificationOutcome::Valid
        } else {
            VerificationOutcome::Invalid("contract hash mismatch".to_string())
        }
    };

    match outcome {
        VerificationOutcome::Valid => println!("{}", "✓ Valid".green()),
        VerificationOutcome::Skipped(reason) => {
            println!("{}", format!("- Skipped: {}", reason).yellow())
        }
        VerificationOutcome::Invalid(reason) => {
            return Err(anyhow!("Verification failed: {}", reason));
        }
    }
    Ok(())
}
