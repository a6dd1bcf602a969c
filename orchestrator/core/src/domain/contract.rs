// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Data-Sharing Contracts
//!
//! A [`DataContract`] records which ticket fields a hop may exchange and under
//! which regulations. Privacy contracts are derived from a
//! `(customer_location, agent_location)` pair; receipt contracts record what
//! an agent was given for a ticket and why.
//!
//! ## Integrity Hash
//!
//! `integrity_hash` is the hex SHA-256 of the contract body (every field except
//! the hash itself) serialized as compact JSON with object keys in sorted
//! order. `serde_json::Value` keeps its map key-sorted, so routing the body
//! through it pins the encoding independent of struct field order.
//!
//! The issue time is an explicit input: identical inputs always produce an
//! identical hash.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::domain::regulation::{Regulation, RegulationResolver, UNREGULATED_FIELDS};

pub const DEFAULT_EXPIRY_HOURS: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Privacy,
    Receipt,
}

impl ContractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::Privacy => "privacy",
            ContractKind::Receipt => "receipt",
        }
    }
}

/// Parties named by a receipt contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParties {
    pub agent_id: String,
    pub ticket_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataContract {
    pub contract_id: String,
    pub kind: ContractKind,
    pub applicable_regulations: Vec<Regulation>,
    /// Never empty.
    pub permitted_fields: Vec<String>,
    /// Unix seconds.
    pub expiry: i64,
    pub policy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parties: Option<ContractParties>,
    #[serde(alias = "policy_hash")]
    pub hash: String,
}

impl DataContract {
    /// Recompute the hash over the current body.
    pub fn compute_hash(&self) -> String {
        let mut body = match serde_json::to_value(self) {
            Ok(value) => value,
            Err(_) => return String::new(),
        };
        if let Some(map) = body.as_object_mut() {
            map.remove("hash");
        }
        let canonical = body.to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// True when the stored hash matches the body.
    pub fn verify_integrity(&self) -> bool {
        !self.hash.is_empty() && self.hash == self.compute_hash()
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at.timestamp() >= self.expiry
    }

    fn seal(mut self) -> Self {
        self.hash = self.compute_hash();
        self
    }
}

#[derive(Debug, Clone)]
pub struct ContractFactory {
    expiry_hours: u32,
}

impl Default for ContractFactory {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_HOURS)
    }
}

impl ContractFactory {
    pub fn new(expiry_hours: u32) -> Self {
        Self { expiry_hours }
    }

    pub fn expiry_hours(&self) -> u32 {
        self.expiry_hours
    }

    fn expiry_from(&self, issued_at: DateTime<Utc>) -> i64 {
        (issued_at + Duration::hours(i64::from(self.expiry_hours))).timestamp()
    }

    /// Privacy contract for a hop between a customer and an agent.
    pub fn build_privacy(
        &self,
        customer_location: &str,
        agent_location: &str,
        issued_at: DateTime<Utc>,
    ) -> DataContract {
        self.build_privacy_constrained(customer_location, agent_location, &[], issued_at)
    }

    /// Privacy contract that also honours the ticket's data-residency
    /// constraints. Each constraint is resolved like a location and its
    /// regulations join those of the two parties.
    pub fn build_privacy_constrained(
        &self,
        customer_location: &str,
        agent_location: &str,
        data_constraints: &[String],
        issued_at: DateTime<Utc>,
    ) -> DataContract {
        let constraints: Vec<&str> = data_constraints
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        let regulations: BTreeSet<Regulation> = RegulationResolver::resolve(customer_location)
            .into_iter()
            .chain(RegulationResolver::resolve(agent_location))
            .chain(constraints.iter().flat_map(|c| RegulationResolver::resolve(c)))
            .collect();

        let mut fields = RegulationResolver::permitted_fields(&regulations);
        let mut policy = if regulations.is_empty() {
            fields = UNREGULATED_FIELDS.iter().map(|f| f.to_string()).collect();
            format!(
                "No data-protection regulation applies between {} and {}; standard field set permitted",
                customer_location, agent_location
            )
        } else {
            let codes: Vec<&str> = regulations.iter().map(Regulation::code).collect();
            format!(
                "Data sharing between {} and {} governed by {}",
                customer_location,
                agent_location,
                codes.join(", ")
            )
        };
        if !constraints.is_empty() {
            policy.push_str(&format!("; data residency: {}", constraints.join(", ")));
        }

        let expiry = self.expiry_from(issued_at);
        let expiry_str = expiry.to_string();
        let joined = constraints.join(",");
        let mut id_parts = vec![
            ContractKind::Privacy.as_str(),
            customer_location,
            agent_location,
            expiry_str.as_str(),
        ];
        if !constraints.is_empty() {
            id_parts.push(joined.as_str());
        }
        let contract_id = format!(
            "{}-{}",
            ContractKind::Privacy.as_str(),
            short_digest(&id_parts)
        );

        DataContract {
            contract_id,
            kind: ContractKind::Privacy,
            applicable_regulations: regulations.into_iter().collect(),
            permitted_fields: fields.into_iter().collect(),
            expiry,
            policy,
            parties: None,
            hash: String::new(),
        }
        .seal()
    }

    /// Receipt contract recording the data an agent received for a ticket.
    pub fn build_receipt(
        &self,
        agent_id: &str,
        ticket_id: &str,
        data_shared: &[String],
        purpose: &str,
        issued_at: DateTime<Utc>,
    ) -> DataContract {
        let mut fields: BTreeSet<String> = data_shared
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        if fields.is_empty() {
            fields = UNREGULATED_FIELDS.iter().map(|f| f.to_string()).collect();
        }

        DataContract {
            contract_id: format!("contract-{}-{}", prefix(agent_id, 4), prefix(ticket_id, 4)),
            kind: ContractKind::Receipt,
            applicable_regulations: Vec::new(),
            permitted_fields: fields.into_iter().collect(),
            expiry: self.expiry_from(issued_at),
            policy: purpose.to_string(),
            parties: Some(ContractParties {
                agent_id: agent_id.to_string(),
                ticket_id: ticket_id.to_string(),
            }),
            hash: String::new(),
        }
        .seal()
    }
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn short_digest(parts: &[&str]) -> String {
    let digest = Sha256::digest(parts.join("|").as_bytes());
    hex::encode(digest)[..12].to_string()
}
