// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Agent Directory Records
//!
//! An [`Agent`] is a service provider listed in the agent directory: a
//! diagnosis bot, a courier, a repair shop or a billing service. Records are
//! owned by the directory; the planner only ever reads snapshots of them.
//!
//! [`SelectedAgent`] is what the selector hands back for a hop. It is either a
//! real directory record or the synthetic fallback used when the directory is
//! empty, so callers can tell the two apart without sniffing sentinel fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::domain::role::WorkflowRole;

/// Stable identifier of an agent within the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for newly registered agents.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One entry in an agent's append-only feedback history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

/// Directory record for a service agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default = "empty_agent_id")]
    pub id: AgentId,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub jurisdiction: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub cost_per_task: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Reputation in `[0, 1]`. Only the feedback path writes this.
    #[serde(default)]
    pub trust_score: f64,
    #[serde(default)]
    pub is_ai: bool,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feedback: Vec<FeedbackEntry>,
}

fn empty_agent_id() -> AgentId {
    AgentId(String::new())
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Agent {
    /// Case-insensitive match of a role tag against the advertised capabilities.
    pub fn has_capability(&self, role: &WorkflowRole) -> bool {
        let tag = role.as_str();
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(tag))
    }

    /// True when the agent operates in, or is located at, `location`.
    pub fn serves_location(&self, location: &str) -> bool {
        let wanted = location.trim().to_lowercase();
        if wanted.is_empty() {
            return false;
        }
        if self.jurisdiction.iter().any(|j| j.trim().to_lowercase() == wanted) {
            return true;
        }
        let own = self.location.to_lowercase();
        !own.is_empty() && (own.contains(&wanted) || wanted.contains(&own))
    }

    /// Wallet address derived from the public key: first 16 hex chars of its SHA-256.
    pub fn derive_wallet_address(public_key: &str) -> String {
        let digest = Sha256::digest(public_key.as_bytes());
        hex::encode(digest)[..16].to_string()
    }
}

/// The agent assigned to a hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "agent", rename_all = "snake_case")]
pub enum SelectedAgent {
    /// A record read from the directory snapshot.
    Directory(Agent),
    /// Fallback stand-in used when the directory has no agents at all.
    Synthetic(Agent),
}

pub const SYNTHETIC_AGENT_ID: &str = "synthetic-agent";
pub const SYNTHETIC_TRUST_SCORE: f64 = 0.8;

impl SelectedAgent {
    /// Sentinel agent able to fill `role`.
    pub fn synthetic(role: &WorkflowRole) -> Self {
        SelectedAgent::Synthetic(Agent {
            id: AgentId::new(SYNTHETIC_AGENT_ID),
            name: "Fallback Agent".to_string(),
            location: "Global".to_string(),
            jurisdiction: vec!["Global".to_string()],
            capabilities: vec![role.as_str().to_string()],
            skills: Vec::new(),
            cost_per_task: 0.0,
            currency: default_currency(),
            trust_score: SYNTHETIC_TRUST_SCORE,
            is_ai: true,
            wallet_address: "0x0".to_string(),
            public_key: "placeholder".to_string(),
            feedback: Vec::new(),
        })
    }

    pub fn agent(&self) -> &Agent {
        match self {
            SelectedAgent::Directory(agent) | SelectedAgent::Synthetic(agent) => agent,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, SelectedAgent::Synthetic(_))
    }
}
