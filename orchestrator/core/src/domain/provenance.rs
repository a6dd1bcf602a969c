// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Provenance Graph
//!
//! The signed record of who performed which step of a ticket's workflow.
//! Nodes are hops in role-resolution order; edges link each consecutive pair.
//!
//! Signatures are base64 DER-encoded ECDSA P-256 / SHA-256 over the hop
//! message `agent_name|role|timestamp`. Public keys are hex compressed SEC1
//! points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::contract::DataContract;
use crate::domain::role::WorkflowRole;

/// Free-text record of a relaxation or anomaly observed during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyFlag {
    pub message: String,
}

impl PolicyFlag {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// `ticket_id|role|agent_id`
pub fn step_id(ticket_id: &str, role: &WorkflowRole, agent_id: &str) -> String {
    format!("{}|{}|{}", ticket_id, role, agent_id)
}

/// Canonical hop message covered by a node signature.
pub fn hop_message(agent_name: &str, role: &WorkflowRole, timestamp: &str) -> String {
    format!("{}|{}|{}", agent_name, role, timestamp)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceNode {
    pub step_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub role: WorkflowRole,
    pub location: String,
    pub trust_score: f64,
    pub cost_per_task: f64,
    pub data_contract: DataContract,
    /// RFC 3339 timestamp included in the signed message.
    pub timestamp: String,
    pub public_key: String,
    pub signature: String,
}

impl ProvenanceNode {
    pub fn signed_message(&self) -> String {
        hop_message(&self.agent_name, &self.role, &self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEdge {
    pub from_step_agent_id: String,
    pub to_step_agent_id: String,
    pub handoff_role: WorkflowRole,
    pub step_id: String,
    pub signature: String,
}

impl ProvenanceEdge {
    /// Handoff from `from` to `to`, attested by the receiving hop.
    pub fn link(from: &ProvenanceNode, to: &ProvenanceNode) -> Self {
        Self {
            from_step_agent_id: from.agent_id.clone(),
            to_step_agent_id: to.agent_id.clone(),
            handoff_role: to.role.clone(),
            step_id: to.step_id.clone(),
            signature: to.signature.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceGraph {
    pub ticket_id: String,
    pub nodes: Vec<ProvenanceNode>,
    pub edges: Vec<ProvenanceEdge>,
    pub policy_flags: Vec<PolicyFlag>,
    pub completed_at: DateTime<Utc>,
}

impl ProvenanceGraph {
    pub fn total_cost(&self) -> f64 {
        self.nodes.iter().map(|n| n.cost_per_task).sum()
    }

    /// Step ids that occur more than once, in first-repeat order.
    pub fn duplicate_step_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for node in &self.nodes {
            if !seen.insert(node.step_id.as_str()) && !duplicates.contains(&node.step_id) {
                duplicates.push(node.step_id.clone());
            }
        }
        duplicates
    }

    /// Edges are exactly the consecutive node pairs, in order.
    pub fn is_well_linked(&self) -> bool {
        if self.edges.len() + 1 != self.nodes.len() {
            return false;
        }
        self.nodes
            .windows(2)
            .zip(&self.edges)
            .all(|(pair, edge)| *edge == ProvenanceEdge::link(&pair[0], &pair[1]))
    }

    pub fn has_flag_containing(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.policy_flags
            .iter()
            .any(|f| f.message.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id_format() {
        assert_eq!(step_id("T-1", &WorkflowRole::Repair, "agent-7"), "T-1|repair|agent-7");
    }

    #[test]
    fn test_hop_message_format() {
        assert_eq!(
            hop_message("FixBot", &WorkflowRole::Diagnosis, "2024-06-01T10:10:00.000000Z"),
            "FixBot|diagnosis|2024-06-01T10:10:00.000000Z"
        );
    }

    #[test]
    fn test_policy_flag_serializes_as_string() {
        let json = serde_json::to_string(&PolicyFlag::new("duplicate step")).unwrap();
        assert_eq!(json, "\"duplicate step\"");
    }
}
