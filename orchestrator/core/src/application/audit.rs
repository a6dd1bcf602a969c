// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Independent re-verification of a previously built provenance log.
//!
//! Findings never fail an audit: each hop gets a [`VerificationOutcome`] and
//! the report collects them. Only an unreachable directory is an error.
//!
//! Hops are anchored to the directory. A directory agent's hop must carry
//! the public key registered for that agent and a step id derived from the
//! log's ticket, the hop's role and the agent id. Hops failing either check,
//! or whose signature does not verify, make their agent an impersonation
//! suspect. Hops of agents with no registered key are skipped and reported
//! as unattributed; only the synthetic fallback agent may be skipped without
//! a finding.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::agent::{Agent, SYNTHETIC_AGENT_ID};
use crate::domain::events::AuditEvent;
use crate::domain::fraud;
use crate::domain::provenance::{step_id, ProvenanceGraph, ProvenanceNode};
use crate::domain::repository::{AgentDirectory, RepositoryError};
use crate::domain::role::WorkflowRole;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::signing::{
    is_placeholder_key, same_public_key, SignatureCodec, VerificationOutcome,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopAudit {
    pub step_id: String,
    pub agent_id: String,
    pub role: WorkflowRole,
    pub timestamp: String,
    pub signature: String,
    pub verification: VerificationOutcome,
    pub contract_intact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub ticket_id: String,
    pub hops: Vec<HopAudit>,
    pub valid: usize,
    pub invalid: usize,
    pub skipped: usize,
    pub duplicate_step_ids: Vec<String>,
    pub double_billed_agents: Vec<String>,
    pub impersonation_suspects: Vec<String>,
    /// Directory agents whose hops could not be tied to a registered key.
    #[serde(default)]
    pub unattributed_agents: Vec<String>,
    pub edges_consistent: bool,
    pub total_cost: f64,
}

impl AuditReport {
    /// No invalid or unattributed hops, tampered contracts, duplicates or
    /// fraud findings.
    pub fn is_clean(&self) -> bool {
        self.invalid == 0
            && self.unattributed_agents.is_empty()
            && self.hops.iter().all(|h| h.contract_intact)
            && self.duplicate_step_ids.is_empty()
            && self.double_billed_agents.is_empty()
            && self.edges_consistent
    }
}

/// Signature check against the key carried on the node itself. Proves the
/// node was not altered after signing, not who signed it.
pub fn verify_node(node: &ProvenanceNode) -> VerificationOutcome {
    SignatureCodec::check(&node.public_key, &node.signed_message(), &node.signature)
}

/// Full check of one hop of `ticket_id`'s log against the directory record
/// of the agent it names.
pub fn verify_hop(
    ticket_id: &str,
    node: &ProvenanceNode,
    registered: Option<&Agent>,
) -> VerificationOutcome {
    if node.step_id != step_id(ticket_id, &node.role, &node.agent_id) {
        return VerificationOutcome::Invalid(format!(
            "step id '{}' does not match ticket, role and agent",
            node.step_id
        ));
    }
    if node.agent_id == SYNTHETIC_AGENT_ID {
        return verify_node(node);
    }

    let agent = match registered {
        Some(agent) => agent,
        None => {
            return VerificationOutcome::Invalid(format!(
                "agent '{}' is not in the directory",
                node.agent_id
            ))
        }
    };
    if is_placeholder_key(&agent.public_key) {
        return match verify_node(node) {
            VerificationOutcome::Invalid(reason) => VerificationOutcome::Invalid(reason),
            _ => VerificationOutcome::Skipped(format!(
                "agent '{}' has no registered public key",
                node.agent_id
            )),
        };
    }
    if !same_public_key(&node.public_key, &agent.public_key) {
        return VerificationOutcome::Invalid(format!(
            "public key does not match the key registered for agent '{}'",
            node.agent_id
        ));
    }
    verify_node(node)
}

fn note(agents: &mut Vec<String>, agent_id: &str) {
    if !agents.iter().any(|a| a == agent_id) {
        agents.push(agent_id.to_string());
    }
}

pub struct AuditService {
    directory: Arc<dyn AgentDirectory>,
    event_bus: Arc<EventBus>,
}

impl AuditService {
    pub fn new(directory: Arc<dyn AgentDirectory>, event_bus: Arc<EventBus>) -> Self {
        Self {
            directory,
            event_bus,
        }
    }

    /// Audit `graph` against the directory and against earlier logs in
    /// `history` (for double billing).
    pub async fn audit(
        &self,
        graph: &ProvenanceGraph,
        history: &[ProvenanceGraph],
    ) -> Result<AuditReport, RepositoryError> {
        let agents: HashMap<String, Agent> = self
            .directory
            .list_agents()
            .await?
            .into_iter()
            .map(|agent| (agent.id.to_string(), agent))
            .collect();

        let mut hops = Vec::with_capacity(graph.nodes.len());
        let mut impersonation_suspects: Vec<String> = Vec::new();
        let mut unattributed_agents: Vec<String> = Vec::new();
        let (mut valid, mut invalid, mut skipped) = (0, 0, 0);

        for node in &graph.nodes {
            let verification = verify_hop(&graph.ticket_id, node, agents.get(&node.agent_id));
            match &verification {
                VerificationOutcome::Valid => valid += 1,
                VerificationOutcome::Skipped(reason) => {
                    skipped += 1;
                    if node.agent_id != SYNTHETIC_AGENT_ID {
                        warn!(step_id = %node.step_id, reason = %reason, "Hop not attributable");
                        note(&mut unattributed_agents, &node.agent_id);
                    }
                }
                VerificationOutcome::Invalid(reason) => {
                    invalid += 1;
                    warn!(step_id = %node.step_id, reason = %reason, "Hop signature rejected");
                    self.event_bus.publish_audit_event(AuditEvent::SignatureRejected {
                        ticket_id: graph.ticket_id.clone(),
                        step_id: node.step_id.clone(),
                        reason: reason.clone(),
                        detected_at: Utc::now(),
                    });
                    note(&mut impersonation_suspects, &node.agent_id);
                }
            }

            let contract_intact = node.data_contract.verify_integrity();
            if !contract_intact {
                warn!(step_id = %node.step_id, "Contract hash mismatch");
            }

            hops.push(HopAudit {
                step_id: node.step_id.clone(),
                agent_id: node.agent_id.clone(),
                role: node.role.clone(),
                timestamp: node.timestamp.clone(),
                signature: node.signature.clone(),
                verification,
                contract_intact,
            });
        }

        let double_billed_agents = fraud::double_billed_agents(graph, history);
        for agent_id in &double_billed_agents {
            warn!(agent_id = %agent_id, ticket_id = %graph.ticket_id, "Double billing detected");
            self.event_bus.publish_audit_event(AuditEvent::DoubleBillingDetected {
                ticket_id: graph.ticket_id.clone(),
                agent_id: agent_id.clone(),
                detected_at: Utc::now(),
            });
        }

        let report = AuditReport {
            ticket_id: graph.ticket_id.clone(),
            hops,
            valid,
            invalid,
            skipped,
            duplicate_step_ids: graph.duplicate_step_ids(),
            double_billed_agents,
            impersonation_suspects,
            unattributed_agents,
            edges_consistent: graph.is_well_linked(),
            total_cost: graph.total_cost(),
        };
        info!(
            ticket_id = %report.ticket_id,
            valid = report.valid,
            invalid = report.invalid,
            skipped = report.skipped,
            "Audit complete"
        );
        Ok(report)
    }
}
