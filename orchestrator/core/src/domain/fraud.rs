// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::provenance::ProvenanceGraph;
use crate::domain::role::WorkflowRole;

/// True when `agent_id` already billed `ticket_id` in any of `history`.
pub fn has_billed(agent_id: &str, ticket_id: &str, history: &[ProvenanceGraph]) -> bool {
    history
        .iter()
        .filter(|g| g.ticket_id == ticket_id)
        .flat_map(|g| g.nodes.iter())
        .any(|n| n.agent_id == agent_id && n.role == WorkflowRole::Billing)
}

/// Billing agents in `graph` that bill the ticket more than once, counting
/// both repeats within the graph and earlier graphs for the same ticket.
pub fn double_billed_agents(graph: &ProvenanceGraph, history: &[ProvenanceGraph]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut flagged: Vec<String> = Vec::new();
    for node in graph.nodes.iter().filter(|n| n.role == WorkflowRole::Billing) {
        let repeated = seen.contains(&node.agent_id.as_str())
            || has_billed(&node.agent_id, &graph.ticket_id, history);
        if repeated && !flagged.contains(&node.agent_id) {
            flagged.push(node.agent_id.clone());
        }
        seen.push(node.agent_id.as_str());
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::ContractFactory;
    use crate::domain::provenance::{step_id, ProvenanceNode};
    use chrono::Utc;

    fn node(ticket: &str, agent: &str, role: WorkflowRole) -> ProvenanceNode {
        ProvenanceNode {
            step_id: step_id(ticket, &role, agent),
            agent_id: agent.to_string(),
            agent_name: agent.to_string(),
            role,
            location: "India".to_string(),
            trust_score: 0.9,
            cost_per_task: 10.0,
            data_contract: ContractFactory::default().build_privacy("India", "India", Utc::now()),
            timestamp: String::new(),
            public_key: String::new(),
            signature: String::new(),
        }
    }

    fn graph(ticket: &str, nodes: Vec<ProvenanceNode>) -> ProvenanceGraph {
        ProvenanceGraph {
            ticket_id: ticket.to_string(),
            nodes,
            edges: Vec::new(),
            policy_flags: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_billing_against_prior_log() {
        let prior = graph("T-1", vec![node("T-1", "biller", WorkflowRole::Billing)]);
        assert!(has_billed("biller", "T-1", &[prior.clone()]));
        assert!(!has_billed("biller", "T-2", &[prior.clone()]));

        let current = graph("T-1", vec![node("T-1", "biller", WorkflowRole::Billing)]);
        assert_eq!(double_billed_agents(&current, &[prior]), vec!["biller".to_string()]);
    }

    #[test]
    fn test_billing_twice_within_one_graph() {
        let current = graph(
            "T-1",
            vec![
                node("T-1", "biller", WorkflowRole::Billing),
                node("T-1", "fixer", WorkflowRole::Repair),
                node("T-1", "biller", WorkflowRole::Billing),
            ],
        );
        assert_eq!(double_billed_agents(&current, &[]), vec!["biller".to_string()]);
    }

    #[test]
    fn test_non_billing_roles_are_ignored() {
        let prior = graph("T-1", vec![node("T-1", "fixer", WorkflowRole::Repair)]);
        let current = graph("T-1", vec![node("T-1", "fixer", WorkflowRole::Repair)]);
        assert!(double_billed_agents(&current, &[prior]).is_empty());
    }
}
