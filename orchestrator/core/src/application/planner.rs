// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Unsigned plan preview: which agent would take each hop and what it costs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::agent::SelectedAgent;
use crate::domain::provenance::PolicyFlag;
use crate::domain::repository::{AgentDirectory, RepositoryError};
use crate::domain::role::{RoleExtractor, WorkflowRole};
use crate::domain::selection::{AgentSelector, SelectionBasis};
use crate::domain::ticket::{Ticket, TicketError};

/// Ordered hop roles for `ticket`, cut to `max_hops`. The flag records a cut.
pub(crate) fn hop_roles(ticket: &Ticket) -> (Vec<WorkflowRole>, Option<PolicyFlag>) {
    let mut roles = RoleExtractor::extract(ticket);
    let limit = ticket.max_hops as usize;
    if roles.len() <= limit {
        return (roles, None);
    }
    let flag = PolicyFlag::new(format!(
        "Role chain truncated from {} to {} roles by max_hops",
        roles.len(),
        limit
    ));
    roles.truncate(limit);
    (roles, Some(flag))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedHop {
    pub role: WorkflowRole,
    pub agent: SelectedAgent,
    pub basis: SelectionBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPreview {
    pub ticket_id: String,
    pub hops: Vec<PlannedHop>,
    pub total_cost: f64,
    pub policy_flags: Vec<PolicyFlag>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error("Agent directory unavailable: {0}")]
    Directory(#[from] RepositoryError),
}

pub struct Planner {
    directory: Arc<dyn AgentDirectory>,
    selector: AgentSelector,
}

impl Planner {
    pub fn new(directory: Arc<dyn AgentDirectory>, selector: AgentSelector) -> Self {
        Self { directory, selector }
    }

    /// Select an agent per role against one directory snapshot.
    pub async fn plan(&self, ticket: &Ticket) -> Result<PlanPreview, PlanError> {
        ticket.validate()?;
        let (roles, truncated) = hop_roles(ticket);
        let agents = self.directory.list_agents().await?;

        let mut policy_flags: Vec<PolicyFlag> = truncated.into_iter().collect();
        let mut hops = Vec::with_capacity(roles.len());
        for role in roles {
            let selection = self.selector.select(&agents, &role, ticket);
            debug!(role = %role, agent_id = %selection.agent.agent().id, "Planned hop");
            policy_flags.extend(selection.flag);
            hops.push(PlannedHop {
                role,
                agent: selection.agent,
                basis: selection.basis,
            });
        }

        let total_cost = hops.iter().map(|h| h.agent.agent().cost_per_task).sum();
        info!(
            ticket_id = %ticket.ticket_id,
            hops = hops.len(),
            total_cost,
            "Plan preview ready"
        );
        Ok(PlanPreview {
            ticket_id: ticket.ticket_id.clone(),
            hops,
            total_cost,
            policy_flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::tests::agent;
    use crate::domain::ticket::tests::ticket;
    use crate::infrastructure::repositories::InMemoryAgentDirectory;

    fn directory() -> Arc<dyn AgentDirectory> {
        Arc::new(
            InMemoryAgentDirectory::with_agents(vec![
                agent("diag", "India", &["diagnosis"], 20.0, 0.9),
                agent("ship", "India", &["logistics"], 15.0, 0.8),
                agent("fix", "India", &["repair"], 120.0, 0.95),
                agent("bill", "India", &["billing"], 5.0, 0.7),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_plan_sums_cost_over_selected_agents() {
        let planner = Planner::new(directory(), AgentSelector::default());
        let preview = planner.plan(&ticket("T-100", "India")).await.unwrap();

        let ids: Vec<&str> = preview.hops.iter().map(|h| h.agent.agent().id.as_str()).collect();
        assert_eq!(ids, vec!["diag", "ship", "fix", "bill"]);
        assert_eq!(preview.total_cost, 160.0);
        assert!(preview.policy_flags.is_empty());
    }

    #[tokio::test]
    async fn test_plan_truncates_to_max_hops() {
        let planner = Planner::new(directory(), AgentSelector::default());
        let mut t = ticket("T-101", "India");
        t.max_hops = 2;
        let preview = planner.plan(&t).await.unwrap();
        assert_eq!(preview.hops.len(), 2);
        assert!(preview.policy_flags[0].message.contains("truncated"));
    }

    #[tokio::test]
    async fn test_plan_rejects_malformed_ticket() {
        let planner = Planner::new(directory(), AgentSelector::default());
        let t = ticket("", "India");
        assert!(matches!(planner.plan(&t).await, Err(PlanError::Ticket(_))));
    }
}
