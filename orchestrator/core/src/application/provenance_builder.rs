// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Provenance Graph Builder
//!
//! Turns a ticket into a signed [`ProvenanceGraph`]. Each hop moves through
//! the same states in order:
//!
//! ```text
//! role-resolved -> agent-selected -> contract-built -> step-id-assigned -> signed -> appended
//! ```
//!
//! and the ticket as a whole ends in `graph-complete`. Selection cannot fail
//! (the cascade always yields an agent), so the only hop-level failure is
//! signing, which aborts the build. A build either returns a complete graph
//! or a [`BuildError`]; partial graphs are never returned.
//!
//! The directory is read once per hop, at the start of the hop. Hops never
//! see each other's snapshots.
//!
//! Synthetic fallback hops carry the placeholder public key and no
//! signature; audit reports them as skipped rather than valid. Directory
//! agents sign with the key registered for them; a provider key that does
//! not match the registered one aborts the build.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::application::planner::hop_roles;
use crate::domain::contract::ContractFactory;
use crate::domain::events::ProvenanceEvent;
use crate::domain::provenance::{
    hop_message, step_id, PolicyFlag, ProvenanceEdge, ProvenanceGraph, ProvenanceNode,
};
use crate::domain::repository::{AgentDirectory, RepositoryError};
use crate::domain::role::WorkflowRole;
use crate::domain::selection::{AgentSelector, Selection};
use crate::domain::ticket::{Ticket, TicketError};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::signing::{is_placeholder_key, KeyPairProvider, SigningError};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error("Failed to sign hop '{step_id}': {source}")]
    Signing {
        step_id: String,
        #[source]
        source: SigningError,
    },

    #[error("Agent directory unavailable: {0}")]
    Directory(#[from] RepositoryError),
}

pub struct ProvenanceGraphBuilder {
    directory: Arc<dyn AgentDirectory>,
    selector: AgentSelector,
    contracts: ContractFactory,
    keys: Arc<dyn KeyPairProvider>,
    event_bus: Arc<EventBus>,
}

impl ProvenanceGraphBuilder {
    pub fn new(
        directory: Arc<dyn AgentDirectory>,
        selector: AgentSelector,
        contracts: ContractFactory,
        keys: Arc<dyn KeyPairProvider>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            directory,
            selector,
            contracts,
            keys,
            event_bus,
        }
    }

    pub async fn build(&self, ticket: &Ticket) -> Result<ProvenanceGraph, BuildError> {
        let span = info_span!("provenance_build", ticket_id = %ticket.ticket_id);
        let result = self.build_graph(ticket).instrument(span).await;
        if let Err(e) = &result {
            warn!(ticket_id = %ticket.ticket_id, error = %e, "Provenance build failed");
            self.event_bus
                .publish_provenance_event(ProvenanceEvent::BuildFailed {
                    ticket_id: ticket.ticket_id.clone(),
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                });
        }
        result
    }

    async fn build_graph(&self, ticket: &Ticket) -> Result<ProvenanceGraph, BuildError> {
        ticket.validate()?;

        let (roles, truncated) = hop_roles(ticket);
        info!(roles = roles.len(), "Starting provenance build");
        self.event_bus
            .publish_provenance_event(ProvenanceEvent::BuildStarted {
                ticket_id: ticket.ticket_id.clone(),
                roles: roles.clone(),
                started_at: Utc::now(),
            });

        let mut policy_flags: Vec<PolicyFlag> = truncated.into_iter().collect();
        let mut nodes: Vec<ProvenanceNode> = Vec::with_capacity(roles.len());
        let mut seen_steps: HashSet<String> = HashSet::new();

        for role in roles {
            let agents = self.directory.list_agents().await?;
            let selection = self.selector.select(&agents, &role, ticket);
            debug!(role = %role, agent_id = %selection.agent.agent().id, "Agent selected");

            if let Some(flag) = &selection.flag {
                self.record_relaxation(ticket, &role, &selection, flag);
                policy_flags.push(flag.clone());
            }

            let node = self.sign_hop(ticket, role, &selection, Utc::now())?;

            if !seen_steps.insert(node.step_id.clone()) {
                warn!(step_id = %node.step_id, "Duplicate step id");
                policy_flags.push(PolicyFlag::new(format!(
                    "Possible duplicate step or double billing: step id '{}' already present",
                    node.step_id
                )));
            }

            debug!(step_id = %node.step_id, "Hop appended");
            self.event_bus
                .publish_provenance_event(ProvenanceEvent::HopAppended {
                    ticket_id: ticket.ticket_id.clone(),
                    step_id: node.step_id.clone(),
                    agent_id: node.agent_id.clone(),
                    role: node.role.clone(),
                    appended_at: Utc::now(),
                });
            nodes.push(node);
        }

        let edges = nodes
            .windows(2)
            .map(|pair| ProvenanceEdge::link(&pair[0], &pair[1]))
            .collect();

        let graph = ProvenanceGraph {
            ticket_id: ticket.ticket_id.clone(),
            nodes,
            edges,
            policy_flags,
            completed_at: Utc::now(),
        };

        info!(
            nodes = graph.nodes.len(),
            flags = graph.policy_flags.len(),
            total_cost = graph.total_cost(),
            "Provenance graph complete"
        );
        self.event_bus
            .publish_provenance_event(ProvenanceEvent::GraphCompleted {
                ticket_id: graph.ticket_id.clone(),
                node_count: graph.nodes.len(),
                flag_count: graph.policy_flags.len(),
                completed_at: graph.completed_at,
            });
        Ok(graph)
    }

    fn record_relaxation(
        &self,
        ticket: &Ticket,
        role: &WorkflowRole,
        selection: &Selection,
        flag: &PolicyFlag,
    ) {
        warn!(role = %role, "{}", flag.message);
        self.event_bus
            .publish_provenance_event(ProvenanceEvent::PolicyRelaxed {
                ticket_id: ticket.ticket_id.clone(),
                role: role.clone(),
                basis: selection.basis,
                message: flag.message.clone(),
                relaxed_at: Utc::now(),
            });
    }

    /// Contract, step id and signature for one selected hop.
    fn sign_hop(
        &self,
        ticket: &Ticket,
        role: WorkflowRole,
        selection: &Selection,
        at: DateTime<Utc>,
    ) -> Result<ProvenanceNode, BuildError> {
        let agent = selection.agent.agent();
        let data_contract = self.contracts.build_privacy_constrained(
            &ticket.customer_location,
            &agent.location,
            &ticket.data_constraints,
            at,
        );
        let step_id = step_id(&ticket.ticket_id, &role, agent.id.as_str());
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Micros, true);

        let (public_key, signature) = if selection.agent.is_synthetic() {
            (agent.public_key.clone(), String::new())
        } else {
            let message = hop_message(&agent.name, &role, &timestamp);
            if is_placeholder_key(&agent.public_key) {
                warn!(agent_id = %agent.id, "Agent has no registered public key; hop is not attributable");
            }
            let key = self
                .keys
                .key_for_agent(agent)
                .map_err(|source| BuildError::Signing {
                    step_id: step_id.clone(),
                    source,
                })?;
            let signature = key
                .sign(message.as_bytes())
                .map_err(|source| BuildError::Signing {
                    step_id: step_id.clone(),
                    source,
                })?;
            (key.public_key().to_string(), signature)
        };

        Ok(ProvenanceNode {
            step_id,
            agent_id: agent.id.to_string(),
            agent_name: agent.name.clone(),
            role,
            location: agent.location.clone(),
            trust_score: agent.trust_score,
            cost_per_task: agent.cost_per_task,
            data_contract,
            timestamp,
            public_key,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::tests::agent;
    use crate::domain::ticket::tests::ticket;
    use crate::infrastructure::repositories::InMemoryAgentDirectory;
    use crate::infrastructure::signing::{
        EphemeralKeyProvider, SessionKey, SignatureCodec, StaticKeyProvider,
    };
    use crate::infrastructure::DomainEvent;
    use std::collections::BTreeMap;

    fn builder_with(
        directory: InMemoryAgentDirectory,
        keys: Arc<dyn KeyPairProvider>,
    ) -> (ProvenanceGraphBuilder, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(64));
        let builder = ProvenanceGraphBuilder::new(
            Arc::new(directory),
            AgentSelector::default(),
            ContractFactory::default(),
            keys,
            bus.clone(),
        );
        (builder, bus)
    }

    fn full_directory() -> InMemoryAgentDirectory {
        InMemoryAgentDirectory::with_agents(vec![
            agent("diag", "Germany", &["diagnosis"], 20.0, 0.9),
            agent("ship", "Germany", &["logistics"], 15.0, 0.8),
            agent("fix", "Germany", &["repair"], 120.0, 0.95),
            agent("bill", "Germany", &["billing"], 5.0, 0.7),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_produces_signed_linked_graph() {
        let (builder, _) = builder_with(full_directory(), Arc::new(EphemeralKeyProvider::new()));
        let graph = builder.build(&ticket("T-200", "Germany")).await.unwrap();

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 3);
        assert!(graph.is_well_linked());
        assert!(graph.policy_flags.is_empty());
        assert_eq!(graph.nodes[2].step_id, "T-200|repair|fix");

        for node in &graph.nodes {
            assert!(!node.data_contract.permitted_fields.is_empty());
            assert!(node.timestamp.ends_with('Z'));
            assert!(SignatureCodec::check(&node.public_key, &node.signed_message(), &node.signature)
                .is_valid());
        }
    }

    #[tokio::test]
    async fn test_registered_key_mismatch_aborts_build() {
        let mut fix = agent("fix", "Germany", &["repair"], 120.0, 0.95);
        fix.public_key = SessionKey::generate().public_key().to_string();
        let directory = InMemoryAgentDirectory::with_agents(vec![fix]).unwrap();
        let (builder, _) = builder_with(directory, Arc::new(EphemeralKeyProvider::new()));
        let mut t = ticket("T-206", "Germany");
        t.required_capabilities = vec!["repair".into()];

        let result = builder.build(&t).await;
        assert!(matches!(
            result,
            Err(BuildError::Signing {
                source: SigningError::KeyMismatch { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_data_constraints_reach_contracts() {
        let (builder, _) = builder_with(full_directory(), Arc::new(EphemeralKeyProvider::new()));
        let mut t = ticket("T-207", "Germany");
        t.required_capabilities = vec!["repair".into()];
        t.data_constraints = vec!["India".into()];

        let graph = builder.build(&t).await.unwrap();
        let regulations = &graph.nodes[0].data_contract.applicable_regulations;
        assert_eq!(regulations.len(), 2);
        assert!(graph.nodes[0].data_contract.policy.contains("data residency: India"));
    }

    #[tokio::test]
    async fn test_duplicate_steps_are_flagged_and_kept() {
        let (builder, _) = builder_with(full_directory(), Arc::new(EphemeralKeyProvider::new()));
        let mut t = ticket("T-201", "Germany");
        t.required_capabilities = vec!["repair".into(), "repair".into()];

        let graph = builder.build(&t).await.unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].step_id, graph.nodes[1].step_id);
        assert!(graph.has_flag_containing("duplicate"));
    }

    #[tokio::test]
    async fn test_empty_directory_uses_synthetic_agents() {
        let (builder, _) = builder_with(InMemoryAgentDirectory::new(), Arc::new(EphemeralKeyProvider::new()));
        let graph = builder.build(&ticket("T-202", "India")).await.unwrap();

        assert_eq!(graph.nodes.len(), 4);
        assert!(graph.nodes.iter().all(|n| n.agent_id == "synthetic-agent"));
        assert_eq!(graph.policy_flags.len(), 4);
        assert!(graph.has_flag_containing("dummy agent"));
        assert!(graph.nodes.iter().all(|n| n.signature.is_empty()));
    }

    #[tokio::test]
    async fn test_signing_failure_aborts_build() {
        let keys = Arc::new(StaticKeyProvider::new(BTreeMap::new()));
        let (builder, bus) = builder_with(full_directory(), keys);
        let mut events = bus.subscribe();

        let result = builder.build(&ticket("T-203", "Germany")).await;
        assert!(matches!(result, Err(BuildError::Signing { .. })));

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::Provenance(ProvenanceEvent::BuildFailed { .. }) = event {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_malformed_ticket_fails_before_any_hop() {
        let (builder, bus) = builder_with(full_directory(), Arc::new(EphemeralKeyProvider::new()));
        let mut events = bus.subscribe();
        let result = builder.build(&ticket("T-204", "")).await;
        assert!(matches!(result, Err(BuildError::Ticket(_))));

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(
                event,
                DomainEvent::Provenance(ProvenanceEvent::HopAppended { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_relaxation_publishes_policy_event() {
        let directory = InMemoryAgentDirectory::with_agents(vec![agent(
            "fix",
            "Brazil",
            &["repair"],
            120.0,
            0.95,
        )])
        .unwrap();
        let (builder, bus) = builder_with(directory, Arc::new(EphemeralKeyProvider::new()));
        let mut events = bus.subscribe();
        let mut t = ticket("T-205", "Germany");
        t.required_capabilities = vec!["repair".into()];

        let graph = builder.build(&t).await.unwrap();
        assert_eq!(graph.policy_flags.len(), 1);
        assert!(graph.policy_flags[0].message.contains("level 3"));

        let mut relaxed = 0;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::Provenance(ProvenanceEvent::PolicyRelaxed { .. }) = event {
                relaxed += 1;
            }
        }
        assert_eq!(relaxed, 1);
    }
}
