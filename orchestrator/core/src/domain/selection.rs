// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Agent Selection
//!
//! [`AgentSelector`] picks one agent per role using an ordered list of
//! [`RelaxationLevel`]s. Each level is a predicate over a candidate; the first
//! level that admits at least one candidate wins and the highest trust score
//! among its matches is chosen (first in enumeration order on ties).
//!
//! | Level | Capability | Location | Budget | Trust |
//! |-------|------------|----------|--------|-------|
//! | `Strict` | ✔ | ✔ | ✔ | ✔ |
//! | `IgnoreTrust` | ✔ | ✔ | ✔ | |
//! | `IgnoreLocation` | ✔ | | ✔ | |
//! | `CapabilityOnly` | ✔ | | | |
//!
//! Selection never fails. When no level matches, the globally most trusted
//! agent is taken; when the directory is empty a synthetic agent stands in.
//! Every relaxation is reported as exactly one [`PolicyFlag`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::agent::{Agent, SelectedAgent};
use crate::domain::provenance::PolicyFlag;
use crate::domain::role::WorkflowRole;
use crate::domain::ticket::Ticket;

pub const DEFAULT_MIN_TRUST_SCORE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxationLevel {
    Strict,
    IgnoreTrust,
    IgnoreLocation,
    CapabilityOnly,
}

impl RelaxationLevel {
    pub const CASCADE: [RelaxationLevel; 4] = [
        RelaxationLevel::Strict,
        RelaxationLevel::IgnoreTrust,
        RelaxationLevel::IgnoreLocation,
        RelaxationLevel::CapabilityOnly,
    ];

    /// 1-based position in the cascade.
    pub fn number(&self) -> u8 {
        match self {
            RelaxationLevel::Strict => 1,
            RelaxationLevel::IgnoreTrust => 2,
            RelaxationLevel::IgnoreLocation => 3,
            RelaxationLevel::CapabilityOnly => 4,
        }
    }

    pub fn admits(&self, agent: &Agent, role: &WorkflowRole, ticket: &Ticket, min_trust: f64) -> bool {
        if !agent.has_capability(role) {
            return false;
        }
        let in_location = || agent.serves_location(&ticket.customer_location);
        let in_budget = || agent.cost_per_task <= ticket.max_budget;
        match self {
            RelaxationLevel::Strict => in_location() && in_budget() && agent.trust_score >= min_trust,
            RelaxationLevel::IgnoreTrust => in_location() && in_budget(),
            RelaxationLevel::IgnoreLocation => in_budget(),
            RelaxationLevel::CapabilityOnly => true,
        }
    }
}

impl fmt::Display for RelaxationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RelaxationLevel::Strict => "strict",
            RelaxationLevel::IgnoreTrust => "trust constraint dropped",
            RelaxationLevel::IgnoreLocation => "location constraint dropped",
            RelaxationLevel::CapabilityOnly => "capability match only",
        };
        write!(f, "level {} ({})", self.number(), label)
    }
}

/// How the selected agent was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "level", rename_all = "snake_case")]
pub enum SelectionBasis {
    Matched(RelaxationLevel),
    GlobalBestTrust,
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub agent: SelectedAgent,
    pub basis: SelectionBasis,
    pub flag: Option<PolicyFlag>,
}

#[derive(Debug, Clone)]
pub struct AgentSelector {
    min_trust_score: f64,
}

impl Default for AgentSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TRUST_SCORE)
    }
}

impl AgentSelector {
    pub fn new(min_trust_score: f64) -> Self {
        Self { min_trust_score }
    }

    pub fn select(&self, candidates: &[Agent], role: &WorkflowRole, ticket: &Ticket) -> Selection {
        if candidates.is_empty() {
            return Selection {
                agent: SelectedAgent::synthetic(role),
                basis: SelectionBasis::Synthetic,
                flag: Some(PolicyFlag::new(format!(
                    "No agent found for role '{}', using dummy agent",
                    role
                ))),
            };
        }

        for level in RelaxationLevel::CASCADE {
            let best = most_trusted(
                candidates
                    .iter()
                    .filter(|a| level.admits(a, role, ticket, self.min_trust_score)),
            );
            if let Some(agent) = best {
                let flag = (level != RelaxationLevel::Strict).then(|| {
                    PolicyFlag::new(format!(
                        "Relaxed matching for role '{}' to {}: selected agent {}",
                        role, level, agent.id
                    ))
                });
                return Selection {
                    agent: SelectedAgent::Directory(agent.clone()),
                    basis: SelectionBasis::Matched(level),
                    flag,
                };
            }
        }

        // Non-empty directory, so a most-trusted agent always exists.
        let fallback = most_trusted(candidates.iter()).unwrap_or(&candidates[0]);
        Selection {
            agent: SelectedAgent::Directory(fallback.clone()),
            basis: SelectionBasis::GlobalBestTrust,
            flag: Some(PolicyFlag::new(format!(
                "No matching agent for role '{}' at any relaxation level; fell back to most trusted agent {}",
                role, fallback.id
            ))),
        }
    }
}

/// Highest trust score; the earliest candidate wins ties.
fn most_trusted<'a, I>(agents: I) -> Option<&'a Agent>
where
    I: Iterator<Item = &'a Agent>,
{
    agents.fold(None, |best: Option<&Agent>, agent| match best {
        Some(b) if b.trust_score >= agent.trust_score => Some(b),
        _ => Some(agent),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::tests::agent;
    use crate::domain::ticket::tests::ticket;

    fn germany_ticket() -> Ticket {
        let mut t = ticket("T-1", "Germany");
        t.max_budget = 100.0;
        t
    }

    #[test]
    fn test_strict_match_picks_max_trust_without_flag() {
        let agents = vec![
            agent("a", "Germany", &["repair"], 50.0, 0.7),
            agent("b", "Germany", &["repair"], 60.0, 0.95),
            agent("c", "Germany", &["repair"], 70.0, 0.8),
        ];
        let s = AgentSelector::default().select(&agents, &WorkflowRole::Repair, &germany_ticket());
        assert_eq!(s.agent.agent().id.as_str(), "b");
        assert_eq!(s.basis, SelectionBasis::Matched(RelaxationLevel::Strict));
        assert!(s.flag.is_none());
    }

    #[test]
    fn test_ties_go_to_first_enumerated() {
        let agents = vec![
            agent("first", "Germany", &["repair"], 50.0, 0.9),
            agent("second", "Germany", &["repair"], 50.0, 0.9),
        ];
        let s = AgentSelector::default().select(&agents, &WorkflowRole::Repair, &germany_ticket());
        assert_eq!(s.agent.agent().id.as_str(), "first");
    }

    #[test]
    fn test_level_two_drops_trust() {
        let agents = vec![
            agent("low", "Germany", &["repair"], 50.0, 0.3),
            agent("far", "India", &["repair"], 50.0, 0.99),
        ];
        let s = AgentSelector::default().select(&agents, &WorkflowRole::Repair, &germany_ticket());
        assert_eq!(s.agent.agent().id.as_str(), "low");
        assert_eq!(s.basis, SelectionBasis::Matched(RelaxationLevel::IgnoreTrust));
        assert!(s.flag.unwrap().message.contains("level 2"));
    }

    #[test]
    fn test_level_three_drops_location() {
        let agents = vec![
            agent("far", "India", &["repair"], 50.0, 0.4),
            agent("pricey", "Germany", &["repair"], 500.0, 0.99),
        ];
        let s = AgentSelector::default().select(&agents, &WorkflowRole::Repair, &germany_ticket());
        assert_eq!(s.agent.agent().id.as_str(), "far");
        assert!(s.flag.unwrap().message.contains("level 3"));
    }

    #[test]
    fn test_level_four_capability_only() {
        let agents = vec![
            agent("pricey", "India", &["repair"], 500.0, 0.5),
            agent("other", "Germany", &["billing"], 10.0, 0.99),
        ];
        let s = AgentSelector::default().select(&agents, &WorkflowRole::Repair, &germany_ticket());
        assert_eq!(s.agent.agent().id.as_str(), "pricey");
        assert_eq!(s.basis, SelectionBasis::Matched(RelaxationLevel::CapabilityOnly));
        assert!(s.flag.unwrap().message.contains("level 4"));
    }

    #[test]
    fn test_no_capability_falls_back_to_global_best() {
        let agents = vec![
            agent("a", "Germany", &["billing"], 10.0, 0.5),
            agent("b", "India", &["logistics"], 10.0, 0.97),
        ];
        let s = AgentSelector::default().select(&agents, &WorkflowRole::Repair, &germany_ticket());
        assert_eq!(s.agent.agent().id.as_str(), "b");
        assert_eq!(s.basis, SelectionBasis::GlobalBestTrust);
        assert!(!s.agent.is_synthetic());
        assert!(s.flag.unwrap().message.contains("No matching agent"));
    }

    #[test]
    fn test_empty_directory_synthesizes_agent() {
        let s = AgentSelector::default().select(&[], &WorkflowRole::Billing, &germany_ticket());
        assert!(s.agent.is_synthetic());
        assert_eq!(s.basis, SelectionBasis::Synthetic);
        assert!(s.flag.unwrap().message.contains("using dummy agent"));
    }

    #[test]
    fn test_trust_threshold_is_inclusive() {
        let agents = vec![agent("edge", "Germany", &["repair"], 10.0, 0.6)];
        let s = AgentSelector::default().select(&agents, &WorkflowRole::Repair, &germany_ticket());
        assert_eq!(s.basis, SelectionBasis::Matched(RelaxationLevel::Strict));
    }
}
