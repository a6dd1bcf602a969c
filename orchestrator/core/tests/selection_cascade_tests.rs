// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use fellowship_core::domain::agent::{Agent, AgentId};
use fellowship_core::domain::role::{RoleExtractor, WorkflowRole};
use fellowship_core::domain::selection::{AgentSelector, RelaxationLevel, SelectionBasis};
use fellowship_core::domain::ticket::Ticket;

fn agent(id: &str, location: &str, caps: &[&str], cost: f64, trust: f64) -> Agent {
    Agent {
        id: AgentId::new(id),
        name: id.to_string(),
        location: location.to_string(),
        jurisdiction: Vec::new(),
        capabilities: caps.iter().map(|c| c.to_string()).collect(),
        skills: Vec::new(),
        cost_per_task: cost,
        currency: "USD".to_string(),
        trust_score: trust,
        is_ai: false,
        wallet_address: String::new(),
        public_key: String::new(),
        feedback: Vec::new(),
    }
}

fn ticket(location: &str, budget: f64) -> Ticket {
    Ticket {
        ticket_id: "T-9".to_string(),
        customer_location: location.to_string(),
        issue_text: String::new(),
        max_budget: budget,
        max_days: 3,
        required_capabilities: Vec::new(),
        data_constraints: Vec::new(),
        max_hops: 4,
    }
}

fn relaxation_flags(flag: &Option<fellowship_core::domain::provenance::PolicyFlag>) -> usize {
    flag.iter().count()
}

#[test]
fn test_each_level_is_reached_in_order() {
    let selector = AgentSelector::default();
    let role = WorkflowRole::Repair;
    let t = ticket("Brazil", 100.0);

    let cases: Vec<(Vec<Agent>, SelectionBasis, &str)> = vec![
        (
            vec![agent("strict", "Brazil", &["repair"], 50.0, 0.9)],
            SelectionBasis::Matched(RelaxationLevel::Strict),
            "strict",
        ),
        (
            vec![agent("low-trust", "Brazil", &["repair"], 50.0, 0.3)],
            SelectionBasis::Matched(RelaxationLevel::IgnoreTrust),
            "low-trust",
        ),
        (
            vec![agent("abroad", "Spain", &["repair"], 50.0, 0.9)],
            SelectionBasis::Matched(RelaxationLevel::IgnoreLocation),
            "abroad",
        ),
        (
            vec![agent("pricey", "Spain", &["repair"], 500.0, 0.9)],
            SelectionBasis::Matched(RelaxationLevel::CapabilityOnly),
            "pricey",
        ),
        (
            vec![
                agent("courier", "Brazil", &["logistics"], 5.0, 0.4),
                agent("biller", "Brazil", &["billing"], 5.0, 0.6),
            ],
            SelectionBasis::GlobalBestTrust,
            "biller",
        ),
    ];

    for (agents, basis, expected) in cases {
        let selection = selector.select(&agents, &role, &t);
        assert_eq!(selection.basis, basis);
        assert_eq!(selection.agent.agent().id.as_str(), expected);
        let expected_flags = if basis == SelectionBasis::Matched(RelaxationLevel::Strict) { 0 } else { 1 };
        assert_eq!(relaxation_flags(&selection.flag), expected_flags);
    }
}

#[test]
fn test_first_level_with_candidates_wins_over_higher_trust_later() {
    let selector = AgentSelector::default();
    let agents = vec![
        agent("far-star", "Spain", &["repair"], 50.0, 0.99),
        agent("local", "Brazil", &["repair"], 50.0, 0.2),
    ];
    let selection = selector.select(&agents, &WorkflowRole::Repair, &ticket("Brazil", 100.0));
    assert_eq!(selection.agent.agent().id.as_str(), "local");
    assert!(selection.flag.unwrap().message.contains("level 2"));
}

#[test]
fn test_ties_go_to_enumeration_order() {
    let selector = AgentSelector::default();
    let agents = vec![
        agent("first", "Brazil", &["repair"], 50.0, 0.8),
        agent("second", "Brazil", &["repair"], 10.0, 0.8),
    ];
    let selection = selector.select(&agents, &WorkflowRole::Repair, &ticket("Brazil", 100.0));
    assert_eq!(selection.agent.agent().id.as_str(), "first");
}

#[test]
fn test_custom_roles_select_by_capability_tag() {
    let selector = AgentSelector::default();
    let agents = vec![agent("cal", "Brazil", &["Calibration"], 50.0, 0.8)];
    let role = WorkflowRole::from_tag("calibration");
    let selection = selector.select(&agents, &role, &ticket("Brazil", 100.0));
    assert_eq!(selection.basis, SelectionBasis::Matched(RelaxationLevel::Strict));
}

#[test]
fn test_single_keyword_ticket_expands_to_full_chain() {
    let mut t = ticket("Brazil", 100.0);
    t.issue_text = "my phone needs a repair".to_string();
    assert_eq!(RoleExtractor::extract(&t), WorkflowRole::CANONICAL_CHAIN.to_vec());

    t.issue_text = "repair the screen and invoice me".to_string();
    assert_eq!(
        RoleExtractor::extract(&t),
        vec![WorkflowRole::Repair, WorkflowRole::Billing]
    );
}
