// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Workflow Roles
//!
//! A role is the job a hop performs. The four canonical roles form the default
//! repair chain; any other capability tag named on a ticket becomes a
//! [`WorkflowRole::Custom`] role and is matched against agent capabilities the
//! same way.
//!
//! [`RoleExtractor`] turns a ticket into the ordered role chain. Order matters:
//! it is the hop order of the resulting provenance graph.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::domain::ticket::Ticket;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkflowRole {
    Diagnosis,
    Logistics,
    Repair,
    Billing,
    Custom(String),
}

impl WorkflowRole {
    /// The full chain used when a ticket does not say enough about itself.
    pub const CANONICAL_CHAIN: [WorkflowRole; 4] = [
        WorkflowRole::Diagnosis,
        WorkflowRole::Logistics,
        WorkflowRole::Repair,
        WorkflowRole::Billing,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "diagnosis" => WorkflowRole::Diagnosis,
            "logistics" => WorkflowRole::Logistics,
            "repair" => WorkflowRole::Repair,
            "billing" => WorkflowRole::Billing,
            _ => WorkflowRole::Custom(tag.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WorkflowRole::Diagnosis => "diagnosis",
            WorkflowRole::Logistics => "logistics",
            WorkflowRole::Repair => "repair",
            WorkflowRole::Billing => "billing",
            WorkflowRole::Custom(tag) => tag,
        }
    }
}

impl fmt::Display for WorkflowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WorkflowRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WorkflowRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(WorkflowRole::from_tag(&tag))
    }
}

/// Keyword cues scanned for in free-text issue descriptions.
const ROLE_CUES: &[(&str, &[&str])] = &[
    ("diagnosis", &["diagnos", "inspect", "troubleshoot"]),
    ("logistics", &["logistic", "pickup", "ship", "deliver", "transport"]),
    ("repair", &["repair", "fix", "replace"]),
    ("billing", &["bill", "invoice", "payment", "pay "]),
];

pub struct RoleExtractor;

impl RoleExtractor {
    /// Ordered role chain for `ticket`.
    ///
    /// Explicit `required_capabilities` are used verbatim. Otherwise the issue
    /// text is scanned; zero or one recognized role expands to the full
    /// canonical chain.
    pub fn extract(ticket: &Ticket) -> Vec<WorkflowRole> {
        if !ticket.required_capabilities.is_empty() {
            return ticket
                .required_capabilities
                .iter()
                .map(|c| WorkflowRole::from_tag(c))
                .collect();
        }

        let scanned = Self::scan(&ticket.issue_text);
        if scanned.len() <= 1 {
            return WorkflowRole::CANONICAL_CHAIN.to_vec();
        }
        scanned
    }

    /// Roles cued by `text`, in order of first appearance, deduplicated.
    pub fn scan(text: &str) -> Vec<WorkflowRole> {
        let lowered = text.to_lowercase();
        let mut hits: Vec<(usize, WorkflowRole)> = ROLE_CUES
            .iter()
            .filter_map(|(tag, cues)| {
                cues.iter()
                    .filter_map(|cue| lowered.find(cue))
                    .min()
                    .map(|pos| (pos, WorkflowRole::from_tag(tag)))
            })
            .collect();
        hits.sort_by_key(|(pos, _)| *pos);
        hits.into_iter().map(|(_, role)| role).collect()
    }
}
