// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::role::WorkflowRole;
use crate::domain::selection::SelectionBasis;

/// Events emitted while a ticket's provenance graph is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProvenanceEvent {
    BuildStarted {
        ticket_id: String,
        roles: Vec<WorkflowRole>,
        started_at: DateTime<Utc>,
    },
    PolicyRelaxed {
        ticket_id: String,
        role: WorkflowRole,
        basis: SelectionBasis,
        message: String,
        relaxed_at: DateTime<Utc>,
    },
    HopAppended {
        ticket_id: String,
        step_id: String,
        agent_id: String,
        role: WorkflowRole,
        appended_at: DateTime<Utc>,
    },
    GraphCompleted {
        ticket_id: String,
        node_count: usize,
        flag_count: usize,
        completed_at: DateTime<Utc>,
    },
    BuildFailed {
        ticket_id: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

/// Directory-side events from the feedback path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrustEvent {
    TrustUpdated {
        agent_id: AgentId,
        old_score: f64,
        new_score: f64,
        updated_at: DateTime<Utc>,
    },
    AgentRegistered {
        agent_id: AgentId,
        name: String,
        registered_at: DateTime<Utc>,
    },
}

/// Audit findings worth surfacing to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuditEvent {
    SignatureRejected {
        ticket_id: String,
        step_id: String,
        reason: String,
        detected_at: DateTime<Utc>,
    },
    DoubleBillingDetected {
        ticket_id: String,
        agent_id: String,
        detected_at: DateTime<Utc>,
    },
}
