// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Domain Repository Interfaces
//!
//! Persistence contract for the agent directory. The interface lives in the
//! domain layer and is implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `AgentDirectory` | `Agent` | `InMemoryAgentDirectory` |
//!
//! The directory is injected into the builder and the feedback service rather
//! than held as process-wide state. Filtering by capability or jurisdiction is
//! not delegated to it: `list_agents` returns every record and selection
//! happens in [`crate::domain::selection::AgentSelector`].
//!
//! ## Concurrency
//!
//! `list_agents` returns a snapshot; later writes never show through it.
//! `update_trust` is a read-modify-write that implementations must apply
//! atomically per agent record so concurrent feedback for the same agent is
//! never lost.

use async_trait::async_trait;

use crate::domain::agent::{Agent, AgentId, FeedbackEntry};
use crate::domain::trust::TrustUpdate;

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Snapshot of every agent, in registration order.
    async fn list_agents(&self) -> Result<Vec<Agent>, RepositoryError>;

    /// Find agent by ID
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError>;

    /// Add a new agent. Assigns an id when the record has none.
    async fn register(&self, agent: Agent) -> Result<Agent, RepositoryError>;

    /// Apply one feedback entry to the agent's trust score.
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn update_trust(
        &self,
        id: &AgentId,
        feedback: FeedbackEntry,
    ) -> Result<TrustUpdate, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    Conflict(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Storage(err.to_string())
    }
}
