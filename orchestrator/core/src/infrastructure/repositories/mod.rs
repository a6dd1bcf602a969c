// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the directory abstraction defined in
//! `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! - **InMemoryAgentDirectory** - registration-ordered, per-record locking.
//!   Seeded from the JSON registry file by
//!   [`crate::infrastructure::registry_loader`].
//!
//! # Locking
//!
//! The outer `RwLock` guards membership (the id index and registration
//! order) and is only write-locked by `register`. Each record sits behind its
//! own `Mutex`, so trust updates for different agents never contend and
//! updates for the same agent serialize. No lock is held across an await.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::agent::{Agent, AgentId, FeedbackEntry};
use crate::domain::repository::{AgentDirectory, RepositoryError};
use crate::domain::trust::{ema_trust, TrustUpdate, RECENT_FEEDBACK_LIMIT};

#[derive(Default)]
struct DirectoryState {
    order: Vec<AgentId>,
    records: HashMap<AgentId, Arc<Mutex<Agent>>>,
}

impl DirectoryState {
    fn insert(&mut self, mut agent: Agent) -> Result<Agent, RepositoryError> {
        if agent.id.is_empty() {
            agent.id = AgentId::generate();
        }
        // Step ids are pipe-joined; a pipe in an agent id makes them ambiguous.
        if agent.id.as_str().contains('|') {
            return Err(RepositoryError::Invalid(format!(
                "agent id '{}' must not contain '|'",
                agent.id
            )));
        }
        if self.records.contains_key(&agent.id) {
            return Err(RepositoryError::Conflict(format!("agent '{}'", agent.id)));
        }
        self.order.push(agent.id.clone());
        self.records
            .insert(agent.id.clone(), Arc::new(Mutex::new(agent.clone())));
        Ok(agent)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAgentDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the directory with existing records, as read from a registry
    /// file. Unlike [`AgentDirectory::register`], seeded records may carry
    /// placeholder or missing keys; ids are still assigned and must be unique.
    pub fn with_agents(agents: Vec<Agent>) -> Result<Self, RepositoryError> {
        let mut state = DirectoryState::default();
        for agent in agents {
            state.insert(agent)?;
        }
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: &AgentId) -> Option<Arc<Mutex<Agent>>> {
        self.state.read().records.get(id).cloned()
    }
}

#[async_trait]
impl AgentDirectory for InMemoryAgentDirectory {
    async fn list_agents(&self) -> Result<Vec<Agent>, RepositoryError> {
        let state = self.state.read();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .map(|record| record.lock().clone())
            .collect())
    }

    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.record(id).map(|record| record.lock().clone()))
    }

    async fn register(&self, mut agent: Agent) -> Result<Agent, RepositoryError> {
        if agent.public_key.trim().is_empty() {
            return Err(RepositoryError::Invalid(
                "public_key is required for agent identity".to_string(),
            ));
        }
        if agent.name.trim().is_empty() {
            return Err(RepositoryError::Invalid("name must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&agent.trust_score) {
            return Err(RepositoryError::Invalid(format!(
                "trust_score must be in [0, 1], got {}",
                agent.trust_score
            )));
        }
        if agent.wallet_address.trim().is_empty() {
            agent.wallet_address = Agent::derive_wallet_address(&agent.public_key);
        }
        let registered = self.state.write().insert(agent)?;
        debug!(agent_id = %registered.id, "Registered agent");
        Ok(registered)
    }

    async fn update_trust(
        &self,
        id: &AgentId,
        feedback: FeedbackEntry,
    ) -> Result<TrustUpdate, RepositoryError> {
        let record = self
            .record(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("agent '{}'", id)))?;

        let mut agent = record.lock();
        let old_score = agent.trust_score;
        let new_score = ema_trust(old_score, feedback.rating);
        agent.trust_score = new_score;
        agent.feedback.push(feedback);

        let skip = agent.feedback.len().saturating_sub(RECENT_FEEDBACK_LIMIT);
        Ok(TrustUpdate {
            agent_id: agent.id.clone(),
            old_score,
            new_score,
            recent_feedback: agent.feedback[skip..].to_vec(),
        })
    }
}
