// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::agent::Agent;
use crate::domain::events::TrustEvent;
use crate::domain::repository::{AgentDirectory, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

/// Adds agents to the directory and announces them.
pub struct AgentRegistrationService {
    directory: Arc<dyn AgentDirectory>,
    event_bus: Arc<EventBus>,
}

impl AgentRegistrationService {
    pub fn new(directory: Arc<dyn AgentDirectory>, event_bus: Arc<EventBus>) -> Self {
        Self { directory, event_bus }
    }

    pub async fn register(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let registered = self.directory.register(agent).await?;
        info!(agent_id = %registered.id, name = %registered.name, "Agent registered");
        self.event_bus.publish_trust_event(TrustEvent::AgentRegistered {
            agent_id: registered.id.clone(),
            name: registered.name.clone(),
            registered_at: Utc::now(),
        });
        Ok(registered)
    }
}
