// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Trust feedback path. Runs outside planning; the directory applies each
//! update atomically per agent.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::domain::agent::{AgentId, FeedbackEntry};
use crate::domain::events::TrustEvent;
use crate::domain::repository::{AgentDirectory, RepositoryError};
use crate::domain::trust::TrustUpdate;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Rating must be within [0, 1], got {0}")]
    InvalidRating(f64),

    #[error("Unknown agent '{0}'")]
    UnknownAgent(AgentId),

    #[error("Agent directory error: {0}")]
    Directory(RepositoryError),
}

pub struct TrustFeedbackService {
    directory: Arc<dyn AgentDirectory>,
    event_bus: Arc<EventBus>,
}

impl TrustFeedbackService {
    pub fn new(directory: Arc<dyn AgentDirectory>, event_bus: Arc<EventBus>) -> Self {
        Self { directory, event_bus }
    }

    pub async fn submit(
        &self,
        agent_id: &AgentId,
        rating: f64,
        comment: impl Into<String>,
    ) -> Result<TrustUpdate, FeedbackError> {
        if !(0.0..=1.0).contains(&rating) {
            return Err(FeedbackError::InvalidRating(rating));
        }

        let entry = FeedbackEntry {
            rating,
            comment: comment.into(),
            submitted_at: Utc::now(),
        };
        let update = self
            .directory
            .update_trust(agent_id, entry)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => FeedbackError::UnknownAgent(agent_id.clone()),
                other => FeedbackError::Directory(other),
            })?;

        info!(
            agent_id = %agent_id,
            old_score = update.old_score,
            new_score = update.new_score,
            "Trust score updated"
        );
        self.event_bus.publish_trust_event(TrustEvent::TrustUpdated {
            agent_id: update.agent_id.clone(),
            old_score: update.old_score,
            new_score: update.new_score,
            updated_at: Utc::now(),
        });
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::tests::agent;
    use crate::infrastructure::repositories::InMemoryAgentDirectory;
    use crate::infrastructure::DomainEvent;

    fn service() -> (TrustFeedbackService, Arc<EventBus>) {
        let directory = InMemoryAgentDirectory::with_agents(vec![agent("a1", "India", &[], 1.0, 0.5)]).unwrap();
        let bus = Arc::new(EventBus::new(8));
        (TrustFeedbackService::new(Arc::new(directory), bus.clone()), bus)
    }

    #[tokio::test]
    async fn test_submit_updates_and_publishes() {
        let (service, bus) = service();
        let mut events = bus.subscribe();

        let update = service.submit(&AgentId::new("a1"), 1.0, "great").await.unwrap();
        assert_eq!(update.new_score, 0.65);
        assert_eq!(update.recent_feedback.len(), 1);

        match events.try_recv().unwrap() {
            DomainEvent::Trust(TrustEvent::TrustUpdated { old_score, .. }) => assert_eq!(old_score, 0.5),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rating_out_of_range() {
        let (service, _) = service();
        for rating in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                service.submit(&AgentId::new("a1"), rating, "").await,
                Err(FeedbackError::InvalidRating(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let (service, _) = service();
        assert!(matches!(
            service.submit(&AgentId::new("ghost"), 0.5, "").await,
            Err(FeedbackError::UnknownAgent(_))
        ));
    }
}
