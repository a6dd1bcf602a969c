// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - Pub/Sub for Domain Events
//
// In-memory fan-out over a tokio broadcast channel. Observers (the CLI's
// verbose mode, tests) subscribe; publishers never block and never fail when
// nobody is listening.

use crate::domain::events::{AuditEvent, ProvenanceEvent, TrustEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Provenance(ProvenanceEvent),
    Trust(TrustEvent),
    Audit(AuditEvent),
}

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before slow receivers lag.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_provenance_event(&self, event: ProvenanceEvent) {
        self.publish(DomainEvent::Provenance(event));
    }

    pub fn publish_trust_event(&self, event: TrustEvent) {
        self.publish(DomainEvent::Trust(event));
    }

    pub fn publish_audit_event(&self, event: AuditEvent) {
        self.publish(DomainEvent::Audit(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Provenance events for one ticket only.
    pub fn subscribe_ticket(&self, ticket_id: impl Into<String>) -> TicketEventReceiver {
        TicketEventReceiver {
            receiver: self.sender.subscribe(),
            ticket_id: ticket_id.into(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

pub struct TicketEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    ticket_id: String,
}

impl TicketEventReceiver {
    /// Next provenance event for the subscribed ticket; others are skipped.
    pub async fn recv(&mut self) -> Result<ProvenanceEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if let DomainEvent::Provenance(event) = event {
                if ticket_of(&event) == self.ticket_id {
                    return Ok(event);
                }
            }
        }
    }
}

fn ticket_of(event: &ProvenanceEvent) -> &str {
    match event {
        ProvenanceEvent::BuildStarted { ticket_id, .. }
        | ProvenanceEvent::PolicyRelaxed { ticket_id, .. }
        | ProvenanceEvent::HopAppended { ticket_id, .. }
        | ProvenanceEvent::GraphCompleted { ticket_id, .. }
        | ProvenanceEvent::BuildFailed { ticket_id, .. } => ticket_id,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentId;
    use chrono::Utc;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.publish_trust_event(TrustEvent::TrustUpdated {
            agent_id: AgentId::new("agent-001"),
            old_score: 0.5,
            new_score: 0.65,
            updated_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            DomainEvent::Trust(TrustEvent::TrustUpdated { new_score, .. }) => {
                assert_eq!(new_score, 0.65)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ticket_receiver_filters_other_tickets() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe_ticket("T-2");

        for ticket in ["T-1", "T-2"] {
            bus.publish_provenance_event(ProvenanceEvent::BuildFailed {
                ticket_id: ticket.to_string(),
                reason: "boom".to_string(),
                failed_at: Utc::now(),
            });
        }

        let event = receiver.recv().await.unwrap();
        assert_eq!(ticket_of(&event), "T-2");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish_audit_event(AuditEvent::DoubleBillingDetected {
            ticket_id: "T-1".to_string(),
            agent_id: "biller".to_string(),
            detected_at: Utc::now(),
        });
    }

    #[test]
    fn test_try_recv_empty() {
        let bus = EventBus::new(4);
        let mut receiver = bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }
}
