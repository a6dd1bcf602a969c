// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_HOPS: u32 = 4;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Malformed ticket: {0}")]
    Malformed(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl From<serde_json::Error> for TicketError {
    fn from(err: serde_json::Error) -> Self {
        TicketError::Malformed(err.to_string())
    }
}

/// A customer repair request. Immutable once handed to the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub customer_location: String,
    #[serde(alias = "issue")]
    pub issue_text: String,
    pub max_budget: f64,
    pub max_days: u32,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub data_constraints: Vec<String>,
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
}

fn default_max_hops() -> u32 {
    DEFAULT_MAX_HOPS
}

impl Ticket {
    /// Parse and validate a ticket from its JSON input shape.
    pub fn from_json(json: &str) -> Result<Self, TicketError> {
        let ticket: Ticket = serde_json::from_str(json)?;
        ticket.validate()?;
        Ok(ticket)
    }

    /// Reject tickets that cannot be planned before any hop is processed.
    pub fn validate(&self) -> Result<(), TicketError> {
        if self.ticket_id.trim().is_empty() {
            return Err(TicketError::MissingField("ticket_id"));
        }
        if self.ticket_id.contains('|') {
            return Err(TicketError::InvalidField {
                field: "ticket_id",
                reason: "must not contain '|'".to_string(),
            });
        }
        if self.customer_location.trim().is_empty() {
            return Err(TicketError::MissingField("customer_location"));
        }
        if !self.max_budget.is_finite() || self.max_budget < 0.0 {
            return Err(TicketError::InvalidField {
                field: "max_budget",
                reason: format!("must be a non-negative number, got {}", self.max_budget),
            });
        }
        if self.max_hops == 0 {
            return Err(TicketError::InvalidField {
                field: "max_hops",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.required_capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err(TicketError::InvalidField {
                field: "required_capabilities",
                reason: "contains an empty capability".to_string(),
            });
        }
        if let Some(tag) = self.required_capabilities.iter().find(|c| c.contains('|')) {
            return Err(TicketError::InvalidField {
                field: "required_capabilities",
                reason: format!("capability '{}' must not contain '|'", tag),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ticket(id: &str, location: &str) -> Ticket {
        Ticket {
            ticket_id: id.to_string(),
            customer_location: location.to_string(),
            issue_text: String::new(),
            max_budget: 500.0,
            max_days: 7,
            required_capabilities: Vec::new(),
            data_constraints: Vec::new(),
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    #[test]
    fn test_max_hops_defaults_to_four() {
        let json = r#"{
            "ticket_id": "T-100",
            "customer_location": "Germany",
            "issue": "Phone screen cracked, needs repair",
            "max_budget": 250.0,
            "max_days": 5
        }"#;
        let t = Ticket::from_json(json).unwrap();
        assert_eq!(t.max_hops, 4);
        assert_eq!(t.issue_text, "Phone screen cracked, needs repair");
        assert!(t.required_capabilities.is_empty());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let json = r#"{"ticket_id": "T-1", "issue_text": "x", "max_budget": 1.0, "max_days": 1}"#;
        assert!(matches!(Ticket::from_json(json), Err(TicketError::Malformed(_))));
    }

    #[test]
    fn test_pipe_in_capability_is_rejected() {
        let mut t = ticket("T-1", "Germany");
        t.required_capabilities = vec!["a|b".to_string()];
        assert!(matches!(
            t.validate(),
            Err(TicketError::InvalidField { field: "required_capabilities", .. })
        ));
    }

    #[test]
    fn test_blank_location_is_rejected() {
        let t = ticket("T-1", "  ");
        assert!(matches!(t.validate(), Err(TicketError::MissingField("customer_location"))));
    }

    #[test]
    fn test_zero_hops_and_negative_budget_rejected() {
        let mut t = ticket("T-1", "India");
        t.max_hops = 0;
        assert!(t.validate().is_err());

        let mut t = ticket("T-1", "India");
        t.max_budget = -1.0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_pipe_in_ticket_id_is_rejected() {
        let t = ticket("T|1", "India");
        assert!(matches!(t.validate(), Err(TicketError::InvalidField { field: "ticket_id", .. })));
    }
}
