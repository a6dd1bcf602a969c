// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Signed task receipts: an agent's attestation that it handled some task
//! data for a ticket, with the receipt contract naming the data it received.
//!
//! The signed message is `agent|data|timestamp`, framed like hop messages.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::domain::agent::Agent;
use crate::domain::contract::{ContractFactory, DataContract};
use crate::infrastructure::signing::{
    KeyPairProvider, SignatureCodec, SigningError, VerificationOutcome,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub agent: String,
    pub data: String,
    pub timestamp: String,
    pub signature: String,
    pub public_key: String,
    pub contract: DataContract,
}

impl Receipt {
    pub fn signed_message(&self) -> String {
        receipt_message(&self.agent, &self.data, &self.timestamp)
    }
}

fn receipt_message(agent: &str, data: &str, timestamp: &str) -> String {
    format!("{}|{}|{}", agent, data, timestamp)
}

pub struct ReceiptService {
    keys: Arc<dyn KeyPairProvider>,
    contracts: ContractFactory,
}

impl ReceiptService {
    pub fn new(keys: Arc<dyn KeyPairProvider>, contracts: ContractFactory) -> Self {
        Self { keys, contracts }
    }

    pub fn issue(
        &self,
        agent: &Agent,
        ticket_id: &str,
        task_data: &str,
        data_shared: &[String],
    ) -> Result<Receipt, SigningError> {
        self.issue_at(agent, ticket_id, task_data, data_shared, Utc::now())
    }

    pub fn issue_at(
        &self,
        agent: &Agent,
        ticket_id: &str,
        task_data: &str,
        data_shared: &[String],
        at: DateTime<Utc>,
    ) -> Result<Receipt, SigningError> {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let key = self.keys.key_for_agent(agent)?;
        let signature = key.sign(receipt_message(&agent.name, task_data, &timestamp).as_bytes())?;
        let contract = self.contracts.build_receipt(
            agent.id.as_str(),
            ticket_id,
            data_shared,
            task_data,
            at,
        );
        debug!(agent_id = %agent.id, contract_id = %contract.contract_id, "Issued receipt");
        Ok(Receipt {
            agent: agent.name.clone(),
            data: task_data.to_string(),
            timestamp,
            signature,
            public_key: key.public_key().to_string(),
            contract,
        })
    }

    pub fn verify(receipt: &Receipt) -> VerificationOutcome {
        if !receipt.contract.verify_integrity() {
            return VerificationOutcome::Invalid("receipt contract hash mismatch".to_string());
        }
        SignatureCodec::check(&receipt.public_key, &receipt.signed_message(), &receipt.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::tests::agent;
    use crate::domain::contract::ContractKind;
    use crate::infrastructure::signing::EphemeralKeyProvider;

    fn service() -> ReceiptService {
        ReceiptService::new(Arc::new(EphemeralKeyProvider::new()), ContractFactory::default())
    }

    #[test]
    fn test_issue_and_verify() {
        let a = agent("agent-004", "India", &["billing"], 5.0, 0.7);
        let receipt = service()
            .issue(&a, "ticket-1001", "invoice sent", &["name".to_string(), "email".to_string()])
            .unwrap();

        assert_eq!(receipt.contract.kind, ContractKind::Receipt);
        assert_eq!(receipt.contract.contract_id, "contract-agen-tick");
        assert_eq!(ReceiptService::verify(&receipt), VerificationOutcome::Valid);
    }

    #[test]
    fn test_altered_receipt_fails() {
        let a = agent("agent-004", "India", &["billing"], 5.0, 0.7);
        let mut receipt = service().issue(&a, "ticket-1001", "invoice sent", &[]).unwrap();
        receipt.data = "refund sent".to_string();
        assert!(matches!(ReceiptService::verify(&receipt), VerificationOutcome::Invalid(_)));
    }

    #[test]
    fn test_altered_contract_fails() {
        let a = agent("agent-004", "India", &["billing"], 5.0, 0.7);
        let mut receipt = service().issue(&a, "ticket-1001", "invoice sent", &[]).unwrap();
        receipt.contract.permitted_fields.push("payment_card".to_string());
        assert!(matches!(ReceiptService::verify(&receipt), VerificationOutcome::Invalid(_)));
    }

    #[test]
    fn test_receipt_requires_registered_key() {
        let mut a = agent("agent-004", "India", &["billing"], 5.0, 0.7);
        a.public_key = crate::infrastructure::signing::SessionKey::generate()
            .public_key()
            .to_string();
        let result = service().issue(&a, "ticket-1001", "invoice sent", &[]);
        assert!(matches!(result, Err(SigningError::KeyMismatch { .. })));
    }
}
