// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Hop Signing
//!
//! ECDSA over NIST P-256 with SHA-256 digests.
//!
//! | Material | Encoding |
//! |----------|----------|
//! | Signature | DER, standard base64 |
//! | Public key | compressed SEC1 point, hex |
//! | Private key (static config) | 32-byte scalar, hex |
//!
//! Signing failures are errors: a hop without a signature has no provenance
//! value. Verification never errors. Malformed keys or signatures verify as
//! [`VerificationOutcome::Invalid`]; placeholder key material (see
//! [`is_placeholder_key`]) verifies as [`VerificationOutcome::Skipped`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use parking_lot::Mutex;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::agent::Agent;
use crate::domain::config::SigningConfig;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("No signing key configured for agent '{0}'")]
    MissingKey(String),

    #[error("Malformed key material for agent '{agent_id}': {reason}")]
    MalformedKey { agent_id: String, reason: String },

    #[error("Signing key for agent '{agent_id}' does not match its registered public key")]
    KeyMismatch { agent_id: String },

    #[error("Signature generation failed: {0}")]
    Signature(String),
}

/// A signing key with its encoded public half.
#[derive(Clone)]
pub struct SessionKey {
    signing_key: SigningKey,
    public_key: String,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl SessionKey {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Parse a hex-encoded 32-byte private scalar.
    pub fn from_hex_scalar(agent_id: &str, scalar_hex: &str) -> Result<Self, SigningError> {
        let malformed = |reason: String| SigningError::MalformedKey {
            agent_id: agent_id.to_string(),
            reason,
        };
        let bytes = hex::decode(scalar_hex.trim()).map_err(|e| malformed(e.to_string()))?;
        let signing_key = SigningKey::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let public_key = hex::encode(verifying_key.to_encoded_point(true).as_bytes());
        Self { signing_key, public_key }
    }

    /// Hex compressed SEC1 public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Base64 DER signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<String, SigningError> {
        let der = SignatureCodec::sign(&self.signing_key, message)?;
        Ok(STANDARD.encode(der))
    }
}

/// Hands out the key an agent signs its hop with.
pub trait KeyPairProvider: Send + Sync {
    fn key_for(&self, agent_id: &str) -> Result<Arc<SessionKey>, SigningError>;

    /// Key for `agent`, which must match the agent's registered public key
    /// whenever one is registered. Agents with placeholder keys sign with
    /// whatever the provider holds; audits cannot attribute those hops.
    fn key_for_agent(&self, agent: &Agent) -> Result<Arc<SessionKey>, SigningError> {
        let key = self.key_for(agent.id.as_str())?;
        if !is_placeholder_key(&agent.public_key) && !same_public_key(key.public_key(), &agent.public_key) {
            return Err(SigningError::KeyMismatch {
                agent_id: agent.id.to_string(),
            });
        }
        Ok(key)
    }
}

/// Generates one key per agent on first use and keeps it for the session.
#[derive(Default)]
pub struct EphemeralKeyProvider {
    keys: Mutex<HashMap<String, Arc<SessionKey>>>,
}

impl EphemeralKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyPairProvider for EphemeralKeyProvider {
    fn key_for(&self, agent_id: &str) -> Result<Arc<SessionKey>, SigningError> {
        let mut keys = self.keys.lock();
        let key = keys
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(SessionKey::generate()));
        Ok(Arc::clone(key))
    }
}

/// Externally supplied keys. Agents without a configured key cannot sign.
pub struct StaticKeyProvider {
    scalars: BTreeMap<String, String>,
}

impl StaticKeyProvider {
    pub fn new(scalars: BTreeMap<String, String>) -> Self {
        Self { scalars }
    }
}

impl KeyPairProvider for StaticKeyProvider {
    fn key_for(&self, agent_id: &str) -> Result<Arc<SessionKey>, SigningError> {
        let scalar = self
            .scalars
            .get(agent_id)
            .ok_or_else(|| SigningError::MissingKey(agent_id.to_string()))?;
        SessionKey::from_hex_scalar(agent_id, scalar).map(Arc::new)
    }
}

/// Key provider described by configuration.
pub fn provider_from_config(config: &SigningConfig) -> Arc<dyn KeyPairProvider> {
    match config {
        SigningConfig::Ephemeral => Arc::new(EphemeralKeyProvider::new()),
        SigningConfig::Static { keys } => Arc::new(StaticKeyProvider::new(keys.clone())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Valid,
    Invalid(String),
    /// Placeholder key material; nothing to verify against.
    Skipped(String),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid)
    }
}

const PLACEHOLDER_PREFIXES: &[&str] = &["mock", "placeholder", "dummy"];

pub fn is_placeholder_key(public_key: &str) -> bool {
    let key = public_key.trim().to_lowercase();
    key.is_empty() || PLACEHOLDER_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Hex public keys compare case-insensitively, ignoring surrounding space.
pub fn same_public_key(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub struct SignatureCodec;

impl SignatureCodec {
    pub fn generate_keypair() -> (SigningKey, VerifyingKey) {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        (signing_key, verifying_key)
    }

    /// DER-encoded signature over the SHA-256 digest of `message`.
    pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        let signature: Signature = signing_key
            .try_sign(message)
            .map_err(|e| SigningError::Signature(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    /// True iff `signature` (DER) over `message` verifies against the SEC1
    /// encoded `public_key`. Malformed input is simply not valid.
    pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        Self::verify_raw(public_key, message, signature).is_ok()
    }

    fn verify_raw(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), String> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(public_key).map_err(|e| format!("Invalid public key: {}", e))?;
        let signature = Signature::from_der(signature).map_err(|e| format!("Invalid signature encoding: {}", e))?;
        verifying_key
            .verify(message, &signature)
            .map_err(|e| format!("Signature verification failed: {}", e))
    }

    /// Verify encoded material as stored on provenance nodes and receipts.
    pub fn check(public_key_hex: &str, message: &str, signature_b64: &str) -> VerificationOutcome {
        if is_placeholder_key(public_key_hex) {
            return VerificationOutcome::Skipped("placeholder key material".to_string());
        }
        let public_key = match hex::decode(public_key_hex.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return VerificationOutcome::Invalid(format!("Invalid public key hex: {}", e)),
        };
        let signature = match STANDARD.decode(signature_b64.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return VerificationOutcome::Invalid(format!("Invalid base64 signature: {}", e)),
        };
        match Self::verify_raw(&public_key, message.as_bytes(), &signature) {
            Ok(()) => VerificationOutcome::Valid,
            Err(reason) => VerificationOutcome::Invalid(reason),
        }
    }
}
