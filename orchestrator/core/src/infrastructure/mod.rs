// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod registry_loader;
pub mod repositories;
pub mod signing;

pub use event_bus::{DomainEvent, EventBus};
pub use repositories::InMemoryAgentDirectory;
pub use signing::{KeyPairProvider, SignatureCodec, SigningError, VerificationOutcome};
