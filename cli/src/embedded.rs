// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! In-process services
//!
//! Loads configuration and the agent registry, then wires the core services
//! together for a single CLI invocation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fellowship_core::{
    application::{
        AgentRegistrationService, AuditService, Planner, ProvenanceGraphBuilder, ReceiptService,
        TrustFeedbackService,
    },
    domain::{config::FellowshipConfig, contract::ContractFactory, selection::AgentSelector},
    infrastructure::{
        event_bus::EventBus,
        registry_loader,
        repositories::InMemoryAgentDirectory,
        signing::{provider_from_config, KeyPairProvider},
    },
};

pub struct EmbeddedServices {
    pub config: FellowshipConfig,
    directory: Arc<InMemoryAgentDirectory>,
    keys: Arc<dyn KeyPairProvider>,
    event_bus: Arc<EventBus>,
}

impl EmbeddedServices {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = FellowshipConfig::load_or_default(config_path)
            .context("Failed to load configuration")?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Self::from_config(config)
    }

    pub fn from_config(config: FellowshipConfig) -> Result<Self> {
        let registry = &config.spec.registry.path;
        let directory = if registry.exists() {
            registry_loader::load_directory(registry)
                .with_context(|| format!("Failed to load agent registry {:?}", registry))?
        } else {
            tracing::warn!("Agent registry {:?} not found; starting with an empty directory", registry);
            InMemoryAgentDirectory::new()
        };
        let keys = provider_from_config(&config.spec.signing);

        Ok(Self {
            config,
            directory: Arc::new(directory),
            keys,
            event_bus: Arc::new(EventBus::with_default_capacity()),
        })
    }

    pub fn directory(&self) -> Arc<InMemoryAgentDirectory> {
        self.directory.clone()
    }

    pub fn registry_path(&self) -> &Path {
        &self.config.spec.registry.path
    }

    fn selector(&self) -> AgentSelector {
        AgentSelector::new(self.config.spec.planning.min_trust_score)
    }

    pub fn contracts(&self) -> ContractFactory {
        ContractFactory::new(self.config.spec.contracts.expiry_hours)
    }

    pub fn planner(&self) -> Planner {
        Planner::new(self.directory.clone(), self.selector())
    }

    pub fn builder(&self) -> ProvenanceGraphBuilder {
        ProvenanceGraphBuilder::new(
            self.directory.clone(),
            self.selector(),
            self.contracts(),
            self.keys.clone(),
            self.event_bus.clone(),
        )
    }

    pub fn auditor(&self) -> AuditService {
        AuditService::new(self.directory.clone(), self.event_bus.clone())
    }

    pub fn feedback(&self) -> TrustFeedbackService {
        TrustFeedbackService::new(self.directory.clone(), self.event_bus.clone())
    }

    pub fn registration(&self) -> AgentRegistrationService {
        AgentRegistrationService::new(self.directory.clone(), self.event_bus.clone())
    }

    pub fn receipts(&self) -> ReceiptService {
        ReceiptService::new(self.keys.clone(), self.contracts())
    }

    /// Write directory changes back to the registry file.
    pub async fn persist_registry(&self) -> Result<()> {
        registry_loader::save_directory(self.directory.as_ref(), self.registry_path())
            .await
            .with_context(|| format!("Failed to save agent registry {:?}", self.registry_path()))
    }
}
