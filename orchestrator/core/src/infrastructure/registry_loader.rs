// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Agent registry file: a JSON array of agent records.
//!
//! Missing optional fields (`skills`, `currency`, `wallet_address`, `is_ai`,
//! `id`) are tolerated; records without an id get a fresh one on load.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::agent::Agent;
use crate::domain::repository::{AgentDirectory, RepositoryError};
use crate::infrastructure::repositories::InMemoryAgentDirectory;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read registry '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write registry '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry '{path}' is not a JSON array of agents: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub fn read_registry(path: &Path) -> Result<Vec<Agent>, RegistryError> {
    let content = fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let agents: Vec<Agent> =
        serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), count = agents.len(), "Read agent registry");
    Ok(agents)
}

/// Load the registry file into a fresh in-memory directory.
pub fn load_directory(path: &Path) -> Result<InMemoryAgentDirectory, RegistryError> {
    let directory = InMemoryAgentDirectory::with_agents(read_registry(path)?)?;
    info!(path = %path.display(), agents = directory.len(), "Loaded agent directory");
    Ok(directory)
}

/// Write the directory back out, pretty-printed, in registration order.
pub async fn save_directory(
    directory: &dyn AgentDirectory,
    path: &Path,
) -> Result<(), RegistryError> {
    let agents = directory.list_agents().await?;
    let json = serde_json::to_string_pretty(&agents).map_err(RepositoryError::from)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| RegistryError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), count = agents.len(), "Saved agent registry");
    Ok(())
}
