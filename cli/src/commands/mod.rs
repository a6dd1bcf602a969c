// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Fellowship CLI

pub mod agents;
pub mod audit;
pub mod config;
pub mod contract;
pub mod feedback;
pub mod ticket;

pub use self::agents::AgentsCommand;
pub use self::config::ConfigCommand;
pub use self::contract::ContractCommand;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Pretty JSON to `output`, or stdout when none is given.
pub(crate) fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {:?}", path)),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}
