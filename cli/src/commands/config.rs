// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use fellowship_core::domain::config::{FellowshipConfig, SigningConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./fellowship-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. FELLOWSHIP_CONFIG_PATH: {}",
            std::env::var("FELLOWSHIP_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./fellowship-config.yaml");
        println!("  4. ~/.fellowship/config.yaml");
        println!();
    }

    let config = FellowshipConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();
    println!("{}", "Registry:".bold());
    println!("  Path: {}", config.spec.registry.path.display());
    println!();
    println!("{}", "Planning:".bold());
    println!("  Minimum trust score: {}", config.spec.planning.min_trust_score);
    println!();
    println!("{}", "Contracts:".bold());
    println!("  Expiry: {}h", config.spec.contracts.expiry_hours);
    println!();
    println!("{}", "Signing:".bold());
    match &config.spec.signing {
        SigningConfig::Ephemeral => println!("  Key source: ephemeral"),
        SigningConfig::Static { keys } => {
            println!("  Key source: static ({} agents)", keys.len());
            for agent in keys.keys() {
                println!("    - {}", agent);
            }
        }
    }
    println!();
    println!("{}", "Observability:".bold());
    println!("  Log level: {}", config.spec.observability.log_level);
    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = FellowshipConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    if with_examples {
        std::fs::write(&output, include_str!("../../templates/config-with-examples.yaml"))
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    } else {
        FellowshipConfig::default()
            .to_yaml_file(&output)
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    }

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );
    Ok(())
}
