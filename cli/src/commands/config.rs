// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hdfs_gateway_core::domain::gateway_config::{GatewayConfigManifest, CONFIG_PATH_ENV};

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
        /// Output path (default: ./hdfs-gateway.yaml)
        #[arg(short, long, default_value = "./hdfs-gateway.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config =
        GatewayConfigManifest::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./hdfs-gateway.yaml");
        println!("  4. ~/.hdfs-gateway/config.yaml");
        println!("  5. /etc/hdfs-gateway/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let remote = &config.spec.remote;
    println!("{}", "Remote Filesystem:".bold());
    println!("  Backend: {:?}", remote.backend);
    println!("  URI: {}", remote.uri);
    println!("  Service user: {}", remote.service_user.as_deref().unwrap_or("(process user)"));
    println!("  Timeout: {}s", remote.timeout_seconds);
    println!();

    let delegation = &config.spec.delegation;
    println!("{}", "Delegation:".bold());
    if delegation.enabled {
        println!("  Enabled: {}", "yes".green());
        println!("  Principal: {}", delegation.principal.as_deref().unwrap_or("(missing)"));
        println!(
            "  Keytab: {}",
            delegation
                .keytab_path
                .as_ref()
                .map_or_else(|| "(missing)".to_string(), |p| p.display().to_string())
        );
        println!("  Renew interval: {}s", delegation.renew_interval_seconds);
    } else {
        println!("  Enabled: {}", "no".dimmed());
    }
    println!();

    let listeners = &config.spec.listeners;
    println!("{}", "Listeners:".bold());
    match listeners.port {
        Some(port) => println!(
            "  Plain: {} (data {})",
            port,
            listeners.data_ports.as_deref().unwrap_or("-")
        ),
        None => println!("  Plain: {}", "(disabled)".dimmed()),
    }
    match listeners.ssl_port {
        Some(port) => println!(
            "  TLS: {} (data {})",
            port,
            listeners.ssl_data_ports.as_deref().unwrap_or("-")
        ),
        None => println!("  TLS: {}", "(disabled)".dimmed()),
    }
    if listeners.max_logins > 0 {
        println!("  Max logins: {}", listeners.max_logins);
    } else {
        println!("  Max logins: unlimited");
    }
    println!();

    println!("{}", "Sessions:".bold());
    println!("  Confine to home: {}", config.spec.sessions.confine_to_home);
    if let Some(users) = &config.spec.users_file {
        println!("  Users file: {}", users.display());
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = GatewayConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid_manifests() {
        for template in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = GatewayConfigManifest::from_yaml_str(template).unwrap();
            config.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("gateway.yaml");
        generate(output.clone(), false).await.unwrap();
        assert!(GatewayConfigManifest::from_yaml_file(&output).is_ok());
    }
}
