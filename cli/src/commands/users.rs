// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Users file commands
//!
//! Commands: hash-password, check

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hdfs_gateway_core::domain::gateway_config::GatewayConfigManifest;
use hdfs_gateway_core::infrastructure::user_store::{hash_password, UserRegistry};

#[derive(Subcommand)]
pub enum UsersCommand {
    /// Print the hash to store as `password_sha256`
    HashPassword {
        #[arg(value_name = "PASSWORD")]
        password: String,
    },

    /// Load a users file and list its accounts
    Check {
        /// Users file (default: `users_file` from the configuration)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(command: UsersCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        UsersCommand::HashPassword { password } => {
            println!("{}", hash_password(&password));
            Ok(())
        }
        UsersCommand::Check { file } => check(file, config_override).await,
    }
}

async fn check(file: Option<PathBuf>, config_override: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => GatewayConfigManifest::load_or_default(config_override)
            .context("Failed to load configuration")?
            .spec
            .users_file
            .context("No users file given and none configured")?,
    };

    let registry =
        UserRegistry::from_yaml_file(&path).with_context(|| format!("Failed to load users file {:?}", path))?;

    let mut accounts: Vec<_> = registry.accounts().collect();
    accounts.sort_by(|a, b| a.name.cmp(&b.name));

    println!("{}", format!("{} account(s) in {}", registry.len(), path.display()).bold());
    for account in accounts {
        let mut flags = Vec::new();
        if !account.enabled {
            flags.push("disabled".red().to_string());
        }
        if !account.can_write {
            flags.push("read-only".yellow().to_string());
        }
        println!(
            "  {} ({}) home={} {}",
            account.name.bold(),
            std::iter::once(account.primary_group.as_str())
                .chain(account.groups.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(","),
            account.home_directory,
            flags.join(" ")
        );
    }
    println!("{}", "✓ Users file is valid".green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_example_users_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.yaml");
        std::fs::write(&path, include_str!("../../templates/users-example.yaml")).unwrap();

        check(Some(path.clone()), None).await.unwrap();

        let registry = UserRegistry::from_yaml_file(&path).unwrap();
        assert!(registry.authenticate("alice", "alice").is_ok());
        assert!(!registry.authenticate("guest", "guest").unwrap().can_write());
    }
}
