// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Interactive gateway session
//!
//! Logs in through the users file and feeds protocol command lines to a
//! [`CommandDispatcher`]. Data commands use stdout (LIST, NLST, RETR) or a
//! local file (`STOR <remote> <local>`) in place of a data connection.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use hdfs_gateway_core::application::command_dispatcher::{CommandDispatcher, ProtocolCommand, Reply};
use hdfs_gateway_core::application::gateway::Gateway;
use hdfs_gateway_core::domain::gateway_config::{GatewayConfigManifest, RemoteBackendKind};
use hdfs_gateway_core::domain::remote_path::RemotePath;
use hdfs_gateway_core::infrastructure::remote::MemoryFileSystem;
use hdfs_gateway_core::infrastructure::user_store::UserRegistry;

#[derive(Args)]
pub struct SessionArgs {
    /// Account name from the users file
    #[arg(short, long)]
    user: String,

    #[arg(short, long, env = "HDFS_GATEWAY_PASSWORD", hide_env_values = true)]
    password: String,

    /// Read commands from a file instead of stdin
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,
}

pub async fn run(args: SessionArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = GatewayConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;
    let gateway = build_gateway(config)?;

    let mut session = gateway
        .login(&args.user, &args.password)
        .await
        .with_context(|| format!("Login failed for {}", args.user))?;
    println!("{}", format!("230 User {} logged in.", args.user).green());

    match &args.script {
        Some(path) => {
            let script = std::fs::read_to_string(path).with_context(|| format!("Failed to read script {:?}", path))?;
            for line in script.lines() {
                if !execute_line(&mut session, line).await? {
                    break;
                }
            }
        }
        None => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await.context("Failed to read command")? {
                if !execute_line(&mut session, &line).await? {
                    break;
                }
            }
        }
    }

    println!("221 Goodbye.");
    Ok(())
}

pub async fn health(config_override: Option<PathBuf>) -> Result<()> {
    let config = GatewayConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;
    let gateway = Gateway::from_config(config)?;

    let fs = gateway.handle().get().await.context("Cannot create remote filesystem client")?;
    fs.health_check().await.context("Remote filesystem is not reachable")?;

    println!(
        "{}",
        format!("✓ Remote filesystem reachable ({:?})", gateway.handle().backend()).green()
    );
    Ok(())
}

/// In-memory namespaces start empty, so give every account its home
fn build_gateway(config: GatewayConfigManifest) -> Result<Gateway> {
    if config.spec.remote.backend != RemoteBackendKind::Memory {
        return Gateway::from_config(config);
    }

    let fs = Arc::new(MemoryFileSystem::new());
    let gateway = Gateway::with_filesystem(config, fs.clone())?;
    if let Some(users) = gateway.users() {
        seed_homes(&fs, users);
    }
    warn!("Using the in-memory backend, contents are discarded at exit");
    Ok(gateway)
}

fn seed_homes(fs: &MemoryFileSystem, users: &UserRegistry) {
    for account in users.accounts() {
        let home = RemotePath::new(&account.home_directory);
        let mut ancestors = Vec::new();
        let mut current = home.parent();
        while let Some(path) = current {
            if path.is_root() {
                break;
            }
            current = path.parent();
            ancestors.push(path);
        }
        for ancestor in ancestors.iter().rev() {
            fs.insert_directory(ancestor.as_str(), "hdfs", "supergroup", 0o755);
        }
    }

    for account in users.accounts() {
        let home = RemotePath::new(&account.home_directory);
        if !home.is_root() {
            fs.insert_directory(home.as_str(), &account.name, &account.primary_group, 0o755);
        }
        info!(user = %account.name, home = %home, "Seeded home directory");
    }
}

/// Run one command line; `false` ends the session
async fn execute_line(session: &mut CommandDispatcher, line: &str) -> Result<bool> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(true);
    }

    let verb = line.split_whitespace().next().unwrap_or_default().to_ascii_uppercase();
    if verb == "QUIT" {
        return Ok(false);
    }
    if verb == "STOR" {
        print_replies(&store_local(session, line).await?);
        return Ok(true);
    }

    let command = match line.parse::<ProtocolCommand>() {
        Ok(command) => command,
        Err(e) => {
            print_reply(&Reply::new(500, e.to_string()));
            return Ok(true);
        }
    };

    let replies = match command {
        ProtocolCommand::List(target) => session.list(target.as_deref(), false, &mut tokio::io::stdout()).await,
        ProtocolCommand::Nlst(target) => session.list(target.as_deref(), true, &mut tokio::io::stdout()).await,
        ProtocolCommand::Retr(path) => session.retrieve(&path, &mut tokio::io::stdout()).await,
        command => vec![session.dispatch(command).await],
    };
    print_replies(&replies);
    Ok(true)
}

/// `STOR <remote> [<local>]`; the local file defaults to the remote name
async fn store_local(session: &mut CommandDispatcher, line: &str) -> Result<Vec<Reply>> {
    let mut parts = line.split_whitespace().skip(1);
    let Some(remote) = parts.next() else {
        return Ok(vec![Reply::new(501, "STOR requires an argument.")]);
    };
    let local = match parts.next() {
        Some(local) => PathBuf::from(local),
        None => match Path::new(remote).file_name() {
            Some(name) => PathBuf::from(name),
            None => return Ok(vec![Reply::new(501, format!("{}: No file name.", remote))]),
        },
    };
    if parts.next().is_some() {
        return Ok(vec![Reply::new(501, "Usage: STOR <remote> [<local>]")]);
    }

    let mut file = match tokio::fs::File::open(&local).await {
        Ok(file) => file,
        Err(e) => return Ok(vec![Reply::new(550, format!("{}: {}", local.display(), e))]),
    };
    Ok(session.store(remote, &mut file).await)
}

fn print_replies(replies: &[Reply]) {
    for reply in replies {
        print_reply(reply);
    }
}

fn print_reply(reply: &Reply) {
    if reply.is_positive() {
        println!("{}", reply.to_string().green());
    } else {
        println!("{}", reply.to_string().red());
    }
}
