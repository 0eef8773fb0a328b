// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # HDFS Gateway CLI
//!
//! The `hdfs-gateway` binary is the operator tool for the gateway core.
//!
//! ## Commands
//!
//! - `hdfs-gateway config show|validate|generate` - Configuration management
//! - `hdfs-gateway users hash-password|check` - Users file maintenance
//! - `hdfs-gateway session --user NAME` - Interactive command session
//! - `hdfs-gateway health` - Probe the remote filesystem

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

mod commands;

use commands::{ConfigCommand, SessionArgs, UsersCommand};

/// HDFS Gateway - File-transfer access to a remote Hadoop filesystem
#[derive(Parser)]
#[command(name = "hdfs-gateway")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HDFS_GATEWAY_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HDFS_GATEWAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Expose Prometheus metrics on this port
    #[arg(long, global = true, env = "HDFS_GATEWAY_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Users file management
    #[command(name = "users")]
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },

    /// Log in and run gateway commands against the remote filesystem
    #[command(name = "session")]
    Session {
        #[command(flatten)]
        args: SessionArgs,
    },

    /// Check the configured remote filesystem is reachable
    #[command(name = "health")]
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    if let Some(port) = cli.metrics_port {
        init_metrics(port)?;
    }

    match cli.command {
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Users { command }) => commands::users::handle_command(command, cli.config).await,
        Some(Commands::Session { args }) => commands::session::run(args, cli.config).await,
        Some(Commands::Health) => commands::session::health(cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

fn init_metrics(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
