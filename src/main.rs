//! CLI entry point for the inquestlabs tool.

use anyhow::{Context, Result};
use clap::Parser;
use inquestlabs_core::config::{self, ClientConfig};
use inquestlabs_core::LabsClient;
use tracing::debug;

mod cli;
mod commands;

use cli::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    if args.debug {
        println!("{args:#?}");
        return Ok(());
    }

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries results only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let client_config = build_config(&args);
    let client = LabsClient::from_config(client_config, args.api_key.clone())
        .context("failed to initialize InQuest Labs client")?;

    commands::run_command(&client, &args).await
}

fn build_config(args: &Args) -> ClientConfig {
    let mut client_config = ClientConfig::default()
        .with_base_url(args.base_url.as_str())
        .with_retry_budget(args.retries)
        .with_verify_tls(!args.insecure);

    if let Some(path) = &args.config {
        client_config = client_config.with_config_file(config::expand_home(path));
    }
    if let Some(proxy) = &args.proxy {
        client_config = client_config.with_proxy("all", proxy.as_str());
    }

    client_config
}
