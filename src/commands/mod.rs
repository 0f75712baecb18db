//! CLI command handlers.

mod db;
mod dfi;
mod yara;

use anyhow::Result;
use inquestlabs_core::LabsClient;
use serde_json::Value;

use crate::cli::{Args, Command};

pub use db::{Database, run_db_command};
pub use dfi::run_dfi_command;
pub use yara::run_yara_command;

pub async fn run_command(client: &LabsClient, args: &Args) -> Result<()> {
    match &args.command {
        Command::Dfi { command } => run_dfi_command(client, command).await,
        Command::Iocdb { command } => run_db_command(client, Database::Ioc, command).await,
        Command::Repdb { command } => run_db_command(client, Database::Rep, command).await,
        Command::Yara { command } => run_yara_command(client, command, args.hex).await,
        Command::Stats => print_json(&client.stats().await?),
    }
}

/// Prints a payload as compact JSON on stdout.
pub(crate) fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
