//! Deep file inspection command handlers.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use inquestlabs_core::{HashInput, LabsClient, SearchCategory};
use serde_json::Value;
use tracing::info;

use super::print_json;
use crate::cli::DfiCommand;

const RESULTS_URL: &str = "https://labs.inquest.net/dfi/sha256";

pub async fn run_dfi_command(client: &LabsClient, command: &DfiCommand) -> Result<()> {
    match command {
        DfiCommand::List => print_json(&client.dfi_list().await?),
        DfiCommand::Details { sha256, attributes } => {
            print_json(&client.dfi_details(sha256, *attributes).await?)
        }
        DfiCommand::Download { sha256, path } => run_download(client, sha256, path).await,
        DfiCommand::Attributes { sha256, filter } => {
            print_json(&client.dfi_attributes(sha256, filter.as_deref()).await?)
        }
        DfiCommand::Search { subcategory, term } => {
            run_search(client, subcategory, term).await
        }
        DfiCommand::Sources => print_json(&client.dfi_sources().await?),
        DfiCommand::Upload { path } => run_upload(client, path).await,
    }
}

async fn run_download(client: &LabsClient, sha256: &str, path: &Path) -> Result<()> {
    let start = Instant::now();
    let bytes = client.dfi_download(sha256, path).await?;
    info!(bytes, path = %path.display(), "download verified");
    println!(
        "saved {sha256} as '{}' in {} seconds.",
        path.display(),
        start.elapsed().as_secs()
    );
    Ok(())
}

async fn run_search(client: &LabsClient, subcategory: &str, term: &str) -> Result<()> {
    let Some(category) = SearchCategory::for_subcategory(subcategory) else {
        let valid: Vec<&str> = SearchCategory::ALL
            .iter()
            .flat_map(|category| category.subcategories().iter().copied())
            .collect();
        bail!(
            "invalid search subcategory '{subcategory}'. valid subcategories include: {}",
            valid.join(", ")
        );
    };
    print_json(&client.dfi_search(category.as_str(), subcategory, term).await?)
}

async fn run_upload(client: &LabsClient, path: &Path) -> Result<()> {
    let start = Instant::now();
    let payload = client.dfi_upload(path).await?;

    let sha256 = match payload {
        Value::String(sha256) => sha256,
        _ => client
            .sha256(HashInput::path(path))
            .with_context(|| format!("failed to hash {}", path.display()))?,
    };

    println!(
        "successfully uploaded {} in {} seconds.",
        path.display(),
        start.elapsed().as_secs()
    );
    println!("see results at: {RESULTS_URL}/{sha256}");
    Ok(())
}
