//! IOC and reputation database command handlers.

use anyhow::Result;
use inquestlabs_core::LabsClient;

use super::print_json;
use crate::cli::DbCommand;

/// Database addressed by an `iocdb` or `repdb` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Database {
    Ioc,
    Rep,
}

pub async fn run_db_command(
    client: &LabsClient,
    database: Database,
    command: &DbCommand,
) -> Result<()> {
    let payload = match (database, command) {
        (Database::Ioc, DbCommand::List) => client.iocdb_list().await?,
        (Database::Ioc, DbCommand::Search { keyword }) => client.iocdb_search(keyword).await?,
        (Database::Ioc, DbCommand::Sources) => client.iocdb_sources().await?,
        (Database::Rep, DbCommand::List) => client.repdb_list().await?,
        (Database::Rep, DbCommand::Search { keyword }) => client.repdb_search(keyword).await?,
        (Database::Rep, DbCommand::Sources) => client.repdb_sources().await?,
    };
    print_json(&payload)
}
