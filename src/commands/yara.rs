//! YARA helper command handlers.
//!
//! Results are printed as plain text, ready to paste into a rule.

use anyhow::Result;
use inquestlabs_core::LabsClient;

use crate::cli::YaraCommand;

pub async fn run_yara_command(client: &LabsClient, command: &YaraCommand, hex: bool) -> Result<()> {
    let rendered = match command {
        YaraCommand::B64re { regex, endian } => client.yara_b64re(regex, endian.endian()).await?,
        YaraCommand::Hexcase { instring } => client.yara_hexcase(instring).await?,
        YaraCommand::Uint { instring, offset } => client.yara_uint(instring, offset, hex).await?,
        YaraCommand::Widere { regex, endian } => client.yara_widere(regex, endian.endian()).await?,
    };
    println!("{rendered}");
    Ok(())
}
