//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use inquestlabs_core::{DEFAULT_BASE_URL, DEFAULT_RETRY_BUDGET, Endian};

/// Command line driver for the InQuest Labs threat intelligence API.
///
/// Deep file inspection, IOC and reputation databases, and YARA rule helpers.
#[derive(Parser, Debug)]
#[command(name = "inquestlabs")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// API key (overrides IQLABS_APIKEY and the configuration file)
    #[arg(long = "api", value_name = "APIKEY", global = true)]
    pub api_key: Option<String>,

    /// Configuration file with API key [default: ~/.iqlabskey]
    #[arg(long, value_name = "CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Intermediate proxy for every request
    #[arg(long, value_name = "PROXY", global = true)]
    pub proxy: Option<String>,

    /// Treat <instring> as hex bytes
    #[arg(long, global = true)]
    pub hex: bool,

    /// Print parsed arguments and exit
    #[arg(long, global = true)]
    pub debug: bool,

    /// Attempts per request before giving up on transport failures (at least 1)
    #[arg(short = 'r', long, default_value_t = DEFAULT_RETRY_BUDGET, value_parser = clap::value_parser!(u32).range(1..), global = true)]
    pub retries: u32,

    /// API base URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deep file inspection
    Dfi {
        #[command(subcommand)]
        command: DfiCommand,
    },
    /// IOC database
    Iocdb {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Reputation database
    Repdb {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// YARA rule helpers
    Yara {
        #[command(subcommand)]
        command: YaraCommand,
    },
    /// Service statistics
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum DfiCommand {
    /// Most recent entries
    List,
    /// Details of a sample
    Details {
        sha256: String,
        /// Include the sample's attributes
        #[arg(long)]
        attributes: bool,
    },
    /// Download a sample and verify its SHA-256
    Download { sha256: String, path: PathBuf },
    /// Attributes of a sample
    Attributes {
        sha256: String,
        /// Only keep attributes of this kind (domain, email, filename, ip, url, xmpid)
        #[arg(long, value_name = "FILTER")]
        filter: Option<String>,
    },
    /// Search by extracted content, hash or IOC
    ///
    /// The category follows from the subcategory: code, context, metadata or
    /// ocr search extracted content; md5, sha1, sha256 or sha512 search hashes;
    /// domain, email, filename, ip, url or xmpid search IOCs.
    Search { subcategory: String, term: String },
    /// YARA hunt rules feeding the corpus
    Sources,
    /// Upload an Office document for inspection
    Upload { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Most recent entries
    List,
    /// Keyword search
    Search { keyword: String },
    /// Feed sources
    Sources,
}

#[derive(Subcommand, Debug)]
pub enum YaraCommand {
    /// Regex to a base64-matching regex
    #[command(alias = "base64re")]
    B64re {
        regex: String,
        #[command(flatten)]
        endian: EndianArgs,
    },
    /// Hex string to a mixed-case-agnostic regex
    Hexcase { instring: String },
    /// Magic string to a uint() condition
    Uint {
        instring: String,
        /// Offset in decimal (222) or hex (0xde)
        #[arg(long, default_value = "0")]
        offset: String,
    },
    /// ASCII regex to its wide-character form
    Widere {
        regex: String,
        #[command(flatten)]
        endian: EndianArgs,
    },
}

#[derive(ClapArgs, Debug, Clone, Copy, Default)]
#[group(multiple = false)]
pub struct EndianArgs {
    /// Big-endian wide characters
    #[arg(long)]
    pub big_endian: bool,

    /// Little-endian wide characters
    #[arg(long)]
    pub little_endian: bool,
}

impl EndianArgs {
    pub fn endian(self) -> Option<Endian> {
        if self.big_endian {
            Some(Endian::Big)
        } else if self.little_endian {
            Some(Endian::Little)
        } else {
            None
        }
    }
}
