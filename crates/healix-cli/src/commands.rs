//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Healix: self-healing locators for UI tests
#[derive(Parser, Debug)]
#[command(name = "healix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Configuration file (defaults to ./healix.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Oracle base URL
    #[arg(long, env = "HEALIX_ORACLE_URL", global = true)]
    pub oracle_url: Option<String>,

    /// Oracle model identifier
    #[arg(long, env = "HEALIX_MODEL", global = true)]
    pub model: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show what a page snapshot looks like to the oracle
    Sanitize(SanitizeArgs),

    /// Ask the oracle for a replacement locator once
    Suggest(SuggestArgs),

    /// Inspect or edit the healing cache
    Cache(CacheArgs),

    /// Review proposals recorded by successful heals
    Proposals(ProposalsArgs),

    /// Write a default healix.yaml
    Init(InitArgs),

    /// Validate configuration and probe the oracle
    Check(CheckArgs),
}

/// Arguments for the sanitize command
#[derive(Args, Debug)]
pub struct SanitizeArgs {
    /// Snapshot file ("-" reads stdin)
    pub snapshot: PathBuf,

    /// Override the character cap
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Also report failure keywords found on the page
    #[arg(long)]
    pub observe: bool,
}

/// Arguments for the suggest command
#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Broken locator
    pub locator: String,

    /// Snapshot file ("-" reads stdin)
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Error message from the failed attempt
    #[arg(short, long)]
    pub error: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Arguments for the cache command
#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Cache operation
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache operations
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached fixes
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormatArg,
    },
    /// Drop a cached fix
    Forget {
        /// Broken-locator signature to drop
        signature: String,
    },
}

/// Arguments for the proposals command
#[derive(Args, Debug)]
pub struct ProposalsArgs {
    /// Proposal operation
    #[command(subcommand)]
    pub command: ProposalCommand,
}

/// Proposal review operations
#[derive(Subcommand, Debug)]
pub enum ProposalCommand {
    /// List proposals
    List {
        /// Include accepted and rejected proposals
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormatArg,
    },
    /// Mark a proposal accepted
    Accept {
        /// Proposal id (or unique prefix)
        id: String,
    },
    /// Mark a proposal rejected
    Reject {
        /// Proposal id (or unique prefix)
        id: String,
    },
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write healix.yaml into
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only validate configuration, skip the oracle probe
    #[arg(long)]
    pub offline: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}
