//! Healix CLI Library
//!
//! Command-line front end for inspecting what the healing engine sees and
//! reviewing what it has learned: snapshot sanitizing, one-off oracle
//! queries, cache maintenance and proposal review.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    CacheArgs, CacheCommand, CheckArgs, Cli, ColorArg, Commands, InitArgs, OutputFormatArg,
    ProposalCommand, ProposalsArgs, SanitizeArgs, SuggestArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Reporter;
