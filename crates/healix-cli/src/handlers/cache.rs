//! Cache command handlers

use super::open_memory;
use crate::error::{CliError, CliResult};
use crate::{OutputFormatArg, Reporter};
use healix::HealixConfig;
use std::io::Write;

/// List cached fixes
pub fn execute_cache_list(
    config: &HealixConfig,
    format: OutputFormatArg,
    reporter: &Reporter,
    out: &mut impl Write,
) -> CliResult<()> {
    let memory = open_memory(config, reporter);
    let entries = memory.entries();
    match format {
        OutputFormatArg::Json => writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?,
        OutputFormatArg::Text => {
            for (signature, target) in &entries {
                writeln!(out, "{signature} -> {target}")?;
            }
            reporter.info(&format!("{} cached fix(es)", entries.len()));
        }
    }
    Ok(())
}

/// Drop a cached fix
pub fn execute_cache_forget(
    config: &HealixConfig,
    signature: &str,
    reporter: &Reporter,
) -> CliResult<()> {
    let memory = open_memory(config, reporter);
    if memory.forget(signature)? {
        reporter.success(&format!("forgot cached fix for '{signature}'"));
        Ok(())
    } else {
        Err(CliError::invalid_argument(format!(
            "no cached fix for '{signature}'"
        )))
    }
}
