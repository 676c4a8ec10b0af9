//! Command handlers - one module per subcommand
//!
//! Handlers write results to the writer they are given and status lines to
//! the [`Reporter`](crate::Reporter), so tests can capture what a command
//! prints.

pub mod cache;
pub mod check;
pub mod init;
pub mod proposals;
pub mod sanitize;
#[cfg(feature = "http")]
pub mod suggest;

pub use cache::{execute_cache_forget, execute_cache_list};
pub use check::execute_check;
pub use init::{execute_init, generate_default_config};
pub use proposals::{execute_proposals_list, execute_review};
pub use sanitize::execute_sanitize;
#[cfg(feature = "http")]
pub use suggest::execute_suggest;

use crate::error::{CliError, CliResult};
use healix::{HealixConfig, MemoryStore, PageSnapshot};
use std::io::Read;
use std::path::Path;

/// Read a snapshot file, or stdin for "-"
pub fn read_snapshot(path: &Path) -> CliResult<PageSnapshot> {
    let html = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| {
            CliError::invalid_argument(format!("cannot read snapshot {}: {e}", path.display()))
        })?
    };
    Ok(PageSnapshot::new(html))
}

/// Open the healing memory named by the configuration
pub fn open_memory(config: &HealixConfig, reporter: &crate::Reporter) -> MemoryStore {
    let memory = MemoryStore::from_config(&config.storage);
    tracing::debug!(
        cache = %config.storage.cache_file.display(),
        entries = memory.len(),
        "opened healing memory"
    );
    if memory.is_degraded() {
        reporter.warning(&format!(
            "healing memory unreadable ({} / {}); starting empty",
            config.storage.cache_file.display(),
            config.storage.ledger_file.display()
        ));
    }
    memory
}
