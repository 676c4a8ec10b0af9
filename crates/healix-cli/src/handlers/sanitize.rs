//! Sanitize command handler

use super::read_snapshot;
use crate::error::CliResult;
use crate::{Reporter, SanitizeArgs};
use healix::{observe_page_errors, HealixConfig, Sanitizer};
use std::io::Write;

/// Print the sanitized context for a snapshot
pub fn execute_sanitize(
    config: &HealixConfig,
    args: &SanitizeArgs,
    reporter: &Reporter,
    out: &mut impl Write,
) -> CliResult<()> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let mut sanitizer_config = config.sanitizer.clone();
    if let Some(max_chars) = args.max_chars {
        sanitizer_config = sanitizer_config.with_max_chars(max_chars);
    }
    let context = Sanitizer::new(sanitizer_config).sanitize(&snapshot);
    writeln!(out, "{context}")?;

    reporter.info(&format!(
        "{} of {} characters kept",
        context.char_len(),
        snapshot.as_str().chars().count()
    ));
    if args.observe {
        let found = observe_page_errors(&snapshot, &config.engine.error_keywords);
        if found.is_empty() {
            reporter.info("no failure keywords on the page");
        } else {
            reporter.warning(&format!("page shows: {}", found.join(", ")));
        }
    }
    Ok(())
}
