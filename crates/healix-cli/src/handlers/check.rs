//! Check command handler

use crate::error::CliResult;
use crate::{CheckArgs, Reporter};
use healix::HealixConfig;

/// Summarize the configuration and, unless offline, probe the oracle
///
/// The configuration has already been validated when it was loaded.
pub fn execute_check(
    config: &HealixConfig,
    args: &CheckArgs,
    reporter: &Reporter,
) -> CliResult<()> {
    reporter.header("Healix configuration");
    reporter.success("configuration is valid");
    reporter.info(&format!(
        "oracle: {} at {} ({} ms)",
        config.oracle.model, config.oracle.endpoint, config.oracle.timeout_ms
    ));
    let engine = &config.engine;
    reporter.info(&format!(
        "plan A accepts >= {:.2} / {:.2}, plan B >= {:.2} / {:.2} (with / without action)",
        engine.plan_a.with_action,
        engine.plan_a.without_action,
        engine.plan_b.with_action,
        engine.plan_b.without_action
    ));
    reporter.info(&format!(
        "timeouts: {} / {} / {} ms",
        engine.timeouts.original_ms, engine.timeouts.plan_a_ms, engine.timeouts.plan_b_ms
    ));
    reporter.info(&format!(
        "memory: {} and {}",
        config.storage.cache_file.display(),
        config.storage.ledger_file.display()
    ));

    if args.offline {
        return Ok(());
    }
    probe_oracle(config, reporter)
}

#[cfg(feature = "http")]
fn probe_oracle(config: &HealixConfig, reporter: &Reporter) -> CliResult<()> {
    use crate::error::CliError;

    let client = healix::OracleClient::new(config.oracle.clone());
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Generic(format!("failed to start runtime: {e}")))?;
    rt.block_on(client.health_check())
        .map_err(|e| CliError::oracle(e.to_string()))?;
    reporter.success(&format!("oracle reachable at {}", client.endpoint()));
    Ok(())
}

#[cfg(not(feature = "http"))]
fn probe_oracle(_config: &HealixConfig, reporter: &Reporter) -> CliResult<()> {
    reporter.warning("built without the http feature; skipping oracle probe");
    Ok(())
}
