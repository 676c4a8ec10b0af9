//! Suggest command handler

use super::read_snapshot;
use crate::error::{CliError, CliResult};
use crate::{OutputFormatArg, Reporter, SuggestArgs};
use healix::{
    observe_page_errors, HealixConfig, OracleClient, Sanitizer, SuggestionQuery, SuggestionRecord,
};
use std::io::Write;

/// Build the query the engine would send for this failure
#[must_use]
pub fn build_query(
    config: &HealixConfig,
    locator: &str,
    snapshot: &healix::PageSnapshot,
    error: Option<&str>,
) -> SuggestionQuery {
    let error_context: String = error
        .unwrap_or_default()
        .chars()
        .take(config.engine.max_error_chars)
        .collect();
    SuggestionQuery {
        signature: locator.to_string(),
        context: Sanitizer::new(config.sanitizer.clone()).sanitize(snapshot),
        error_context,
        page_errors: observe_page_errors(snapshot, &config.engine.error_keywords),
    }
}

/// One-off oracle query, reporting whether Plan A would accept the answer
pub fn execute_suggest(
    config: &HealixConfig,
    args: &SuggestArgs,
    reporter: &Reporter,
    out: &mut impl Write,
) -> CliResult<()> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let query = build_query(config, &args.locator, &snapshot, args.error.as_deref());
    let client = OracleClient::new(config.oracle.clone());
    reporter.info(&format!(
        "asking {} ({}) about '{}'",
        client.endpoint(),
        client.model(),
        args.locator
    ));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Generic(format!("failed to start runtime: {e}")))?;
    let record = rt
        .block_on(client.request_suggestion(&query))
        .map_err(|e| CliError::oracle(e.to_string()))?;

    match args.format {
        OutputFormatArg::Json => writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?,
        OutputFormatArg::Text => write_text(&record, out)?,
    }

    let thresholds = config.engine.plan_a;
    let has_action = record.action.is_some();
    let threshold = thresholds.for_suggestion(has_action);
    if thresholds.accepts(record.confidence, has_action) {
        reporter.success(&format!(
            "confidence {:.2} meets the plan A threshold {threshold:.2}",
            record.confidence
        ));
    } else {
        reporter.warning(&format!(
            "confidence {:.2} is below the plan A threshold {threshold:.2}; the engine would not use it",
            record.confidence
        ));
    }
    Ok(())
}

fn write_text(record: &SuggestionRecord, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "target:     {}", record.target_locator)?;
    writeln!(
        out,
        "action:     {}",
        record
            .action
            .map_or_else(|| "(caller's)".to_string(), |a| a.to_string())
    )?;
    writeln!(out, "confidence: {:.2}", record.confidence)?;
    if !record.rationale.is_empty() {
        writeln!(out, "rationale:  {}", record.rationale)?;
    }
    Ok(())
}
