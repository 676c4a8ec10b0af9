//! Proposal review handlers
//!
//! The engine only ever appends pending proposals; accepting or rejecting
//! them is the reviewer's job and happens here.

use super::open_memory;
use crate::error::CliResult;
use crate::{OutputFormatArg, Reporter};
use healix::{HealixConfig, Proposal, ProposalStatus};
use std::io::Write;

/// List proposals, pending only unless `all`
pub fn execute_proposals_list(
    config: &HealixConfig,
    all: bool,
    format: OutputFormatArg,
    reporter: &Reporter,
    out: &mut impl Write,
) -> CliResult<()> {
    let memory = open_memory(config, reporter);
    let proposals = if all {
        memory.proposals()
    } else {
        memory.pending_proposals()
    };
    match format {
        OutputFormatArg::Json => writeln!(out, "{}", serde_json::to_string_pretty(&proposals)?)?,
        OutputFormatArg::Text => {
            for proposal in &proposals {
                writeln!(out, "{}", format_proposal(proposal))?;
            }
            reporter.info(&format!("{} proposal(s)", proposals.len()));
        }
    }
    Ok(())
}

/// Apply a reviewer decision
pub fn execute_review(
    config: &HealixConfig,
    id: &str,
    status: ProposalStatus,
    reporter: &Reporter,
) -> CliResult<()> {
    let memory = open_memory(config, reporter);
    let proposal = memory.set_proposal_status(id, status)?;
    reporter.success(&format!(
        "{} {}: {} -> {} ({})",
        status,
        short_id(&proposal),
        proposal.original_locator,
        proposal.suggested_locator,
        proposal.source_location
    ));
    Ok(())
}

/// One-line summary of a proposal
#[must_use]
pub fn format_proposal(proposal: &Proposal) -> String {
    format!(
        "{}  {:<14}  {}  {} -> {}",
        short_id(proposal),
        proposal.status.to_string(),
        proposal.source_location,
        proposal.original_locator,
        proposal.suggested_locator
    )
}

fn short_id(proposal: &Proposal) -> String {
    proposal.id.to_string().chars().take(8).collect()
}
