//! Healix CLI: self-healing locator tooling
//!
//! ## Usage
//!
//! ```bash
//! healix sanitize page.html --observe       # What the oracle would see
//! healix suggest '#old-id' -s page.html      # Ask the oracle once
//! healix cache list                          # Cached fixes
//! healix proposals list                      # Pending review
//! healix proposals accept 3f2a               # Accept by id prefix
//! ```

use clap::Parser;
use healix::ProposalStatus;
use healix_cli::{
    handlers, CacheCommand, Cli, CliConfig, CliResult, ColorChoice, Commands, ProposalCommand,
    Reporter, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match run(cli, &config, &reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.failure(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &CliConfig, reporter: &Reporter) -> CliResult<()> {
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Init(args) => handlers::execute_init(&args, reporter),
        Commands::Sanitize(args) => {
            let healix = config.load_healix()?;
            handlers::execute_sanitize(&healix, &args, reporter, &mut stdout)
        }
        #[cfg(feature = "http")]
        Commands::Suggest(args) => {
            let healix = config.load_healix()?;
            handlers::execute_suggest(&healix, &args, reporter, &mut stdout)
        }
        #[cfg(not(feature = "http"))]
        Commands::Suggest(_) => Err(healix_cli::CliError::Generic(
            "oracle client not enabled. Rebuild with --features http".to_string(),
        )),
        Commands::Cache(args) => {
            let healix = config.load_healix()?;
            match args.command {
                CacheCommand::List { format } => {
                    handlers::execute_cache_list(&healix, format, reporter, &mut stdout)
                }
                CacheCommand::Forget { signature } => {
                    handlers::execute_cache_forget(&healix, &signature, reporter)
                }
            }
        }
        Commands::Proposals(args) => {
            let healix = config.load_healix()?;
            match args.command {
                ProposalCommand::List { all, format } => {
                    handlers::execute_proposals_list(&healix, all, format, reporter, &mut stdout)
                }
                ProposalCommand::Accept { id } => {
                    handlers::execute_review(&healix, &id, ProposalStatus::Accepted, reporter)
                }
                ProposalCommand::Reject { id } => {
                    handlers::execute_review(&healix, &id, ProposalStatus::Rejected, reporter)
                }
            }
        }
        Commands::Check(args) => {
            let healix = config.load_healix()?;
            handlers::execute_check(&healix, &args, reporter)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_config_path(cli.config.clone())
        .with_oracle_url(cli.oracle_url.clone())
        .with_model(cli.model.clone())
}

fn init_tracing(verbosity: Verbosity) {
    // RUST_LOG wins over -v/-q
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
