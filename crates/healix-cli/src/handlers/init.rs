//! Init command handler

use crate::error::{CliError, CliResult};
use crate::{InitArgs, Reporter};
use healix::{HealixConfig, DEFAULT_CONFIG_FILE};

const HEADER: &str = "\
# Healix configuration
#
# Relative storage paths resolve against the working directory of the
# test run. Delete a section to fall back to its defaults.
";

/// Render the default configuration file
pub fn generate_default_config() -> CliResult<String> {
    let body = HealixConfig::default().to_yaml()?;
    Ok(format!("{HEADER}\n{body}"))
}

/// Write `healix.yaml` into the target directory
pub fn execute_init(args: &InitArgs, reporter: &Reporter) -> CliResult<()> {
    if !args.path.is_dir() {
        return Err(CliError::invalid_argument(format!(
            "not a directory: {}",
            args.path.display()
        )));
    }
    let target = args.path.join(DEFAULT_CONFIG_FILE);
    if target.exists() && !args.force {
        return Err(CliError::config(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }
    std::fs::write(&target, generate_default_config()?)?;
    reporter.success(&format!("wrote {}", target.display()));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_loads() {
        let text = generate_default_config().unwrap();
        assert!(text.starts_with("# Healix configuration"));
        let config = HealixConfig::from_yaml(&text).unwrap();
        assert_eq!(config, HealixConfig::default());
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            path: dir.path().to_path_buf(),
            force: false,
        };
        let reporter = Reporter::new(false, true);

        execute_init(&args, &reporter).unwrap();
        assert!(dir.path().join("healix.yaml").exists());
        assert!(matches!(
            execute_init(&args, &reporter),
            Err(CliError::Config { .. })
        ));

        let forced = InitArgs {
            force: true,
            ..args
        };
        execute_init(&forced, &reporter).unwrap();
    }

    #[test]
    fn test_init_missing_directory() {
        let args = InitArgs {
            path: "/nonexistent/healix".into(),
            force: false,
        };
        assert!(execute_init(&args, &Reporter::new(false, true)).is_err());
    }
}
