//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// cohort-tables - manuscript summary tables for the cohort study
///
/// Collects per-run model results, aggregates them across runs and writes
/// the published quartile and demographic performance tables.
///
/// Examples:
///   cohort-tables
///   cohort-tables --root ./project --verbose
///   cohort-tables --config study.toml --quiet
///   cohort-tables --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .cohort-tables.toml in the project root
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root that all configured paths are relative to
    #[arg(short, long, default_value = ".", value_name = "DIR", env = "COHORT_TABLES_ROOT")]
    pub root: PathBuf,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cohort-tables.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // --init-config writes into the root, so it must exist either way
        if !self.root.is_dir() {
            return Err(format!(
                "Project root is not a directory: {}",
                self.root.display()
            ));
        }

        if let Some(ref config) = self.config {
            if !config.is_file() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Log filter: `rust_log` directives (the `RUST_LOG` value) when given,
    /// otherwise the level from [`Args::log_level`].
    pub fn env_filter(&self, rust_log: Option<&str>) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.log_level()).into())
            .parse_lossy(rust_log.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_args() -> Args {
        Args {
            config: None,
            root: PathBuf::from("."),
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_parse_from_flags() {
        let args = Args::parse_from(["cohort-tables", "--root", "/tmp", "-v"]);
        assert_eq!(args.root, PathBuf::from("/tmp"));
        assert!(args.verbose);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_root_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir.csv");
        std::fs::write(&file, "a\n1\n").unwrap();

        let mut args = make_args();
        args.root = file;
        assert!(args.validate().unwrap_err().contains("not a directory"));
    }

    #[test]
    fn test_validation_missing_config_file() {
        let mut args = make_args();
        args.config = Some(PathBuf::from("/nonexistent/.cohort-tables.toml"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_env_filter_defaults_to_flag_level() {
        let mut args = make_args();
        assert_eq!(args.env_filter(None).to_string(), "info");

        args.verbose = true;
        assert_eq!(args.env_filter(Some("")).to_string(), "debug");
    }

    #[test]
    fn test_env_filter_honors_rust_log() {
        let filter = make_args().env_filter(Some("cohort_tables=trace"));
        assert!(filter.to_string().contains("cohort_tables=trace"));
    }
}
