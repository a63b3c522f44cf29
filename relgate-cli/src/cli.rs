//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Relgate -- release revision validation engine.
///
/// Use `relgate <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "relgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to the relgate.toml configuration file.
    #[arg(short, long, default_value = "relgate.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run all checks over a revision directory.
    Check(CheckArgs),

    /// Ignore-rule pattern tooling.
    Pattern(PatternArgs),
}

// ---- check ----

/// Run the check executor over a revision directory.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Revision directory containing the uploaded file set.
    pub path: PathBuf,

    /// Project name (default: derived from the directory name).
    #[arg(long)]
    pub project: Option<String>,

    /// Version (default: derived from the directory name).
    #[arg(long)]
    pub version: Option<String>,

    /// Revision number.
    #[arg(long, default_value = "00001")]
    pub revision: String,

    /// Release policy TOML file.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Committee keyring TOML file.
    #[arg(long)]
    pub keyring: Option<PathBuf>,

    /// Ignore rules TOML file applied to the report.
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

// ---- pattern ----

/// Validate and probe ignore-rule patterns.
#[derive(Args, Debug)]
pub struct PatternArgs {
    #[command(subcommand)]
    pub action: PatternAction,
}

#[derive(Subcommand, Debug)]
pub enum PatternAction {
    /// Validate a pattern without evaluating it.
    Validate {
        /// Pattern to validate.
        pattern: String,
    },
    /// Evaluate a pattern against a field value.
    Match {
        /// Pattern to evaluate.
        pattern: String,
        /// Field value ("-" probes an absent field).
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_check_basic() {
        let args = Cli::try_parse_from(["relgate", "check", "/data/widget-1.0"]);
        assert!(args.is_ok(), "should parse 'check' subcommand");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Check(check_args) => {
                assert_eq!(check_args.path, PathBuf::from("/data/widget-1.0"));
                assert_eq!(check_args.revision, "00001");
                assert!(check_args.project.is_none());
                assert!(check_args.policy.is_none());
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_check_full_options() {
        let args = Cli::try_parse_from([
            "relgate",
            "check",
            "/data/widget-1.0",
            "--project",
            "widget",
            "--version",
            "1.0",
            "--revision",
            "00003",
            "--policy",
            "policy.toml",
            "--keyring",
            "keys.toml",
            "--rules",
            "rules.toml",
        ]);
        assert!(args.is_ok(), "should parse check with all options");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Check(check_args) => {
                assert_eq!(check_args.project.as_deref(), Some("widget"));
                assert_eq!(check_args.version.as_deref(), Some("1.0"));
                assert_eq!(check_args.revision, "00003");
                assert_eq!(check_args.policy, Some(PathBuf::from("policy.toml")));
                assert_eq!(check_args.keyring, Some(PathBuf::from("keys.toml")));
                assert_eq!(check_args.rules, Some(PathBuf::from("rules.toml")));
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_pattern_validate() {
        let args = Cli::try_parse_from(["relgate", "pattern", "validate", "archive.*"]);
        assert!(args.is_ok(), "should parse 'pattern validate'");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Pattern(pattern_args) => match pattern_args.action {
                PatternAction::Validate { pattern } => {
                    assert_eq!(pattern, "archive.*");
                }
                _ => panic!("expected Validate action"),
            },
            _ => panic!("expected Pattern command"),
        }
    }

    #[test]
    fn test_cli_parse_pattern_match() {
        let args =
            Cli::try_parse_from(["relgate", "pattern", "match", "^rat\\.", "rat.scan"]);
        assert!(args.is_ok(), "should parse 'pattern match'");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Pattern(pattern_args) => match pattern_args.action {
                PatternAction::Match { pattern, value } => {
                    assert_eq!(pattern, "^rat\\.");
                    assert_eq!(value, "rat.scan");
                }
                _ => panic!("expected Match action"),
            },
            _ => panic!("expected Pattern command"),
        }
    }

    #[test]
    fn test_cli_parse_custom_config_path() {
        let args = Cli::try_parse_from(["relgate", "-c", "/custom/config.toml", "check", "."]);
        assert!(args.is_ok(), "should parse with custom config path");
        let cli = args.expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/custom/config.toml"));
    }

    #[test]
    fn test_cli_parse_log_level() {
        let args = Cli::try_parse_from(["relgate", "--log-level", "debug", "check", "."]);
        assert!(args.is_ok(), "should parse with custom log level");
        let cli = args.expect("parse succeeded");
        assert_eq!(cli.log_level, Some("debug".to_owned()));
    }

    #[test]
    fn test_cli_parse_output_format_json() {
        let args = Cli::try_parse_from(["relgate", "--output", "json", "check", "."]);
        assert!(args.is_ok(), "should parse with json output format");
        let cli = args.expect("parse succeeded");
        match cli.output {
            OutputFormat::Json => {}
            _ => panic!("expected Json output format"),
        }
    }

    #[test]
    fn test_cli_parse_invalid_command_fails() {
        let args = Cli::try_parse_from(["relgate", "invalid-command"]);
        assert!(args.is_err(), "should fail on invalid command");
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["relgate"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "relgate");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(
            subcommands.contains(&"check"),
            "should have 'check' subcommand"
        );
        assert!(
            subcommands.contains(&"pattern"),
            "should have 'pattern' subcommand"
        );
    }
}
