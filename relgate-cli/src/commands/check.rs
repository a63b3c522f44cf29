//! `relgate check` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use relgate_check_engine::{CheckExecutor, Keyring};
use relgate_core::config::RelgateConfig;
use relgate_core::policy::ReleasePolicy;
use relgate_core::types::{CheckResult, CheckStatus, Revision};
use relgate_ignore_rules::{CompiledRule, IgnoreRule, PartitionedResults, partition};

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
pub async fn execute(
    args: CheckArgs,
    config: &RelgateConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    if !args.path.is_dir() {
        return Err(CliError::Command(format!(
            "revision directory not found: {}",
            args.path.display()
        )));
    }
    let revision = revision_identity(&args)?;
    let policy = load_policy(args.policy.as_deref())?;
    let keyring = load_keyring(args.keyring.as_deref())?;
    let rules = load_rules(args.rules.as_deref())?;

    info!(
        revision = %revision,
        policy_rules = rules.len(),
        keys = keyring.len(),
        "running revision check"
    );

    let executor = CheckExecutor::builder()
        .config(config.engine.clone())
        .build();
    let summary = executor
        .run_revision(&revision, &args.path, &policy, Arc::new(keyring))
        .await?;

    let partitioned = partition(summary.results, &rules);
    let report = CheckReport::build(
        &revision,
        summary.executed,
        summary.cached,
        summary.skipped,
        &partitioned,
    );
    writer.render(&report)?;

    match blocking_error(policy.strict_checking, &partitioned) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Derive the revision identity from flags or the directory name
/// (`<project>-<version>`).
fn revision_identity(args: &CheckArgs) -> Result<Revision, CliError> {
    if let (Some(project), Some(version)) = (&args.project, &args.version) {
        return Ok(Revision::new(project, version, &args.revision));
    }
    let dir_name = args
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CliError::Command(format!(
                "cannot derive a release name from '{}'",
                args.path.display()
            ))
        })?;
    let (derived_project, derived_version) = dir_name.rsplit_once('-').ok_or_else(|| {
        CliError::Command(format!(
            "cannot derive project/version from '{dir_name}', pass --project and --version"
        ))
    })?;
    Ok(Revision::new(
        args.project.as_deref().unwrap_or(derived_project),
        args.version.as_deref().unwrap_or(derived_version),
        &args.revision,
    ))
}

fn load_policy(path: Option<&Path>) -> Result<ReleasePolicy, CliError> {
    let Some(path) = path else {
        return Ok(ReleasePolicy::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("cannot read policy file {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| CliError::Config(format!("invalid policy file {}: {e}", path.display())))
}

fn load_keyring(path: Option<&Path>) -> Result<Keyring, CliError> {
    match path {
        Some(path) => Keyring::load_from_file(path)
            .map_err(|e| CliError::Config(format!("cannot load keyring: {e}"))),
        None => Ok(Keyring::new()),
    }
}

#[derive(Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<IgnoreRule>,
}

/// Load and compile ignore rules from a TOML file (`[[rules]]` entries).
fn load_rules(path: Option<&Path>) -> Result<Vec<CompiledRule>, CliError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("cannot read rules file {}: {e}", path.display())))?;
    let file: RulesFile = toml::from_str(&content)
        .map_err(|e| CliError::Config(format!("invalid rules file {}: {e}", path.display())))?;
    file.rules
        .iter()
        .map(|rule| rule.compile().map_err(CliError::from))
        .collect()
}

/// Decide whether the visible results block the run.
///
/// Failures and exceptions always block; strict checking additionally
/// escalates warnings.
fn blocking_error(strict: bool, partitioned: &PartitionedResults) -> Option<CliError> {
    let failures = partitioned.visible_count(CheckStatus::Failure);
    let exceptions = partitioned.visible_count(CheckStatus::Exception);
    let warnings = partitioned.visible_count(CheckStatus::Warning);
    let escalated_warnings = if strict { warnings } else { 0 };
    if failures + exceptions + escalated_warnings > 0 {
        Some(CliError::ChecksFailed {
            failures,
            exceptions,
            escalated_warnings,
        })
    } else {
        None
    }
}

#[derive(Serialize)]
pub struct CheckReport {
    pub release: String,
    pub revision: String,
    pub executed: usize,
    pub cached: usize,
    pub skipped: usize,
    pub success: usize,
    pub warning: usize,
    pub failure: usize,
    pub exception: usize,
    pub ignored: usize,
    pub results: Vec<ResultEntry>,
}

#[derive(Serialize)]
pub struct ResultEntry {
    pub checker: String,
    pub path: Option<String>,
    pub member: Option<String>,
    pub status: String,
    pub message: String,
    pub cached: bool,
}

impl CheckReport {
    fn build(
        revision: &Revision,
        executed: usize,
        cached: usize,
        skipped: usize,
        partitioned: &PartitionedResults,
    ) -> Self {
        let mut visible: Vec<&CheckResult> = partitioned.visible.iter().collect();
        visible.sort_by_key(|r| {
            (
                status_rank(r.status),
                r.checker.clone(),
                r.primary_rel_path.clone(),
                r.member_rel_path.clone(),
            )
        });
        Self {
            release: revision.release_name(),
            revision: revision.number.clone(),
            executed,
            cached,
            skipped,
            success: partitioned.visible_count(CheckStatus::Success),
            warning: partitioned.visible_count(CheckStatus::Warning),
            failure: partitioned.visible_count(CheckStatus::Failure),
            exception: partitioned.visible_count(CheckStatus::Exception),
            ignored: partitioned.ignored.len(),
            results: visible
                .into_iter()
                .map(|r| ResultEntry {
                    checker: r.checker.clone(),
                    path: r.primary_rel_path.clone(),
                    member: r.member_rel_path.clone(),
                    status: r.status.to_string(),
                    message: r.message.clone(),
                    cached: r.cached,
                })
                .collect(),
        }
    }
}

/// Display order: blocking results first.
fn status_rank(status: CheckStatus) -> u8 {
    match status {
        CheckStatus::Failure => 0,
        CheckStatus::Exception => 1,
        CheckStatus::Warning => 2,
        CheckStatus::Success => 3,
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Revision {} r{} -- {} executed, {} cached, {} skipped",
            self.release.bold(),
            self.revision,
            self.executed,
            self.cached,
            self.skipped
        )?;
        writeln!(
            w,
            "  {} success, {} warning, {} failure, {} exception ({} ignored by rules)",
            self.success.to_string().green(),
            self.warning.to_string().yellow(),
            if self.failure > 0 {
                self.failure.to_string().red()
            } else {
                self.failure.to_string().normal()
            },
            self.exception,
            self.ignored
        )?;
        writeln!(w)?;

        for entry in &self.results {
            let status_colored = match entry.status.as_str() {
                "success" => entry.status.green(),
                "warning" => entry.status.yellow(),
                "failure" => entry.status.red(),
                _ => entry.status.magenta(),
            };
            let mut target = entry.path.clone().unwrap_or_else(|| "<revision>".to_owned());
            if let Some(member) = &entry.member {
                target.push('!');
                target.push_str(member);
            }
            let cached_mark = if entry.cached { " (cached)" } else { "" };
            writeln!(
                w,
                "  [{:<9}] {:<18} {}{}: {}",
                status_colored, entry.checker, target, cached_mark, entry.message
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn check_args(path: &str) -> CheckArgs {
        CheckArgs {
            path: PathBuf::from(path),
            project: None,
            version: None,
            revision: "00001".to_owned(),
            policy: None,
            keyring: None,
            rules: None,
        }
    }

    fn result(status: CheckStatus) -> CheckResult {
        CheckResult {
            id: "r-1".to_owned(),
            release_name: "widget-1.0".to_owned(),
            revision_number: "00001".to_owned(),
            checker: "hash.verify".to_owned(),
            primary_rel_path: Some("a.sha512".to_owned()),
            member_rel_path: None,
            status,
            message: "m".to_owned(),
            data: serde_json::Value::Null,
            created: SystemTime::now(),
            cached: false,
            inputs_hash: None,
            forwarded_from: None,
        }
    }

    #[test]
    fn identity_derived_from_directory_name() {
        let revision = revision_identity(&check_args("/data/widget-1.0.3")).unwrap();
        assert_eq!(revision.project, "widget-1.0");
        assert_eq!(revision.version, "3");

        let revision = revision_identity(&check_args("/data/widget-2.0")).unwrap();
        assert_eq!(revision.release_name(), "widget-2.0");
    }

    #[test]
    fn identity_flags_override_derivation() {
        let mut args = check_args("/data/anything");
        args.project = Some("widget".to_owned());
        args.version = Some("1.0".to_owned());
        let revision = revision_identity(&args).unwrap();
        assert_eq!(revision.project, "widget");
        assert_eq!(revision.version, "1.0");
        assert_eq!(revision.number, "00001");
    }

    #[test]
    fn underivable_identity_is_a_command_error() {
        let err = revision_identity(&check_args("/data/widget")).unwrap_err();
        assert!(matches!(err, CliError::Command(_)));
    }

    #[test]
    fn rules_file_loads_and_compiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(
            &path,
            r#"
[[rules]]
asf_uid = "alice"
checker_pattern = "archive.*"
status = "warning"
"#,
        )
        .unwrap();
        let rules = load_rules(Some(&path)).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].matches(&result(CheckStatus::Warning)));

        let mut archive_warning = result(CheckStatus::Warning);
        archive_warning.checker = "archive.structure".to_owned();
        assert!(rules[0].matches(&archive_warning));
    }

    #[test]
    fn empty_rule_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "[[rules]]\nasf_uid = \"alice\"\n").unwrap();
        let err = load_rules(Some(&path)).unwrap_err();
        assert!(matches!(err, CliError::Pattern(_)));
    }

    #[test]
    fn policy_file_parses_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.toml");
        std::fs::write(
            &path,
            "committee = \"widget\"\nlicense_check_mode = \"rat\"\nstrict_checking = true\n",
        )
        .unwrap();
        let policy = load_policy(Some(&path)).unwrap();
        assert_eq!(policy.committee, "widget");
        assert!(policy.strict_checking);
    }

    #[test]
    fn blocking_decision_follows_strict_flag() {
        let only_warnings = PartitionedResults {
            visible: vec![result(CheckStatus::Warning), result(CheckStatus::Success)],
            ignored: Vec::new(),
        };
        assert!(blocking_error(false, &only_warnings).is_none());
        match blocking_error(true, &only_warnings) {
            Some(CliError::ChecksFailed {
                escalated_warnings, ..
            }) => assert_eq!(escalated_warnings, 1),
            other => panic!("expected ChecksFailed, got {other:?}"),
        }

        let with_failure = PartitionedResults {
            visible: vec![result(CheckStatus::Failure)],
            ignored: Vec::new(),
        };
        assert!(matches!(
            blocking_error(false, &with_failure),
            Some(CliError::ChecksFailed { failures: 1, .. })
        ));
    }

    #[test]
    fn report_orders_blocking_results_first() {
        let partitioned = PartitionedResults {
            visible: vec![
                result(CheckStatus::Success),
                result(CheckStatus::Failure),
                result(CheckStatus::Warning),
            ],
            ignored: Vec::new(),
        };
        let report = CheckReport::build(
            &Revision::new("widget", "1.0", "00001"),
            3,
            0,
            0,
            &partitioned,
        );
        let statuses: Vec<&str> = report.results.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["failure", "warning", "success"]);
        assert_eq!(report.failure, 1);
        assert_eq!(report.ignored, 0);
    }
}
