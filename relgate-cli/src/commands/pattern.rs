//! `relgate pattern` command handler

use std::io::Write;

use serde::Serialize;

use relgate_ignore_rules::{Pattern, validate_pattern};

use crate::cli::{PatternAction, PatternArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `pattern` command.
pub fn execute(args: PatternArgs, writer: &OutputWriter) -> Result<(), CliError> {
    match args.action {
        PatternAction::Validate { pattern } => execute_validate(&pattern, writer),
        PatternAction::Match { pattern, value } => execute_match(&pattern, &value, writer),
    }
}

fn execute_validate(pattern: &str, writer: &OutputWriter) -> Result<(), CliError> {
    validate_pattern(pattern)?;
    let compiled = Pattern::parse(pattern)?;
    let report = PatternReport {
        pattern: pattern.to_owned(),
        mode: mode_name(&compiled).to_owned(),
        value: None,
        matched: None,
    };
    writer.render(&report)?;
    Ok(())
}

fn execute_match(pattern: &str, value: &str, writer: &OutputWriter) -> Result<(), CliError> {
    let compiled = Pattern::parse(pattern)?;
    // "-" probes the absent-field case (e.g. results without a member path)
    let probe = if value == "-" { None } else { Some(value) };
    let matched = compiled.matches(probe);
    let report = PatternReport {
        pattern: pattern.to_owned(),
        mode: mode_name(&compiled).to_owned(),
        value: probe.map(str::to_owned),
        matched: Some(matched),
    };
    writer.render(&report)?;
    Ok(())
}

fn mode_name(pattern: &Pattern) -> &'static str {
    match pattern {
        Pattern::Glob { .. } => "glob",
        Pattern::Regex { .. } => "regex",
        Pattern::Negated(_) => "negated",
        Pattern::MissingOnly => "missing-only",
    }
}

#[derive(Serialize)]
pub struct PatternReport {
    pub pattern: String,
    pub mode: String,
    pub value: Option<String>,
    pub matched: Option<bool>,
}

impl Render for PatternReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Pattern: {} ({})", self.pattern.bold(), self.mode)?;
        match self.matched {
            Some(true) => writeln!(
                w,
                "  {} '{}'",
                "matches".green(),
                self.value.as_deref().unwrap_or("<absent>")
            )?,
            Some(false) => writeln!(
                w,
                "  {} '{}'",
                "does not match".red(),
                self.value.as_deref().unwrap_or("<absent>")
            )?,
            None => writeln!(w, "  {}", "valid".green())?,
        }
        Ok(())
    }
}
