//! `grantcheck check`: one reconciliation round, then exit.

use std::io::Write;
use std::time::Duration;

use clap::Args;
use grantcheck_config::Settings;
use grantcheck_recon::diff::parse_field_list;
use grantcheck_recon::{check, CheckOptions, Field, ReconError, Report};
use grantcheck_sources::{HttpSettings, InstitutionalClient, RegistryClient, Session};

use crate::exit_codes::EXIT_DIFFS;
use crate::CliError;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Grant identifier to look up, e.g. HD012345
    #[arg(env = "GRANT_ID")]
    pub grant_id: Option<String>,

    /// Session cookie from a logged-in institutional browser session
    #[arg(long, env = "COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Emit the full report as JSON instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Comma-separated fields to compare, in report order
    #[arg(long, value_name = "LIST")]
    pub fields: Option<String>,

    /// Exit 1 when any field differs
    #[arg(long)]
    pub fail_on_diff: bool,

    /// Print both canonical records to stderr
    #[arg(long)]
    pub dump_records: bool,

    /// Suppress progress messages
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Flag/env value, trimmed; `None` when absent or blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn resolve_fields(flag: Option<&str>, settings: &Settings) -> Result<Vec<Field>, CliError> {
    match flag {
        None => Ok(settings.report.fields.clone()),
        Some(list) => {
            let fields = parse_field_list(list).map_err(|e| CliError::args(e.to_string()))?;
            if fields.is_empty() {
                return Err(CliError::args("--fields must name at least one field"));
            }
            Ok(fields)
        }
    }
}

pub(crate) fn http_settings(settings: &Settings) -> HttpSettings {
    HttpSettings {
        timeout: Duration::from_secs(settings.http.timeout_secs),
        max_retries: settings.http.max_retries,
        ..HttpSettings::default()
    }
}

/// Both HTTP clients, configured from settings.
pub(crate) fn build_sources(
    session: Session,
    settings: &Settings,
) -> Result<(InstitutionalClient, RegistryClient), ReconError> {
    let http = http_settings(settings);
    let institutional =
        InstitutionalClient::with_base_url(session, &settings.institutional.base_url, &http)?;
    let registry = RegistryClient::with_base_urls(
        &settings.registry.api_base,
        &settings.registry.services_base,
        &http,
    )?;
    Ok((institutional, registry))
}

pub(crate) fn write_report(out: &mut dyn Write, report: &Report, json: bool) -> Result<(), CliError> {
    let text = if json {
        let mut s = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::io(format!("cannot serialize report: {e}")))?;
        s.push('\n');
        s
    } else {
        report.render_text()
    };
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| CliError::io(format!("cannot write report: {e}")))
}

pub(crate) fn dump_records(report: &Report) -> Result<(), CliError> {
    for (label, record) in [("institutional", &report.institutional), ("registry", &report.registry)] {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| CliError::io(format!("cannot serialize {label} record: {e}")))?;
        eprintln!("{label}: {json}");
    }
    Ok(())
}

pub fn cmd_check(args: CheckArgs, settings: &Settings) -> Result<(), CliError> {
    let grant_id = non_blank(args.grant_id).ok_or_else(|| {
        CliError::args("no grant ID found").with_hint("pass it as an argument or set GRANT_ID")
    })?;
    let cookie = non_blank(args.cookie).ok_or_else(|| {
        CliError::args("no session cookie found")
            .with_hint("copy the Cookie header from a logged-in browser into --cookie or COOKIE")
    })?;

    let options = CheckOptions {
        fields: resolve_fields(args.fields.as_deref(), settings)?,
        ..settings.check_options()
    };

    let session = Session::new(cookie).map_err(CliError::recon)?;
    let (institutional, registry) = build_sources(session, settings).map_err(CliError::recon)?;

    if !args.quiet {
        eprintln!("Searching institution for {grant_id}, then NIH RePORTER...");
    }

    let report = check(&grant_id, &options, &institutional, &registry).map_err(CliError::recon)?;

    if args.dump_records {
        dump_records(&report)?;
    }
    write_report(&mut std::io::stdout().lock(), &report, args.json)?;

    if args.fail_on_diff && report.has_differences() {
        return Err(CliError {
            code: EXIT_DIFFS,
            message: String::new(),
            hint: None,
        });
    }
    Ok(())
}
