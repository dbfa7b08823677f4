//! `grantcheck interactive`: prompt for grant IDs until the user quits.
//!
//! The session cookie is asked for once and reused for every round. A
//! grant that is missing from either source re-prompts; anything else ends
//! the session with the usual exit code.

use std::io::{BufRead, Write};

use clap::Args;
use grantcheck_config::Settings;
use grantcheck_recon::{check, CheckOptions, ReconError, Report, SourceKind};
use grantcheck_sources::Session;

use crate::check::{build_sources, dump_records, non_blank, resolve_fields, write_report};
use crate::CliError;

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Session cookie; prompted for when absent
    #[arg(long, env = "COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Grant ID for the first round; later rounds prompt
    #[arg(long, env = "GRANT_ID")]
    pub grant_id: Option<String>,

    /// Comma-separated fields to compare, in report order
    #[arg(long, value_name = "LIST")]
    pub fields: Option<String>,

    /// Emit each report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print both canonical records to stderr after each round
    #[arg(long)]
    pub dump_records: bool,
}

/// Line-oriented prompts over any reader/writer pair.
pub(crate) struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `label` and read one trimmed line. `None` on end of input.
    pub(crate) fn ask(&mut self, label: &str) -> Result<Option<String>, CliError> {
        write!(self.output, "{label}")
            .and_then(|_| self.output.flush())
            .map_err(|e| CliError::io(format!("cannot write prompt: {e}")))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| CliError::io(format!("cannot read input: {e}")))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn say(&mut self, message: &str) -> Result<(), CliError> {
        writeln!(self.output, "{message}").map_err(|e| CliError::io(format!("cannot write output: {e}")))
    }

    fn output(&mut self) -> &mut W {
        &mut self.output
    }
}

fn is_quit(answer: &str) -> bool {
    answer.is_empty() || answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit")
}

/// Errors that send the user back to the grant prompt.
fn retry_message(err: &ReconError) -> Option<String> {
    match err {
        ReconError::NotFound { source: SourceKind::Institutional, .. } => {
            Some(format!("{err}; try another grant ID"))
        }
        e if e.is_recoverable() => Some(e.to_string()),
        _ => None,
    }
}

/// Drive up to `max_rounds` rounds. `round` performs one reconciliation for
/// a grant ID with the remembered session.
pub(crate) fn run_loop<R, W>(
    prompter: &mut Prompter<R, W>,
    mut first_grant: Option<String>,
    cookie: Option<String>,
    max_rounds: u32,
    json: bool,
    mut round: impl FnMut(&str, &Session) -> Result<Report, ReconError>,
) -> Result<(), CliError>
where
    R: BufRead,
    W: Write,
{
    let cookie = match cookie {
        Some(c) => c,
        None => prompter.ask("Session cookie: ")?.unwrap_or_default(),
    };
    let session = Session::new(cookie)
        .map_err(|e| CliError::recon(e).with_hint("copy the Cookie header from a logged-in browser"))?;

    for n in 1..=max_rounds {
        let grant_id = match first_grant.take() {
            Some(id) => id,
            None => match prompter.ask("Grant ID (blank to quit): ")? {
                Some(answer) if !is_quit(&answer) => answer,
                _ => return Ok(()),
            },
        };

        log::debug!("interactive round {n}/{max_rounds}: {grant_id}");
        match round(&grant_id, &session) {
            Ok(report) => write_report(prompter.output(), &report, json)?,
            Err(err) => match retry_message(&err) {
                Some(message) => prompter.say(&message)?,
                None => return Err(CliError::recon(err)),
            },
        }
    }

    prompter.say(&format!("Stopping after {max_rounds} rounds."))
}

pub fn cmd_interactive(args: InteractiveArgs, settings: &Settings) -> Result<(), CliError> {
    let options = CheckOptions {
        fields: resolve_fields(args.fields.as_deref(), settings)?,
        ..settings.check_options()
    };

    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());
    let dump = args.dump_records;

    run_loop(
        &mut prompter,
        non_blank(args.grant_id),
        non_blank(args.cookie),
        settings.interactive.max_rounds,
        args.json,
        |grant_id, session| {
            let (institutional, registry) = build_sources(session.clone(), settings)?;
            let report = check(grant_id, &options, &institutional, &registry)?;
            if dump {
                if let Err(e) = dump_records(&report) {
                    log::warn!("{}", e.message);
                }
            }
            Ok(report)
        },
    )
}
