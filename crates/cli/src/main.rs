// grantcheck CLI - reconcile institutional grant records against NIH RePORTER

mod check;
mod config_cmd;
mod exit_codes;
mod interactive;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use grantcheck_config::SettingsError;
use grantcheck_recon::{ReconError, SourceKind};
use tracing_subscriber::EnvFilter;

use check::CheckArgs;
use config_cmd::ConfigCommands;
use exit_codes::{recon_exit_code, EXIT_CONFIG, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use interactive::InteractiveArgs;

#[derive(Parser)]
#[command(name = "grantcheck")]
#[command(about = "Compare a grant's institutional record with NIH RePORTER")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: String,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one grant and print the differences
    #[command(after_help = "\
Examples:
  grantcheck check HD012345 --cookie 'PHPSESSID=...'
  COOKIE='PHPSESSID=...' GRANT_ID=HD012345 grantcheck check
  grantcheck check HD012345 --json --fields totalCost,currentEndDate
  grantcheck check HD012345 --fail-on-diff --quiet || echo 'records differ'")]
    Check(CheckArgs),

    /// Prompt for grant IDs and reconcile each in turn
    #[command(after_help = "\
Examples:
  grantcheck interactive
  COOKIE='PHPSESSID=...' grantcheck interactive --grant-id HD012345")]
    Interactive(InteractiveArgs),

    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

/// stderr subscriber; RUST_LOG wins over `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        None => {
            eprintln!("Usage: grantcheck <command> [options]");
            eprintln!("       grantcheck --help for more information");
            Ok(())
        }
        Some(Commands::Config(cmd)) => config_cmd::cmd_config(cmd, cli.config),
        Some(Commands::Check(args)) => config_cmd::load_settings(cli.config.as_deref())
            .and_then(|settings| check::cmd_check(args, &settings)),
        Some(Commands::Interactive(args)) => config_cmd::load_settings(cli.config.as_deref())
            .and_then(|settings| interactive::cmd_interactive(args, &settings)),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn settings(err: SettingsError) -> Self {
        let hint = match &err {
            SettingsError::AlreadyExists(_) => Some("pass --force to overwrite".to_string()),
            SettingsError::Parse { .. } | SettingsError::Invalid(_) => {
                Some("`grantcheck config init --force` rewrites the defaults".to_string())
            }
            SettingsError::Io { .. } => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    /// Create error from a reconciliation error with proper exit code.
    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::Authentication(_) => {
                Some("the session cookie has expired; copy a fresh one from the browser".to_string())
            }
            ReconError::Extraction { source: SourceKind::Institutional, .. } => {
                Some("the institutional page layout may have changed; rerun with --log-level debug".to_string())
            }
            ReconError::NotFound { source: SourceKind::Institutional, .. } => {
                Some("check the grant ID, e.g. HD012345".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
