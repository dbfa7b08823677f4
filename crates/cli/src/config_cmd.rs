//! `grantcheck config`: locate, create and inspect the config file.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use grantcheck_config::Settings;

use crate::CliError;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the config file path
    Path,

    /// Write a commented default config file
    #[command(after_help = "\
Examples:
  grantcheck config init
  grantcheck config init --force
  grantcheck --config ./grantcheck.toml config init")]
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective settings as TOML
    Show,
}

pub fn cmd_config(cmd: ConfigCommands, path_override: Option<PathBuf>) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Path => {
            let path = path_override.unwrap_or_else(Settings::config_path);
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init { force } => {
            let path = path_override.unwrap_or_else(Settings::config_path);
            Settings::write_default(&path, force).map_err(CliError::settings)?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let settings = load_settings(path_override.as_deref())?;
            let text = settings.to_toml().map_err(CliError::settings)?;
            print!("{text}");
            Ok(())
        }
    }
}

/// An explicit `--config` path must exist; the default location falls back
/// to built-in defaults when absent.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let settings = match path {
        Some(p) => Settings::load_from(p),
        None => Settings::load(),
    }
    .map_err(CliError::settings)?;
    log::debug!("settings: {settings:?}");
    Ok(settings)
}
