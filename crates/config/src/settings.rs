use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use grantcheck_recon::{CheckOptions, Field, FundingSource, DEFAULT_FIELDS};
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum SettingsError {
    /// Reading or writing the config file failed.
    Io { path: PathBuf, message: String },
    /// The file is not valid TOML for this schema.
    Parse { path: Option<PathBuf>, message: String },
    /// Parsed, but a value is out of range.
    Invalid(String),
    /// `init` refused to overwrite an existing file.
    AlreadyExists(PathBuf),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Parse { path: Some(path), message } => {
                write!(f, "invalid config {}: {message}", path.display())
            }
            Self::Parse { path: None, message } => write!(f, "invalid config: {message}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
            Self::AlreadyExists(path) => write!(f, "{} already exists", path.display()),
        }
    }
}

impl std::error::Error for SettingsError {}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstitutionalSettings {
    pub base_url: String,
    /// Rows requested per search page.
    pub page_size: u32,
    pub funding_source: FundingSource,
}

impl Default for InstitutionalSettings {
    fn default() -> Self {
        Self {
            base_url: "https://gdb.pop.upenn.edu".into(),
            page_size: 99,
            funding_source: FundingSource::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    pub api_base: String,
    pub services_base: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.reporter.nih.gov".into(),
            services_base: "https://reporter.nih.gov/services".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    /// Compared fields, in report order.
    pub fields: Vec<Field>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            fields: DEFAULT_FIELDS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractiveSettings {
    pub max_rounds: u32,
}

impl Default for InteractiveSettings {
    fn default() -> Self {
        Self { max_rounds: 25 }
    }
}

/// Everything `grantcheck` reads from `config.toml`. Credentials are never
/// stored here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub institutional: InstitutionalSettings,
    pub registry: RegistrySettings,
    pub http: HttpSettings,
    pub report: ReportSettings,
    pub interactive: InteractiveSettings,
}

const DEFAULT_CONFIG: &str = r#"# grantcheck configuration
#
# Credentials do not belong here: pass the session cookie with --cookie or
# the COOKIE environment variable.

[institutional]
base_url = "https://gdb.pop.upenn.edu"
page_size = 99
# Where the funding institute is read on the grant detail page:
#   { selected = "<select id>" }  currently selected option of that control
#   { option = "<value>" }        option with a fixed value attribute
funding_source = { selected = "grant_funding_source" }

[registry]
api_base = "https://api.reporter.nih.gov"
services_base = "https://reporter.nih.gov/services"

[http]
timeout_secs = 30
# Extra attempts on HTTP 429 / 5xx / network errors
max_retries = 2

[report]
fields = [
    "names",
    "totalCost",
    "directCost",
    "indirectCost",
    "projectStartDate",
    "projectEndDate",
    "currentStartDate",
    "currentEndDate",
]

[interactive]
max_rounds = 25
"#;

fn check_url(name: &str, value: &str) -> Result<(), SettingsError> {
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(SettingsError::Invalid(format!(
            "{name} must be an http(s) URL, got {value:?}"
        )));
    }
    Ok(())
}

impl Settings {
    /// `<config_dir>/grantcheck/config.toml`
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grantcheck")
            .join("config.toml")
    }

    /// Load from the default location; a missing file means defaults.
    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents).map_err(|e| match e {
            SettingsError::Parse { path: None, message } => SettingsError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml(input: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(input).map_err(|e| SettingsError::Parse {
            path: None,
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        check_url("institutional.base_url", &self.institutional.base_url)?;
        check_url("registry.api_base", &self.registry.api_base)?;
        check_url("registry.services_base", &self.registry.services_base)?;

        if self.institutional.page_size == 0 {
            return Err(SettingsError::Invalid("institutional.page_size must be at least 1".into()));
        }
        if self.http.timeout_secs == 0 {
            return Err(SettingsError::Invalid("http.timeout_secs must be at least 1".into()));
        }
        if self.interactive.max_rounds == 0 {
            return Err(SettingsError::Invalid("interactive.max_rounds must be at least 1".into()));
        }

        if self.report.fields.is_empty() {
            return Err(SettingsError::Invalid("report.fields must not be empty".into()));
        }
        for (i, field) in self.report.fields.iter().enumerate() {
            if self.report.fields[..i].contains(field) {
                return Err(SettingsError::Invalid(format!("report.fields lists '{field}' twice")));
            }
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Parse {
            path: None,
            message: e.to_string(),
        })
    }

    /// Options for one reconciliation round.
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            page_size: self.institutional.page_size,
            funding_source: self.institutional.funding_source.clone(),
            fields: self.report.fields.clone(),
        }
    }

    /// Write the commented default file. Refuses to overwrite unless `force`.
    pub fn write_default(path: &Path, force: bool) -> Result<(), SettingsError> {
        if path.exists() && !force {
            return Err(SettingsError::AlreadyExists(path.to_path_buf()));
        }

        let io_err = |e: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, DEFAULT_CONFIG).map_err(io_err)
    }
}
