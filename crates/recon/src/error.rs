use std::fmt;

/// Which upstream system a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Institutional,
    Registry,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Institutional => write!(f, "institutional"),
            Self::Registry => write!(f, "registry"),
        }
    }
}

#[derive(Debug)]
pub enum ReconError {
    /// Required credential or identifier input is missing.
    Configuration(String),
    /// The institutional system rejected the session (login form or 401/403).
    Authentication(String),
    /// No usable candidate for the query.
    NotFound { source: SourceKind, message: String },
    /// A required field could not be located or parsed in a source payload.
    Extraction { source: SourceKind, field: String, detail: String },
    /// Network / HTTP failure talking to a source.
    Transport { source: SourceKind, message: String },
}

impl ReconError {
    pub(crate) fn extraction(
        source: SourceKind,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Extraction {
            source,
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Only a registry miss is recoverable: the caller may ask for a new
    /// identifier instead of terminating.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound {
                source: SourceKind::Registry,
                ..
            }
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Authentication(msg) => write!(f, "authentication failed: {msg}"),
            Self::NotFound { source: SourceKind::Registry, message } => {
                write!(f, "not found on registry: {message}")
            }
            Self::NotFound { source, message } => write!(f, "not found ({source}): {message}"),
            Self::Extraction { source, field, detail } => {
                write!(f, "{source} payload: cannot extract '{field}': {detail}")
            }
            Self::Transport { source, message } => write!(f, "{source} transport error: {message}"),
        }
    }
}

impl std::error::Error for ReconError {}
