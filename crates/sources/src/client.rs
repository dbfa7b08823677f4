//! Shared HTTP plumbing: retry, backoff and status classification.

use std::thread;
use std::time::Duration;

use grantcheck_recon::{ReconError, SourceKind};

pub(crate) const USER_AGENT: &str = concat!("grantcheck/", env!("CARGO_PKG_VERSION"));

/// Transport knobs shared by both clients.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Additional attempts after the first, for 429 / 5xx / network errors.
    pub max_retries: u32,
    /// Wait before the first retry; doubled on each subsequent one.
    pub initial_backoff: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Blocking client bound to one upstream system.
///
/// Callers pass a request-building closure, invoked once per attempt.
/// 401/403 map to `Authentication`; any other failure that survives the
/// retries maps to `Transport` for the bound source.
pub(crate) struct FetchClient {
    http: reqwest::blocking::Client,
    source: SourceKind,
    settings: HttpSettings,
}

impl FetchClient {
    pub(crate) fn new(source: SourceKind, settings: &HttpSettings) -> Result<Self, ReconError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ReconError::Transport {
                source,
                message: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            source,
            settings: settings.clone(),
        })
    }

    fn transport(&self, message: String) -> ReconError {
        ReconError::Transport {
            source: self.source,
            message,
        }
    }

    fn send_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, ReconError> {
        let max_retries = self.settings.max_retries;
        let mut backoff = self.settings.initial_backoff;
        let mut attempt = 0u32;

        loop {
            match build_request(&self.http).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    // Only the institutional side carries a session.
                    if status == 401 || status == 403 {
                        let message = format!("{} rejected the request (HTTP {status})", self.source);
                        return Err(match self.source {
                            SourceKind::Institutional => ReconError::Authentication(message),
                            SourceKind::Registry => self.transport(message),
                        });
                    }

                    if status == 429 || status >= 500 {
                        if attempt >= max_retries {
                            return Err(self.transport(format!(
                                "HTTP {status} after {} attempt(s)",
                                attempt + 1,
                            )));
                        }

                        // Retry-After (seconds) wins over our own backoff for 429.
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or(backoff)
                        } else {
                            backoff
                        };

                        log::warn!(
                            "{}: retry {}/{} in {:?} (HTTP {status})",
                            self.source,
                            attempt + 1,
                            max_retries,
                            wait,
                        );
                        thread::sleep(wait);
                        backoff *= 2;
                        attempt += 1;
                        continue;
                    }

                    if status >= 400 {
                        let body = resp.text().unwrap_or_default();
                        return Err(self.transport(format!(
                            "HTTP {status}: {}",
                            body.chars().take(200).collect::<String>(),
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    if attempt >= max_retries {
                        return Err(self.transport(format!(
                            "request failed after {} attempt(s): {e}",
                            attempt + 1,
                        )));
                    }

                    log::warn!(
                        "{}: retry {}/{} in {:?} ({e})",
                        self.source,
                        attempt + 1,
                        max_retries,
                        backoff,
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                }
            }
        }
    }

    /// Send with retry and return the body as text.
    pub(crate) fn text(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, ReconError> {
        let resp = self.send_with_retry(build_request)?;
        resp.text()
            .map_err(|e| self.transport(format!("cannot read response body: {e}")))
    }

    /// Send with retry and parse the body as JSON.
    pub(crate) fn json(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, ReconError> {
        let text = self.text(build_request)?;
        let trimmed = text.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| {
            self.transport(format!(
                "invalid JSON response: {e} (body: {})",
                trimmed.chars().take(200).collect::<String>(),
            ))
        })
    }
}
