//! Institutional grant database client (PHP form endpoints).

use grantcheck_recon::{InstitutionalSource, ReconError, SourceKind};
use url::Url;

use crate::client::{FetchClient, HttpSettings};

/// Session credential for the institutional system, taken from a logged-in
/// browser. Never logged.
#[derive(Clone)]
pub struct Session {
    cookie: String,
}

impl Session {
    pub fn new(cookie: impl Into<String>) -> Result<Self, ReconError> {
        let cookie = cookie.into().trim().to_string();
        if cookie.is_empty() {
            return Err(ReconError::Configuration(
                "session cookie is empty (set COOKIE or pass --cookie)".into(),
            ));
        }
        Ok(Self { cookie })
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("cookie", &"<redacted>").finish()
    }
}

pub struct InstitutionalClient {
    client: FetchClient,
    session: Session,
    base_url: String,
    origin: String,
}

impl InstitutionalClient {
    pub fn with_base_url(
        session: Session,
        base_url: &str,
        settings: &HttpSettings,
    ) -> Result<Self, ReconError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).map_err(|e| {
            ReconError::Configuration(format!("invalid institutional base URL {base_url:?}: {e}"))
        })?;

        Ok(Self {
            client: FetchClient::new(SourceKind::Institutional, settings)?,
            session,
            origin: parsed.origin().ascii_serialization(),
            base_url,
        })
    }

    fn list_url(&self) -> String {
        format!("{}/grants_list.php", self.base_url)
    }

    fn post(&self, url: &str) -> impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder + '_ {
        let url = url.to_string();
        move |http: &reqwest::blocking::Client| {
            http.post(&url)
                .header(reqwest::header::COOKIE, self.session.cookie())
                .header(reqwest::header::ORIGIN, &self.origin)
                .header(reqwest::header::REFERER, self.list_url())
                .header("Upgrade-Insecure-Requests", "1")
        }
    }
}

impl InstitutionalSource for InstitutionalClient {
    fn search(&self, identifier: &str, page_size: u32) -> Result<String, ReconError> {
        let url = self.list_url();
        log::debug!("POST {url} (grant number {identifier})");

        let page_size = page_size.to_string();
        let form = [
            ("post_grant_grant_number", identifier),
            ("post_HidPerPage", page_size.as_str()),
            ("post_Submit", "Y"),
        ];
        let post = self.post(&url);
        self.client.text(|http| post(http).form(&form))
    }

    fn detail(&self, serial: &str) -> Result<String, ReconError> {
        let url = format!("{}/grants_maint.php", self.base_url);
        log::debug!("POST {url}?serial={serial}");

        let post = self.post(&url);
        self.client.text(|http| post(http).query(&[("serial", serial)]))
    }
}
