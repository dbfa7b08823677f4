//! NIH RePORTER client: project search API plus the two detail services
//! behind the public project pages.

use grantcheck_recon::{RegistrySource, ReconError, SourceKind};
use serde_json::{json, Value};

use crate::client::{FetchClient, HttpSettings};

pub struct RegistryClient {
    client: FetchClient,
    api_base: String,
    services_base: String,
}

impl RegistryClient {
    pub fn with_base_urls(
        api_base: &str,
        services_base: &str,
        settings: &HttpSettings,
    ) -> Result<Self, ReconError> {
        Ok(Self {
            client: FetchClient::new(SourceKind::Registry, settings)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            services_base: services_base.trim_end_matches('/').to_string(),
        })
    }

    fn service(&self, name: &str, application_id: i64) -> Result<Value, ReconError> {
        let url = format!("{}/Projects/{name}", self.services_base);
        log::debug!("GET {url}?projectId={application_id}");

        let id = application_id.to_string();
        self.client
            .json(|http| http.get(&url).query(&[("projectId", id.as_str())]))
    }
}

impl RegistrySource for RegistryClient {
    fn search(&self, pattern: &str) -> Result<Value, ReconError> {
        let url = format!("{}/v1/projects/Search", self.api_base);
        log::debug!("POST {url} (project_nums {pattern})");

        let body = json!({ "criteria": { "project_nums": pattern } });
        self.client.json(|http| http.post(&url).json(&body))
    }

    fn funding_detail(&self, application_id: i64) -> Result<Value, ReconError> {
        self.service("ProjectFundingDetail", application_id)
    }

    fn project_detail(&self, application_id: i64) -> Result<Value, ReconError> {
        self.service("ProjectDetail", application_id)
    }
}
