//! Orchestration of one reconciliation round over two collaborators.
//!
//! The collaborators own transport. Everything here is sequential and
//! returns either a complete [`Report`] or an error; no partial output.

use serde_json::Value;

use crate::diff::{Field, DEFAULT_FIELDS};
use crate::error::ReconError;
use crate::extract::institutional::{parse_detail_page, parse_search_page};
use crate::extract::registry::{build_record, parse_search_results, partial_id_pattern};
use crate::extract::FundingSource;
use crate::model::ResolvedPair;
use crate::report::Report;
use crate::select::{latest_registry_match, latest_revision};

/// Institutional record-management system.
pub trait InstitutionalSource {
    /// Search page HTML for a grant identifier.
    fn search(&self, identifier: &str, page_size: u32) -> Result<String, ReconError>;
    /// Detail page HTML for a serial token taken from the search page.
    fn detail(&self, serial: &str) -> Result<String, ReconError>;
}

/// Government grant registry.
pub trait RegistrySource {
    /// Search response for a wildcard project-number pattern.
    fn search(&self, pattern: &str) -> Result<Value, ReconError>;
    fn funding_detail(&self, application_id: i64) -> Result<Value, ReconError>;
    fn project_detail(&self, application_id: i64) -> Result<Value, ReconError>;
}

/// Knobs for a round.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub page_size: u32,
    pub funding_source: FundingSource,
    pub fields: Vec<Field>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            page_size: 99,
            funding_source: FundingSource::default(),
            fields: DEFAULT_FIELDS.to_vec(),
        }
    }
}

/// Fetch and extract both records for `query`.
///
/// The institutional side runs first: its institute code filters the
/// registry candidates.
pub fn resolve_pair(
    query: &str,
    options: &CheckOptions,
    institutional: &dyn InstitutionalSource,
    registry: &dyn RegistrySource,
) -> Result<ResolvedPair, ReconError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ReconError::Configuration("grant identifier is empty".into()));
    }

    log::debug!("institutional search for {query}");
    let search_html = institutional.search(query, options.page_size)?;
    let candidates = parse_search_page(&search_html)?;
    let revision = latest_revision(&candidates)?;
    let serial = revision.serial.as_deref().unwrap_or_default();

    log::debug!("institutional detail for serial {serial}");
    let detail_html = institutional.detail(serial)?;
    let inst_record = parse_detail_page(&detail_html, revision.title.clone(), &options.funding_source)?;

    let pattern = partial_id_pattern(query);
    log::debug!("registry search for {pattern} (institute {})", inst_record.institute);
    let body = registry.search(&pattern)?;
    let hits = parse_search_results(&body)?;
    let chosen = latest_registry_match(&hits, &inst_record.institute)?;

    let funding = registry.funding_detail(chosen.application_id)?;
    let project = registry.project_detail(chosen.application_id)?;
    let reg_record = build_record(chosen, &funding, &project)?;

    Ok(ResolvedPair {
        query: query.to_string(),
        application_id: chosen.application_id,
        institutional: inst_record,
        registry: reg_record,
    })
}

/// One full round: resolve both records, then diff them.
pub fn check(
    query: &str,
    options: &CheckOptions,
    institutional: &dyn InstitutionalSource,
    registry: &dyn RegistrySource,
) -> Result<Report, ReconError> {
    let pair = resolve_pair(query, options, institutional, registry)?;
    let report = Report::new(pair, &options.fields);
    log::info!(
        "{}: {} difference(s) across {} field(s)",
        report.grant_id,
        report.diffs.len(),
        report.fields.len()
    );
    Ok(report)
}
