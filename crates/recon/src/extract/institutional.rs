//! Institutional record-management pages (HTML forms and tables).
//!
//! Search page: one `tr.grid` / `tr.altgrid` row per revision. The first
//! cell links to the detail page (`grants_maint.php?serial=…`) with the grant
//! title as link text; the second cell holds the grant number.
//!
//! Detail page: a form whose inputs carry stable element ids. Every scalar is
//! read from the input's `value` attribute.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, SourceKind};
use crate::model::{GrantRecord, InstitutionalCandidate};
use crate::select::latest_revision;

use super::{parse_date, parse_whole_dollars, split_name};

const SOURCE: SourceKind = SourceKind::Institutional;

/// Element present only on the login form. Seeing it means the session
/// cookie was rejected and the page carries no record data.
pub const LOGIN_MARKER: &str = "#user_name__td";

pub const DEFAULT_FUNDING_CONTROL: &str = "grant_funding_source";

// ---------------------------------------------------------------------------
// Funding-source policy
// ---------------------------------------------------------------------------

/// Where the funding-institute code is read from on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingSource {
    /// Text of the currently selected option of `select#<id>`. With no
    /// `selected` attribute the first option is the one a browser shows.
    #[serde(rename = "selected")]
    SelectedOption(String),
    /// Text of the option with a fixed `value` attribute, wherever it sits.
    #[serde(rename = "option")]
    FixedOption(String),
}

impl Default for FundingSource {
    fn default() -> Self {
        Self::SelectedOption(DEFAULT_FUNDING_CONTROL.to_string())
    }
}

impl FundingSource {
    /// Selectors tried in order; the first match wins.
    fn css(&self) -> Vec<String> {
        match self {
            Self::SelectedOption(control_id) => vec![
                format!("select#{control_id} option[selected]"),
                format!("select#{control_id} option"),
            ],
            Self::FixedOption(value) => vec![format!("option[value=\"{value}\"]")],
        }
    }
}

impl std::fmt::Display for FundingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectedOption(control_id) => write!(f, "selected option of #{control_id}"),
            Self::FixedOption(value) => write!(f, "option value={value}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn selector(field: &str, css: &str) -> Result<Selector, ReconError> {
    Selector::parse(css)
        .map_err(|e| ReconError::extraction(SOURCE, field, format!("invalid selector {css:?}: {e:?}")))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Fail with `Authentication` if the page is the login form.
pub fn ensure_session(doc: &Html) -> Result<(), ReconError> {
    let marker = selector("session", LOGIN_MARKER)?;
    if doc.select(&marker).next().is_some() {
        return Err(ReconError::Authentication(
            "institutional system returned its login form; supply a fresh session cookie".into(),
        ));
    }
    Ok(())
}

/// Read the `value` attribute of the element with the given id.
fn input_value<'a>(doc: &'a Html, field: &str, id: &str) -> Result<&'a str, ReconError> {
    let sel = selector(field, &format!("#{id}"))?;
    let el = doc
        .select(&sel)
        .next()
        .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("element #{id} not found")))?;
    el.value()
        .attr("value")
        .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("element #{id} has no value")))
}

fn input_amount(doc: &Html, field: &str, id: &str) -> Result<i64, ReconError> {
    let raw = input_value(doc, field, id)?;
    parse_whole_dollars(raw)
        .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("not an amount: {raw:?}")))
}

fn input_date(doc: &Html, field: &str, id: &str) -> Result<chrono::NaiveDate, ReconError> {
    let raw = input_value(doc, field, id)?;
    parse_date(raw).ok_or_else(|| ReconError::extraction(SOURCE, field, format!("not a date: {raw:?}")))
}

/// Pull the serial token out of a detail link such as
/// `grants_maint.php?serial=12345`.
pub fn serial_from_href(href: &str) -> Option<String> {
    let (_, rest) = href
        .split_once("?serial=")
        .or_else(|| href.split_once("&serial="))?;
    let serial: String = rest
        .chars()
        .take_while(|c| !matches!(c, '&' | '#' | '"'))
        .collect();
    if serial.is_empty() {
        None
    } else {
        Some(serial)
    }
}

// ---------------------------------------------------------------------------
// Search page
// ---------------------------------------------------------------------------

/// Parse the search result table into candidates, in document order.
/// Rows without a grant-number cell are skipped.
pub fn parse_search_page(html: &str) -> Result<Vec<InstitutionalCandidate>, ReconError> {
    let doc = Html::parse_document(html);
    ensure_session(&doc)?;

    let rows = selector("searchRows", "tr.grid, tr.altgrid")?;
    let link = selector("searchRows", "a")?;

    let mut candidates = Vec::new();
    for row in doc.select(&rows) {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "td")
            .collect();

        let Some(number_cell) = cells.get(1) else {
            log::debug!("skipping search row without a grant number cell");
            continue;
        };
        let grant_number = element_text(*number_cell);
        if grant_number.is_empty() {
            continue;
        }

        let anchor = cells.first().and_then(|cell| cell.select(&link).next());
        let serial = anchor
            .and_then(|a| a.value().attr("href"))
            .and_then(serial_from_href);
        let title = anchor.map(element_text).filter(|t| !t.is_empty());

        candidates.push(InstitutionalCandidate {
            grant_number,
            serial,
            title,
        });
    }

    log::debug!("institutional search: {} candidate row(s)", candidates.len());
    Ok(candidates)
}

// ---------------------------------------------------------------------------
// Detail page
// ---------------------------------------------------------------------------

/// Parse the grant maintenance form into a canonical record.
///
/// `indirect_cost` is derived as `total - direct`; the page does not report it.
pub fn parse_detail_page(
    html: &str,
    title: Option<String>,
    funding: &FundingSource,
) -> Result<GrantRecord, ReconError> {
    let doc = Html::parse_document(html);
    ensure_session(&doc)?;

    let fullname = selector("names", "#fullname")?;
    let names = doc
        .select(&fullname)
        .map(|el| split_name(SOURCE, &element_text(el)))
        .collect::<Result<Vec<_>, _>>()?;
    if names.is_empty() {
        return Err(ReconError::extraction(SOURCE, "names", "no #fullname elements"));
    }

    let grant_id = input_value(&doc, "grantId", "grant_grant_number")?.trim().to_string();

    let mut institute = None;
    for css in funding.css() {
        let sel = selector("institute", &css)?;
        if let Some(el) = doc.select(&sel).next() {
            institute = Some(element_text(el));
            break;
        }
    }
    let institute = institute
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ReconError::extraction(SOURCE, "institute", format!("no funding source at {funding}"))
        })?;

    let total_cost = input_amount(&doc, "totalCost", "grant_total_costs")?;
    let direct_cost = input_amount(&doc, "directCost", "grant_annual_direct_costs")?;
    let indirect_cost = total_cost.checked_sub(direct_cost).ok_or_else(|| {
        ReconError::extraction(
            SOURCE,
            "indirectCost",
            format!("total {total_cost} minus direct {direct_cost} is out of range"),
        )
    })?;

    Ok(GrantRecord {
        grant_id,
        grant_title: title,
        names,
        institute,
        total_cost: Some(total_cost),
        direct_cost: Some(direct_cost),
        indirect_cost: Some(indirect_cost),
        current_start_date: Some(input_date(&doc, "currentStartDate", "grant_curr_start_date")?),
        current_end_date: Some(input_date(&doc, "currentEndDate", "grant_curr_end_date")?),
        project_start_date: Some(input_date(&doc, "projectStartDate", "grant_start_date")?),
        project_end_date: Some(input_date(&doc, "projectEndDate", "grant_end_date")?),
    })
}

/// Search page + detail page → canonical record, taking the title from the
/// latest revision row.
pub fn extract_institutional(
    search_html: &str,
    detail_html: &str,
    funding: &FundingSource,
) -> Result<GrantRecord, ReconError> {
    let candidates = parse_search_page(search_html)?;
    let chosen = latest_revision(&candidates)?;
    parse_detail_page(detail_html, chosen.title.clone(), funding)
}
