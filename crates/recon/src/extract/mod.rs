//! Payload → `GrantRecord` extraction.
//!
//! Each source gets its own module. Extraction is all-or-nothing: a missing
//! or malformed required field yields `ReconError::Extraction` naming the
//! source and the field, never a silent default.

pub mod institutional;
pub mod registry;

pub use institutional::{extract_institutional, FundingSource};
pub use registry::extract_registry;

use chrono::NaiveDate;

use crate::error::{ReconError, SourceKind};
use crate::model::InvestigatorName;

/// Date layouts seen across both sources, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a calendar date, discarding any time-of-day component.
///
/// Both sources are reduced to day precision here, so a date is only ever
/// compared against another date built the same way.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Parse a currency string into whole dollars.
/// Handles "1234", "$1,234", "1234.56" (cents truncated), "-500".
pub fn parse_whole_dollars(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
        .collect();
    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let dollars: i64 = whole.parse().ok()?;
    Some(if negative { -dollars } else { dollars })
}

/// Split `"Last, First"` on the first comma-space.
pub fn split_name(
    source: SourceKind,
    raw: &str,
) -> Result<InvestigatorName, ReconError> {
    let raw = raw.trim();
    let (last, first) = raw.split_once(", ").ok_or_else(|| {
        ReconError::extraction(source, "names", format!("expected \"Last, First\", got {raw:?}"))
    })?;
    Ok(InvestigatorName::new(first.trim(), last.trim()))
}
