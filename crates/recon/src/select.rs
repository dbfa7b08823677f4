//! Candidate selection: which institutional revision and which registry
//! record represent "the" grant.

use crate::error::{ReconError, SourceKind};
use crate::model::{InstitutionalCandidate, RegistryCandidate};

/// Revision number of an institutional grant number.
///
/// Everything after the first `-` with non-digits removed, parsed as an
/// integer: `HD012345-03A1` → `31`. Only the relative order between rows
/// of the same grant is meaningful.
pub fn revision_number(grant_number: &str) -> Option<u64> {
    let (_, tail) = grant_number.split_once('-')?;
    let digits: String = tail.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    match digits.parse() {
        Ok(n) => Some(n),
        Err(e) => {
            log::debug!("revision digits {digits:?} in {grant_number} unusable: {e}");
            None
        }
    }
}

/// Highest-numbered revision; ties go to the first row in input order.
///
/// Rows without a parseable revision are ignored. Fails with institutional
/// `NotFound` if nothing usable remains or the winner has no detail link.
pub fn latest_revision(
    candidates: &[InstitutionalCandidate],
) -> Result<&InstitutionalCandidate, ReconError> {
    let mut best: Option<(u64, &InstitutionalCandidate)> = None;
    for candidate in candidates {
        let Some(revision) = revision_number(&candidate.grant_number) else {
            log::debug!("ignoring row without revision: {}", candidate.grant_number);
            continue;
        };
        if best.map_or(true, |(top, _)| revision > top) {
            best = Some((revision, candidate));
        }
    }

    let (revision, chosen) = best.ok_or_else(|| ReconError::NotFound {
        source: SourceKind::Institutional,
        message: format!("no revisions among {} search row(s)", candidates.len()),
    })?;

    if chosen.serial.is_none() {
        return Err(ReconError::NotFound {
            source: SourceKind::Institutional,
            message: format!("revision {} has no detail link", chosen.grant_number),
        });
    }

    log::debug!("selected revision {revision} ({})", chosen.grant_number);
    Ok(chosen)
}

/// Registry record for the institute with the latest project end date.
///
/// Undated candidates rank below every dated one; ties go to the first
/// candidate in input order. An empty match is a recoverable registry
/// `NotFound`.
pub fn latest_registry_match<'a>(
    candidates: &'a [RegistryCandidate],
    institute: &str,
) -> Result<&'a RegistryCandidate, ReconError> {
    let institute = institute.trim();
    let mut best: Option<&RegistryCandidate> = None;
    for candidate in candidates.iter().filter(|c| c.institute == institute) {
        if best.map_or(true, |top| candidate.project_end_date > top.project_end_date) {
            best = Some(candidate);
        }
    }

    let chosen = best.ok_or_else(|| ReconError::NotFound {
        source: SourceKind::Registry,
        message: format!(
            "no record administered by {institute} among {} result(s)",
            candidates.len()
        ),
    })?;

    log::debug!(
        "selected registry record {} (appl_id {})",
        chosen.project_num,
        chosen.application_id
    );
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(number: &str, serial: Option<&str>) -> InstitutionalCandidate {
        InstitutionalCandidate {
            grant_number: number.into(),
            serial: serial.map(String::from),
            title: None,
        }
    }

    fn hit(appl: i64, ic: &str, end: Option<&str>) -> RegistryCandidate {
        RegistryCandidate {
            application_id: appl,
            project_num: format!("P{appl}"),
            institute: ic.into(),
            project_end_date: end.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            investigators: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_revision_number() {
        assert_eq!(revision_number("HD-01"), Some(1));
        assert_eq!(revision_number("HD-03A1"), Some(31));
        assert_eq!(revision_number("R01-HD-12"), Some(12));
        assert_eq!(revision_number("HD012345"), None);
        assert_eq!(revision_number("HD-A"), None);
    }

    #[test]
    fn test_latest_revision_picks_max() {
        let rows = vec![row("HD-01", Some("a")), row("HD-03", Some("c")), row("HD-02", Some("b"))];
        assert_eq!(latest_revision(&rows).unwrap().serial.as_deref(), Some("c"));
    }

    #[test]
    fn test_latest_revision_tie_first_wins() {
        let rows = vec![row("HD-02", Some("first")), row("HD-2", Some("second"))];
        assert_eq!(latest_revision(&rows).unwrap().serial.as_deref(), Some("first"));
    }

    #[test]
    fn test_latest_revision_skips_unparseable() {
        let rows = vec![row("garbage", Some("x")), row("HD-01", Some("a"))];
        assert_eq!(latest_revision(&rows).unwrap().serial.as_deref(), Some("a"));
    }

    #[test]
    fn test_overflowing_revision_is_skipped() {
        assert_eq!(revision_number("HD-99999999999999999999999"), None);
        let rows = vec![row("HD-99999999999999999999999", Some("x")), row("HD-02", Some("b"))];
        assert_eq!(latest_revision(&rows).unwrap().serial.as_deref(), Some("b"));
    }

    #[test]
    fn test_latest_revision_empty_is_not_found() {
        let err = latest_revision(&[]).unwrap_err();
        assert!(matches!(err, ReconError::NotFound { source: SourceKind::Institutional, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_latest_revision_without_link_is_not_found() {
        let rows = vec![row("HD-01", Some("a")), row("HD-02", None)];
        let err = latest_revision(&rows).unwrap_err();
        assert!(err.to_string().contains("HD-02"), "{err}");
    }

    #[test]
    fn test_registry_filters_by_institute_and_takes_latest() {
        let hits = vec![
            hit(1, "NICHD", Some("2024-06-30")),
            hit(2, "NIA", Some("2030-01-01")),
            hit(3, "NICHD", Some("2026-06-30")),
            hit(4, "NICHD", None),
        ];
        assert_eq!(latest_registry_match(&hits, "NICHD").unwrap().application_id, 3);
        assert_eq!(latest_registry_match(&hits, "NIA").unwrap().application_id, 2);
    }

    #[test]
    fn test_registry_tie_first_wins() {
        let hits = vec![hit(7, "NICHD", Some("2026-06-30")), hit(8, "NICHD", Some("2026-06-30"))];
        assert_eq!(latest_registry_match(&hits, "NICHD").unwrap().application_id, 7);
    }

    #[test]
    fn test_registry_no_match_is_recoverable() {
        let hits = vec![hit(1, "NIA", Some("2024-06-30"))];
        let err = latest_registry_match(&hits, "NICHD").unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().starts_with("not found on registry"));
    }
}
