//! Government grant registry (JSON API).
//!
//! The search endpoint returns `{"results": [...]}`; each hit carries the
//! application id used to key the funding and project detail calls.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{ReconError, SourceKind};
use crate::model::{GrantRecord, InvestigatorName, RegistryCandidate};

use crate::select::latest_registry_match;

use super::{parse_date, parse_whole_dollars};

const SOURCE: SourceKind = SourceKind::Registry;

/// Registry search pattern for a partial grant identifier: six single-char
/// wildcards for the application-type/activity prefix, then anything after.
pub fn partial_id_pattern(identifier: &str) -> String {
    format!("??????{}*", identifier.trim())
}

// ---------------------------------------------------------------------------
// Typed accessors
// ---------------------------------------------------------------------------

fn required<'a>(obj: &'a Value, key: &str, field: &str) -> Result<&'a Value, ReconError> {
    obj.get(key)
        .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("missing key '{key}'")))
}

fn required_str<'a>(obj: &'a Value, key: &str, field: &str) -> Result<&'a str, ReconError> {
    required(obj, key, field)?
        .as_str()
        .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("'{key}' is not a string")))
}

/// `null` → `None`; integer or float → whole dollars; numeric string accepted.
fn optional_amount(obj: &Value, key: &str, field: &str) -> Result<Option<i64>, ReconError> {
    match required(obj, key, field)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(Some)
            .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("'{key}' out of range"))),
        Value::String(s) => parse_whole_dollars(s)
            .map(Some)
            .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("not an amount: {s:?}"))),
        other => Err(ReconError::extraction(
            SOURCE,
            field,
            format!("'{key}' has unexpected type: {other}"),
        )),
    }
}

/// `null` or `""` → `None`; otherwise must parse as a date.
fn optional_date(obj: &Value, key: &str, field: &str) -> Result<Option<NaiveDate>, ReconError> {
    match required(obj, key, field)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| ReconError::extraction(SOURCE, field, format!("not a date: {s:?}"))),
        other => Err(ReconError::extraction(
            SOURCE,
            field,
            format!("'{key}' has unexpected type: {other}"),
        )),
    }
}

fn investigators(raw: &Value) -> Result<Vec<InvestigatorName>, ReconError> {
    let list = raw
        .as_array()
        .ok_or_else(|| ReconError::extraction(SOURCE, "names", "'principal_investigators' is not an array"))?;

    list.iter()
        .map(|pi| {
            Ok(InvestigatorName::new(
                required_str(pi, "first_name", "names")?.trim(),
                required_str(pi, "last_name", "names")?.trim(),
            ))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Parse the fields selection needs from one search hit. Investigators are
/// kept raw so a malformed hit that loses selection cannot fail the run.
pub fn parse_candidate(hit: &Value) -> Result<RegistryCandidate, ReconError> {
    let application_id = required(hit, "appl_id", "applId")?
        .as_i64()
        .ok_or_else(|| ReconError::extraction(SOURCE, "applId", "'appl_id' is not an integer"))?;

    let institute = required(hit, "agency_ic_admin", "institute")?;
    let institute = required_str(institute, "abbreviation", "institute")?.trim().to_string();

    Ok(RegistryCandidate {
        application_id,
        project_num: required_str(hit, "project_num", "grantId")?.trim().to_string(),
        institute,
        project_end_date: optional_date(hit, "project_end_date", "projectEndDate")?,
        investigators: hit.get("principal_investigators").cloned().unwrap_or(Value::Null),
    })
}

/// Parse the `results` array of a search response.
pub fn parse_search_results(body: &Value) -> Result<Vec<RegistryCandidate>, ReconError> {
    let results = required(body, "results", "results")?
        .as_array()
        .ok_or_else(|| ReconError::extraction(SOURCE, "results", "'results' is not an array"))?;

    let candidates = results.iter().map(parse_candidate).collect::<Result<Vec<_>, _>>()?;
    log::debug!("registry search: {} candidate(s)", candidates.len());
    Ok(candidates)
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

/// Combine the chosen search hit with its funding and project details.
///
/// Costs are taken as reported, including `indirect_cost`.
pub fn build_record(
    candidate: &RegistryCandidate,
    funding: &Value,
    project: &Value,
) -> Result<GrantRecord, ReconError> {
    let names = investigators(&candidate.investigators)?;
    if names.is_empty() {
        return Err(ReconError::extraction(SOURCE, "names", "no principal investigators"));
    }

    Ok(GrantRecord {
        grant_id: candidate.project_num.clone(),
        grant_title: None,
        names,
        institute: candidate.institute.clone(),
        total_cost: optional_amount(funding, "total_funding", "totalCost")?,
        direct_cost: optional_amount(funding, "direct_cost", "directCost")?,
        indirect_cost: optional_amount(funding, "indirect_cost", "indirectCost")?,
        current_start_date: optional_date(project, "budget_start_date", "currentStartDate")?,
        current_end_date: optional_date(project, "budget_end_date", "currentEndDate")?,
        project_start_date: optional_date(project, "project_start_date", "projectStartDate")?,
        project_end_date: optional_date(project, "project_end_date", "projectEndDate")?,
    })
}

/// Search response + funding detail + project detail → canonical record for
/// the hit chosen by [`latest_registry_match`] under `institute`.
///
/// The detail payloads must belong to that hit's application id.
pub fn extract_registry(
    search_body: &Value,
    funding: &Value,
    project: &Value,
    institute: &str,
) -> Result<GrantRecord, ReconError> {
    let candidates = parse_search_results(search_body)?;
    let chosen = latest_registry_match(&candidates, institute)?;
    build_record(chosen, funding, project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit() -> Value {
        json!({
            "appl_id": 10834567,
            "project_num": "5R01HD012345-03",
            "agency_ic_admin": { "code": "HD", "abbreviation": "NICHD", "name": "Child Health" },
            "project_end_date": "2026-06-30T12:00:00Z",
            "principal_investigators": [
                { "first_name": "Jane", "last_name": "Doe", "is_contact_pi": true }
            ]
        })
    }

    fn funding() -> Value {
        json!({ "total_funding": 250000, "direct_cost": 180000.0, "indirect_cost": 70000 })
    }

    fn project() -> Value {
        json!({
            "project_start_date": "2021-07-01T00:00:00",
            "project_end_date": "2026-06-30T00:00:00",
            "budget_start_date": "2023-07-01T00:00:00",
            "budget_end_date": "2024-06-30T00:00:00"
        })
    }

    #[test]
    fn test_partial_id_pattern() {
        assert_eq!(partial_id_pattern("HD012345"), "??????HD012345*");
        assert_eq!(partial_id_pattern(" HD012345 "), "??????HD012345*");
    }

    #[test]
    fn test_parse_candidate() {
        let c = parse_candidate(&hit()).unwrap();
        assert_eq!(c.application_id, 10834567);
        assert_eq!(c.project_num, "5R01HD012345-03");
        assert_eq!(c.institute, "NICHD");
        assert_eq!(c.project_end_date, NaiveDate::from_ymd_opt(2026, 6, 30));
        assert_eq!(investigators(&c.investigators).unwrap(), vec![InvestigatorName::new("Jane", "Doe")]);
    }

    #[test]
    fn test_candidate_missing_institute() {
        let mut h = hit();
        h.as_object_mut().unwrap().remove("agency_ic_admin");
        let err = parse_candidate(&h).unwrap_err();
        assert!(matches!(err, ReconError::Extraction { ref field, source: SourceKind::Registry, .. } if field == "institute"));
    }

    #[test]
    fn test_search_results_must_be_array() {
        let err = parse_search_results(&json!({ "meta": {} })).unwrap_err();
        assert!(matches!(err, ReconError::Extraction { ref field, .. } if field == "results"));
        assert!(parse_search_results(&json!({ "results": [] })).unwrap().is_empty());
    }

    fn search_body() -> Value {
        json!({ "meta": { "total": 1 }, "results": [hit()] })
    }

    #[test]
    fn test_extract_registry() {
        let record = extract_registry(&search_body(), &funding(), &project(), "NICHD").unwrap();
        assert_eq!(record.grant_id, "5R01HD012345-03");
        assert_eq!(record.grant_title, None);
        assert_eq!(record.total_cost, Some(250_000));
        assert_eq!(record.direct_cost, Some(180_000));
        assert_eq!(record.indirect_cost, Some(70_000));
        assert_eq!(record.current_start_date, NaiveDate::from_ymd_opt(2023, 7, 1));
        assert_eq!(record.project_end_date, NaiveDate::from_ymd_opt(2026, 6, 30));
    }

    #[test]
    fn test_null_values_are_absent() {
        let funding = json!({ "total_funding": 250000, "direct_cost": null, "indirect_cost": null });
        let project = json!({
            "project_start_date": null,
            "project_end_date": "",
            "budget_start_date": "2023-07-01",
            "budget_end_date": "2024-06-30"
        });
        let record = extract_registry(&search_body(), &funding, &project, "NICHD").unwrap();
        assert_eq!(record.direct_cost, None);
        assert_eq!(record.project_start_date, None);
        assert_eq!(record.project_end_date, None);
    }

    #[test]
    fn test_missing_detail_key_is_extraction_error() {
        let funding = json!({ "total_funding": 250000, "direct_cost": 1 });
        let err = extract_registry(&search_body(), &funding, &project(), "NICHD").unwrap_err();
        assert!(matches!(err, ReconError::Extraction { ref field, .. } if field == "indirectCost"));
    }

    #[test]
    fn test_wrong_type_is_extraction_error() {
        let project = json!({
            "project_start_date": 20210701,
            "project_end_date": null,
            "budget_start_date": null,
            "budget_end_date": null
        });
        let err = extract_registry(&search_body(), &funding(), &project, "NICHD").unwrap_err();
        assert!(matches!(err, ReconError::Extraction { ref field, .. } if field == "projectStartDate"));
    }

    #[test]
    fn test_malformed_investigators_on_losing_hit_are_ignored() {
        let mut other = hit();
        other["appl_id"] = json!(10999999);
        other["agency_ic_admin"]["abbreviation"] = json!("NIA");
        other["principal_investigators"] = json!([{ "first_name": "Solo" }]);
        let body = json!({ "results": [other, hit()] });

        let record = extract_registry(&body, &funding(), &project(), "NICHD").unwrap();
        assert_eq!(record.names, vec![InvestigatorName::new("Jane", "Doe")]);

        let err = extract_registry(&body, &funding(), &project(), "NIA").unwrap_err();
        assert!(matches!(err, ReconError::Extraction { ref field, .. } if field == "names"), "{err}");
    }

    #[test]
    fn test_extract_registry_other_institute_is_not_found() {
        let err = extract_registry(&search_body(), &funding(), &project(), "NIA").unwrap_err();
        assert!(err.is_recoverable());
    }
}
