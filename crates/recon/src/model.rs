use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Canonical record
// ---------------------------------------------------------------------------

/// A principal investigator, split from the `"Last, First"` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvestigatorName {
    pub first_name: String,
    pub last_name: String,
}

impl InvestigatorName {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Case-insensitive match on first and last name independently.
    pub fn matches(&self, other: &InvestigatorName) -> bool {
        self.first_name.to_lowercase() == other.first_name.to_lowercase()
            && self.last_name.to_lowercase() == other.last_name.to_lowercase()
    }
}

impl std::fmt::Display for InvestigatorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.last_name, self.first_name)
    }
}

/// The normalized record each source is mapped into before comparison.
///
/// `None` means the source did not report a value. The institutional
/// extractor always fills the scalar fields; the registry may report `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantRecord {
    pub grant_id: String,
    pub grant_title: Option<String>,
    pub names: Vec<InvestigatorName>,
    pub institute: String,
    pub total_cost: Option<i64>,
    pub direct_cost: Option<i64>,
    pub indirect_cost: Option<i64>,
    pub current_start_date: Option<NaiveDate>,
    pub current_end_date: Option<NaiveDate>,
    pub project_start_date: Option<NaiveDate>,
    pub project_end_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Candidates (transient, selection only)
// ---------------------------------------------------------------------------

/// One row of the institutional search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionalCandidate {
    pub grant_number: String,
    pub serial: Option<String>,
    pub title: Option<String>,
}

/// One hit from the registry identifier search.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryCandidate {
    pub application_id: i64,
    pub project_num: String,
    pub institute: String,
    pub project_end_date: Option<NaiveDate>,
    /// Raw `principal_investigators`, parsed only for the chosen hit.
    pub investigators: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Resolved pair
// ---------------------------------------------------------------------------

/// Both canonical records for one identifier, ready to diff.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPair {
    pub query: String,
    pub application_id: i64,
    pub institutional: GrantRecord,
    pub registry: GrantRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_match_ignores_case() {
        let a = InvestigatorName::new("Jane", "Doe");
        assert!(a.matches(&InvestigatorName::new("jane", "DOE")));
        assert!(!a.matches(&InvestigatorName::new("Doe", "Jane")));
    }

    #[test]
    fn name_display_is_last_comma_first() {
        assert_eq!(InvestigatorName::new("Jane", "Doe").to_string(), "Doe, Jane");
    }
}
