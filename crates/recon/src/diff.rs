//! Field-level comparison of two canonical records.
//!
//! The registry record is authoritative: a mismatch reports the registry's
//! value, and a field the registry does not report (or reports as zero) is
//! never flagged.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{GrantRecord, InvestigatorName};

/// Which equality predicate a field is compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Set equality over investigator names, case-insensitive.
    Names,
    /// Calendar-day equality; skipped when the authoritative date is absent.
    Date,
    /// Plain equality; skipped when the authoritative value is absent or zero.
    Value,
}

/// A comparable field of [`GrantRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Names,
    TotalCost,
    DirectCost,
    IndirectCost,
    ProjectStartDate,
    ProjectEndDate,
    CurrentStartDate,
    CurrentEndDate,
}

/// Every field, in report order.
pub const DEFAULT_FIELDS: [Field; 8] = [
    Field::Names,
    Field::TotalCost,
    Field::DirectCost,
    Field::IndirectCost,
    Field::ProjectStartDate,
    Field::ProjectEndDate,
    Field::CurrentStartDate,
    Field::CurrentEndDate,
];

impl Field {
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Names => "names",
            Self::TotalCost => "totalCost",
            Self::DirectCost => "directCost",
            Self::IndirectCost => "indirectCost",
            Self::ProjectStartDate => "projectStartDate",
            Self::ProjectEndDate => "projectEndDate",
            Self::CurrentStartDate => "currentStartDate",
            Self::CurrentEndDate => "currentEndDate",
        }
    }

    pub fn comparison(self) -> Comparison {
        match self {
            Self::Names => Comparison::Names,
            Self::TotalCost | Self::DirectCost | Self::IndirectCost => Comparison::Value,
            Self::ProjectStartDate
            | Self::ProjectEndDate
            | Self::CurrentStartDate
            | Self::CurrentEndDate => Comparison::Date,
        }
    }

    fn amount(self, record: &GrantRecord) -> Option<i64> {
        match self {
            Self::TotalCost => record.total_cost,
            Self::DirectCost => record.direct_cost,
            Self::IndirectCost => record.indirect_cost,
            _ => None,
        }
    }

    fn date(self, record: &GrantRecord) -> Option<NaiveDate> {
        match self {
            Self::ProjectStartDate => record.project_start_date,
            Self::ProjectEndDate => record.project_end_date,
            Self::CurrentStartDate => record.current_start_date,
            Self::CurrentEndDate => record.current_end_date,
            _ => None,
        }
    }

    /// The record's value for this field, or `None` if not reported.
    pub fn value_of(self, record: &GrantRecord) -> Option<FieldValue> {
        match self.comparison() {
            Comparison::Names => Some(FieldValue::Names(record.names.clone())),
            Comparison::Value => self.amount(record).map(FieldValue::Amount),
            Comparison::Date => self.date(record).map(FieldValue::Date),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Field {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        DEFAULT_FIELDS
            .iter()
            .copied()
            .find(|f| f.wire_name() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = DEFAULT_FIELDS.iter().map(|f| f.wire_name()).collect();
                ReconError::Configuration(format!(
                    "unknown field '{name}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Parse a comma-separated field list, preserving order.
pub fn parse_field_list(list: &str) -> Result<Vec<Field>, ReconError> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(Field::from_str)
        .collect()
}

/// A field's value as carried in a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Names(Vec<InvestigatorName>),
    Amount(i64),
    Date(NaiveDate),
}

/// One mismatched field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: Field,
    /// The registry's value, which is what gets reported.
    pub authoritative: FieldValue,
    /// The institutional value, `None` if that side did not report one.
    pub reference: Option<FieldValue>,
}

/// Symmetric double containment with case-insensitive matching.
pub fn names_equal(a: &[InvestigatorName], b: &[InvestigatorName]) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| b.iter().any(|y| x.matches(y)))
        && b.iter().all(|y| a.iter().any(|x| y.matches(x)))
}

fn differs(field: Field, authoritative: &GrantRecord, reference: &GrantRecord) -> bool {
    match field.comparison() {
        Comparison::Names => !names_equal(&authoritative.names, &reference.names),
        Comparison::Date => match field.date(authoritative) {
            None => false,
            Some(date) => field.date(reference) != Some(date),
        },
        Comparison::Value => match field.amount(authoritative) {
            None | Some(0) => false,
            Some(amount) => field.amount(reference) != Some(amount),
        },
    }
}

/// Compare `fields` in order and return the ones that disagree.
///
/// Neither record is modified; the result depends only on the inputs.
pub fn diff(authoritative: &GrantRecord, reference: &GrantRecord, fields: &[Field]) -> Vec<FieldDiff> {
    fields
        .iter()
        .copied()
        .filter(|&field| differs(field, authoritative, reference))
        .filter_map(|field| {
            let value = field.value_of(authoritative)?;
            Some(FieldDiff {
                field,
                authoritative: value,
                reference: field.value_of(reference),
            })
        })
        .collect()
}
