use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::diff::{diff, Field, FieldDiff, FieldValue};
use crate::model::{GrantRecord, InvestigatorName, ResolvedPair};

/// Outcome of one reconciliation: identifiers, the compared field list and
/// every mismatch, plus both records for the JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub query: String,
    /// Registry grant id.
    pub grant_id: String,
    /// Institutional grant title.
    pub title: Option<String>,
    pub application_id: i64,
    pub fields: Vec<Field>,
    pub diffs: Vec<FieldDiff>,
    pub institutional: GrantRecord,
    pub registry: GrantRecord,
}

impl Report {
    /// Diff the pair (registry authoritative) over `fields`.
    pub fn new(pair: ResolvedPair, fields: &[Field]) -> Self {
        let diffs = diff(&pair.registry, &pair.institutional, fields);
        Self {
            query: pair.query,
            grant_id: pair.registry.grant_id.clone(),
            title: pair.institutional.grant_title.clone(),
            application_id: pair.application_id,
            fields: fields.to_vec(),
            diffs,
            institutional: pair.institutional,
            registry: pair.registry,
        }
    }

    pub fn has_differences(&self) -> bool {
        !self.diffs.is_empty()
    }

    /// The console report. Blank lines match the historical output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("\n\n");
        out.push_str(&format!("NIH Grant ID: {}\n", self.grant_id));
        out.push_str(&format!("Title: {}\n", self.title.as_deref().unwrap_or_default()));
        out.push_str("\n\n");
        out.push_str(&format!("{} changes found:\n", self.diffs.len()));
        out.push_str("\n\n");
        for d in &self.diffs {
            out.push_str(&format!("{}: {}\n", d.field, render_value(&d.authoritative)));
        }
        out
    }
}

/// `M/D/YYYY`, no zero padding.
pub fn render_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

/// `Last, First; Last, First`.
pub fn render_names(names: &[InvestigatorName]) -> String {
    names
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Date(date) => render_date(*date),
        FieldValue::Names(names) => render_names(names),
        FieldValue::Amount(amount) => serde_json::Value::from(*amount).to_string(),
    }
}
