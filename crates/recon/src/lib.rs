//! `grantcheck-recon`: Grant record reconciliation engine.
//!
//! Pure engine crate: receives raw source payloads through the
//! [`pipeline`] collaborator traits, normalizes them into [`GrantRecord`]s,
//! and reports the fields that disagree. No CLI or network dependencies.

pub mod diff;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod select;

pub use diff::{diff, Comparison, Field, FieldDiff, FieldValue, DEFAULT_FIELDS};
pub use error::{ReconError, SourceKind};
pub use extract::{extract_institutional, extract_registry, FundingSource};
pub use model::{GrantRecord, InvestigatorName, ResolvedPair};
pub use pipeline::{check, resolve_pair, CheckOptions, InstitutionalSource, RegistrySource};
pub use report::Report;
