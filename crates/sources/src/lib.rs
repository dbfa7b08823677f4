//! Blocking HTTP implementations of the reconciliation collaborators.
//!
//! No parsing happens here: clients return raw HTML / JSON and leave
//! extraction to `grantcheck-recon`. Retries are limited to 429, 5xx and
//! network errors.

mod client;
mod institutional;
mod registry;

pub use client::HttpSettings;
pub use institutional::{InstitutionalClient, Session};
pub use registry::RegistryClient;
