//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code    | Domain     | Description                                        |
//! |---------|------------|----------------------------------------------------|
//! | 0       | Universal  | Success (including "differences found" by default) |
//! | 1       | check      | Differences found, only with `--fail-on-diff`      |
//! | 2       | Universal  | Usage error: bad arguments, missing grant ID/cookie |
//! | 3       | Universal  | Local I/O failure (stdin/stdout)                   |
//! | 60-69   | sources    | Session, lookup, extraction and transport failures |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use grantcheck_recon::{ReconError, SourceKind};

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Differences found between the two sources (`check --fail-on-diff`).
/// Like `diff(1)`, exit 1 means "records differ."
pub const EXIT_DIFFS: u8 = 1;

/// Usage error - bad arguments, missing grant ID or session cookie,
/// unknown field name.
pub const EXIT_USAGE: u8 = 2;

/// Reading the prompt or writing the report failed.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Sources (60-69)
// =============================================================================

/// Institutional system rejected the session cookie (login form or 401/403).
pub const EXIT_AUTH: u8 = 60;

/// Institutional search returned no usable revision.
pub const EXIT_NOT_FOUND_INSTITUTIONAL: u8 = 61;

/// Registry has no record for the grant under the institutional institute.
pub const EXIT_NOT_FOUND_REGISTRY: u8 = 62;

/// A required field could not be extracted from a source payload.
pub const EXIT_EXTRACTION: u8 = 63;

/// Network/HTTP failure after retries.
pub const EXIT_TRANSPORT: u8 = 64;

/// Config file unreadable, unparseable or invalid.
pub const EXIT_CONFIG: u8 = 65;

/// Map a reconciliation error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Configuration(_) => EXIT_USAGE,
        ReconError::Authentication(_) => EXIT_AUTH,
        ReconError::NotFound { source: SourceKind::Institutional, .. } => EXIT_NOT_FOUND_INSTITUTIONAL,
        ReconError::NotFound { source: SourceKind::Registry, .. } => EXIT_NOT_FOUND_REGISTRY,
        ReconError::Extraction { .. } => EXIT_EXTRACTION,
        ReconError::Transport { .. } => EXIT_TRANSPORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_DIFFS,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_AUTH,
            EXIT_NOT_FOUND_INSTITUTIONAL,
            EXIT_NOT_FOUND_REGISTRY,
            EXIT_EXTRACTION,
            EXIT_TRANSPORT,
            EXIT_CONFIG,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_recon_exit_code() {
        let registry_miss = ReconError::NotFound {
            source: SourceKind::Registry,
            message: "none".into(),
        };
        assert_eq!(recon_exit_code(&registry_miss), EXIT_NOT_FOUND_REGISTRY);
        assert_eq!(recon_exit_code(&ReconError::Authentication("x".into())), EXIT_AUTH);
        assert_eq!(recon_exit_code(&ReconError::Configuration("x".into())), EXIT_USAGE);
    }
}
