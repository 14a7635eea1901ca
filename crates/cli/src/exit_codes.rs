//! CLI Exit Code Registry
//!
//! Single source of truth for `certtrack` exit codes. Scripts rely on them,
//! so codes are never renumbered.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Success                                       |
//! | 1       | Universal | General error (unspecified)                   |
//! | 2       | Universal | CLI usage error (bad args, bad date)          |
//! | 3-9     | recon     | Reconciliation findings (duplicates)          |
//! | 10-19   | session   | Login state and role checks                   |
//! | 20-29   | service   | Talking to the user / certificate services    |
//! | 30-39   | input     | Local input files                             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` / the relevant command

use certtrack_client::ClientError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid dates, conflicting options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-9)
// =============================================================================

/// `--strict`: some certificate is referenced by more than one mapping.
pub const EXIT_RECON_DUPLICATES: u8 = 3;

// =============================================================================
// Session (10-19)
// =============================================================================

/// No saved session (run `certtrack login`).
pub const EXIT_NOT_AUTH: u8 = 10;

/// The service rejected the token or credentials (401/403).
pub const EXIT_AUTH_REJECTED: u8 = 11;

/// Logged-in role may not run this command.
pub const EXIT_FORBIDDEN: u8 = 12;

// =============================================================================
// Service (20-29)
// =============================================================================

/// Network failure or unexpected HTTP status.
pub const EXIT_SERVICE_NETWORK: u8 = 20;

/// Service rejected the request (400/422).
pub const EXIT_SERVICE_VALIDATION: u8 = 21;

/// Service answered with a body we could not understand.
pub const EXIT_SERVICE_RESPONSE: u8 = 22;

// =============================================================================
// Input (30-39)
// =============================================================================

/// Cannot read or write a local file.
pub const EXIT_INPUT_IO: u8 = 30;

/// Local JSON input is malformed or not a list.
pub const EXIT_INPUT_PARSE: u8 = 31;

/// Map a ClientError to its exit code.
pub fn client_exit_code(err: &ClientError) -> u8 {
    match err {
        ClientError::NotAuthenticated => EXIT_NOT_AUTH,
        ClientError::Http(401, _) | ClientError::Http(403, _) => EXIT_AUTH_REJECTED,
        ClientError::Http(_, _) | ClientError::Network(_) => EXIT_SERVICE_NETWORK,
        ClientError::Validation(_) => EXIT_SERVICE_VALIDATION,
        ClientError::Parse(_) => EXIT_SERVICE_RESPONSE,
        ClientError::Io(_) => EXIT_INPUT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_registry() {
        assert_eq!(client_exit_code(&ClientError::NotAuthenticated), EXIT_NOT_AUTH);
        assert_eq!(client_exit_code(&ClientError::Http(403, String::new())), EXIT_AUTH_REJECTED);
        assert_eq!(client_exit_code(&ClientError::Http(502, String::new())), EXIT_SERVICE_NETWORK);
        assert_eq!(client_exit_code(&ClientError::Validation("x".into())), EXIT_SERVICE_VALIDATION);
        assert_eq!(client_exit_code(&ClientError::Parse("x".into())), EXIT_SERVICE_RESPONSE);
        assert_eq!(client_exit_code(&ClientError::Io("x".into())), EXIT_INPUT_IO);
    }
}
