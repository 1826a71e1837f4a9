//! Exit codes for the estail CLI.

use std::process::ExitCode;

/// Exit code constants.
pub mod codes {
    /// Normal or interrupted termination, or a successful lookup.
    pub const SUCCESS: u8 = 0;
    /// Setup error, or a lookup that failed for a reason other than "not found".
    pub const FAILURE: u8 = 1;
    /// Lookup gave up after every attempt came back "not found".
    pub const NOT_FOUND: u8 = 42;
}

/// Process exit code for a raw code
pub fn exit_code(code: u8) -> ExitCode {
    ExitCode::from(code)
}
