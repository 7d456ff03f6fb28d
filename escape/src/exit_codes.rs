//! Stable exit codes for escape CLI commands.

/// Command succeeded, or the submitted manifest passed every check.
pub const OK: i32 = 0;
/// Command failed due to invalid config, unreadable input or other errors.
pub const INVALID: i32 = 1;
/// `escape check` ran but the manifest did not pass.
pub const NOT_PASSED: i32 = 2;
