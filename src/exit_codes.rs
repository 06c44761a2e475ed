//! Stable exit codes for agentctl commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Any failure: missing agent or scenario, cycle, blocked deactivation,
/// held lock, schema violation, or filesystem error.
pub const FAILURE: i32 = 1;
