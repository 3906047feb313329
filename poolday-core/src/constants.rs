/// Days past a series' start through which open-ended series are materialized.
pub const DEFAULT_MATERIALIZE_DAYS: i64 = 365;

/// Upper bound on appointments materialized from a series in a single call.
pub const MAX_MATERIALIZED_OCCURRENCES: usize = 365;

/// Deadline for a single remote call when the config does not set one.
pub const DEFAULT_REMOTE_TIMEOUT: &str = "10s";

/// Prefix of remote provider binaries found in PATH (`poolday-remote-<name>`).
pub const REMOTE_BINARY_PREFIX: &str = "poolday-remote-";
