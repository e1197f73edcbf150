//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (rejected by local validation)
pub const DATAERR: i32 = 65;

/// Cannot open input (node not found)
pub const NOINPUT: i32 = 66;

/// Service unavailable (remote store failed)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Temporary failure (some members of a batch failed)
pub const TEMPFAIL: i32 = 75;

/// Configuration error
pub const CONFIG: i32 = 78;
