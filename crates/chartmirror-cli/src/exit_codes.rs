//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: u8 = 0;

/// General error - unspecified failure
pub const ERROR: u8 = 1;

/// Validation error - bad arguments, pattern or requested version
pub const VALIDATION_ERROR: u8 = 2;

/// Template error - index parsing or template rendering failed
pub const TEMPLATE_ERROR: u8 = 3;

/// Chart error - invalid chart structure or Chart.yaml
pub const CHART_ERROR: u8 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: u8 = 5;

/// Network error - index or archive fetch failed
pub const NETWORK_ERROR: u8 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: u8 = 64;
