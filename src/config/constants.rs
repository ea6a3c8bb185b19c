//! Repository-wide constants
//!
//! Centralized location for defaults and environment variable names.

// =============================================================================
// Environment variables
// =============================================================================

/// Comma separated tracking flags (`refresh_after_save`, `no_tracking`, ...)
pub const ENV_TRACKING: &str = "REPOKIT_TRACKING";

/// Conflict policy for post-save refresh (`store` | `client`)
pub const ENV_REFRESH_WINS: &str = "REPOKIT_REFRESH_WINS";

/// Handling of refresh on an untracked entity (`lenient` | `strict`)
pub const ENV_REFRESH_POLICY: &str = "REPOKIT_REFRESH_POLICY";

/// Save pending changes before the backend is released
pub const ENV_AUTO_SAVE: &str = "REPOKIT_AUTO_SAVE";

/// Connection string handed to backends
pub const ENV_CONNECTION: &str = "REPOKIT_CONNECTION";

// =============================================================================
// Defaults
// =============================================================================

/// Default tracking flags
pub const DEFAULT_TRACKING: &str = "refresh_after_save";

/// Default connection string (in-process store)
pub const DEFAULT_CONNECTION: &str = "memory://default";

/// Default name of a predicate parameter
pub const DEFAULT_PARAMETER_NAME: &str = "item";

// =============================================================================
// Backend conventions
// =============================================================================

/// Prefix of a typed single-argument add entry point (`AddToOrders`)
pub const ADD_METHOD_PREFIX: &str = "Add";

/// Name of the two-argument add-by-set-name entry point
pub const ADD_OBJECT_METHOD: &str = "AddObject";
