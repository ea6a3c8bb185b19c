//! Repository settings loaded from environment variables.

use std::env;
use std::str::FromStr;

use super::constants::{
    DEFAULT_CONNECTION, DEFAULT_TRACKING, ENV_AUTO_SAVE, ENV_CONNECTION, ENV_REFRESH_POLICY,
    ENV_REFRESH_WINS, ENV_TRACKING,
};
use crate::types::{RefreshMode, RefreshPolicy, TrackingPolicy};

/// Repository configuration
#[derive(Clone, PartialEq)]
pub struct RepositoryConfig {
    pub tracking: TrackingPolicy,
    pub refresh_mode: RefreshMode,
    pub refresh_policy: RefreshPolicy,
    pub auto_save_on_dispose: bool,
    connection_string: String,
}

impl std::fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("tracking", &self.tracking)
            .field("refresh_mode", &self.refresh_mode)
            .field("refresh_policy", &self.refresh_policy)
            .field("auto_save_on_dispose", &self.auto_save_on_dispose)
            .field("connection_string", &"[REDACTED]")
            .finish()
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingPolicy::REFRESH_AFTER_SAVE,
            refresh_mode: RefreshMode::StoreWins,
            refresh_policy: RefreshPolicy::Lenient,
            auto_save_on_dispose: false,
            connection_string: DEFAULT_CONNECTION.to_string(),
        }
    }
}

impl RepositoryConfig {
    /// Load configuration from environment variables (and `.env`).
    ///
    /// Unset or unparsable values fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            tracking: parse_var(ENV_TRACKING).unwrap_or_else(|| {
                DEFAULT_TRACKING
                    .parse()
                    .unwrap_or(TrackingPolicy::REFRESH_AFTER_SAVE)
            }),
            refresh_mode: parse_var(ENV_REFRESH_WINS).unwrap_or_default(),
            refresh_policy: parse_var(ENV_REFRESH_POLICY).unwrap_or_default(),
            auto_save_on_dispose: parse_var(ENV_AUTO_SAVE).unwrap_or(false),
            connection_string: env::var(ENV_CONNECTION)
                .unwrap_or_else(|_| DEFAULT_CONNECTION.to_string()),
        }
    }

    /// Same settings with different tracking flags
    pub fn with_tracking(mut self, tracking: TrackingPolicy) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save_on_dispose = enabled;
        self
    }

    pub fn with_connection_string(mut self, connection: impl Into<String>) -> Self {
        self.connection_string = connection.into();
        self
    }

    /// Connection string for backend construction
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

fn parse_var<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{} has an invalid value ({}), using default", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_refresh_after_save_store_wins() {
        let config = RepositoryConfig::default();
        assert!(config.tracking.refreshes_after_save());
        assert!(!config.tracking.is_no_tracking());
        assert_eq!(config.refresh_mode, RefreshMode::StoreWins);
        assert_eq!(config.refresh_policy, RefreshPolicy::Lenient);
        assert!(!config.auto_save_on_dispose);
    }

    #[test]
    fn test_debug_redacts_connection() {
        let config = RepositoryConfig::default().with_connection_string("memory://secret");
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = RepositoryConfig::default()
            .with_tracking(TrackingPolicy::NO_TRACKING)
            .with_refresh_policy(RefreshPolicy::Strict)
            .with_auto_save(true);
        assert!(config.tracking.is_no_tracking());
        assert_eq!(config.refresh_policy, RefreshPolicy::Strict);
        assert!(config.auto_save_on_dispose);
    }
}
