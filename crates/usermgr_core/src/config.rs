//! Process configuration resolved from environment variables.
//!
//! # Responsibility
//! - Resolve store location, logging setup and validation policy once at
//!   process start.
//!
//! # Invariants
//! - Blank values fall back to defaults.
//! - Unknown enumerated values are rejected instead of silently defaulted.

use crate::db::DbTarget;
use crate::logging::default_log_level;
use crate::service::user_service::{EmailPolicy, ValidationPolicy};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "USERMGR_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "USERMGR_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "USERMGR_LOG_DIR";
pub const EMAIL_POLICY_ENV: &str = "USERMGR_EMAIL_POLICY";

const DEFAULT_DB_FILE_NAME: &str = "usermgr.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "usermgr-logs";
const IN_MEMORY_DB_PATH: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for {key}; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db: DbTarget,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub validation: ValidationPolicy,
}

impl AppConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        let db = match value(DB_PATH_ENV) {
            Some(path) if path == IN_MEMORY_DB_PATH => DbTarget::Memory,
            Some(path) => DbTarget::File(PathBuf::from(path)),
            None => DbTarget::File(std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
        };

        let log_level = value(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string());

        let log_dir = value(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME));

        let email = match value(EMAIL_POLICY_ENV) {
            Some(raw) => EmailPolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: EMAIL_POLICY_ENV,
                value: raw,
                expected: "non_empty|well_formed",
            })?,
            None => EmailPolicy::default(),
        };

        Ok(Self {
            db,
            log_level,
            log_dir,
            validation: ValidationPolicy { email },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DB_PATH_ENV, EMAIL_POLICY_ENV, LOG_DIR_ENV};
    use crate::db::DbTarget;
    use crate::logging::default_log_level;
    use crate::service::user_service::EmailPolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn resolve(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = resolve(&[]).unwrap();
        assert_eq!(
            config.db,
            DbTarget::File(std::env::temp_dir().join("usermgr.sqlite3"))
        );
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, std::env::temp_dir().join("usermgr-logs"));
        assert_eq!(config.validation.email, EmailPolicy::WellFormed);
    }

    #[test]
    fn memory_marker_selects_in_memory_store() {
        let config = resolve(&[(DB_PATH_ENV, " :memory: ")]).unwrap();
        assert_eq!(config.db, DbTarget::Memory);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = resolve(&[(LOG_DIR_ENV, "   "), (EMAIL_POLICY_ENV, "")]).unwrap();
        assert_eq!(config.log_dir, std::env::temp_dir().join("usermgr-logs"));
        assert_eq!(config.validation.email, EmailPolicy::WellFormed);
    }

    #[test]
    fn explicit_values_are_used() {
        let config = resolve(&[
            (DB_PATH_ENV, "/var/lib/usermgr/users.db"),
            (EMAIL_POLICY_ENV, "non_empty"),
        ])
        .unwrap();
        assert_eq!(
            config.db,
            DbTarget::File(PathBuf::from("/var/lib/usermgr/users.db"))
        );
        assert_eq!(config.validation.email, EmailPolicy::NonEmpty);
    }

    #[test]
    fn unknown_email_policy_is_rejected() {
        let err = resolve(&[(EMAIL_POLICY_ENV, "strict")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value `strict` for USERMGR_EMAIL_POLICY; expected non_empty|well_formed"
        );
    }
}
