//! Core domain logic for the user management console.
//! This crate owns the user record, its persistence and its business rules.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{ConnectionFactory, DbError, DbResult, DbTarget};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::user::{User, UserId, EMAIL_MAX_CHARS, NAME_MAX_CHARS};
pub use repo::user_repo::{
    RepoError, RepoOperation, RepoResult, SqliteUserRepository, UserRepository,
};
pub use service::user_service::{
    EmailPolicy, ServiceError, ServiceResult, UserService, ValidationError, ValidationPolicy,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
