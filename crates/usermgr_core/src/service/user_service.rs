//! User use-case service.
//!
//! # Responsibility
//! - Gate every mutation with field-level validation.
//! - Translate "row does not exist" into `NotFound` for update/delete.
//! - Delegate persistence to a `UserRepository`.
//!
//! # Invariants
//! - Invalid input never reaches the repository.
//! - `update_user`/`delete_user` never mutate the store for a missing id.
//! - An empty user table is a normal, empty `get_all_users` result.

use crate::model::user::{User, UserId};
use crate::repo::user_repo::{RepoError, UserRepository};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Field-level input rejection raised before any store access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    EmptyEmail,
    MalformedEmail(String),
    /// Id is absent or not positive.
    InvalidId(Option<UserId>),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "user name is required"),
            Self::EmptyEmail => write!(f, "user email is required"),
            Self::MalformedEmail(email) => write!(f, "malformed email address `{email}`"),
            Self::InvalidId(Some(id)) => write!(f, "invalid user id {id}"),
            Self::InvalidId(None) => write!(f, "user id is required"),
        }
    }
}

impl Error for ValidationError {}

/// Service error for user use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input was rejected before touching the store.
    Validation(ValidationError),
    /// Referenced user does not exist.
    NotFound(UserId),
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "user with id {id} not found"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// How strictly email addresses are checked before insert/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailPolicy {
    /// Only require a non-blank value.
    NonEmpty,
    /// Additionally require a `local@domain.tld` shape.
    #[default]
    WellFormed,
}

impl EmailPolicy {
    /// Parses `non_empty` or `well_formed` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "non_empty" => Some(Self::NonEmpty),
            "well_formed" => Some(Self::WellFormed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonEmpty => "non_empty",
            Self::WellFormed => "well_formed",
        }
    }
}

/// Validation knobs applied by `UserService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationPolicy {
    pub email: EmailPolicy,
}

/// Use-case service over a user repository.
pub struct UserService<R: UserRepository> {
    repo: R,
    policy: ValidationPolicy,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service with the default validation policy.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, ValidationPolicy::default())
    }

    pub fn with_policy(repo: R, policy: ValidationPolicy) -> Self {
        Self { repo, policy }
    }

    /// Validates and inserts a new user.
    ///
    /// On success `user.id` and `user.created_at` hold the store-assigned
    /// values.
    pub fn save_user(&self, user: &mut User) -> ServiceResult<bool> {
        self.checked(user)?;
        let created = self.repo.create(user)?;
        info!(
            "event=user_create module=service status=ok id={}",
            user.id.unwrap_or_default()
        );
        Ok(created)
    }

    /// Validates and overwrites name/email/age of an existing user.
    pub fn update_user(&self, user: &User) -> ServiceResult<bool> {
        self.checked(user)?;
        let id = checked_id(user.id)?;
        if self.repo.find_by_id(id)?.is_none() {
            warn!("event=user_update module=service status=error error_code=not_found id={id}");
            return Err(ServiceError::NotFound(id));
        }

        let updated = self.repo.update(user)?;
        info!("event=user_update module=service status=ok id={id}");
        Ok(updated)
    }

    /// Deletes an existing user.
    pub fn delete_user(&self, id: UserId) -> ServiceResult<bool> {
        if self.repo.find_by_id(id)?.is_none() {
            warn!("event=user_delete module=service status=error error_code=not_found id={id}");
            return Err(ServiceError::NotFound(id));
        }

        let deleted = self.repo.delete(id)?;
        info!("event=user_delete module=service status=ok id={id}");
        Ok(deleted)
    }

    /// Looks a user up by id.
    ///
    /// A well-formed id without a matching row yields `Ok(None)`.
    pub fn get_user_by_id(&self, id: Option<UserId>) -> ServiceResult<Option<User>> {
        let id = checked_id(id)?;
        Ok(self.repo.find_by_id(id)?)
    }

    /// Returns every user; empty when none are registered.
    pub fn get_all_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repo.find_all()?)
    }

    /// Checks name and email of `user` against this service's policy.
    pub fn validate_user(&self, user: &User) -> Result<(), ValidationError> {
        if user.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let email = user.email.trim();
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if self.policy.email == EmailPolicy::WellFormed && !EMAIL_RE.is_match(email) {
            return Err(ValidationError::MalformedEmail(user.email.clone()));
        }

        Ok(())
    }

    fn checked(&self, user: &User) -> Result<(), ValidationError> {
        self.validate_user(user).inspect_err(|err| {
            warn!("event=user_validate module=service status=error error_code=validation error={err}");
        })
    }
}

fn checked_id(id: Option<UserId>) -> Result<UserId, ValidationError> {
    match id {
        Some(value) if value > 0 => Ok(value),
        other => Err(ValidationError::InvalidId(other)),
    }
}
