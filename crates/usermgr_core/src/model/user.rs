//! User domain model.
//!
//! # Responsibility
//! - Define the single persisted record managed by this crate.
//!
//! # Invariants
//! - `id` and `created_at` are assigned by the store on insert and never
//!   change afterwards.
//! - `email` is unique across all users (enforced by the store).
//!
//! # See also
//! - crates/usermgr_core/src/db/migrations/0001_users.sql

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Store-assigned numeric user identifier.
pub type UserId = i64;

/// Maximum stored length of `name`, in characters.
pub const NAME_MAX_CHARS: usize = 15;
/// Maximum stored length of `email`, in characters.
pub const EMAIL_MAX_CHARS: usize = 25;

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// `None` until the user has been inserted.
    pub id: Option<UserId>,
    /// Display name, stored in the `username` column.
    pub name: String,
    pub email: String,
    pub age: u32,
    /// Unix epoch milliseconds. Set once by the store at insert time.
    pub created_at: Option<i64>,
}

impl User {
    /// Creates an unsaved user. `id` and `created_at` stay empty until insert.
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            age,
            created_at: None,
        }
    }
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "User(id=")?;
        match self.id {
            Some(id) => write!(f, "{id}")?,
            None => write!(f, "-")?,
        }
        write!(
            f,
            ", name={}, email={}, age={}, created_at=",
            self.name, self.email, self.age
        )?;
        match self.created_at {
            Some(created_at) => write!(f, "{created_at})"),
            None => write!(f, "-)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::User;

    #[test]
    fn new_user_is_not_persisted() {
        let user = User::new("Arslan", "a@x.com", 28);
        assert_eq!(user.id, None);
        assert_eq!(user.created_at, None);
    }

    #[test]
    fn display_marks_unassigned_fields() {
        let mut user = User::new("Arslan", "a@x.com", 28);
        assert_eq!(
            user.to_string(),
            "User(id=-, name=Arslan, email=a@x.com, age=28, created_at=-)"
        );

        user.id = Some(7);
        user.created_at = Some(1_700_000_000_000);
        assert_eq!(
            user.to_string(),
            "User(id=7, name=Arslan, email=a@x.com, age=28, created_at=1700000000000)"
        );
    }
}
