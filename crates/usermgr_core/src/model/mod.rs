//! Domain model for user management.
//!
//! # Responsibility
//! - Define canonical data structures used by repository and service layers.
//!
//! # Invariants
//! - Users are identified by a store-assigned `UserId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod user;
