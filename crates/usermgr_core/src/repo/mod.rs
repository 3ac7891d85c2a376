//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data-access contract used by the service layer.
//! - Isolate SQLite query details from validation and business rules.
//!
//! # Invariants
//! - Repository APIs report a missing row as `None`/`false`, never as an error.
//! - Store failures are wrapped with the failed operation name.

pub mod user_repo;
