//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define explicit, FK-indexed data access over canonical plan storage.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every function takes an explicit connection/transaction handle; there
//!   is no process-wide session state.
//! - Repository APIs return semantic errors (`NotFound`, temporal ordering)
//!   in addition to DB transport errors.

pub mod history_repo;
pub mod plan_repo;
