//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into transactional, invariant-checked
//!   write paths.
//! - Keep callers decoupled from SQL and historization details.
//!
//! # Invariants
//! - Every write path runs inside one `Immediate` SQLite transaction; a
//!   violated invariant aborts the whole transaction.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod event_service;
pub mod lifecycle_service;
pub mod plan_service;

/// Current wall-clock instant in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
