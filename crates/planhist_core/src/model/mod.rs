//! Domain model for statutory land-use plan records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep lifecycle historization shapes (intervals, events) in one place.
//!
//! # Invariants
//! - Every domain object is identified by a stable `Uuid`.
//! - Lifecycle status is a code value drawn from the fixed code list in
//!   `crate::rules`.

pub mod geometry;
pub mod interval;
pub mod plan;
