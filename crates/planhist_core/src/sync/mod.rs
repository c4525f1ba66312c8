//! Registry submission synchronization.
//!
//! # Responsibility
//! - Build submission documents from plan state and historization records.
//! - Drive the staged, idempotent hand-off to the external plan registry.
//!
//! # Invariants
//! - The synchronizer writes only plain status columns back to the store;
//!   it never opens or closes status intervals.

pub mod submission;
