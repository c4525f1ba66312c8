//! Core domain logic for PlanHist.
//! This crate is the single source of truth for lifecycle and
//! historization invariants of statutory land-use plan records.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod rules;
pub mod service;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geometry::{Geometry, GeometryFault, LineString, Polygon, Pt, Ring};
pub use model::interval::{EventClass, EventInterval, Owner, OwnerKind, StatusInterval};
pub use model::plan::{Plan, PlanObject, Proposition, Regulation, RegulationGroup};
pub use service::event_service::{EventError, EventService};
pub use service::lifecycle_service::{LifecycleError, LifecycleService};
pub use service::plan_service::{PlanService, PlanWriteError};
pub use sync::submission::{
    RegistryClient, SubmissionOutcome, SubmissionService, SyncError, SyncStage,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
