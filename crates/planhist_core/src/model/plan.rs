//! Plan, plan object, and regulation domain records.
//!
//! # Responsibility
//! - Define the canonical statutory plan record and its dependents.
//! - Keep registry submission write-back fields on the plan record.
//!
//! # Invariants
//! - `status` always holds a code value from the fixed lifecycle code list.
//! - A plan has at most one general regulation group.
//! - Plan object geometry kind matches the stored `kind` discriminator.

use crate::model::geometry::{Geometry, Polygon};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a plan record.
pub type PlanId = Uuid;

/// Stable identifier for a spatial plan object.
pub type PlanObjectId = Uuid;

/// Stable identifier for a regulation group.
pub type GroupId = Uuid;

/// Stable identifier for a regulation.
pub type RegulationId = Uuid;

/// Stable identifier for a proposition.
pub type PropositionId = Uuid;

/// Top-level statutory spatial planning record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub uuid: PlanId,
    pub name: String,
    /// Current lifecycle status code value.
    pub status: String,
    /// Plan area footprint.
    pub geometry: Polygon,
    /// Registry identifier obtained once during submission.
    pub permanent_identifier: Option<String>,
    /// Epoch ms of the last successful remote validation.
    pub validated_at: Option<i64>,
    /// Remote validation messages, newline separated.
    pub validation_errors: Option<String>,
    /// Epoch ms of the last successful export.
    pub exported_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Named bundle of regulations/propositions shared by plan objects or,
/// when general, by the plan itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationGroup {
    pub uuid: GroupId,
    pub plan_uuid: PlanId,
    pub name: String,
    /// The plan-wide general group; at most one per plan.
    pub is_general: bool,
}

/// Spatial object belonging to one plan, linked to regulation groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanObject {
    pub uuid: PlanObjectId,
    pub plan_uuid: PlanId,
    /// Land-use semantics as opposed to "other" markings.
    pub land_use: bool,
    pub name: String,
    /// Current lifecycle status code value.
    pub status: String,
    pub geometry: Geometry,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Binding rule attached to a regulation group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    pub uuid: RegulationId,
    pub group_uuid: GroupId,
    /// Regulation kind code value; principal land-use codes drive the
    /// area overlap exclusion.
    pub code: String,
    /// Current lifecycle status code value.
    pub status: String,
}

/// Non-binding recommendation attached to a regulation group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposition {
    pub uuid: PropositionId,
    pub group_uuid: GroupId,
    pub body: String,
    /// Current lifecycle status code value.
    pub status: String,
}
