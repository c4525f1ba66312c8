//! Lifecycle historization records.
//!
//! # Responsibility
//! - Define status interval and nested event interval shapes.
//! - Identify interval owners across the four historized entity kinds.
//!
//! # Invariants
//! - An owner has at most one interval with `ending_at = None` at any time.
//! - `starting_at <= ending_at` whenever an interval is closed.
//! - An event lies inside the bounds of its owning status interval.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one status interval row.
pub type IntervalId = Uuid;

/// Stable identifier of one event interval row.
pub type EventId = Uuid;

/// Entity kinds that carry a historized lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Plan,
    PlanObject,
    Regulation,
    Proposition,
}

impl OwnerKind {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::PlanObject => "plan_object",
            Self::Regulation => "regulation",
            Self::Proposition => "proposition",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plan" => Some(Self::Plan),
            "plan_object" => Some(Self::PlanObject),
            "regulation" => Some(Self::Regulation),
            "proposition" => Some(Self::Proposition),
            _ => None,
        }
    }
}

impl Display for OwnerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Reference to the entity owning a status interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub uuid: Uuid,
}

impl Owner {
    pub fn plan(uuid: Uuid) -> Self {
        Self {
            kind: OwnerKind::Plan,
            uuid,
        }
    }

    pub fn plan_object(uuid: Uuid) -> Self {
        Self {
            kind: OwnerKind::PlanObject,
            uuid,
        }
    }

    pub fn regulation(uuid: Uuid) -> Self {
        Self {
            kind: OwnerKind::Regulation,
            uuid,
        }
    }

    pub fn proposition(uuid: Uuid) -> Self {
        Self {
            kind: OwnerKind::Proposition,
            uuid,
        }
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.uuid)
    }
}

/// Historized record of how long an owner held one lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusInterval {
    pub uuid: IntervalId,
    pub owner: Owner,
    /// Lifecycle status code value held during this interval.
    pub status: String,
    /// Epoch milliseconds.
    pub starting_at: i64,
    /// Epoch milliseconds. `None` means currently open.
    pub ending_at: Option<i64>,
}

impl StatusInterval {
    pub fn is_open(&self) -> bool {
        self.ending_at.is_none()
    }

    /// Returns whether `at` falls within `[starting_at, ending_at or +inf)`.
    pub fn contains(&self, at: i64) -> bool {
        at >= self.starting_at && self.ending_at.map_or(true, |end| at <= end)
    }
}

/// Mutually exclusive classification of a nested sub-event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    /// Formal decision taken during the status.
    Decision,
    /// Processing/handling step performed by the authority.
    Processing,
    /// Interaction with stakeholders or the public.
    Interaction,
}

impl EventClass {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Processing => "processing",
            Self::Interaction => "interaction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "decision" => Some(Self::Decision),
            "processing" => Some(Self::Processing),
            "interaction" => Some(Self::Interaction),
            _ => None,
        }
    }
}

impl Display for EventClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Sub-event nested inside one status interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInterval {
    pub uuid: EventId,
    pub interval_uuid: IntervalId,
    pub class: EventClass,
    /// Concrete code value within the classification's code list.
    pub code: String,
    /// Epoch milliseconds.
    pub starting_at: i64,
    /// Epoch milliseconds. `None` means an instantaneous event.
    pub ending_at: Option<i64>,
}
