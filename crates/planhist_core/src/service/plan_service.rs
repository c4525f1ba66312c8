//! Plan record write paths with geometry and topology guards.
//!
//! # Responsibility
//! - Create plans, regulation groups, plan objects, regulations, and
//!   propositions with their first historization interval.
//! - Run the geometry guard (validity, simplicity, principal land-use
//!   non-overlap) on every insert/update of a geometry-bearing entity.
//!
//! # Invariants
//! - New dependents inherit the plan's current status; callers never supply
//!   one.
//! - A geometry violation aborts the whole write transaction; prior state
//!   is untouched.
//! - A plan has at most one general regulation group.

use crate::model::geometry::{
    line_is_simple, polygon_is_valid, polygons_overlap, Geometry, GeometryFault, Polygon,
};
use crate::model::interval::Owner;
use crate::model::plan::{
    GroupId, Plan, PlanId, PlanObject, PlanObjectId, Proposition, Regulation, RegulationGroup,
};
use crate::repo::history_repo::{self, HistoryError};
use crate::repo::plan_repo::{self, PlanRepoError};
use crate::rules::status_code;
use crate::service::now_ms;
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from plan record write paths.
#[derive(Debug)]
pub enum PlanWriteError {
    /// Status code value is not in the fixed code list.
    UnknownStatus(String),
    /// Target row does not exist.
    NotFound(Owner),
    /// Plan already has a general regulation group.
    GeneralGroupExists(PlanId),
    /// Polygonal geometry is not OGC-valid.
    InvalidGeometry { owner: Owner, fault: GeometryFault },
    /// Line geometry self-intersects.
    SelfIntersectingLine { owner: Owner },
    /// Two area objects sharing a principal land-use code overlap.
    OverlappingGeometry {
        first: PlanObjectId,
        second: PlanObjectId,
        code: String,
    },
    /// Historization failure.
    History(HistoryError),
    /// Repository-level failure.
    Repo(PlanRepoError),
}

impl Display for PlanWriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStatus(value) => write!(f, "unknown lifecycle status code: {value}"),
            Self::NotFound(owner) => write!(f, "{owner} not found"),
            Self::GeneralGroupExists(plan) => {
                write!(f, "plan {plan} already has a general regulation group")
            }
            Self::InvalidGeometry { owner, fault } => {
                write!(f, "invalid geometry on {owner}: {fault}")
            }
            Self::SelfIntersectingLine { owner } => {
                write!(f, "line geometry on {owner} self-intersects")
            }
            Self::OverlappingGeometry {
                first,
                second,
                code,
            } => write!(
                f,
                "area objects {first} and {second} overlap under principal land use `{code}`"
            ),
            Self::History(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlanWriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::History(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HistoryError> for PlanWriteError {
    fn from(value: HistoryError) -> Self {
        Self::History(value)
    }
}

impl From<PlanRepoError> for PlanWriteError {
    fn from(value: PlanRepoError) -> Self {
        match value {
            PlanRepoError::NotFound(owner) => Self::NotFound(owner),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for PlanWriteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(PlanRepoError::from(value))
    }
}

/// Transactional write service for plan records.
pub struct PlanService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> PlanService<'conn> {
    /// Creates the service from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> Result<Self, PlanWriteError> {
        plan_repo::ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Creates one plan with its first open status interval.
    pub fn create_plan(
        &self,
        name: &str,
        status: &str,
        geometry: &Polygon,
    ) -> Result<Plan, PlanWriteError> {
        if status_code(status).is_none() {
            return Err(PlanWriteError::UnknownStatus(status.to_string()));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let plan = plan_repo::create_plan(&tx, name, status, geometry)?;

        let owner = Owner::plan(plan.uuid);
        if let Err(fault) = polygon_is_valid(geometry) {
            return Err(PlanWriteError::InvalidGeometry { owner, fault });
        }

        history_repo::open_interval(&tx, owner, status, now_ms())?;
        tx.commit()?;

        info!(
            "event=plan_create module=plan status=ok plan={} lifecycle_status={}",
            plan.uuid, plan.status
        );
        Ok(plan)
    }

    /// Replaces one plan's footprint geometry after validity checks.
    pub fn update_plan_geometry(
        &self,
        plan_uuid: PlanId,
        geometry: &Polygon,
    ) -> Result<(), PlanWriteError> {
        if let Err(fault) = polygon_is_valid(geometry) {
            return Err(PlanWriteError::InvalidGeometry {
                owner: Owner::plan(plan_uuid),
                fault,
            });
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        plan_repo::update_plan_geometry(&tx, plan_uuid, geometry)?;
        tx.commit()?;
        Ok(())
    }

    /// Creates one regulation group under a plan.
    pub fn create_group(
        &self,
        plan_uuid: PlanId,
        name: &str,
        is_general: bool,
    ) -> Result<RegulationGroup, PlanWriteError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if plan_repo::get_plan(&tx, plan_uuid)?.is_none() {
            return Err(PlanWriteError::NotFound(Owner::plan(plan_uuid)));
        }
        if is_general && plan_repo::general_group(&tx, plan_uuid)?.is_some() {
            return Err(PlanWriteError::GeneralGroupExists(plan_uuid));
        }

        let group = plan_repo::create_group(&tx, plan_uuid, name, is_general)?;
        tx.commit()?;
        Ok(group)
    }

    /// Creates one plan object, links it to its regulation groups, runs the
    /// geometry guard, and opens its first status interval.
    ///
    /// # Contract
    /// - The object inherits the plan's current status; callers never
    ///   supply one.
    /// - An area object whose groups carry a principal land-use regulation
    ///   must not overlap another such object of the same plan under the
    ///   same code; shared boundaries are permitted.
    pub fn create_plan_object(
        &self,
        plan_uuid: PlanId,
        land_use: bool,
        name: &str,
        geometry: &Geometry,
        group_uuids: &[GroupId],
    ) -> Result<PlanObject, PlanWriteError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let plan = plan_repo::get_plan(&tx, plan_uuid)?
            .ok_or(PlanWriteError::NotFound(Owner::plan(plan_uuid)))?;

        let object = plan_repo::create_plan_object(
            &tx,
            plan_uuid,
            land_use,
            name,
            plan.status.as_str(),
            geometry,
        )?;
        let owner = Owner::plan_object(object.uuid);

        check_geometry_shape(owner, geometry)?;
        for group_uuid in group_uuids {
            plan_repo::link_object_to_group(&tx, object.uuid, *group_uuid)?;
        }
        check_principal_overlaps(&tx, plan_uuid, object.uuid)?;

        history_repo::open_interval(&tx, owner, plan.status.as_str(), now_ms())?;
        tx.commit()?;

        info!(
            "event=plan_object_create module=plan status=ok plan={} object={} kind={}",
            plan_uuid,
            object.uuid,
            object.geometry.kind_str()
        );
        Ok(object)
    }

    /// Replaces one plan object's geometry after the full geometry guard.
    pub fn update_plan_object_geometry(
        &self,
        object_uuid: PlanObjectId,
        geometry: &Geometry,
    ) -> Result<(), PlanWriteError> {
        let owner = Owner::plan_object(object_uuid);
        check_geometry_shape(owner, geometry)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let object = plan_repo::get_plan_object(&tx, object_uuid)?
            .ok_or(PlanWriteError::NotFound(owner))?;

        plan_repo::update_plan_object_geometry(&tx, object_uuid, geometry)?;
        check_principal_overlaps(&tx, object.plan_uuid, object_uuid)?;
        tx.commit()?;
        Ok(())
    }

    /// Creates one regulation under a group, inheriting the plan's current
    /// status, with its first interval opened in the same transaction.
    pub fn create_regulation(
        &self,
        group_uuid: GroupId,
        code: &str,
    ) -> Result<Regulation, PlanWriteError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let plan_status = plan_status_of_group(&tx, group_uuid)?;

        let regulation = plan_repo::create_regulation(&tx, group_uuid, code, plan_status.as_str())?;
        history_repo::open_interval(
            &tx,
            Owner::regulation(regulation.uuid),
            plan_status.as_str(),
            now_ms(),
        )?;
        tx.commit()?;
        Ok(regulation)
    }

    /// Creates one proposition under a group, inheriting the plan's current
    /// status, with its first interval opened in the same transaction.
    pub fn create_proposition(
        &self,
        group_uuid: GroupId,
        body: &str,
    ) -> Result<Proposition, PlanWriteError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let plan_status = plan_status_of_group(&tx, group_uuid)?;

        let proposition = plan_repo::create_proposition(&tx, group_uuid, body, plan_status.as_str())?;
        history_repo::open_interval(
            &tx,
            Owner::proposition(proposition.uuid),
            plan_status.as_str(),
            now_ms(),
        )?;
        tx.commit()?;
        Ok(proposition)
    }

    /// Deletes one plan with all dependents and historization records.
    pub fn delete_plan(&self, plan_uuid: PlanId) -> Result<(), PlanWriteError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        plan_repo::delete_plan(&tx, plan_uuid)?;
        tx.commit()?;
        info!(
            "event=plan_delete module=plan status=ok plan={}",
            plan_uuid
        );
        Ok(())
    }

    /// Loads one plan by id.
    pub fn get_plan(&self, plan_uuid: PlanId) -> Result<Option<Plan>, PlanWriteError> {
        Ok(plan_repo::get_plan(self.conn, plan_uuid)?)
    }

    /// Loads one plan object by id.
    pub fn get_plan_object(
        &self,
        object_uuid: PlanObjectId,
    ) -> Result<Option<PlanObject>, PlanWriteError> {
        Ok(plan_repo::get_plan_object(self.conn, object_uuid)?)
    }
}

/// Validity/simplicity portion of the geometry guard.
fn check_geometry_shape(owner: Owner, geometry: &Geometry) -> Result<(), PlanWriteError> {
    match geometry {
        Geometry::Area(polygon) => polygon_is_valid(polygon)
            .map_err(|fault| PlanWriteError::InvalidGeometry { owner, fault }),
        Geometry::Line(line) => {
            line_is_simple(line).map_err(|fault| match fault {
                GeometryFault::RingSelfIntersection => {
                    PlanWriteError::SelfIntersectingLine { owner }
                }
                other => PlanWriteError::InvalidGeometry { owner, fault: other },
            })
        }
        Geometry::Point(_) => Ok(()),
    }
}

/// Non-overlap portion of the geometry guard: the subject area object must
/// not overlap any other area object of the plan sharing a principal
/// land-use code. Runs inside the caller's transaction, after the subject's
/// row and group links are in place.
fn check_principal_overlaps(
    tx: &Connection,
    plan_uuid: PlanId,
    subject_uuid: PlanObjectId,
) -> Result<(), PlanWriteError> {
    let classified = plan_repo::area_objects_with_principal_codes(tx, plan_uuid)?;
    let (subject, subject_codes) = match classified
        .iter()
        .find(|(object, _)| object.uuid == subject_uuid)
    {
        Some(entry) => entry,
        None => return Ok(()),
    };

    let subject_polygon = match &subject.geometry {
        Geometry::Area(polygon) => polygon,
        _ => return Ok(()),
    };

    for (other, other_codes) in &classified {
        if other.uuid == subject_uuid {
            continue;
        }
        let shared = match subject_codes
            .iter()
            .find(|code| other_codes.contains(code))
        {
            Some(code) => code,
            None => continue,
        };
        if let Geometry::Area(other_polygon) = &other.geometry {
            if polygons_overlap(subject_polygon, other_polygon) {
                return Err(PlanWriteError::OverlappingGeometry {
                    first: other.uuid,
                    second: subject_uuid,
                    code: shared.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Resolves the current status of the plan owning `group_uuid`.
fn plan_status_of_group(tx: &Connection, group_uuid: GroupId) -> Result<String, PlanWriteError> {
    let group = plan_repo::get_group(tx, group_uuid)?.ok_or_else(|| {
        PlanWriteError::Repo(PlanRepoError::InvalidData(format!(
            "regulation group {group_uuid} not found"
        )))
    })?;
    let plan = plan_repo::get_plan(tx, group.plan_uuid)?
        .ok_or(PlanWriteError::NotFound(Owner::plan(group.plan_uuid)))?;
    Ok(plan.status)
}
