//! Plan record repository: plans, objects, groups, regulations, propositions.
//!
//! # Responsibility
//! - Provide explicit CRUD and FK-indexed dependency lookups over canonical
//!   plan storage.
//! - Keep SQL and geometry (de)serialization details inside the persistence
//!   boundary.
//!
//! # Invariants
//! - Geometry columns always hold valid JSON for the model geometry types.
//! - Dependent lookups go through explicit foreign keys; there are no
//!   object-graph backrefs.
//! - Owner deletion removes the owner's historization rows in the same
//!   transaction.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::geometry::{Geometry, Polygon};
use crate::model::interval::{Owner, OwnerKind};
use crate::model::plan::{
    GroupId, Plan, PlanId, PlanObject, PlanObjectId, Proposition, PropositionId, Regulation,
    RegulationGroup, RegulationId,
};
use crate::repo::history_repo;
use crate::rules::is_principal_land_use;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type PlanRepoResult<T> = Result<T, PlanRepoError>;

/// Errors from plan record persistence and query operations.
#[derive(Debug)]
pub enum PlanRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target row does not exist.
    NotFound(Owner),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for PlanRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(owner) => write!(f, "{owner} not found"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "plan repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "plan repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid plan data: {message}"),
        }
    }
}

impl Error for PlanRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PlanRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PlanRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<history_repo::HistoryError> for PlanRepoError {
    fn from(value: history_repo::HistoryError) -> Self {
        match value {
            history_repo::HistoryError::Db(err) => Self::Db(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

const PLAN_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    status,
    geometry,
    permanent_identifier,
    validated_at,
    validation_errors,
    exported_at,
    created_at,
    updated_at
FROM plans";

const OBJECT_SELECT_SQL: &str = "SELECT
    uuid,
    plan_uuid,
    land_use,
    name,
    status,
    geometry,
    created_at,
    updated_at
FROM plan_objects";

/// Verifies the connection carries the migrated schema this repository
/// expects. Services call this once at construction.
pub fn ensure_schema_ready(conn: &Connection) -> PlanRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(PlanRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in [
        "plans",
        "regulation_groups",
        "plan_objects",
        "plan_object_groups",
        "regulations",
        "propositions",
        "status_intervals",
        "event_intervals",
    ] {
        if !table_exists(conn, table)? {
            return Err(PlanRepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Inserts one plan row and returns the stored record.
pub fn create_plan(
    conn: &Connection,
    name: &str,
    status: &str,
    geometry: &Polygon,
) -> PlanRepoResult<Plan> {
    let uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO plans (uuid, name, status, geometry)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            uuid.to_string(),
            name,
            status,
            polygon_to_json(geometry)?,
        ],
    )?;
    get_plan(conn, uuid)?.ok_or(PlanRepoError::NotFound(Owner::plan(uuid)))
}

/// Loads one plan by id.
pub fn get_plan(conn: &Connection, uuid: PlanId) -> PlanRepoResult<Option<Plan>> {
    let mut stmt = conn.prepare(&format!("{PLAN_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_plan_row(row)?));
    }
    Ok(None)
}

/// Replaces one plan's footprint geometry.
pub fn update_plan_geometry(
    conn: &Connection,
    uuid: PlanId,
    geometry: &Polygon,
) -> PlanRepoResult<()> {
    let changed = conn.execute(
        "UPDATE plans
         SET geometry = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        params![uuid.to_string(), polygon_to_json(geometry)?],
    )?;
    if changed == 0 {
        return Err(PlanRepoError::NotFound(Owner::plan(uuid)));
    }
    Ok(())
}

/// Sets the current status column on any historized owner row.
pub fn update_owner_status(conn: &Connection, owner: Owner, status: &str) -> PlanRepoResult<()> {
    let sql = match owner.kind {
        OwnerKind::Plan => {
            "UPDATE plans
             SET status = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;"
        }
        OwnerKind::PlanObject => {
            "UPDATE plan_objects
             SET status = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;"
        }
        OwnerKind::Regulation => {
            "UPDATE regulations
             SET status = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;"
        }
        OwnerKind::Proposition => {
            "UPDATE propositions
             SET status = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;"
        }
    };
    let changed = conn.execute(sql, params![owner.uuid.to_string(), status])?;
    if changed == 0 {
        return Err(PlanRepoError::NotFound(owner));
    }
    Ok(())
}

/// Loads the current status column of any historized owner row.
pub fn owner_status(conn: &Connection, owner: Owner) -> PlanRepoResult<Option<String>> {
    let sql = match owner.kind {
        OwnerKind::Plan => "SELECT status FROM plans WHERE uuid = ?1;",
        OwnerKind::PlanObject => "SELECT status FROM plan_objects WHERE uuid = ?1;",
        OwnerKind::Regulation => "SELECT status FROM regulations WHERE uuid = ?1;",
        OwnerKind::Proposition => "SELECT status FROM propositions WHERE uuid = ?1;",
    };
    let status = conn
        .query_row(sql, [owner.uuid.to_string()], |row| row.get(0))
        .optional()?;
    Ok(status)
}

/// Writes remote validation results back to the plan row.
pub fn set_validation_result(
    conn: &Connection,
    uuid: PlanId,
    validated_at: i64,
    validation_errors: Option<&str>,
) -> PlanRepoResult<()> {
    let changed = conn.execute(
        "UPDATE plans
         SET validated_at = ?2,
             validation_errors = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        params![uuid.to_string(), validated_at, validation_errors],
    )?;
    if changed == 0 {
        return Err(PlanRepoError::NotFound(Owner::plan(uuid)));
    }
    Ok(())
}

/// Records the export instant on the plan row.
pub fn set_exported_at(conn: &Connection, uuid: PlanId, exported_at: i64) -> PlanRepoResult<()> {
    let changed = conn.execute(
        "UPDATE plans
         SET exported_at = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        params![uuid.to_string(), exported_at],
    )?;
    if changed == 0 {
        return Err(PlanRepoError::NotFound(Owner::plan(uuid)));
    }
    Ok(())
}

/// Stores the permanent identifier obtained from the registry.
pub fn set_permanent_identifier(
    conn: &Connection,
    uuid: PlanId,
    identifier: &str,
) -> PlanRepoResult<()> {
    let changed = conn.execute(
        "UPDATE plans
         SET permanent_identifier = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        params![uuid.to_string(), identifier],
    )?;
    if changed == 0 {
        return Err(PlanRepoError::NotFound(Owner::plan(uuid)));
    }
    Ok(())
}

/// Deletes one plan with every dependent row and all historization records.
/// Must run inside the caller's transaction.
pub fn delete_plan(conn: &Connection, uuid: PlanId) -> PlanRepoResult<()> {
    if get_plan(conn, uuid)?.is_none() {
        return Err(PlanRepoError::NotFound(Owner::plan(uuid)));
    }

    for (owner, _) in plan_dependents(conn, uuid)? {
        history_repo::delete_intervals_for_owner(conn, owner)?;
    }
    for object_uuid in plan_object_ids(conn, uuid)? {
        history_repo::delete_intervals_for_owner(conn, Owner::plan_object(object_uuid))?;
    }
    history_repo::delete_intervals_for_owner(conn, Owner::plan(uuid))?;

    conn.execute("DELETE FROM plans WHERE uuid = ?1;", [uuid.to_string()])?;
    Ok(())
}

/// Inserts one regulation group row.
pub fn create_group(
    conn: &Connection,
    plan_uuid: PlanId,
    name: &str,
    is_general: bool,
) -> PlanRepoResult<RegulationGroup> {
    let uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO regulation_groups (uuid, plan_uuid, name, is_general)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            uuid.to_string(),
            plan_uuid.to_string(),
            name,
            i64::from(is_general),
        ],
    )?;
    Ok(RegulationGroup {
        uuid,
        plan_uuid,
        name: name.to_string(),
        is_general,
    })
}

/// Loads one regulation group by id.
pub fn get_group(conn: &Connection, uuid: GroupId) -> PlanRepoResult<Option<RegulationGroup>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, plan_uuid, name, is_general
         FROM regulation_groups
         WHERE uuid = ?1;",
    )?;
    let mut rows = stmt.query([uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_group_row(row)?));
    }
    Ok(None)
}

/// Loads the plan-wide general group, if one exists.
pub fn general_group(conn: &Connection, plan_uuid: PlanId) -> PlanRepoResult<Option<RegulationGroup>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, plan_uuid, name, is_general
         FROM regulation_groups
         WHERE plan_uuid = ?1
           AND is_general = 1;",
    )?;
    let mut rows = stmt.query([plan_uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_group_row(row)?));
    }
    Ok(None)
}

/// Inserts one plan object row.
pub fn create_plan_object(
    conn: &Connection,
    plan_uuid: PlanId,
    land_use: bool,
    name: &str,
    status: &str,
    geometry: &Geometry,
) -> PlanRepoResult<PlanObject> {
    let uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO plan_objects (uuid, plan_uuid, kind, land_use, name, status, geometry)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            uuid.to_string(),
            plan_uuid.to_string(),
            geometry.kind_str(),
            i64::from(land_use),
            name,
            status,
            geometry_to_json(geometry)?,
        ],
    )?;
    get_plan_object(conn, uuid)?.ok_or(PlanRepoError::NotFound(Owner::plan_object(uuid)))
}

/// Loads one plan object by id.
pub fn get_plan_object(
    conn: &Connection,
    uuid: PlanObjectId,
) -> PlanRepoResult<Option<PlanObject>> {
    let mut stmt = conn.prepare(&format!("{OBJECT_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_object_row(row)?));
    }
    Ok(None)
}

/// Replaces one plan object's geometry, keeping the kind discriminator in
/// step with the new geometry.
pub fn update_plan_object_geometry(
    conn: &Connection,
    uuid: PlanObjectId,
    geometry: &Geometry,
) -> PlanRepoResult<()> {
    let changed = conn.execute(
        "UPDATE plan_objects
         SET kind = ?2,
             geometry = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        params![
            uuid.to_string(),
            geometry.kind_str(),
            geometry_to_json(geometry)?,
        ],
    )?;
    if changed == 0 {
        return Err(PlanRepoError::NotFound(Owner::plan_object(uuid)));
    }
    Ok(())
}

/// Links one plan object to one regulation group. Idempotent.
pub fn link_object_to_group(
    conn: &Connection,
    object_uuid: PlanObjectId,
    group_uuid: GroupId,
) -> PlanRepoResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO plan_object_groups (object_uuid, group_uuid)
         VALUES (?1, ?2);",
        params![object_uuid.to_string(), group_uuid.to_string()],
    )?;
    Ok(())
}

/// Inserts one regulation row.
pub fn create_regulation(
    conn: &Connection,
    group_uuid: GroupId,
    code: &str,
    status: &str,
) -> PlanRepoResult<Regulation> {
    let uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO regulations (uuid, group_uuid, code, status)
         VALUES (?1, ?2, ?3, ?4);",
        params![uuid.to_string(), group_uuid.to_string(), code, status],
    )?;
    Ok(Regulation {
        uuid,
        group_uuid,
        code: code.to_string(),
        status: status.to_string(),
    })
}

/// Loads one regulation by id.
pub fn get_regulation(
    conn: &Connection,
    uuid: RegulationId,
) -> PlanRepoResult<Option<Regulation>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, group_uuid, code, status
         FROM regulations
         WHERE uuid = ?1;",
    )?;
    let mut rows = stmt.query([uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let group_text: String = row.get("group_uuid")?;
        return Ok(Some(Regulation {
            uuid: parse_uuid(&uuid_text, "regulations.uuid")?,
            group_uuid: parse_uuid(&group_text, "regulations.group_uuid")?,
            code: row.get("code")?,
            status: row.get("status")?,
        }));
    }
    Ok(None)
}

/// Inserts one proposition row.
pub fn create_proposition(
    conn: &Connection,
    group_uuid: GroupId,
    body: &str,
    status: &str,
) -> PlanRepoResult<Proposition> {
    let uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO propositions (uuid, group_uuid, body, status)
         VALUES (?1, ?2, ?3, ?4);",
        params![uuid.to_string(), group_uuid.to_string(), body, status],
    )?;
    Ok(Proposition {
        uuid,
        group_uuid,
        body: body.to_string(),
        status: status.to_string(),
    })
}

/// Loads one proposition by id.
pub fn get_proposition(
    conn: &Connection,
    uuid: PropositionId,
) -> PlanRepoResult<Option<Proposition>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, group_uuid, body, status
         FROM propositions
         WHERE uuid = ?1;",
    )?;
    let mut rows = stmt.query([uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let group_text: String = row.get("group_uuid")?;
        return Ok(Some(Proposition {
            uuid: parse_uuid(&uuid_text, "propositions.uuid")?,
            group_uuid: parse_uuid(&group_text, "propositions.group_uuid")?,
            body: row.get("body")?,
            status: row.get("status")?,
        }));
    }
    Ok(None)
}

/// Lists every regulation and proposition under any of the plan's groups,
/// with its current status. Deterministic order: regulations first, then
/// propositions, each by uuid.
pub fn plan_dependents(
    conn: &Connection,
    plan_uuid: PlanId,
) -> PlanRepoResult<Vec<(Owner, String)>> {
    let mut dependents = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT r.uuid, r.status
         FROM regulations r
         INNER JOIN regulation_groups g ON g.uuid = r.group_uuid
         WHERE g.plan_uuid = ?1
         ORDER BY r.uuid ASC;",
    )?;
    let mut rows = stmt.query([plan_uuid.to_string()])?;
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        dependents.push((
            Owner::regulation(parse_uuid(&uuid_text, "regulations.uuid")?),
            row.get(1)?,
        ));
    }

    let mut stmt = conn.prepare(
        "SELECT p.uuid, p.status
         FROM propositions p
         INNER JOIN regulation_groups g ON g.uuid = p.group_uuid
         WHERE g.plan_uuid = ?1
         ORDER BY p.uuid ASC;",
    )?;
    let mut rows = stmt.query([plan_uuid.to_string()])?;
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        dependents.push((
            Owner::proposition(parse_uuid(&uuid_text, "propositions.uuid")?),
            row.get(1)?,
        ));
    }

    Ok(dependents)
}

/// Lists area objects of one plan with their principal land-use codes,
/// resolved through the object's regulation groups. Objects without any
/// principal code are omitted.
pub fn area_objects_with_principal_codes(
    conn: &Connection,
    plan_uuid: PlanId,
) -> PlanRepoResult<Vec<(PlanObject, Vec<String>)>> {
    let mut stmt = conn.prepare(&format!(
        "{OBJECT_SELECT_SQL}
         WHERE plan_uuid = ?1
           AND kind = 'area'
         ORDER BY uuid ASC;"
    ))?;
    let mut rows = stmt.query([plan_uuid.to_string()])?;

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let object = parse_object_row(row)?;
        let codes = principal_codes_for_object(conn, object.uuid)?;
        if !codes.is_empty() {
            result.push((object, codes));
        }
    }
    Ok(result)
}

fn principal_codes_for_object(
    conn: &Connection,
    object_uuid: PlanObjectId,
) -> PlanRepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT r.code
         FROM regulations r
         INNER JOIN plan_object_groups og ON og.group_uuid = r.group_uuid
         WHERE og.object_uuid = ?1
         ORDER BY r.code ASC;",
    )?;
    let mut rows = stmt.query([object_uuid.to_string()])?;

    let mut codes = Vec::new();
    while let Some(row) = rows.next()? {
        let code: String = row.get(0)?;
        if is_principal_land_use(&code) {
            codes.push(code);
        }
    }
    Ok(codes)
}

fn plan_object_ids(conn: &Connection, plan_uuid: PlanId) -> PlanRepoResult<Vec<PlanObjectId>> {
    let mut stmt = conn.prepare(
        "SELECT uuid FROM plan_objects WHERE plan_uuid = ?1 ORDER BY uuid ASC;",
    )?;
    let mut rows = stmt.query([plan_uuid.to_string()])?;

    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        ids.push(parse_uuid(&uuid_text, "plan_objects.uuid")?);
    }
    Ok(ids)
}

fn parse_plan_row(row: &Row<'_>) -> PlanRepoResult<Plan> {
    let uuid_text: String = row.get("uuid")?;
    let geometry_text: String = row.get("geometry")?;
    Ok(Plan {
        uuid: parse_uuid(&uuid_text, "plans.uuid")?,
        name: row.get("name")?,
        status: row.get("status")?,
        geometry: polygon_from_json(&geometry_text)?,
        permanent_identifier: row.get("permanent_identifier")?,
        validated_at: row.get("validated_at")?,
        validation_errors: row.get("validation_errors")?,
        exported_at: row.get("exported_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_object_row(row: &Row<'_>) -> PlanRepoResult<PlanObject> {
    let uuid_text: String = row.get("uuid")?;
    let plan_text: String = row.get("plan_uuid")?;
    let geometry_text: String = row.get("geometry")?;

    let land_use = match row.get::<_, i64>("land_use")? {
        0 => false,
        1 => true,
        other => {
            return Err(PlanRepoError::InvalidData(format!(
                "invalid land_use value `{other}` in plan_objects.land_use"
            )));
        }
    };

    Ok(PlanObject {
        uuid: parse_uuid(&uuid_text, "plan_objects.uuid")?,
        plan_uuid: parse_uuid(&plan_text, "plan_objects.plan_uuid")?,
        land_use,
        name: row.get("name")?,
        status: row.get("status")?,
        geometry: geometry_from_json(&geometry_text)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_group_row(row: &Row<'_>) -> PlanRepoResult<RegulationGroup> {
    let uuid_text: String = row.get("uuid")?;
    let plan_text: String = row.get("plan_uuid")?;
    let is_general = match row.get::<_, i64>("is_general")? {
        0 => false,
        1 => true,
        other => {
            return Err(PlanRepoError::InvalidData(format!(
                "invalid is_general value `{other}` in regulation_groups.is_general"
            )));
        }
    };
    Ok(RegulationGroup {
        uuid: parse_uuid(&uuid_text, "regulation_groups.uuid")?,
        plan_uuid: parse_uuid(&plan_text, "regulation_groups.plan_uuid")?,
        name: row.get("name")?,
        is_general,
    })
}

fn polygon_to_json(polygon: &Polygon) -> PlanRepoResult<String> {
    serde_json::to_string(polygon)
        .map_err(|err| PlanRepoError::InvalidData(format!("polygon serialization failed: {err}")))
}

fn polygon_from_json(value: &str) -> PlanRepoResult<Polygon> {
    serde_json::from_str(value).map_err(|err| {
        PlanRepoError::InvalidData(format!("invalid polygon JSON in plans.geometry: {err}"))
    })
}

fn geometry_to_json(geometry: &Geometry) -> PlanRepoResult<String> {
    serde_json::to_string(geometry)
        .map_err(|err| PlanRepoError::InvalidData(format!("geometry serialization failed: {err}")))
}

fn geometry_from_json(value: &str) -> PlanRepoResult<Geometry> {
    serde_json::from_str(value).map_err(|err| {
        PlanRepoError::InvalidData(format!(
            "invalid geometry JSON in plan_objects.geometry: {err}"
        ))
    })
}

fn parse_uuid(value: &str, column: &'static str) -> PlanRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| PlanRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn table_exists(conn: &Connection, table: &str) -> PlanRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
