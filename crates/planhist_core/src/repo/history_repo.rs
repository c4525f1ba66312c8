//! Temporal historization store.
//!
//! # Responsibility
//! - Append/close status interval rows, one open interval per owner.
//! - Persist event interval rows nested inside status intervals.
//!
//! # Invariants
//! - An owner never has two simultaneously open intervals.
//! - A newly opened interval must not start before the interval it replaces
//!   ended (no time travel).
//! - Every function takes the caller's connection/transaction handle;
//!   violations surface as `TemporalOrdering*` errors that abort the
//!   enclosing transaction.

use crate::db::DbError;
use crate::model::interval::{EventInterval, IntervalId, Owner, OwnerKind, StatusInterval};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors from historization store operations.
#[derive(Debug)]
pub enum HistoryError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Opening a second open interval for the same owner.
    OpenIntervalExists { owner: Owner },
    /// Closing when the owner has no open interval.
    NoOpenInterval { owner: Owner },
    /// New interval starts before the previous one ended, or an interval
    /// would end before it started.
    TemporalOrdering {
        owner: Owner,
        boundary: i64,
        at: i64,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for HistoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::OpenIntervalExists { owner } => {
                write!(f, "{owner} already has an open status interval")
            }
            Self::NoOpenInterval { owner } => {
                write!(f, "{owner} has no open status interval")
            }
            Self::TemporalOrdering { owner, boundary, at } => write!(
                f,
                "temporal ordering violation for {owner}: {at} is before boundary {boundary}"
            ),
            Self::InvalidData(message) => write!(f, "invalid historization data: {message}"),
        }
    }
}

impl Error for HistoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for HistoryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for HistoryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

const INTERVAL_SELECT_SQL: &str = "SELECT
    uuid,
    owner_kind,
    owner_uuid,
    status,
    starting_at,
    ending_at
FROM status_intervals";

/// Opens a new status interval for the owner.
///
/// # Contract
/// - Fails with `OpenIntervalExists` when the owner already has an open
///   interval.
/// - Fails with `TemporalOrdering` when `at` precedes the end of the last
///   closed interval.
pub fn open_interval(
    conn: &Connection,
    owner: Owner,
    status: &str,
    at: i64,
) -> HistoryResult<StatusInterval> {
    if current_open_interval(conn, owner)?.is_some() {
        return Err(HistoryError::OpenIntervalExists { owner });
    }

    let last_end: Option<i64> = conn.query_row(
        "SELECT MAX(ending_at)
         FROM status_intervals
         WHERE owner_kind = ?1
           AND owner_uuid = ?2
           AND ending_at IS NOT NULL;",
        params![owner.kind.as_db(), owner.uuid.to_string()],
        |row| row.get(0),
    )?;
    if let Some(boundary) = last_end {
        if at < boundary {
            return Err(HistoryError::TemporalOrdering {
                owner,
                boundary,
                at,
            });
        }
    }

    let interval = StatusInterval {
        uuid: Uuid::new_v4(),
        owner,
        status: status.to_string(),
        starting_at: at,
        ending_at: None,
    };
    conn.execute(
        "INSERT INTO status_intervals (
            uuid,
            owner_kind,
            owner_uuid,
            status,
            starting_at,
            ending_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, NULL);",
        params![
            interval.uuid.to_string(),
            owner.kind.as_db(),
            owner.uuid.to_string(),
            status,
            at,
        ],
    )?;
    Ok(interval)
}

/// Closes the owner's currently open interval at `at`.
///
/// # Contract
/// - Fails with `NoOpenInterval` when nothing is open.
/// - Fails with `TemporalOrdering` when `at` precedes the open interval's
///   start.
pub fn close_open_interval(
    conn: &Connection,
    owner: Owner,
    at: i64,
) -> HistoryResult<StatusInterval> {
    let mut open = match current_open_interval(conn, owner)? {
        Some(interval) => interval,
        None => return Err(HistoryError::NoOpenInterval { owner }),
    };

    if at < open.starting_at {
        return Err(HistoryError::TemporalOrdering {
            owner,
            boundary: open.starting_at,
            at,
        });
    }

    conn.execute(
        "UPDATE status_intervals
         SET ending_at = ?2
         WHERE uuid = ?1;",
        params![open.uuid.to_string(), at],
    )?;
    open.ending_at = Some(at);
    Ok(open)
}

/// Loads the owner's open interval, if any.
pub fn current_open_interval(
    conn: &Connection,
    owner: Owner,
) -> HistoryResult<Option<StatusInterval>> {
    let mut stmt = conn.prepare(&format!(
        "{INTERVAL_SELECT_SQL}
         WHERE owner_kind = ?1
           AND owner_uuid = ?2
           AND ending_at IS NULL;"
    ))?;
    let mut rows = stmt.query(params![owner.kind.as_db(), owner.uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_interval_row(row)?));
    }
    Ok(None)
}

/// Lists the owner's intervals in chronological order.
pub fn list_intervals(conn: &Connection, owner: Owner) -> HistoryResult<Vec<StatusInterval>> {
    let mut stmt = conn.prepare(&format!(
        "{INTERVAL_SELECT_SQL}
         WHERE owner_kind = ?1
           AND owner_uuid = ?2
         ORDER BY starting_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query(params![owner.kind.as_db(), owner.uuid.to_string()])?;

    let mut intervals = Vec::new();
    while let Some(row) = rows.next()? {
        intervals.push(parse_interval_row(row)?);
    }
    Ok(intervals)
}

/// Loads one interval by id.
pub fn get_interval(
    conn: &Connection,
    interval_uuid: IntervalId,
) -> HistoryResult<Option<StatusInterval>> {
    let mut stmt = conn.prepare(&format!("{INTERVAL_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([interval_uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_interval_row(row)?));
    }
    Ok(None)
}

/// Inserts one validated event row. Compatibility and bounds are checked by
/// the event service before this call.
pub fn insert_event(conn: &Connection, event: &EventInterval) -> HistoryResult<()> {
    conn.execute(
        "INSERT INTO event_intervals (
            uuid,
            interval_uuid,
            class,
            code,
            starting_at,
            ending_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            event.uuid.to_string(),
            event.interval_uuid.to_string(),
            event.class.as_db(),
            event.code.as_str(),
            event.starting_at,
            event.ending_at,
        ],
    )?;
    Ok(())
}

/// Lists events nested in one interval in chronological order.
pub fn list_events(
    conn: &Connection,
    interval_uuid: IntervalId,
) -> HistoryResult<Vec<EventInterval>> {
    let mut stmt = conn.prepare(
        "SELECT
            uuid,
            interval_uuid,
            class,
            code,
            starting_at,
            ending_at
         FROM event_intervals
         WHERE interval_uuid = ?1
         ORDER BY starting_at ASC, uuid ASC;",
    )?;
    let mut rows = stmt.query([interval_uuid.to_string()])?;

    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        events.push(parse_event_row(row)?);
    }
    Ok(events)
}

/// Deletes every interval (and, via FK cascade, nested events) of an owner.
/// Called by owner deletion paths.
pub fn delete_intervals_for_owner(conn: &Connection, owner: Owner) -> HistoryResult<()> {
    conn.execute(
        "DELETE FROM status_intervals
         WHERE owner_kind = ?1
           AND owner_uuid = ?2;",
        params![owner.kind.as_db(), owner.uuid.to_string()],
    )?;
    Ok(())
}

fn parse_interval_row(row: &Row<'_>) -> HistoryResult<StatusInterval> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "status_intervals.uuid")?;

    let kind_text: String = row.get("owner_kind")?;
    let kind = OwnerKind::parse(&kind_text).ok_or_else(|| {
        HistoryError::InvalidData(format!(
            "invalid owner kind `{kind_text}` in status_intervals.owner_kind"
        ))
    })?;

    let owner_uuid_text: String = row.get("owner_uuid")?;
    let owner_uuid = parse_uuid(&owner_uuid_text, "status_intervals.owner_uuid")?;

    Ok(StatusInterval {
        uuid,
        owner: Owner {
            kind,
            uuid: owner_uuid,
        },
        status: row.get("status")?,
        starting_at: row.get("starting_at")?,
        ending_at: row.get("ending_at")?,
    })
}

fn parse_event_row(row: &Row<'_>) -> HistoryResult<EventInterval> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "event_intervals.uuid")?;

    let interval_text: String = row.get("interval_uuid")?;
    let interval_uuid = parse_uuid(&interval_text, "event_intervals.interval_uuid")?;

    let class_text: String = row.get("class")?;
    let class = crate::model::interval::EventClass::parse(&class_text).ok_or_else(|| {
        HistoryError::InvalidData(format!(
            "invalid event class `{class_text}` in event_intervals.class"
        ))
    })?;

    Ok(EventInterval {
        uuid,
        interval_uuid,
        class,
        code: row.get("code")?,
        starting_at: row.get("starting_at")?,
        ending_at: row.get("ending_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> HistoryResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| HistoryError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// Returns whether the owner has exactly one open interval. Used by tests
/// and consistency probes.
pub fn open_interval_count(conn: &Connection, owner: Owner) -> HistoryResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*)
         FROM status_intervals
         WHERE owner_kind = ?1
           AND owner_uuid = ?2
           AND ending_at IS NULL;",
        params![owner.kind.as_db(), owner.uuid.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}
