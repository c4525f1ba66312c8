//! Event-type compatibility validator and event write path.
//!
//! # Responsibility
//! - Admit event intervals only when their (status, classification, code)
//!   triple is on the static allow-list.
//! - Enforce event bounds against the owning status interval.
//!
//! # Invariants
//! - An event starts within `[interval.starting_at, interval.ending_at or
//!   +inf)`.
//! - A closed owning interval bounds the event's end as well.
//! - An event without `ending_at` is instantaneous.

use crate::model::interval::{EventClass, EventInterval, IntervalId};
use crate::repo::history_repo::{self, HistoryError};
use crate::repo::plan_repo::{self, PlanRepoError};
use crate::rules::event_is_allowed;
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from event interval admission.
#[derive(Debug)]
pub enum EventError {
    /// Owning status interval does not exist.
    IntervalNotFound(IntervalId),
    /// (status, classification, code) triple is not on the allow-list.
    Incompatible {
        interval: IntervalId,
        status: String,
        class: EventClass,
        code: String,
    },
    /// Event lies outside the bounds of its owning interval.
    OutsideInterval {
        interval: IntervalId,
        event_start: i64,
        event_end: Option<i64>,
        interval_start: i64,
        interval_end: Option<i64>,
    },
    /// Event would end before it starts.
    EndBeforeStart { starting_at: i64, ending_at: i64 },
    /// Historization failure.
    History(HistoryError),
    /// Repository-level failure.
    Repo(PlanRepoError),
}

impl Display for EventError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IntervalNotFound(interval) => {
                write!(f, "status interval not found: {interval}")
            }
            Self::Incompatible {
                interval,
                status,
                class,
                code,
            } => write!(
                f,
                "event ({class}, {code}) is not admitted under status {status} in interval {interval}"
            ),
            Self::OutsideInterval {
                interval,
                event_start,
                event_end,
                interval_start,
                interval_end,
            } => write!(
                f,
                "event [{event_start}, {event_end:?}] lies outside interval {interval} bounds [{interval_start}, {interval_end:?}]"
            ),
            Self::EndBeforeStart {
                starting_at,
                ending_at,
            } => write!(f, "event ends at {ending_at} before it starts at {starting_at}"),
            Self::History(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EventError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::History(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HistoryError> for EventError {
    fn from(value: HistoryError) -> Self {
        Self::History(value)
    }
}

impl From<PlanRepoError> for EventError {
    fn from(value: PlanRepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for EventError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(PlanRepoError::from(value))
    }
}

/// Transactional event admission service over one migrated connection.
pub struct EventService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> EventService<'conn> {
    /// Creates the service from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> Result<Self, EventError> {
        plan_repo::ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Records one event inside a status interval after compatibility and
    /// bounds validation.
    pub fn record_event(
        &self,
        interval_uuid: IntervalId,
        class: EventClass,
        code: &str,
        starting_at: i64,
        ending_at: Option<i64>,
    ) -> Result<EventInterval, EventError> {
        if let Some(end) = ending_at {
            if end < starting_at {
                return Err(EventError::EndBeforeStart {
                    starting_at,
                    ending_at: end,
                });
            }
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let interval = history_repo::get_interval(&tx, interval_uuid)?
            .ok_or(EventError::IntervalNotFound(interval_uuid))?;

        if !event_is_allowed(interval.status.as_str(), class, code) {
            return Err(EventError::Incompatible {
                interval: interval_uuid,
                status: interval.status,
                class,
                code: code.to_string(),
            });
        }

        let start_ok = interval.contains(starting_at);
        let end_ok = match (ending_at, interval.ending_at) {
            (Some(event_end), Some(interval_end)) => event_end <= interval_end,
            _ => true,
        };
        if !start_ok || !end_ok {
            return Err(EventError::OutsideInterval {
                interval: interval_uuid,
                event_start: starting_at,
                event_end: ending_at,
                interval_start: interval.starting_at,
                interval_end: interval.ending_at,
            });
        }

        let event = EventInterval {
            uuid: Uuid::new_v4(),
            interval_uuid,
            class,
            code: code.to_string(),
            starting_at,
            ending_at,
        };
        history_repo::insert_event(&tx, &event)?;
        tx.commit()?;

        info!(
            "event=event_record module=event status=ok interval={} class={} code={}",
            interval_uuid, class, code
        );
        Ok(event)
    }

    /// Lists events nested in one interval in chronological order.
    pub fn events(&self, interval_uuid: IntervalId) -> Result<Vec<EventInterval>, EventError> {
        Ok(history_repo::list_events(self.conn, interval_uuid)?)
    }
}
