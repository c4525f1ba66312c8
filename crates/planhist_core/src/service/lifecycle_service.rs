//! Status propagation engine.
//!
//! # Responsibility
//! - Apply status changes to historized owners: close the open interval,
//!   open the next one, keep the owner's status column in step.
//! - Cascade a plan's status change to dependents per the cascade registry.
//!
//! # Invariants
//! - A no-op status change (new == current) is a silent success and leaves
//!   exactly one open interval.
//! - Cascade reaches only dependents whose current status equals the plan's
//!   previous status; deliberately diverged dependents are left untouched.
//! - Every cascaded write and historization write commits atomically with
//!   the plan's own interval change, or none does.

use crate::model::interval::{Owner, StatusInterval};
use crate::repo::history_repo::{self, HistoryError};
use crate::repo::plan_repo::{self, PlanRepoError};
use crate::rules::{cascade_targets, status_code};
use crate::service::now_ms;
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from status propagation operations.
#[derive(Debug)]
pub enum LifecycleError {
    /// Status code value is not in the fixed code list.
    UnknownStatus(String),
    /// Target owner row does not exist.
    NotFound(Owner),
    /// Historization invariant violation (temporal ordering, open interval
    /// bookkeeping).
    History(HistoryError),
    /// Repository-level failure.
    Repo(PlanRepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStatus(value) => write!(f, "unknown lifecycle status code: {value}"),
            Self::NotFound(owner) => write!(f, "{owner} not found"),
            Self::History(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::History(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HistoryError> for LifecycleError {
    fn from(value: HistoryError) -> Self {
        Self::History(value)
    }
}

impl From<PlanRepoError> for LifecycleError {
    fn from(value: PlanRepoError) -> Self {
        match value {
            PlanRepoError::NotFound(owner) => Self::NotFound(owner),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(PlanRepoError::from(value))
    }
}

/// Transactional status change engine over one migrated connection.
pub struct LifecycleService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> LifecycleService<'conn> {
    /// Creates the service from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> Result<Self, LifecycleError> {
        plan_repo::ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Sets the owner's status now. See [`Self::set_status_at`].
    pub fn set_status(&self, owner: Owner, new_status: &str) -> Result<(), LifecycleError> {
        self.set_status_at(owner, new_status, now_ms())
    }

    /// Sets the owner's status at an explicit instant.
    ///
    /// # Contract
    /// - Rejects unknown status codes before touching storage.
    /// - No-op when the owner already holds `new_status` (silent success).
    /// - Closes the open interval and opens the next one at `at`.
    /// - For a plan owner, cascades to every dependent listed by the cascade
    ///   registry whose current status equals the plan's previous status,
    ///   closing/opening their intervals at the same instant.
    /// - Fully transactional: one commit or a clean rollback.
    pub fn set_status_at(
        &self,
        owner: Owner,
        new_status: &str,
        at: i64,
    ) -> Result<(), LifecycleError> {
        if status_code(new_status).is_none() {
            return Err(LifecycleError::UnknownStatus(new_status.to_string()));
        }

        // Immediate behavior takes the write lock up front, so the previous
        // status read below cannot race a concurrent change on the same row.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let previous = plan_repo::owner_status(&tx, owner)?
            .ok_or(LifecycleError::NotFound(owner))?;
        if previous == new_status {
            info!(
                "event=status_change module=lifecycle status=noop owner_kind={} owner={} value={}",
                owner.kind, owner.uuid, new_status
            );
            return Ok(());
        }

        transition(&tx, owner, new_status, at)?;

        let mut cascaded = 0usize;
        let targets = cascade_targets(owner.kind);
        if !targets.is_empty() {
            for (dependent, status) in plan_repo::plan_dependents(&tx, owner.uuid)? {
                if !targets.contains(&dependent.kind) {
                    continue;
                }
                if status != previous {
                    continue;
                }
                transition(&tx, dependent, new_status, at)?;
                cascaded += 1;
            }
        }

        match tx.commit() {
            Ok(()) => {
                info!(
                    "event=status_change module=lifecycle status=ok owner_kind={} owner={} from={} to={} cascaded={}",
                    owner.kind, owner.uuid, previous, new_status, cascaded
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=status_change module=lifecycle status=error owner_kind={} owner={} error_code=commit_failed error={}",
                    owner.kind, owner.uuid, err
                );
                Err(err.into())
            }
        }
    }

    /// Lists the owner's historization record in chronological order.
    pub fn history(&self, owner: Owner) -> Result<Vec<StatusInterval>, LifecycleError> {
        Ok(history_repo::list_intervals(self.conn, owner)?)
    }

    /// Loads the owner's currently open interval, if any.
    pub fn current_interval(&self, owner: Owner) -> Result<Option<StatusInterval>, LifecycleError> {
        Ok(history_repo::current_open_interval(self.conn, owner)?)
    }
}

/// Closes the owner's open interval at `at`, opens the next one, and keeps
/// the owner row's status column in step. Runs inside the caller's
/// transaction.
fn transition(
    tx: &Connection,
    owner: Owner,
    new_status: &str,
    at: i64,
) -> Result<(), LifecycleError> {
    history_repo::close_open_interval(tx, owner, at)?;
    history_repo::open_interval(tx, owner, new_status, at)?;
    plan_repo::update_owner_status(tx, owner, new_status)?;
    Ok(())
}
