//! Staged plan submission to the external registry.
//!
//! # Responsibility
//! - Assemble the plan matter from current status, interval history, and
//!   the status-keyed rule tables.
//! - Execute the staged hand-off: validate, upload changed documents,
//!   reserve the permanent identifier once, validate the plan matter,
//!   create-or-update the current phase.
//!
//! # Invariants
//! - Unchanged documents are skipped via the remote last-modified check.
//! - A permanent identifier is reserved at most once per plan and must
//!   match the registry key format.
//! - Results are written back as plain plan columns only.

use crate::model::interval::{EventClass, EventInterval, Owner, StatusInterval};
use crate::model::plan::{Plan, PlanId};
use crate::repo::history_repo;
use crate::repo::plan_repo;
use crate::rules::allowed_event_codes;
use crate::service::now_ms;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registry identifier key format, e.g. `HR-104233`.
static PERMANENT_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,3}-\d{3,10}$").expect("identifier pattern is valid"));

pub type SyncResult<T> = Result<T, SyncError>;

/// Hand-off stage, carried in every sync error for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Validate,
    UploadDocuments,
    ReserveIdentifier,
    ValidateMatter,
    Phase,
    WriteBack,
}

impl Display for SyncStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::UploadDocuments => "upload_documents",
            Self::ReserveIdentifier => "reserve_identifier",
            Self::ValidateMatter => "validate_matter",
            Self::Phase => "phase",
            Self::WriteBack => "write_back",
        };
        f.write_str(name)
    }
}

/// Structured sync failure envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    pub stage: SyncStage,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl SyncError {
    pub fn new(
        stage: SyncStage,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            stage,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sync failed at stage {} with code {}: {}",
            self.stage, self.code, self.message
        )
    }
}

impl Error for SyncError {}

/// One uploadable submission document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDocument {
    /// Stable document key within the registry.
    pub document_id: String,
    /// Serialized document body.
    pub content: String,
    /// Local modification instant, epoch ms.
    pub modified_at: i64,
}

/// Interval history entry within the plan matter.
#[derive(Debug, Clone, Serialize)]
pub struct MatterInterval {
    pub status: String,
    pub starting_at: i64,
    pub ending_at: Option<i64>,
    pub events: Vec<MatterEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatterEvent {
    pub class: EventClass,
    pub code: String,
    pub starting_at: i64,
    pub ending_at: Option<i64>,
}

/// Records the registry requires for the plan's current status, derived
/// from the status-keyed rule tables.
#[derive(Debug, Clone, Serialize)]
pub struct RequiredRecords {
    pub decisions: Vec<String>,
    pub processing_events: Vec<String>,
    pub interaction_events: Vec<String>,
}

/// The fuller "plan matter" validated and submitted per phase.
#[derive(Debug, Clone, Serialize)]
pub struct PlanMatter {
    pub plan_uuid: PlanId,
    pub name: String,
    pub status: String,
    pub permanent_identifier: Option<String>,
    pub intervals: Vec<MatterInterval>,
    pub required: RequiredRecords,
}

/// External registry API surface used by the synchronizer.
pub trait RegistryClient {
    /// Returns the remote document's last-modified instant, if the
    /// document exists remotely.
    fn document_last_modified(&self, document_id: &str) -> SyncResult<Option<i64>>;
    /// Uploads one document body.
    fn upload_document(&self, document: &PlanDocument) -> SyncResult<()>;
    /// Reserves the permanent registry identifier for a plan. Called at
    /// most once per plan.
    fn reserve_permanent_identifier(&self, plan_key: &str) -> SyncResult<String>;
    /// Validates the plan; returns validation messages (empty = valid).
    fn validate_plan(&self, matter: &PlanMatter) -> SyncResult<Vec<String>>;
    /// Validates the fuller plan matter; returns validation messages.
    fn validate_plan_matter(&self, matter: &PlanMatter) -> SyncResult<Vec<String>>;
    /// Returns the remote phase document key, if the phase exists.
    fn get_phase(&self, permanent_identifier: &str, phase_key: &str) -> SyncResult<Option<String>>;
    /// Creates the phase remotely.
    fn create_phase(
        &self,
        permanent_identifier: &str,
        phase_key: &str,
        matter: &PlanMatter,
    ) -> SyncResult<()>;
    /// Updates the existing phase remotely.
    fn update_phase(
        &self,
        permanent_identifier: &str,
        phase_key: &str,
        matter: &PlanMatter,
    ) -> SyncResult<()>;
}

/// Outcome of one staged hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Remote validation rejected the plan; messages were written back.
    Rejected { messages: Vec<String> },
    /// The plan was exported end to end.
    Exported {
        uploaded: usize,
        skipped: usize,
        permanent_identifier: String,
        phase_created: bool,
    },
}

/// Staged, idempotent registry synchronizer.
///
/// Reads the plan and its historization records, derives required registry
/// records from the rule tables, and hands the result to a
/// [`RegistryClient`]. Results land in plain plan columns; status intervals
/// are never touched here.
pub struct SubmissionService<'conn, C: RegistryClient> {
    conn: &'conn Connection,
    client: C,
}

impl<'conn, C: RegistryClient> SubmissionService<'conn, C> {
    pub fn new(conn: &'conn Connection, client: C) -> Self {
        Self { conn, client }
    }

    /// Runs the full staged hand-off for one plan.
    pub fn sync_plan(&self, plan_uuid: PlanId) -> SyncResult<SubmissionOutcome> {
        let plan = self.load_plan(plan_uuid)?;
        let matter = self.build_matter(&plan)?;

        // Stage 1: plan validation. Messages are written back either way.
        let messages = self.client.validate_plan(&matter)?;
        self.write_validation(&plan, &messages)?;
        if !messages.is_empty() {
            warn!(
                "event=plan_sync module=sync status=rejected plan={} stage=validate messages={}",
                plan_uuid,
                messages.len()
            );
            return Ok(SubmissionOutcome::Rejected { messages });
        }

        // Stage 2: upload changed documents, skipping unchanged ones.
        let mut uploaded = 0usize;
        let mut skipped = 0usize;
        for document in build_documents(&plan, &matter) {
            let remote = self.client.document_last_modified(&document.document_id)?;
            if remote.is_some_and(|instant| instant >= document.modified_at) {
                skipped += 1;
                continue;
            }
            self.client.upload_document(&document)?;
            uploaded += 1;
        }

        // Stage 3: permanent identifier, reserved exactly once.
        let permanent_identifier = match plan.permanent_identifier.clone() {
            Some(identifier) => identifier,
            None => {
                let identifier = self
                    .client
                    .reserve_permanent_identifier(&plan.uuid.to_string())?;
                if !PERMANENT_IDENTIFIER_RE.is_match(&identifier) {
                    return Err(SyncError::new(
                        SyncStage::ReserveIdentifier,
                        "malformed_identifier",
                        format!("registry returned malformed identifier `{identifier}`"),
                        false,
                    ));
                }
                plan_repo::set_permanent_identifier(self.conn, plan.uuid, &identifier)
                    .map_err(write_back_error)?;
                identifier
            }
        };

        // Stage 4: plan matter validation.
        let matter = PlanMatter {
            permanent_identifier: Some(permanent_identifier.clone()),
            ..matter
        };
        let messages = self.client.validate_plan_matter(&matter)?;
        self.write_validation(&plan, &messages)?;
        if !messages.is_empty() {
            warn!(
                "event=plan_sync module=sync status=rejected plan={} stage=validate_matter messages={}",
                plan_uuid,
                messages.len()
            );
            return Ok(SubmissionOutcome::Rejected { messages });
        }

        // Stage 5: create-or-update the current phase.
        let phase_key = plan.status.clone();
        let phase_created = match self
            .client
            .get_phase(&permanent_identifier, &phase_key)?
        {
            Some(_) => {
                self.client
                    .update_phase(&permanent_identifier, &phase_key, &matter)?;
                false
            }
            None => {
                self.client
                    .create_phase(&permanent_identifier, &phase_key, &matter)?;
                true
            }
        };

        plan_repo::set_exported_at(self.conn, plan.uuid, now_ms()).map_err(write_back_error)?;
        info!(
            "event=plan_sync module=sync status=ok plan={} uploaded={} skipped={} phase_created={}",
            plan_uuid, uploaded, skipped, phase_created
        );

        Ok(SubmissionOutcome::Exported {
            uploaded,
            skipped,
            permanent_identifier,
            phase_created,
        })
    }

    fn load_plan(&self, plan_uuid: PlanId) -> SyncResult<Plan> {
        match plan_repo::get_plan(self.conn, plan_uuid) {
            Ok(Some(plan)) => Ok(plan),
            Ok(None) => Err(SyncError::new(
                SyncStage::Validate,
                "plan_not_found",
                format!("plan {plan_uuid} does not exist"),
                false,
            )),
            Err(err) => Err(SyncError::new(
                SyncStage::Validate,
                "store_error",
                err.to_string(),
                true,
            )),
        }
    }

    fn build_matter(&self, plan: &Plan) -> SyncResult<PlanMatter> {
        let intervals = history_repo::list_intervals(self.conn, Owner::plan(plan.uuid))
            .map_err(|err| {
                SyncError::new(SyncStage::Validate, "store_error", err.to_string(), true)
            })?;

        let mut matter_intervals = Vec::with_capacity(intervals.len());
        for interval in &intervals {
            let events = history_repo::list_events(self.conn, interval.uuid).map_err(|err| {
                SyncError::new(SyncStage::Validate, "store_error", err.to_string(), true)
            })?;
            matter_intervals.push(matter_interval(interval, events));
        }

        Ok(PlanMatter {
            plan_uuid: plan.uuid,
            name: plan.name.clone(),
            status: plan.status.clone(),
            permanent_identifier: plan.permanent_identifier.clone(),
            intervals: matter_intervals,
            required: required_records(&plan.status),
        })
    }

    fn write_validation(&self, plan: &Plan, messages: &[String]) -> SyncResult<()> {
        let joined = if messages.is_empty() {
            None
        } else {
            Some(messages.join("\n"))
        };
        plan_repo::set_validation_result(self.conn, plan.uuid, now_ms(), joined.as_deref())
            .map_err(write_back_error)
    }
}

/// Derives the registry's required decision/processing/interaction records
/// for a status value from the rule tables. One fixed mapping per status.
pub fn required_records(status: &str) -> RequiredRecords {
    let to_owned = |codes: &[&str]| codes.iter().map(|code| (*code).to_string()).collect();
    RequiredRecords {
        decisions: to_owned(allowed_event_codes(status, EventClass::Decision)),
        processing_events: to_owned(allowed_event_codes(status, EventClass::Processing)),
        interaction_events: to_owned(allowed_event_codes(status, EventClass::Interaction)),
    }
}

fn matter_interval(interval: &StatusInterval, events: Vec<EventInterval>) -> MatterInterval {
    MatterInterval {
        status: interval.status.clone(),
        starting_at: interval.starting_at,
        ending_at: interval.ending_at,
        events: events
            .into_iter()
            .map(|event| MatterEvent {
                class: event.class,
                code: event.code,
                starting_at: event.starting_at,
                ending_at: event.ending_at,
            })
            .collect(),
    }
}

/// Builds the uploadable documents for one plan: the plan record itself and
/// its historization record.
fn build_documents(plan: &Plan, matter: &PlanMatter) -> Vec<PlanDocument> {
    let plan_content = serde_json::to_string(matter).unwrap_or_default();
    let history_modified = matter
        .intervals
        .iter()
        .flat_map(|interval| {
            std::iter::once(interval.starting_at).chain(interval.ending_at)
        })
        .max()
        .unwrap_or(plan.updated_at);

    vec![
        PlanDocument {
            document_id: format!("{}/plan", plan.uuid),
            content: plan_content.clone(),
            modified_at: plan.updated_at,
        },
        PlanDocument {
            document_id: format!("{}/history", plan.uuid),
            content: plan_content,
            modified_at: history_modified,
        },
    ]
}

fn write_back_error(err: plan_repo::PlanRepoError) -> SyncError {
    SyncError::new(SyncStage::WriteBack, "store_error", err.to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::{required_records, PERMANENT_IDENTIFIER_RE};

    #[test]
    fn identifier_pattern_accepts_registry_keys() {
        assert!(PERMANENT_IDENTIFIER_RE.is_match("HR-104233"));
        assert!(PERMANENT_IDENTIFIER_RE.is_match("X-999"));
        assert!(!PERMANENT_IDENTIFIER_RE.is_match("hr-104233"));
        assert!(!PERMANENT_IDENTIFIER_RE.is_match("HR104233"));
        assert!(!PERMANENT_IDENTIFIER_RE.is_match("HR-12"));
    }

    #[test]
    fn required_records_follow_status_tables() {
        let preparation = required_records("02");
        assert_eq!(preparation.decisions, vec!["01", "02", "03"]);
        assert_eq!(preparation.processing_events, vec!["01", "02"]);

        let lapsed = required_records("08");
        assert!(lapsed.decisions.is_empty());
        assert!(lapsed.interaction_events.is_empty());
    }
}
