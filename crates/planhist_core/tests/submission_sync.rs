use planhist_core::db::open_db_in_memory;
use planhist_core::model::geometry::{Polygon, Pt};
use planhist_core::sync::submission::{PlanDocument, PlanMatter, SubmissionService};
use planhist_core::{
    Plan, PlanService, RegistryClient, SubmissionOutcome, SyncError, SyncStage,
};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

fn unit_square() -> Polygon {
    Polygon::from_exterior(vec![
        Pt::new(0.0, 0.0),
        Pt::new(4.0, 0.0),
        Pt::new(4.0, 4.0),
        Pt::new(0.0, 4.0),
        Pt::new(0.0, 0.0),
    ])
}

fn seed_plan(conn: &Connection) -> Plan {
    let plans = PlanService::try_new(conn).unwrap();
    plans.create_plan("Test plan", "03", &unit_square()).unwrap()
}

#[derive(Default)]
struct FakeRegistry {
    remote_documents: RefCell<HashMap<String, i64>>,
    uploaded: RefCell<Vec<String>>,
    reserve_calls: Cell<usize>,
    identifier: Option<String>,
    plan_messages: Vec<String>,
    matter_messages: Vec<String>,
    phases: RefCell<HashSet<String>>,
    phase_updates: Cell<usize>,
}

impl FakeRegistry {
    fn with_identifier(identifier: &str) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            ..Self::default()
        }
    }
}

impl RegistryClient for FakeRegistry {
    fn document_last_modified(&self, document_id: &str) -> Result<Option<i64>, SyncError> {
        Ok(self.remote_documents.borrow().get(document_id).copied())
    }

    fn upload_document(&self, document: &PlanDocument) -> Result<(), SyncError> {
        self.uploaded.borrow_mut().push(document.document_id.clone());
        self.remote_documents
            .borrow_mut()
            .insert(document.document_id.clone(), document.modified_at);
        Ok(())
    }

    fn reserve_permanent_identifier(&self, _plan_key: &str) -> Result<String, SyncError> {
        self.reserve_calls.set(self.reserve_calls.get() + 1);
        Ok(self
            .identifier
            .clone()
            .unwrap_or_else(|| "HR-104233".to_string()))
    }

    fn validate_plan(&self, _matter: &PlanMatter) -> Result<Vec<String>, SyncError> {
        Ok(self.plan_messages.clone())
    }

    fn validate_plan_matter(&self, _matter: &PlanMatter) -> Result<Vec<String>, SyncError> {
        Ok(self.matter_messages.clone())
    }

    fn get_phase(
        &self,
        permanent_identifier: &str,
        phase_key: &str,
    ) -> Result<Option<String>, SyncError> {
        let key = format!("{permanent_identifier}/{phase_key}");
        Ok(self.phases.borrow().get(&key).cloned())
    }

    fn create_phase(
        &self,
        permanent_identifier: &str,
        phase_key: &str,
        _matter: &PlanMatter,
    ) -> Result<(), SyncError> {
        self.phases
            .borrow_mut()
            .insert(format!("{permanent_identifier}/{phase_key}"));
        Ok(())
    }

    fn update_phase(
        &self,
        _permanent_identifier: &str,
        _phase_key: &str,
        _matter: &PlanMatter,
    ) -> Result<(), SyncError> {
        self.phase_updates.set(self.phase_updates.get() + 1);
        Ok(())
    }
}

impl RegistryClient for &FakeRegistry {
    fn document_last_modified(&self, document_id: &str) -> Result<Option<i64>, SyncError> {
        (**self).document_last_modified(document_id)
    }
    fn upload_document(&self, document: &PlanDocument) -> Result<(), SyncError> {
        (**self).upload_document(document)
    }
    fn reserve_permanent_identifier(&self, plan_key: &str) -> Result<String, SyncError> {
        (**self).reserve_permanent_identifier(plan_key)
    }
    fn validate_plan(&self, matter: &PlanMatter) -> Result<Vec<String>, SyncError> {
        (**self).validate_plan(matter)
    }
    fn validate_plan_matter(&self, matter: &PlanMatter) -> Result<Vec<String>, SyncError> {
        (**self).validate_plan_matter(matter)
    }
    fn get_phase(
        &self,
        permanent_identifier: &str,
        phase_key: &str,
    ) -> Result<Option<String>, SyncError> {
        (**self).get_phase(permanent_identifier, phase_key)
    }
    fn create_phase(
        &self,
        permanent_identifier: &str,
        phase_key: &str,
        matter: &PlanMatter,
    ) -> Result<(), SyncError> {
        (**self).create_phase(permanent_identifier, phase_key, matter)
    }
    fn update_phase(
        &self,
        permanent_identifier: &str,
        phase_key: &str,
        matter: &PlanMatter,
    ) -> Result<(), SyncError> {
        (**self).update_phase(permanent_identifier, phase_key, matter)
    }
}

#[test]
fn first_sync_exports_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let plan = seed_plan(&conn);
    let sync = SubmissionService::new(&conn, FakeRegistry::default());

    let outcome = sync.sync_plan(plan.uuid).unwrap();
    match outcome {
        SubmissionOutcome::Exported {
            uploaded,
            skipped,
            permanent_identifier,
            phase_created,
        } => {
            assert_eq!(uploaded, 2);
            assert_eq!(skipped, 0);
            assert_eq!(permanent_identifier, "HR-104233");
            assert!(phase_created);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let plans = PlanService::try_new(&conn).unwrap();
    let loaded = plans.get_plan(plan.uuid).unwrap().unwrap();
    assert_eq!(loaded.permanent_identifier.as_deref(), Some("HR-104233"));
    assert!(loaded.validated_at.is_some());
    assert!(loaded.validation_errors.is_none());
    assert!(loaded.exported_at.is_some());
}

#[test]
fn unchanged_documents_are_skipped() {
    let conn = open_db_in_memory().unwrap();
    let plan = seed_plan(&conn);

    let registry = FakeRegistry::default();
    registry
        .remote_documents
        .borrow_mut()
        .insert(format!("{}/plan", plan.uuid), i64::MAX);
    registry
        .remote_documents
        .borrow_mut()
        .insert(format!("{}/history", plan.uuid), i64::MAX);

    let sync = SubmissionService::new(&conn, registry);
    match sync.sync_plan(plan.uuid).unwrap() {
        SubmissionOutcome::Exported {
            uploaded, skipped, ..
        } => {
            assert_eq!(uploaded, 0);
            assert_eq!(skipped, 2);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn permanent_identifier_is_reserved_only_once() {
    let conn = open_db_in_memory().unwrap();
    let plan = seed_plan(&conn);

    let registry = FakeRegistry::default();
    let sync = SubmissionService::new(&conn, &registry);
    sync.sync_plan(plan.uuid).unwrap();
    sync.sync_plan(plan.uuid).unwrap();

    assert_eq!(registry.reserve_calls.get(), 1);
    let plans = PlanService::try_new(&conn).unwrap();
    let loaded = plans.get_plan(plan.uuid).unwrap().unwrap();
    assert_eq!(loaded.permanent_identifier.as_deref(), Some("HR-104233"));
}

#[test]
fn second_sync_updates_the_existing_phase() {
    let conn = open_db_in_memory().unwrap();
    let plan = seed_plan(&conn);

    let registry = FakeRegistry::default();
    let sync = SubmissionService::new(&conn, &registry);

    match sync.sync_plan(plan.uuid).unwrap() {
        SubmissionOutcome::Exported { phase_created, .. } => assert!(phase_created),
        other => panic!("unexpected outcome: {other:?}"),
    }
    match sync.sync_plan(plan.uuid).unwrap() {
        SubmissionOutcome::Exported { phase_created, .. } => assert!(!phase_created),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(registry.phase_updates.get(), 1);
}

#[test]
fn validation_messages_are_written_back_and_stop_the_hand_off() {
    let conn = open_db_in_memory().unwrap();
    let plan = seed_plan(&conn);

    let registry = FakeRegistry {
        plan_messages: vec!["missing lifecycle decision".to_string()],
        ..FakeRegistry::default()
    };
    let sync = SubmissionService::new(&conn, registry);

    match sync.sync_plan(plan.uuid).unwrap() {
        SubmissionOutcome::Rejected { messages } => {
            assert_eq!(messages, vec!["missing lifecycle decision".to_string()]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let plans = PlanService::try_new(&conn).unwrap();
    let loaded = plans.get_plan(plan.uuid).unwrap().unwrap();
    assert!(loaded.validated_at.is_some());
    assert_eq!(
        loaded.validation_errors.as_deref(),
        Some("missing lifecycle decision")
    );
    assert!(loaded.permanent_identifier.is_none());
    assert!(loaded.exported_at.is_none());
}

#[test]
fn matter_rejection_stops_before_the_phase_stage() {
    let conn = open_db_in_memory().unwrap();
    let plan = seed_plan(&conn);

    let registry = FakeRegistry {
        matter_messages: vec!["plan matter incomplete".to_string()],
        ..FakeRegistry::default()
    };
    let sync = SubmissionService::new(&conn, registry);

    match sync.sync_plan(plan.uuid).unwrap() {
        SubmissionOutcome::Rejected { messages } => {
            assert_eq!(messages, vec!["plan matter incomplete".to_string()]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let plans = PlanService::try_new(&conn).unwrap();
    let loaded = plans.get_plan(plan.uuid).unwrap().unwrap();
    // Identifier reservation happens before matter validation and sticks.
    assert_eq!(loaded.permanent_identifier.as_deref(), Some("HR-104233"));
    assert!(loaded.exported_at.is_none());
    assert_eq!(
        loaded.validation_errors.as_deref(),
        Some("plan matter incomplete")
    );
}

#[test]
fn malformed_registry_identifier_fails_the_reservation_stage() {
    let conn = open_db_in_memory().unwrap();
    let plan = seed_plan(&conn);

    let registry = FakeRegistry::with_identifier("not a key");
    let sync = SubmissionService::new(&conn, registry);

    let err = sync.sync_plan(plan.uuid).unwrap_err();
    assert_eq!(err.stage, SyncStage::ReserveIdentifier);
    assert_eq!(err.code, "malformed_identifier");

    let plans = PlanService::try_new(&conn).unwrap();
    let loaded = plans.get_plan(plan.uuid).unwrap().unwrap();
    assert!(loaded.permanent_identifier.is_none());
    assert!(loaded.exported_at.is_none());
}

#[test]
fn syncing_a_missing_plan_reports_plan_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed_plan(&conn);
    let sync = SubmissionService::new(&conn, FakeRegistry::default());

    let err = sync.sync_plan(uuid::Uuid::new_v4()).unwrap_err();
    assert_eq!(err.stage, SyncStage::Validate);
    assert_eq!(err.code, "plan_not_found");
}
