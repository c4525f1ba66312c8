use planhist_core::db::open_db_in_memory;
use planhist_core::model::geometry::{Polygon, Pt};
use planhist_core::model::interval::{EventClass, Owner, StatusInterval};
use planhist_core::{EventError, EventService, LifecycleService, PlanService};
use rusqlite::Connection;

fn unit_square() -> Polygon {
    Polygon::from_exterior(vec![
        Pt::new(0.0, 0.0),
        Pt::new(4.0, 0.0),
        Pt::new(4.0, 4.0),
        Pt::new(0.0, 4.0),
        Pt::new(0.0, 0.0),
    ])
}

fn seed_plan_interval(conn: &Connection, status: &str) -> StatusInterval {
    let plans = PlanService::try_new(conn).unwrap();
    let plan = plans.create_plan("Test plan", status, &unit_square()).unwrap();
    let lifecycle = LifecycleService::try_new(conn).unwrap();
    lifecycle
        .current_interval(Owner::plan(plan.uuid))
        .unwrap()
        .unwrap()
}

#[test]
fn allowed_event_is_recorded_inside_its_interval() {
    let conn = open_db_in_memory().unwrap();
    let interval = seed_plan_interval(&conn, "03");
    let events = EventService::try_new(&conn).unwrap();

    let event = events
        .record_event(
            interval.uuid,
            EventClass::Decision,
            "04",
            interval.starting_at,
            None,
        )
        .unwrap();
    assert_eq!(event.interval_uuid, interval.uuid);

    let listed = events.events(interval.uuid).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].code, "04");
    assert_eq!(listed[0].class, EventClass::Decision);
}

#[test]
fn event_code_off_the_allow_list_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let interval = seed_plan_interval(&conn, "03");
    let events = EventService::try_new(&conn).unwrap();

    let err = events
        .record_event(
            interval.uuid,
            EventClass::Interaction,
            "01",
            interval.starting_at,
            None,
        )
        .unwrap_err();
    match err {
        EventError::Incompatible { status, code, .. } => {
            assert_eq!(status, "03");
            assert_eq!(code, "01");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(events.events(interval.uuid).unwrap().is_empty());
}

#[test]
fn proposal_decision_is_rejected_under_valid_status() {
    let conn = open_db_in_memory().unwrap();
    let interval = seed_plan_interval(&conn, "06");
    let events = EventService::try_new(&conn).unwrap();

    let err = events
        .record_event(
            interval.uuid,
            EventClass::Decision,
            "04",
            interval.starting_at,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EventError::Incompatible { .. }));

    events
        .record_event(
            interval.uuid,
            EventClass::Decision,
            "09",
            interval.starting_at,
            None,
        )
        .unwrap();
}

#[test]
fn event_starting_before_its_interval_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let interval = seed_plan_interval(&conn, "03");
    let events = EventService::try_new(&conn).unwrap();

    let err = events
        .record_event(
            interval.uuid,
            EventClass::Decision,
            "04",
            interval.starting_at - 1,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EventError::OutsideInterval { .. }));
}

#[test]
fn event_overrunning_a_closed_interval_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let interval = seed_plan_interval(&conn, "03");
    let lifecycle = LifecycleService::try_new(&conn).unwrap();
    let events = EventService::try_new(&conn).unwrap();

    // Close the first interval by moving the plan on.
    lifecycle
        .set_status(interval.owner, "04")
        .unwrap();
    let closed = lifecycle.history(interval.owner).unwrap()[0].clone();
    let closed_end = closed.ending_at.unwrap();

    let err = events
        .record_event(
            closed.uuid,
            EventClass::Decision,
            "04",
            closed.starting_at,
            Some(closed_end + 10),
        )
        .unwrap_err();
    assert!(matches!(err, EventError::OutsideInterval { .. }));

    events
        .record_event(
            closed.uuid,
            EventClass::Decision,
            "04",
            closed.starting_at,
            Some(closed_end),
        )
        .unwrap();
}

#[test]
fn event_ending_before_it_starts_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let interval = seed_plan_interval(&conn, "03");
    let events = EventService::try_new(&conn).unwrap();

    let err = events
        .record_event(
            interval.uuid,
            EventClass::Decision,
            "04",
            interval.starting_at + 10,
            Some(interval.starting_at),
        )
        .unwrap_err();
    assert!(matches!(err, EventError::EndBeforeStart { .. }));
}

#[test]
fn unknown_interval_is_reported_as_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed_plan_interval(&conn, "03");
    let events = EventService::try_new(&conn).unwrap();

    let missing = uuid::Uuid::new_v4();
    let err = events
        .record_event(missing, EventClass::Decision, "04", 0, None)
        .unwrap_err();
    assert!(matches!(err, EventError::IntervalNotFound(id) if id == missing));
}

#[test]
fn events_are_deleted_with_their_interval() {
    let conn = open_db_in_memory().unwrap();
    let interval = seed_plan_interval(&conn, "03");
    let events = EventService::try_new(&conn).unwrap();
    events
        .record_event(
            interval.uuid,
            EventClass::Processing,
            "03",
            interval.starting_at,
            None,
        )
        .unwrap();

    let plans = PlanService::try_new(&conn).unwrap();
    plans.delete_plan(interval.owner.uuid).unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM event_intervals;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}
