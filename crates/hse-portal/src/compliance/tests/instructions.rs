use chrono::{Duration, NaiveDate};

use super::common::{caller, date, department_scope, now, seeded_store, OPERATIONS, SITE_WORKER};
use crate::compliance::instructions::{
    AssignmentDraft, ComplianceStatus, InstructionDraft, InstructionKind, InstructionMetrics,
    InstructionService, MAX_VALIDITY_DAYS,
};
use crate::error::ServiceError;
use crate::targeting::ScopeDraft;

const DUE_SOON_DAYS: i64 = 30;

fn draft() -> InstructionDraft {
    InstructionDraft {
        title: "Confined space entry".to_string(),
        description: String::new(),
        kind: InstructionKind::Department,
        file_key: None,
        validity_days: 365,
    }
}

#[test]
fn assigning_twice_refreshes_existing_records() {
    let store = seeded_store();
    let service = InstructionService::new(store.clone(), DUE_SOON_DAYS);
    let manager = caller(&store, "manager");
    let instruction = service.create(&manager, draft(), now()).expect("instruction");

    let first = service
        .assign(
            &manager,
            instruction.id,
            AssignmentDraft {
                scope: department_scope(&[OPERATIONS]),
                completed_date: Some(date("2024-03-10")),
            },
            now(),
        )
        .expect("assign operations");
    assert_eq!((first.created, first.updated), (2, 0));

    let views = service
        .records(&manager, now().date_naive())
        .expect("records");
    assert_eq!(views.len(), 2);
    assert!(views
        .iter()
        .all(|view| view.record.next_due_date == date("2025-03-10")));
    assert!(views
        .iter()
        .all(|view| view.status == ComplianceStatus::DueSoon));
    assert!(views
        .iter()
        .all(|view| view.instruction_title == "Confined space entry"));

    let second = service
        .assign(
            &manager,
            instruction.id,
            AssignmentDraft {
                scope: ScopeDraft::org_wide(),
                completed_date: None,
            },
            now(),
        )
        .expect("assign everyone");
    assert_eq!((second.created, second.updated), (3, 2));

    let views = service
        .records(&manager, now().date_naive())
        .expect("records");
    assert_eq!(views.len(), 5);
    assert!(views
        .iter()
        .all(|view| view.record.next_due_date == date("2026-03-01")));
}

#[test]
fn metrics_count_each_status_window() {
    let store = seeded_store();
    let service = InstructionService::new(store.clone(), DUE_SOON_DAYS);
    let manager = caller(&store, "manager");
    let today = now().date_naive();

    let cases = [
        (department_scope(&[OPERATIONS]), date("2023-06-01")),
        (ScopeDraft::org_wide(), date("2024-03-20")),
        (ScopeDraft::org_wide(), date("2024-12-01")),
    ];
    for (scope, completed) in cases {
        let instruction = service.create(&manager, draft(), now()).expect("instruction");
        service
            .assign(
                &manager,
                instruction.id,
                AssignmentDraft {
                    scope,
                    completed_date: Some(completed),
                },
                now(),
            )
            .expect("assign");
    }

    assert_eq!(
        service.metrics(&manager, today).expect("metrics"),
        InstructionMetrics {
            valid: 5,
            due_soon: 5,
            overdue: 2,
        }
    );

    let worker = caller(&store, "site.worker");
    let mine = service.my_records(&worker, today).expect("my records");
    let statuses: Vec<_> = mine.iter().map(|view| view.status).collect();
    assert_eq!(
        statuses,
        vec![
            ComplianceStatus::Overdue,
            ComplianceStatus::DueSoon,
            ComplianceStatus::Valid
        ]
    );
}

#[test]
fn acknowledgement_recomputes_the_due_date_once() {
    let store = seeded_store();
    let service = InstructionService::new(store.clone(), DUE_SOON_DAYS);
    let manager = caller(&store, "manager");
    let worker = caller(&store, "site.worker");
    let instruction = service.create(&manager, draft(), now()).expect("instruction");
    service
        .assign(
            &manager,
            instruction.id,
            AssignmentDraft {
                scope: department_scope(&[OPERATIONS]),
                completed_date: None,
            },
            now(),
        )
        .expect("assign");

    let today = now().date_naive();
    let record = service.my_records(&worker, today).expect("records")[0]
        .record
        .clone();
    assert_eq!(record.employee, SITE_WORKER);

    let acknowledged_on = today + Duration::days(4);
    let acknowledged = service
        .acknowledge(&worker, record.id, acknowledged_on)
        .expect("acknowledge");
    assert_eq!(acknowledged.acknowledged_date, Some(acknowledged_on));
    assert_eq!(acknowledged.next_due_date, date("2026-03-05"));

    let repeated = service
        .acknowledge(&worker, record.id, today + Duration::days(40))
        .expect("repeat");
    assert_eq!(repeated.acknowledged_date, Some(acknowledged_on));
    assert_eq!(repeated.next_due_date, date("2026-03-05"));

    let other = caller(&store, "ops.worker");
    assert!(matches!(
        service.acknowledge(&other, record.id, today),
        Err(ServiceError::NotFound("record"))
    ));
}

#[test]
fn zero_validity_and_unknown_instructions_are_rejected() {
    let store = seeded_store();
    let service = InstructionService::new(store.clone(), DUE_SOON_DAYS);
    let manager = caller(&store, "manager");

    let mut invalid = draft();
    invalid.validity_days = 0;
    match service.create(&manager, invalid, now()) {
        Err(ServiceError::Validation(errors)) => assert!(errors.has("validity_days")),
        other => panic!("expected validation failure, got {other:?}"),
    }

    let instruction = service.create(&manager, draft(), now()).expect("instruction");
    assert!(matches!(
        service.assign(
            &manager,
            crate::compliance::instructions::InstructionId(instruction.id.0 + 10_000),
            AssignmentDraft {
                scope: ScopeDraft::org_wide(),
                completed_date: None,
            },
            now(),
        ),
        Err(ServiceError::NotFound("instruction"))
    ));

    let worker = caller(&store, "ops.worker");
    assert!(matches!(
        service.create(&worker, draft(), now()),
        Err(ServiceError::Access(_))
    ));
}

#[test]
fn validity_and_completion_dates_stay_inside_the_calendar() {
    let store = seeded_store();
    let service = InstructionService::new(store.clone(), i64::MAX);
    let manager = caller(&store, "manager");

    for validity_days in [u32::MAX, MAX_VALIDITY_DAYS + 1] {
        let mut oversized = draft();
        oversized.validity_days = validity_days;
        match service.create(&manager, oversized, now()) {
            Err(ServiceError::Validation(errors)) => assert!(errors.has("validity_days")),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    let mut longest = draft();
    longest.validity_days = MAX_VALIDITY_DAYS;
    let instruction = service.create(&manager, longest, now()).expect("instruction");
    match service.assign(
        &manager,
        instruction.id,
        AssignmentDraft {
            scope: department_scope(&[OPERATIONS]),
            completed_date: Some(NaiveDate::MAX),
        },
        now(),
    ) {
        Err(ServiceError::Validation(errors)) => assert!(errors.has("completed_date")),
        other => panic!("expected validation failure, got {other:?}"),
    }

    let outcome = service
        .assign(
            &manager,
            instruction.id,
            AssignmentDraft {
                scope: department_scope(&[OPERATIONS]),
                completed_date: None,
            },
            now(),
        )
        .expect("assign");
    assert_eq!(outcome.created, 2);
    let metrics = service
        .metrics(&manager, now().date_naive())
        .expect("metrics");
    assert_eq!(metrics.due_soon, 2);
}
