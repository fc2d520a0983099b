use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};

use super::*;
use crate::directory::domain::{
    Department, DepartmentId, Employee, EmployeeId, IdentityId, Position, PositionId,
};
use crate::validation::ValidationErrors;

struct Record {
    id: u64,
    scope: AudienceScope,
    active: bool,
}

impl Broadcast for Record {
    fn record_id(&self) -> u64 {
        self.id
    }

    fn audience(&self) -> &AudienceScope {
        &self.scope
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

fn department(id: u64, parent: Option<u64>) -> Department {
    Department {
        id: DepartmentId(id),
        name: format!("Dept {id}"),
        parent: parent.map(DepartmentId),
    }
}

fn employee(id: u64, department: Option<u64>, position: Option<u64>) -> Employee {
    Employee {
        id: EmployeeId(id),
        identity: IdentityId(id),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
        register: None,
        department: department.map(DepartmentId),
        position: position.map(PositionId),
        location: None,
        phone: String::new(),
        email: String::new(),
        is_head: false,
        photo_key: None,
        hired_date: Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp")
            .date_naive(),
        created_at: Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

fn positions() -> Vec<Position> {
    (1..=3)
        .map(|id| Position {
            id: PositionId(id),
            name: format!("Position {id}"),
        })
        .collect()
}

fn departments(targets: &[u64]) -> AudienceScope {
    AudienceScope::Departments(targets.iter().copied().map(DepartmentId).collect())
}

fn ids(raw: &[u64]) -> BTreeSet<EmployeeId> {
    raw.iter().copied().map(EmployeeId).collect()
}

/// A -> B -> C chain, with a sibling subtree D -> E under nothing.
fn chain_snapshot() -> OrgSnapshot {
    OrgSnapshot::new(
        &[
            department(1, None),
            department(2, Some(1)),
            department(3, Some(2)),
            department(4, None),
            department(5, Some(4)),
        ],
        &positions(),
        vec![
            employee(10, Some(1), Some(1)),
            employee(11, Some(2), Some(2)),
            employee(12, Some(3), Some(1)),
            employee(13, Some(4), None),
            employee(14, Some(5), Some(3)),
            employee(15, None, Some(2)),
        ],
    )
}

#[test]
fn department_scope_reaches_the_whole_subtree() {
    let org = chain_snapshot();
    assert_eq!(org.employees_for(&departments(&[1])), ids(&[10, 11, 12]));
    assert_eq!(org.employees_for(&departments(&[2])), ids(&[11, 12]));
    assert_eq!(org.employees_for(&departments(&[3, 4])), ids(&[12, 13, 14]));
}

#[test]
fn department_scope_excludes_ancestors_and_unrelated_subtrees() {
    let org = chain_snapshot();
    let eligible = org.employees_for(&departments(&[2]));
    assert!(!eligible.contains(&EmployeeId(10)));
    assert!(!eligible.contains(&EmployeeId(13)));
    assert!(!eligible.contains(&EmployeeId(14)));
}

#[test]
fn deep_descendant_inherits_and_unassigned_employee_never_matches() {
    let org = chain_snapshot();
    let scope = departments(&[1]);
    let deep = org.employee(EmployeeId(12)).expect("employee in C");
    let floating = org.employee(EmployeeId(15)).expect("employee without department");

    assert!(org.includes(deep, &scope));
    assert!(!org.includes(floating, &scope));
    assert!(!org.employees_for(&scope).contains(&EmployeeId(15)));
}

#[test]
fn empty_department_scope_reaches_nobody() {
    let org = chain_snapshot();
    assert!(org.employees_for(&AudienceScope::Departments(BTreeSet::new())).is_empty());
}

#[test]
fn position_and_specific_scopes_match_exactly() {
    let org = chain_snapshot();
    let by_position = AudienceScope::Positions(BTreeSet::from([PositionId(1)]));
    assert_eq!(org.employees_for(&by_position), ids(&[10, 12]));

    let specific = AudienceScope::Employees(ids(&[11, 99]));
    assert_eq!(org.employees_for(&specific), ids(&[11]));
    assert_eq!(org.employees_for(&AudienceScope::OrganizationWide).len(), 6);
}

#[test]
fn records_for_skips_inactive_records_and_duplicates() {
    let org = chain_snapshot();
    let records = vec![
        Record {
            id: 1,
            scope: AudienceScope::OrganizationWide,
            active: true,
        },
        Record {
            id: 2,
            scope: departments(&[1]),
            active: false,
        },
        Record {
            id: 3,
            scope: departments(&[1]),
            active: true,
        },
        Record {
            id: 3,
            scope: AudienceScope::OrganizationWide,
            active: true,
        },
        Record {
            id: 4,
            scope: AudienceScope::Positions(BTreeSet::from([PositionId(3)])),
            active: true,
        },
    ];

    let employee = org.employee(EmployeeId(12)).expect("employee");
    let matched: Vec<u64> = org
        .records_for(employee, &records)
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(matched, vec![1, 3]);
}

/// Deterministic pseudo-random forests; each department picks an earlier one (or none) as parent.
fn generated_snapshot(seed: u64, departments: u64, employees: u64) -> OrgSnapshot {
    let mut state = seed;
    let mut next = move |bound: u64| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) % bound
    };

    let tree: Vec<Department> = (1..=departments)
        .map(|id| {
            let parent = if id == 1 { 0 } else { next(id) };
            department(id, (parent != 0).then_some(parent))
        })
        .collect();
    let staff: Vec<Employee> = (1..=employees)
        .map(|id| {
            let dept = next(departments + 1);
            let position = next(4);
            employee(
                100 + id,
                (dept != 0).then_some(dept),
                (position != 0).then_some(position),
            )
        })
        .collect();

    OrgSnapshot::new(&tree, &positions(), staff)
}

#[test]
fn employees_for_and_records_for_are_duals_over_generated_trees() {
    for seed in 1..=25 {
        let org = generated_snapshot(seed, 12, 30);
        let records: Vec<Record> = (1..=12)
            .map(|id| Record {
                id,
                scope: match id % 4 {
                    0 => AudienceScope::OrganizationWide,
                    1 => departments(&[id, (id * 7) % 12 + 1]),
                    2 => AudienceScope::Positions(BTreeSet::from([PositionId(id % 3 + 1)])),
                    _ => AudienceScope::Employees(ids(&[100 + id, 100 + id * 2])),
                },
                active: true,
            })
            .collect();

        for employee in org.employees() {
            let reached: BTreeSet<u64> = org
                .records_for(employee, &records)
                .into_iter()
                .map(|record| record.id)
                .collect();
            for record in &records {
                let eligible = org.employees_for(&record.scope).contains(&employee.id);
                assert_eq!(
                    eligible,
                    reached.contains(&record.id),
                    "seed {seed}: employee {:?} vs record {}",
                    employee.id,
                    record.id
                );
            }
        }
    }
}

#[test]
fn reconciliation_counts_missing_reads_and_acknowledgements() {
    let eligible = ids(&[1, 2, 3, 4, 5]);
    let engagements = [
        Engagement {
            employee: EmployeeId(1),
            acknowledged: true,
        },
        Engagement {
            employee: EmployeeId(2),
            acknowledged: false,
        },
    ];

    let outcome = reconcile(&eligible, &engagements, true);
    assert_eq!(outcome.unread, 3);
    assert_eq!(outcome.unacknowledged, 4);

    let no_ack = reconcile(&eligible, &engagements, false);
    assert_eq!(no_ack.unread, 3);
    assert_eq!(no_ack.unacknowledged, 0);
}

#[test]
fn records_without_eligible_employees_contribute_nothing() {
    let stray = [Engagement {
        employee: EmployeeId(9),
        acknowledged: false,
    }];
    for requires_ack in [true, false] {
        assert_eq!(
            reconcile(&BTreeSet::new(), &stray, requires_ack),
            Reconciliation::default()
        );
    }

    let mut total = Reconciliation::default();
    total += reconcile(&ids(&[1, 2]), &[], true);
    total += reconcile(&BTreeSet::new(), &[], true);
    assert_eq!(total.unread, 2);
    assert_eq!(total.unacknowledged, 2);
}

#[test]
fn drafts_require_targets_matching_their_kind() {
    let org = chain_snapshot();

    let mut errors = ValidationErrors::new();
    let empty = ScopeDraft {
        scope_kind: ScopeKind::Department,
        ..ScopeDraft::org_wide()
    };
    assert!(empty.resolve(&org, &mut errors).is_none());
    assert!(errors.has("departments"));

    let mut errors = ValidationErrors::new();
    let unknown = ScopeDraft {
        scope_kind: ScopeKind::Position,
        positions: vec![PositionId(42)],
        ..ScopeDraft::org_wide()
    };
    assert!(unknown.resolve(&org, &mut errors).is_none());
    assert!(errors.has("positions"));

    let mut errors = ValidationErrors::new();
    let unrecognized = ScopeDraft {
        scope_kind: ScopeKind::Unrecognized,
        ..ScopeDraft::org_wide()
    };
    assert!(unrecognized.resolve(&org, &mut errors).is_none());
    assert!(errors.has("scope_kind"));

    let mut errors = ValidationErrors::new();
    let specific = ScopeDraft {
        scope_kind: ScopeKind::SpecificEmployee,
        employees: vec![EmployeeId(11), EmployeeId(11)],
        ..ScopeDraft::org_wide()
    };
    assert_eq!(
        specific.resolve(&org, &mut errors),
        Some(AudienceScope::Employees(ids(&[11])))
    );
    assert!(errors.is_empty());
}
