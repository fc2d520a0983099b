use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::access::{Caller, CallerResolver};
use crate::directory::domain::{
    Department, DepartmentId, Employee, EmployeeId, Identity, IdentityId, Position, PositionId,
};
use crate::directory::DirectoryRepository;
use crate::store::InMemoryPortalStore;
use crate::targeting::{ScopeDraft, ScopeKind};

pub(super) const HEAD_OFFICE: DepartmentId = DepartmentId(901);
pub(super) const OPERATIONS: DepartmentId = DepartmentId(902);
pub(super) const MINE_SITE: DepartmentId = DepartmentId(903);
pub(super) const FINANCE: DepartmentId = DepartmentId(904);

pub(super) const ENGINEER: PositionId = PositionId(911);
pub(super) const DRIVER: PositionId = PositionId(912);

pub(super) const OPS_WORKER: EmployeeId = EmployeeId(922);
pub(super) const SITE_WORKER: EmployeeId = EmployeeId(923);
pub(super) const FINANCE_WORKER: EmployeeId = EmployeeId(924);
pub(super) const FLOATER: EmployeeId = EmployeeId(925);

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

/// Head Office > Operations > Mine Site, plus a separate Finance root. Every employee has a
/// login; `manager` is an HSE manager, the rest are plain employees.
pub(super) fn seeded_store() -> Arc<InMemoryPortalStore> {
    let store = Arc::new(InMemoryPortalStore::new());
    for (id, name, parent) in [
        (HEAD_OFFICE, "Head Office", None),
        (OPERATIONS, "Operations", Some(HEAD_OFFICE)),
        (MINE_SITE, "Mine Site", Some(OPERATIONS)),
        (FINANCE, "Finance", None),
    ] {
        store
            .insert_department(Department {
                id,
                name: name.to_string(),
                parent,
            })
            .expect("department");
    }
    for (id, name) in [(ENGINEER, "Engineer"), (DRIVER, "Driver")] {
        store
            .insert_position(Position {
                id,
                name: name.to_string(),
            })
            .expect("position");
    }

    let people = [
        (EmployeeId(921), "manager", "hse_manager", Some(HEAD_OFFICE), None),
        (OPS_WORKER, "ops.worker", "employee", Some(OPERATIONS), Some(ENGINEER)),
        (SITE_WORKER, "site.worker", "employee", Some(MINE_SITE), Some(DRIVER)),
        (FINANCE_WORKER, "finance.worker", "employee", Some(FINANCE), Some(ENGINEER)),
        (FLOATER, "floater", "employee", None, None),
    ];
    for (id, username, group, department, position) in people {
        let identity = store
            .insert_identity(Identity {
                id: IdentityId(id.0 + 100),
                username: username.to_string(),
                is_superuser: false,
                groups: vec![group.to_string()],
            })
            .expect("identity");
        store
            .insert_employee(Employee {
                id,
                identity: identity.id,
                first_name: username.to_string(),
                last_name: "Tester".to_string(),
                register: None,
                department,
                position,
                location: None,
                phone: String::new(),
                email: String::new(),
                is_head: false,
                photo_key: None,
                hired_date: date("2024-01-15"),
                created_at: now(),
            })
            .expect("employee");
    }
    store
}

pub(super) fn caller(store: &Arc<InMemoryPortalStore>, username: &str) -> Caller {
    CallerResolver::new(store.clone())
        .resolve(username)
        .expect("known caller")
}

pub(super) fn department_scope(targets: &[DepartmentId]) -> ScopeDraft {
    ScopeDraft {
        scope_kind: ScopeKind::Department,
        departments: targets.to_vec(),
        ..ScopeDraft::org_wide()
    }
}
