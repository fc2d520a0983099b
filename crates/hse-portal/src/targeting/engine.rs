use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::AddAssign;

use serde::Serialize;

use super::scope::AudienceScope;
use crate::directory::domain::{Department, Employee, EmployeeId, Position, PositionId};
use crate::directory::{DepartmentTree, DirectoryRepository};
use crate::store::RepositoryError;

/// A record addressed to an audience: notices, trainings, and exams.
pub trait Broadcast {
    fn record_id(&self) -> u64;
    fn audience(&self) -> &AudienceScope;
    fn is_active(&self) -> bool;
}

/// Department tree, positions, and employees captured once per operation.
#[derive(Debug, Clone, Default)]
pub struct OrgSnapshot {
    tree: DepartmentTree,
    positions: BTreeSet<PositionId>,
    employees: BTreeMap<EmployeeId, Employee>,
}

impl OrgSnapshot {
    pub fn new(departments: &[Department], positions: &[Position], employees: Vec<Employee>) -> Self {
        Self {
            tree: DepartmentTree::from_departments(departments),
            positions: positions.iter().map(|position| position.id).collect(),
            employees: employees
                .into_iter()
                .map(|employee| (employee.id, employee))
                .collect(),
        }
    }

    pub fn load<D>(directory: &D) -> Result<Self, RepositoryError>
    where
        D: DirectoryRepository + ?Sized,
    {
        Ok(Self::new(
            &directory.departments()?,
            &directory.positions()?,
            directory.employees()?,
        ))
    }

    pub fn tree(&self) -> &DepartmentTree {
        &self.tree
    }

    pub fn has_position(&self, id: PositionId) -> bool {
        self.positions.contains(&id)
    }

    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.employees.values()
    }

    /// Employees a scope reaches. Department scopes cover each target's whole subtree.
    pub fn employees_for(&self, scope: &AudienceScope) -> BTreeSet<EmployeeId> {
        match scope {
            AudienceScope::OrganizationWide => self.employees.keys().copied().collect(),
            AudienceScope::Departments(targets) => {
                if targets.is_empty() {
                    return BTreeSet::new();
                }
                let closure = self.tree.closure(targets.iter().copied());
                self.employees
                    .values()
                    .filter(|employee| {
                        employee
                            .department
                            .is_some_and(|department| closure.contains(&department))
                    })
                    .map(|employee| employee.id)
                    .collect()
            }
            AudienceScope::Positions(targets) => self
                .employees
                .values()
                .filter(|employee| {
                    employee
                        .position
                        .is_some_and(|position| targets.contains(&position))
                })
                .map(|employee| employee.id)
                .collect(),
            AudienceScope::Employees(targets) => targets
                .iter()
                .copied()
                .filter(|id| self.employees.contains_key(id))
                .collect(),
        }
    }

    /// Whether `scope` reaches `employee`, walking up from the employee's department.
    pub fn includes(&self, employee: &Employee, scope: &AudienceScope) -> bool {
        match scope {
            AudienceScope::OrganizationWide => true,
            AudienceScope::Departments(targets) => employee.department.is_some_and(|start| {
                self.tree
                    .ancestors(start)
                    .iter()
                    .any(|department| targets.contains(department))
            }),
            AudienceScope::Positions(targets) => employee
                .position
                .is_some_and(|position| targets.contains(&position)),
            AudienceScope::Employees(targets) => targets.contains(&employee.id),
        }
    }

    /// Active records reaching `employee`, de-duplicated by id in input order.
    pub fn records_for<'r, R>(&self, employee: &Employee, records: &'r [R]) -> Vec<&'r R>
    where
        R: Broadcast,
    {
        let mut seen = HashSet::new();
        records
            .iter()
            .filter(|record| record.is_active())
            .filter(|record| self.includes(employee, record.audience()))
            .filter(|record| seen.insert(record.record_id()))
            .collect()
    }
}

/// Per-employee state observed for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub employee: EmployeeId,
    pub acknowledged: bool,
}

/// Outstanding engagement across one or more records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub eligible: usize,
    pub unread: usize,
    pub unacknowledged: usize,
}

impl AddAssign for Reconciliation {
    fn add_assign(&mut self, other: Self) {
        self.eligible += other.eligible;
        self.unread += other.unread;
        self.unacknowledged += other.unacknowledged;
    }
}

/// Counts eligible employees without state, and without acknowledgement when it is required.
/// State held by employees outside `eligible` is ignored.
pub fn reconcile(
    eligible: &BTreeSet<EmployeeId>,
    engagements: &[Engagement],
    requires_acknowledgement: bool,
) -> Reconciliation {
    if eligible.is_empty() {
        return Reconciliation::default();
    }

    let engaged: BTreeSet<EmployeeId> = engagements
        .iter()
        .map(|engagement| engagement.employee)
        .collect();
    let acknowledged: BTreeSet<EmployeeId> = engagements
        .iter()
        .filter(|engagement| engagement.acknowledged)
        .map(|engagement| engagement.employee)
        .collect();

    Reconciliation {
        eligible: eligible.len(),
        unread: eligible.difference(&engaged).count(),
        unacknowledged: if requires_acknowledgement {
            eligible.difference(&acknowledged).count()
        } else {
            0
        },
    }
}
