use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::engine::OrgSnapshot;
use crate::directory::domain::{DepartmentId, EmployeeId, PositionId};
use crate::validation::ValidationErrors;

/// Who a broadcast record is addressed to. Exactly one target set exists per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope_kind", content = "targets")]
pub enum AudienceScope {
    #[serde(rename = "org_wide")]
    OrganizationWide,
    /// Target departments; each one brings its whole subtree along.
    #[serde(rename = "department")]
    Departments(BTreeSet<DepartmentId>),
    #[serde(rename = "position")]
    Positions(BTreeSet<PositionId>),
    #[serde(rename = "specific_employee")]
    Employees(BTreeSet<EmployeeId>),
}

impl AudienceScope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            AudienceScope::OrganizationWide => ScopeKind::OrgWide,
            AudienceScope::Departments(_) => ScopeKind::Department,
            AudienceScope::Positions(_) => ScopeKind::Position,
            AudienceScope::Employees(_) => ScopeKind::SpecificEmployee,
        }
    }

    /// Drops a deleted department from the target set. An emptied department scope stays
    /// department-scoped and therefore reaches nobody.
    pub fn without_department(&mut self, id: DepartmentId) {
        if let AudienceScope::Departments(targets) = self {
            targets.remove(&id);
        }
    }
}

/// Targeting mode named by inbound drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    OrgWide,
    Department,
    Position,
    SpecificEmployee,
    #[serde(other)]
    Unrecognized,
}

/// Inbound targeting fields as submitted with a notice, training, or exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDraft {
    pub scope_kind: ScopeKind,
    #[serde(default)]
    pub departments: Vec<DepartmentId>,
    #[serde(default)]
    pub positions: Vec<PositionId>,
    #[serde(default)]
    pub employees: Vec<EmployeeId>,
}

impl ScopeDraft {
    pub fn org_wide() -> Self {
        Self {
            scope_kind: ScopeKind::OrgWide,
            departments: Vec::new(),
            positions: Vec::new(),
            employees: Vec::new(),
        }
    }

    /// Checks the target set required by the kind and that every id exists, recording
    /// problems under `scope_kind`, `departments`, `positions`, or `employees`.
    pub fn resolve(
        &self,
        org: &OrgSnapshot,
        errors: &mut ValidationErrors,
    ) -> Option<AudienceScope> {
        match self.scope_kind {
            ScopeKind::OrgWide => Some(AudienceScope::OrganizationWide),
            ScopeKind::Department => {
                let targets: BTreeSet<_> = self.departments.iter().copied().collect();
                if targets.is_empty() {
                    errors.add("departments", "select at least one department");
                    return None;
                }
                let missing: Vec<_> = targets
                    .iter()
                    .filter(|id| !org.tree().contains(**id))
                    .map(|id| id.0.to_string())
                    .collect();
                if !missing.is_empty() {
                    errors.add(
                        "departments",
                        format!("unknown departments: {}", missing.join(", ")),
                    );
                    return None;
                }
                Some(AudienceScope::Departments(targets))
            }
            ScopeKind::Position => {
                let targets: BTreeSet<_> = self.positions.iter().copied().collect();
                if targets.is_empty() {
                    errors.add("positions", "select at least one position");
                    return None;
                }
                let missing: Vec<_> = targets
                    .iter()
                    .filter(|id| !org.has_position(**id))
                    .map(|id| id.0.to_string())
                    .collect();
                if !missing.is_empty() {
                    errors.add(
                        "positions",
                        format!("unknown positions: {}", missing.join(", ")),
                    );
                    return None;
                }
                Some(AudienceScope::Positions(targets))
            }
            ScopeKind::SpecificEmployee => {
                let targets: BTreeSet<_> = self.employees.iter().copied().collect();
                if targets.is_empty() {
                    errors.add("employees", "select at least one employee");
                    return None;
                }
                let missing: Vec<_> = targets
                    .iter()
                    .filter(|id| org.employee(**id).is_none())
                    .map(|id| id.0.to_string())
                    .collect();
                if !missing.is_empty() {
                    errors.add(
                        "employees",
                        format!("unknown employees: {}", missing.join(", ")),
                    );
                    return None;
                }
                Some(AudienceScope::Employees(targets))
            }
            ScopeKind::Unrecognized => {
                errors.add("scope_kind", "unknown scope kind");
                None
            }
        }
    }
}
