use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    Assignment, Department, DepartmentId, Employee, EmployeeDraft, EmployeeId, Identity,
    IdentityId, Location, LocationId, LocationKind, NewIdentity, Position, PositionId,
};
use super::hierarchy::DepartmentTree;
use super::import::{EmployeeImportError, EmployeeImporter, ImportSummary};
use super::repository::DirectoryRepository;
use crate::access::{Caller, Role};
use crate::error::ServiceError;
use crate::store::Sequence;
use crate::validation::{require_text, ValidationErrors};

pub(crate) static DEPARTMENT_IDS: Sequence = Sequence::new();
pub(crate) static POSITION_IDS: Sequence = Sequence::new();
pub(crate) static LOCATION_IDS: Sequence = Sequence::new();
pub(crate) static IDENTITY_IDS: Sequence = Sequence::new();
pub(crate) static EMPLOYEE_IDS: Sequence = Sequence::new();

/// Roles allowed to change reference data and onboard employees.
const DIRECTORY_ADMINS: &[Role] = &[Role::SystemAdmin, Role::HseManager];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentDraft {
    pub name: String,
    #[serde(default)]
    pub parent: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDraft {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDraft {
    pub name: String,
    pub kind: LocationKind,
}

/// Department listing entry with its full `Parent / Child` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentView {
    pub id: DepartmentId,
    pub name: String,
    pub parent: Option<DepartmentId>,
    pub path: String,
}

/// Service owning the org hierarchy and the employee directory.
pub struct DirectoryService<S> {
    store: Arc<S>,
}

impl<S> DirectoryService<S>
where
    S: DirectoryRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn departments(&self, caller: &Caller) -> Result<Vec<DepartmentView>, ServiceError> {
        caller.require_manager()?;
        let mut departments = self.store.departments()?;
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        let tree = DepartmentTree::from_departments(&departments);

        Ok(departments
            .iter()
            .map(|department| DepartmentView {
                id: department.id,
                name: department.name.clone(),
                parent: department.parent,
                path: tree.path_label(&departments, department.id),
            })
            .collect())
    }

    pub fn create_department(
        &self,
        caller: &Caller,
        draft: DepartmentDraft,
    ) -> Result<Department, ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        let departments = self.store.departments()?;
        let department = validate_department(&departments, None, draft)?;
        let stored = self.store.insert_department(department)?;
        info!(department = stored.id.0, name = %stored.name, "department created");
        Ok(stored)
    }

    /// Renames and/or re-parents a department, rejecting cycles.
    pub fn update_department(
        &self,
        caller: &Caller,
        id: DepartmentId,
        draft: DepartmentDraft,
    ) -> Result<Department, ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        let departments = self.store.departments()?;
        if !departments.iter().any(|department| department.id == id) {
            return Err(ServiceError::NotFound("department"));
        }
        let department = validate_department(&departments, Some(id), draft)?;
        self.store.update_department(department.clone())?;
        Ok(department)
    }

    pub fn delete_department(&self, caller: &Caller, id: DepartmentId) -> Result<(), ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        let departments = self.store.departments()?;
        if !departments.iter().any(|department| department.id == id) {
            return Err(ServiceError::NotFound("department"));
        }
        self.store.remove_department(id)?;
        info!(department = id.0, "department removed");
        Ok(())
    }

    pub fn positions(&self, caller: &Caller) -> Result<Vec<Position>, ServiceError> {
        caller.require_manager()?;
        let mut positions = self.store.positions()?;
        positions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(positions)
    }

    pub fn create_position(
        &self,
        caller: &Caller,
        draft: PositionDraft,
    ) -> Result<Position, ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        let mut errors = ValidationErrors::new();
        let name = draft.name.trim().to_string();
        require_text(&mut errors, "name", &name);
        if self
            .store
            .positions()?
            .iter()
            .any(|position| position.name == name)
        {
            errors.add("name", "a position with this name already exists");
        }
        let position = errors.finish(Position {
            id: PositionId(POSITION_IDS.next()),
            name,
        })?;
        Ok(self.store.insert_position(position)?)
    }

    pub fn locations(&self, caller: &Caller) -> Result<Vec<Location>, ServiceError> {
        caller.require_manager()?;
        let mut locations = self.store.locations()?;
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    pub fn create_location(
        &self,
        caller: &Caller,
        draft: LocationDraft,
    ) -> Result<Location, ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        let mut errors = ValidationErrors::new();
        let name = draft.name.trim().to_string();
        require_text(&mut errors, "name", &name);
        if self
            .store
            .locations()?
            .iter()
            .any(|location| location.name == name && location.kind == draft.kind)
        {
            errors.add("name", "this location already exists");
        }
        let location = errors.finish(Location {
            id: LocationId(LOCATION_IDS.next()),
            name,
            kind: draft.kind,
        })?;
        Ok(self.store.insert_location(location)?)
    }

    pub fn register_identity(
        &self,
        caller: &Caller,
        draft: NewIdentity,
    ) -> Result<Identity, ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        if draft.is_superuser {
            caller.require(&[Role::SystemAdmin])?;
        }
        let mut errors = ValidationErrors::new();
        let username = draft.username.trim().to_string();
        require_text(&mut errors, "username", &username);
        for group in &draft.groups {
            if Role::from_group(group).is_none() {
                errors.add("groups", format!("unknown role group '{group}'"));
            }
        }
        if self.store.identity_by_username(&username)?.is_some() {
            errors.add("username", "this username is already registered");
        }
        let identity = errors.finish(Identity {
            id: IdentityId(IDENTITY_IDS.next()),
            username,
            is_superuser: draft.is_superuser,
            groups: draft.groups,
        })?;
        Ok(self.store.insert_identity(identity)?)
    }

    pub fn register_employee(
        &self,
        caller: &Caller,
        draft: EmployeeDraft,
        now: DateTime<Utc>,
    ) -> Result<Employee, ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "first_name", &draft.first_name);
        require_text(&mut errors, "last_name", &draft.last_name);

        if self.store.identity(draft.identity)?.is_none() {
            errors.add("identity", "identity does not exist");
        } else if self.store.employee_for_identity(draft.identity)?.is_some() {
            errors.add("identity", "identity is already linked to an employee");
        }

        let register = normalize_register(draft.register);
        let employees = self.store.employees()?;
        if let Some(register) = register.as_deref() {
            if employees
                .iter()
                .any(|employee| employee.register.as_deref() == Some(register))
            {
                errors.add("register", "register number is already in use");
            }
        }

        let assignment = Assignment {
            department: draft.department,
            position: draft.position,
            location: draft.location,
        };
        self.check_assignment(&assignment, &mut errors)?;

        let employee = errors.finish(Employee {
            id: EmployeeId(EMPLOYEE_IDS.next()),
            identity: draft.identity,
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            register,
            department: assignment.department,
            position: assignment.position,
            location: assignment.location,
            phone: draft.phone.trim().to_string(),
            email: draft.email.trim().to_string(),
            is_head: draft.is_head,
            photo_key: draft.photo_key.filter(|key| !key.trim().is_empty()),
            hired_date: draft.hired_date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
        })?;

        let stored = self.store.insert_employee(employee)?;
        info!(employee = stored.id.0, "employee onboarded");
        Ok(stored)
    }

    pub fn reassign_employee(
        &self,
        caller: &Caller,
        id: EmployeeId,
        assignment: Assignment,
    ) -> Result<Employee, ServiceError> {
        caller.require(DIRECTORY_ADMINS)?;
        let mut employee = self
            .store
            .employee(id)?
            .ok_or(ServiceError::NotFound("employee"))?;

        let mut errors = ValidationErrors::new();
        self.check_assignment(&assignment, &mut errors)?;
        errors.finish(())?;

        employee.department = assignment.department;
        employee.position = assignment.position;
        employee.location = assignment.location;
        self.store.update_employee(employee.clone())?;
        Ok(employee)
    }

    /// Directory listing ordered by last then first name.
    pub fn employees(&self, caller: &Caller) -> Result<Vec<Employee>, ServiceError> {
        caller.require_manager()?;
        let mut employees = self.store.employees()?;
        employees.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(employees)
    }

    /// Makes sure the bootstrap superuser can log in; runs at startup without a caller.
    pub fn ensure_superuser(&self, username: &str) -> Result<Identity, ServiceError> {
        let username = username.trim();
        if let Some(identity) = self.store.identity_by_username(username)? {
            return Ok(identity);
        }
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "username", username);
        let identity = errors.finish(Identity {
            id: IdentityId(IDENTITY_IDS.next()),
            username: username.to_string(),
            is_superuser: true,
            groups: vec![Role::SystemAdmin.group_name().to_string()],
        })?;
        let stored = self.store.insert_identity(identity)?;
        info!(identity = stored.id.0, username = %stored.username, "bootstrap superuser created");
        Ok(stored)
    }

    pub fn import_employees<R: Read>(
        &self,
        caller: &Caller,
        reader: R,
        now: DateTime<Utc>,
    ) -> Result<ImportSummary, EmployeeImportError> {
        caller
            .require(DIRECTORY_ADMINS)
            .map_err(ServiceError::from)?;
        EmployeeImporter::new(self.store.as_ref()).from_reader(reader, now)
    }

    fn check_assignment(
        &self,
        assignment: &Assignment,
        errors: &mut ValidationErrors,
    ) -> Result<(), ServiceError> {
        if let Some(department) = assignment.department {
            if !self
                .store
                .departments()?
                .iter()
                .any(|candidate| candidate.id == department)
            {
                errors.add("department", "department does not exist");
            }
        }
        if let Some(position) = assignment.position {
            if !self
                .store
                .positions()?
                .iter()
                .any(|candidate| candidate.id == position)
            {
                errors.add("position", "position does not exist");
            }
        }
        if let Some(location) = assignment.location {
            if !self
                .store
                .locations()?
                .iter()
                .any(|candidate| candidate.id == location)
            {
                errors.add("location", "location does not exist");
            }
        }
        Ok(())
    }
}

fn normalize_register(register: Option<String>) -> Option<String> {
    register
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty())
}

fn validate_department(
    departments: &[Department],
    id: Option<DepartmentId>,
    draft: DepartmentDraft,
) -> Result<Department, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = draft.name.trim().to_string();
    require_text(&mut errors, "name", &name);

    if departments
        .iter()
        .any(|department| department.name == name && Some(department.id) != id)
    {
        errors.add("name", "a department with this name already exists");
    }

    let tree = DepartmentTree::from_departments(departments);
    if let Err(err) = tree.validate_parent(id, draft.parent) {
        errors.add("parent", err.to_string());
    }

    errors.finish(Department {
        id: id.unwrap_or_else(|| DepartmentId(DEPARTMENT_IDS.next())),
        name,
        parent: draft.parent,
    })
}
