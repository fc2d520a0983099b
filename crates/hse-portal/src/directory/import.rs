use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::domain::{
    Department, DepartmentId, Employee, EmployeeId, Identity, IdentityId, Location, LocationId,
    LocationKind, Position, PositionId,
};
use super::repository::DirectoryRepository;
use super::service::{
    DEPARTMENT_IDS, EMPLOYEE_IDS, IDENTITY_IDS, LOCATION_IDS, POSITION_IDS,
};
use crate::access::Role;
use crate::error::ServiceError;
use crate::store::RepositoryError;

#[derive(Debug)]
pub enum EmployeeImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Repository(RepositoryError),
    Service(ServiceError),
}

impl std::fmt::Display for EmployeeImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmployeeImportError::Io(err) => write!(f, "failed to read employee export: {}", err),
            EmployeeImportError::Csv(err) => write!(f, "invalid employee CSV data: {}", err),
            EmployeeImportError::Repository(err) => {
                write!(f, "could not store imported employees: {}", err)
            }
            EmployeeImportError::Service(err) => write!(f, "import rejected: {}", err),
        }
    }
}

impl std::error::Error for EmployeeImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmployeeImportError::Io(err) => Some(err),
            EmployeeImportError::Csv(err) => Some(err),
            EmployeeImportError::Repository(err) => Some(err),
            EmployeeImportError::Service(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for EmployeeImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for EmployeeImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for EmployeeImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

impl From<ServiceError> for EmployeeImportError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

/// Outcome of an onboarding import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub rejected: Vec<RejectedRow>,
}

/// A CSV row that could not be applied; `line` counts the header as line 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    username: String,
    first_name: String,
    last_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    register: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    position: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    hired_date: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// Applies onboarding CSV exports to the directory, creating missing reference data.
pub struct EmployeeImporter<'a, D: ?Sized> {
    directory: &'a D,
    departments: HashMap<String, Department>,
    positions: HashMap<String, PositionId>,
    locations: HashMap<(String, LocationKind), LocationId>,
}

impl<'a, D> EmployeeImporter<'a, D>
where
    D: DirectoryRepository + ?Sized,
{
    pub fn new(directory: &'a D) -> Self {
        Self {
            directory,
            departments: HashMap::new(),
            positions: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(
        self,
        path: P,
        now: DateTime<Utc>,
    ) -> Result<ImportSummary, EmployeeImportError> {
        let file = std::fs::File::open(path)?;
        self.from_reader(file, now)
    }

    pub fn from_reader<R: Read>(
        mut self,
        reader: R,
        now: DateTime<Utc>,
    ) -> Result<ImportSummary, EmployeeImportError> {
        self.load_reference_data()?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut summary = ImportSummary::default();

        for (index, row) in csv_reader.deserialize::<EmployeeRow>().enumerate() {
            let line = index + 2;
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    summary.rejected.push(RejectedRow {
                        line,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let outcome = match self.apply_row(row, now) {
                Ok(outcome) => outcome,
                Err(RepositoryError::Conflict) => {
                    RowOutcome::Rejected("row conflicts with an existing record".to_string())
                }
                Err(err) => return Err(err.into()),
            };
            match outcome {
                RowOutcome::Created => summary.created += 1,
                RowOutcome::Updated => summary.updated += 1,
                RowOutcome::Rejected(reason) => {
                    warn!(line, %reason, "employee import row rejected");
                    summary.rejected.push(RejectedRow { line, reason });
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            rejected = summary.rejected.len(),
            "employee import finished"
        );
        Ok(summary)
    }

    fn load_reference_data(&mut self) -> Result<(), RepositoryError> {
        self.departments = self
            .directory
            .departments()?
            .into_iter()
            .map(|department| (department.name.clone(), department))
            .collect();
        self.positions = self
            .directory
            .positions()?
            .into_iter()
            .map(|position| (position.name, position.id))
            .collect();
        self.locations = self
            .directory
            .locations()?
            .into_iter()
            .map(|location| ((location.name, location.kind), location.id))
            .collect();
        Ok(())
    }

    fn apply_row(
        &mut self,
        row: EmployeeRow,
        now: DateTime<Utc>,
    ) -> Result<RowOutcome, RepositoryError> {
        let username = row.username.trim().to_string();
        if username.is_empty() {
            return Ok(RowOutcome::Rejected("username is required".to_string()));
        }
        if row.first_name.trim().is_empty() || row.last_name.trim().is_empty() {
            return Ok(RowOutcome::Rejected(
                "first_name and last_name are required".to_string(),
            ));
        }

        let hired_date = match row.hired_date.as_deref() {
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(err) => {
                    return Ok(RowOutcome::Rejected(format!(
                        "hired_date '{raw}' is not YYYY-MM-DD ({err})"
                    )))
                }
            },
            None => None,
        };

        let location_kind = match (&row.location, row.location_type.as_deref()) {
            (Some(_), Some(raw)) => match LocationKind::parse(raw) {
                Some(kind) => Some(kind),
                None => {
                    return Ok(RowOutcome::Rejected(format!(
                        "unknown location_type '{raw}'"
                    )))
                }
            },
            (Some(name), None) => {
                return Ok(RowOutcome::Rejected(format!(
                    "location '{name}' requires a location_type"
                )))
            }
            (None, _) => None,
        };

        let department_path = match row.department.as_deref() {
            Some(raw) => {
                let segments = department_segments(raw);
                if segments.is_empty() {
                    return Ok(RowOutcome::Rejected(format!(
                        "department '{raw}' names no department"
                    )));
                }
                Some(segments)
            }
            None => None,
        };

        let register = row
            .register
            .map(|value| value.to_uppercase())
            .filter(|value| !value.is_empty());

        let identity = self.directory.identity_by_username(&username)?;
        let existing = match &identity {
            Some(identity) => self.directory.employee_for_identity(identity.id)?,
            None => None,
        };

        if let Some(register) = register.as_deref() {
            let clash = self.directory.employees()?.into_iter().any(|employee| {
                employee.register.as_deref() == Some(register)
                    && Some(employee.id) != existing.as_ref().map(|current| current.id)
            });
            if clash {
                return Ok(RowOutcome::Rejected(format!(
                    "register '{register}' belongs to another employee"
                )));
            }
        }

        let department = match department_path {
            Some(segments) => Some(self.ensure_department_path(&segments)?),
            None => None,
        };
        let position = match row.position {
            Some(name) => Some(self.ensure_position(name)?),
            None => None,
        };
        let location = match (row.location, location_kind) {
            (Some(name), Some(kind)) => Some(self.ensure_location(name, kind)?),
            _ => None,
        };

        let identity = match identity {
            Some(identity) => identity,
            None => self.directory.insert_identity(Identity {
                id: IdentityId(IDENTITY_IDS.next()),
                username: username.clone(),
                is_superuser: false,
                groups: vec![Role::Employee.group_name().to_string()],
            })?,
        };

        match existing {
            Some(mut employee) => {
                employee.first_name = row.first_name.trim().to_string();
                employee.last_name = row.last_name.trim().to_string();
                employee.register = register.or(employee.register);
                employee.department = department.or(employee.department);
                employee.position = position.or(employee.position);
                employee.location = location.or(employee.location);
                if let Some(email) = row.email {
                    employee.email = email;
                }
                if let Some(phone) = row.phone {
                    employee.phone = phone;
                }
                if let Some(hired_date) = hired_date {
                    employee.hired_date = hired_date;
                }
                self.directory.update_employee(employee)?;
                Ok(RowOutcome::Updated)
            }
            None => {
                self.directory.insert_employee(Employee {
                    id: EmployeeId(EMPLOYEE_IDS.next()),
                    identity: identity.id,
                    first_name: row.first_name.trim().to_string(),
                    last_name: row.last_name.trim().to_string(),
                    register,
                    department,
                    position,
                    location,
                    phone: row.phone.unwrap_or_default(),
                    email: row.email.unwrap_or_default(),
                    is_head: false,
                    photo_key: None,
                    hired_date: hired_date.unwrap_or_else(|| now.date_naive()),
                    created_at: now,
                })?;
                Ok(RowOutcome::Created)
            }
        }
    }

    /// Resolves `Parent / Child` segments, creating each missing one under the previous one.
    fn ensure_department_path(
        &mut self,
        segments: &[String],
    ) -> Result<DepartmentId, RepositoryError> {
        let mut parent: Option<DepartmentId> = None;
        let mut last = None;

        for segment in segments {
            let id = match self.departments.get(segment.as_str()) {
                Some(existing) => existing.id,
                None => {
                    let created = self.directory.insert_department(Department {
                        id: DepartmentId(DEPARTMENT_IDS.next()),
                        name: segment.to_string(),
                        parent,
                    })?;
                    let id = created.id;
                    self.departments.insert(created.name.clone(), created);
                    id
                }
            };
            parent = Some(id);
            last = Some(id);
        }

        last.ok_or(RepositoryError::NotFound)
    }

    fn ensure_position(&mut self, name: String) -> Result<PositionId, RepositoryError> {
        if let Some(id) = self.positions.get(&name) {
            return Ok(*id);
        }
        let created = self.directory.insert_position(Position {
            id: PositionId(POSITION_IDS.next()),
            name: name.clone(),
        })?;
        self.positions.insert(name, created.id);
        Ok(created.id)
    }

    fn ensure_location(
        &mut self,
        name: String,
        kind: LocationKind,
    ) -> Result<LocationId, RepositoryError> {
        let key = (name, kind);
        if let Some(id) = self.locations.get(&key) {
            return Ok(*id);
        }
        let created = self.directory.insert_location(Location {
            id: LocationId(LOCATION_IDS.next()),
            name: key.0.clone(),
            kind,
        })?;
        self.locations.insert(key, created.id);
        Ok(created.id)
    }
}

fn department_segments(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

enum RowOutcome {
    Created,
    Updated,
    Rejected(String),
}
