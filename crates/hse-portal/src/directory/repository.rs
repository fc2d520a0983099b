use super::domain::{
    Department, DepartmentId, Employee, EmployeeId, Identity, IdentityId, Location, Position,
};
use crate::store::RepositoryError;

/// Storage abstraction for the org hierarchy, identities, and employees.
pub trait DirectoryRepository: Send + Sync {
    fn departments(&self) -> Result<Vec<Department>, RepositoryError>;
    /// Fails with `Conflict` when the name is already taken.
    fn insert_department(&self, department: Department) -> Result<Department, RepositoryError>;
    fn update_department(&self, department: Department) -> Result<(), RepositoryError>;
    /// Removes the department, detaching its children and employees and dropping it from every
    /// broadcast record's target set.
    fn remove_department(&self, id: DepartmentId) -> Result<(), RepositoryError>;

    fn positions(&self) -> Result<Vec<Position>, RepositoryError>;
    fn insert_position(&self, position: Position) -> Result<Position, RepositoryError>;

    fn locations(&self) -> Result<Vec<Location>, RepositoryError>;
    fn insert_location(&self, location: Location) -> Result<Location, RepositoryError>;

    fn identity(&self, id: IdentityId) -> Result<Option<Identity>, RepositoryError>;
    fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, RepositoryError>;
    fn insert_identity(&self, identity: Identity) -> Result<Identity, RepositoryError>;

    fn employees(&self) -> Result<Vec<Employee>, RepositoryError>;
    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    fn employee_for_identity(
        &self,
        identity: IdentityId,
    ) -> Result<Option<Employee>, RepositoryError>;
    /// Fails with `Conflict` when the identity or register number is already linked.
    fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError>;
    fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError>;
}
