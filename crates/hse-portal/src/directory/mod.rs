//! Org hierarchy and employee directory.

pub mod domain;
pub mod hierarchy;
mod import;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{
    Assignment, Department, DepartmentId, Employee, EmployeeDraft, EmployeeId, Identity,
    IdentityId, Location, LocationId, LocationKind, NewIdentity, Position, PositionId,
};
pub use hierarchy::{DepartmentTree, HierarchyError};
pub use import::{EmployeeImportError, EmployeeImporter, ImportSummary, RejectedRow};
pub use repository::DirectoryRepository;
pub use router::directory_router;
pub use service::{DepartmentDraft, DepartmentView, DirectoryService, LocationDraft, PositionDraft};
