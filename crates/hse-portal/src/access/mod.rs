//! Coarse role gate.
//!
//! The caller's role is resolved once at the HTTP boundary into a [`Caller`] and passed
//! explicitly into every service operation that needs authorization.

mod extract;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::directory::domain::{EmployeeId, Identity, IdentityId};

pub use extract::{CallerResolver, CALLER_HEADER};

/// Portal roles, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    HseManager,
    DepartmentHead,
    Employee,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::SystemAdmin,
        Role::HseManager,
        Role::DepartmentHead,
        Role::Employee,
    ];

    /// Roles allowed to manage records and view organization-wide data.
    pub const MANAGERS: &'static [Role] =
        &[Role::SystemAdmin, Role::HseManager, Role::DepartmentHead];

    pub const EMPLOYEES: &'static [Role] = &[Role::Employee];

    pub const fn group_name(self) -> &'static str {
        match self {
            Role::SystemAdmin => "system_admin",
            Role::HseManager => "hse_manager",
            Role::DepartmentHead => "department_head",
            Role::Employee => "employee",
        }
    }

    pub fn from_group(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.group_name() == name.trim())
    }

    pub fn is_manager(self) -> bool {
        Self::MANAGERS.contains(&self)
    }
}

/// Maps an identity onto a single role: superusers are system admins, otherwise the most
/// privileged role-named group wins, and identities without one are plain employees.
pub fn resolve_role(identity: &Identity) -> Role {
    if identity.is_superuser {
        return Role::SystemAdmin;
    }

    Role::ALL
        .into_iter()
        .find(|role| {
            identity
                .groups
                .iter()
                .any(|group| Role::from_group(group) == Some(*role))
        })
        .unwrap_or(Role::Employee)
}

/// Authenticated request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub identity: IdentityId,
    pub username: String,
    pub role: Role,
    pub employee: Option<EmployeeId>,
}

impl Caller {
    pub fn require(&self, allowed: &[Role]) -> Result<(), AccessError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AccessError::Forbidden { role: self.role })
        }
    }

    pub fn require_manager(&self) -> Result<(), AccessError> {
        self.require(Role::MANAGERS)
    }

    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role {} is not allowed to perform this action", .role.group_name())]
    Forbidden { role: Role },
    #[error("identity lookup failed: {0}")]
    Lookup(String),
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = match self {
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AccessError::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
