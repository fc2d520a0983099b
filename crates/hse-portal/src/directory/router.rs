use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use super::domain::{Assignment, DepartmentId, EmployeeDraft, EmployeeId, NewIdentity};
use super::import::EmployeeImportError;
use super::repository::DirectoryRepository;
use super::service::{DepartmentDraft, DirectoryService, LocationDraft, PositionDraft};
use crate::access::Caller;
use crate::error::ServiceError;

/// Router exposing the department tree, reference data, and employee onboarding.
pub fn directory_router<S>(service: Arc<DirectoryService<S>>) -> Router
where
    S: DirectoryRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/departments",
            get(list_departments::<S>).post(create_department::<S>),
        )
        .route(
            "/api/v1/departments/:id",
            put(update_department::<S>).delete(delete_department::<S>),
        )
        .route(
            "/api/v1/positions",
            get(list_positions::<S>).post(create_position::<S>),
        )
        .route(
            "/api/v1/locations",
            get(list_locations::<S>).post(create_location::<S>),
        )
        .route("/api/v1/identities", post(register_identity::<S>))
        .route(
            "/api/v1/employees",
            get(list_employees::<S>).post(register_employee::<S>),
        )
        .route("/api/v1/employees/:id", put(reassign_employee::<S>))
        .route("/api/v1/employees/import", post(import_employees::<S>))
        .with_state(service)
}

type Directory<S> = State<Arc<DirectoryService<S>>>;

async fn list_departments<S>(
    State(service): Directory<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    Ok(Json(service.departments(&caller)?).into_response())
}

async fn create_department<S>(
    State(service): Directory<S>,
    caller: Caller,
    Json(draft): Json<DepartmentDraft>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    let department = service.create_department(&caller, draft)?;
    Ok((StatusCode::CREATED, Json(department)).into_response())
}

async fn update_department<S>(
    State(service): Directory<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(draft): Json<DepartmentDraft>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    let department = service.update_department(&caller, DepartmentId(id), draft)?;
    Ok(Json(department).into_response())
}

async fn delete_department<S>(
    State(service): Directory<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    service.delete_department(&caller, DepartmentId(id))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_positions<S>(
    State(service): Directory<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    Ok(Json(service.positions(&caller)?).into_response())
}

async fn create_position<S>(
    State(service): Directory<S>,
    caller: Caller,
    Json(draft): Json<PositionDraft>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    let position = service.create_position(&caller, draft)?;
    Ok((StatusCode::CREATED, Json(position)).into_response())
}

async fn list_locations<S>(
    State(service): Directory<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    Ok(Json(service.locations(&caller)?).into_response())
}

async fn create_location<S>(
    State(service): Directory<S>,
    caller: Caller,
    Json(draft): Json<LocationDraft>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    let location = service.create_location(&caller, draft)?;
    Ok((StatusCode::CREATED, Json(location)).into_response())
}

async fn register_identity<S>(
    State(service): Directory<S>,
    caller: Caller,
    Json(draft): Json<NewIdentity>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    let identity = service.register_identity(&caller, draft)?;
    Ok((StatusCode::CREATED, Json(identity)).into_response())
}

async fn list_employees<S>(
    State(service): Directory<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    Ok(Json(service.employees(&caller)?).into_response())
}

async fn register_employee<S>(
    State(service): Directory<S>,
    caller: Caller,
    Json(draft): Json<EmployeeDraft>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    let employee = service.register_employee(&caller, draft, Utc::now())?;
    Ok((StatusCode::CREATED, Json(employee)).into_response())
}

async fn reassign_employee<S>(
    State(service): Directory<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(assignment): Json<Assignment>,
) -> Result<Response, ServiceError>
where
    S: DirectoryRepository + 'static,
{
    let employee = service.reassign_employee(&caller, EmployeeId(id), assignment)?;
    Ok(Json(employee).into_response())
}

async fn import_employees<S>(
    State(service): Directory<S>,
    caller: Caller,
    body: String,
) -> Response
where
    S: DirectoryRepository + 'static,
{
    match service.import_employees(&caller, body.as_bytes(), Utc::now()) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(EmployeeImportError::Service(error)) => error.into_response(),
        Err(EmployeeImportError::Repository(error)) => ServiceError::from(error).into_response(),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
    }
}
