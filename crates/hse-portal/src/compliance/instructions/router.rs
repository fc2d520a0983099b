use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use super::domain::{AssignmentDraft, InstructionDraft, InstructionId, InstructionRecordId};
use super::repository::InstructionRepository;
use super::service::InstructionService;
use crate::access::Caller;
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;

pub fn instruction_router<S>(service: Arc<InstructionService<S>>) -> Router
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/instructions", get(list::<S>).post(create::<S>))
        .route("/api/v1/instructions/records", get(records::<S>))
        .route("/api/v1/instructions/:id/assign", post(assign::<S>))
        .route("/api/v1/me/instructions", get(my_records::<S>))
        .route(
            "/api/v1/me/instructions/:record_id/acknowledge",
            post(acknowledge::<S>),
        )
        .with_state(service)
}

type Instructions<S> = State<Arc<InstructionService<S>>>;

async fn list<S>(State(service): Instructions<S>, caller: Caller) -> Result<Response, ServiceError>
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.list(&caller)?).into_response())
}

async fn create<S>(
    State(service): Instructions<S>,
    caller: Caller,
    Json(draft): Json<InstructionDraft>,
) -> Result<Response, ServiceError>
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    let instruction = service.create(&caller, draft, Utc::now())?;
    Ok((StatusCode::CREATED, Json(instruction)).into_response())
}

async fn records<S>(
    State(service): Instructions<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.records(&caller, Utc::now().date_naive())?).into_response())
}

async fn assign<S>(
    State(service): Instructions<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(draft): Json<AssignmentDraft>,
) -> Result<Response, ServiceError>
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    let outcome = service.assign(&caller, InstructionId(id), draft, Utc::now())?;
    Ok(Json(outcome).into_response())
}

async fn my_records<S>(
    State(service): Instructions<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.my_records(&caller, Utc::now().date_naive())?).into_response())
}

async fn acknowledge<S>(
    State(service): Instructions<S>,
    caller: Caller,
    Path(record_id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    let record = service.acknowledge(
        &caller,
        InstructionRecordId(record_id),
        Utc::now().date_naive(),
    )?;
    Ok(Json(record).into_response())
}
