use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use super::domain::{ResultUpdate, StatusUpdate, TrainingDraft, TrainingId};
use super::repository::TrainingRepository;
use super::service::TrainingService;
use crate::access::Caller;
use crate::directory::domain::EmployeeId;
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;

pub fn training_router<S>(service: Arc<TrainingService<S>>) -> Router
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/trainings", get(list::<S>).post(create::<S>))
        .route(
            "/api/v1/trainings/:id",
            get(detail::<S>).put(update::<S>).delete(remove::<S>),
        )
        .route("/api/v1/trainings/:id/status", put(update_status::<S>))
        .route(
            "/api/v1/trainings/:id/participants/:employee_id",
            put(record_result::<S>),
        )
        .route("/api/v1/me/trainings", get(my_trainings::<S>))
        .with_state(service)
}

type Trainings<S> = State<Arc<TrainingService<S>>>;

async fn list<S>(State(service): Trainings<S>, caller: Caller) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.list(&caller)?).into_response())
}

async fn create<S>(
    State(service): Trainings<S>,
    caller: Caller,
    Json(draft): Json<TrainingDraft>,
) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    let saved = service.create(&caller, draft, Utc::now())?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

async fn detail<S>(
    State(service): Trainings<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.detail(&caller, TrainingId(id))?).into_response())
}

async fn update<S>(
    State(service): Trainings<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(draft): Json<TrainingDraft>,
) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    let saved = service.update(&caller, TrainingId(id), draft, Utc::now())?;
    Ok(Json(saved).into_response())
}

async fn remove<S>(
    State(service): Trainings<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    service.delete(&caller, TrainingId(id))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn update_status<S>(
    State(service): Trainings<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    let participation = service.update_status(&caller, TrainingId(id), update, Utc::now())?;
    Ok(Json(participation).into_response())
}

async fn record_result<S>(
    State(service): Trainings<S>,
    caller: Caller,
    Path((id, employee_id)): Path<(u64, u64)>,
    Json(update): Json<ResultUpdate>,
) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    let participation = service.record_result(
        &caller,
        TrainingId(id),
        EmployeeId(employee_id),
        update,
        Utc::now(),
    )?;
    Ok(Json(participation).into_response())
}

async fn my_trainings<S>(
    State(service): Trainings<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.my_trainings(&caller)?).into_response())
}
