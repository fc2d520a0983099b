use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use super::domain::{AnswerDraft, AttemptHandle, ExamDraft, ExamId, QuestionDraft};
use super::error::ExamError;
use super::repository::ExamRepository;
use super::service::ExamService;
use crate::access::Caller;
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;

pub fn exam_router<S>(service: Arc<ExamService<S>>) -> Router
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/exams", get(list::<S>).post(create::<S>))
        .route("/api/v1/exams/:id", put(update::<S>).delete(remove::<S>))
        .route("/api/v1/exams/:id/questions", put(replace_questions::<S>))
        .route("/api/v1/exams/:id/attempts", get(attempts::<S>))
        .route("/api/v1/exams/:id/start", post(start::<S>))
        .route("/api/v1/me/exams", get(available::<S>))
        .route(
            "/api/v1/attempts/:handle/questions/:number",
            get(question::<S>).post(answer::<S>),
        )
        .route("/api/v1/attempts/:handle/finish", post(finish::<S>))
        .with_state(service)
}

type Exams<S> = State<Arc<ExamService<S>>>;

fn parse_handle(raw: &str) -> Result<AttemptHandle, ServiceError> {
    raw.parse().map_err(|_| ServiceError::NotFound("attempt"))
}

async fn list<S>(State(service): Exams<S>, caller: Caller) -> Result<Response, ServiceError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.list(&caller)?).into_response())
}

async fn create<S>(
    State(service): Exams<S>,
    caller: Caller,
    Json(draft): Json<ExamDraft>,
) -> Result<Response, ServiceError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    let exam = service.create(&caller, draft, Utc::now())?;
    Ok((StatusCode::CREATED, Json(exam)).into_response())
}

async fn update<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(draft): Json<ExamDraft>,
) -> Result<Response, ServiceError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.update(&caller, ExamId(id), draft)?).into_response())
}

async fn remove<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    let removal = service.delete(&caller, ExamId(id))?;
    Ok(Json(serde_json::json!({ "removal": removal })).into_response())
}

async fn replace_questions<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(questions): Json<Vec<QuestionDraft>>,
) -> Result<Response, ServiceError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.replace_questions(&caller, ExamId(id), questions)?).into_response())
}

async fn attempts<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.attempts(&caller, ExamId(id))?).into_response())
}

async fn available<S>(State(service): Exams<S>, caller: Caller) -> Result<Response, ServiceError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.available(&caller)?).into_response())
}

async fn start<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ExamError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    let started = service.start(&caller, ExamId(id), Utc::now())?;
    Ok((StatusCode::CREATED, Json(started)).into_response())
}

async fn question<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path((handle, number)): Path<(String, usize)>,
) -> Result<Response, ExamError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    let handle = parse_handle(&handle)?;
    Ok(Json(service.question(&caller, handle, number, Utc::now())?).into_response())
}

async fn answer<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path((handle, number)): Path<(String, usize)>,
    Json(answer): Json<AnswerDraft>,
) -> Result<Response, ExamError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    let handle = parse_handle(&handle)?;
    let next = service.answer(&caller, handle, number, answer, Utc::now())?;
    Ok(Json(next).into_response())
}

async fn finish<S>(
    State(service): Exams<S>,
    caller: Caller,
    Path(handle): Path<String>,
) -> Result<Response, ExamError>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    let handle = parse_handle(&handle)?;
    Ok(Json(service.finish(&caller, handle, Utc::now())?).into_response())
}
