use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use super::domain::{NoticeDraft, NoticeId};
use super::repository::NoticeRepository;
use super::service::NoticeService;
use crate::access::Caller;
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;

pub fn notice_router<S>(service: Arc<NoticeService<S>>) -> Router
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/notices", get(list::<S>).post(create::<S>))
        .route("/api/v1/notices/:id", put(update::<S>).delete(remove::<S>))
        .route("/api/v1/me/notices", get(my_notices::<S>))
        .route("/api/v1/me/notices/:id/acknowledge", post(acknowledge::<S>))
        .with_state(service)
}

type Notices<S> = State<Arc<NoticeService<S>>>;

async fn list<S>(State(service): Notices<S>, caller: Caller) -> Result<Response, ServiceError>
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.list(&caller)?).into_response())
}

async fn create<S>(
    State(service): Notices<S>,
    caller: Caller,
    Json(draft): Json<NoticeDraft>,
) -> Result<Response, ServiceError>
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    let notice = service.create(&caller, draft, Utc::now())?;
    Ok((StatusCode::CREATED, Json(notice)).into_response())
}

async fn update<S>(
    State(service): Notices<S>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(draft): Json<NoticeDraft>,
) -> Result<Response, ServiceError>
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.update(&caller, NoticeId(id), draft)?).into_response())
}

async fn remove<S>(
    State(service): Notices<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    service.delete(&caller, NoticeId(id))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn my_notices<S>(
    State(service): Notices<S>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.my_notices(&caller, Utc::now())?).into_response())
}

async fn acknowledge<S>(
    State(service): Notices<S>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError>
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    Ok(Json(service.acknowledge(&caller, NoticeId(id), Utc::now())?).into_response())
}
