use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::access::AccessError;
use crate::error::ServiceError;
use crate::store::RepositoryError;
use crate::validation::ValidationErrors;

/// Rule rejections raised while taking an exam, on top of the common service failures.
#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("exam has no questions yet")]
    NoQuestions,
    #[error("every question needs at least two choices and exactly one correct answer")]
    MalformedQuestions,
    #[error("exam already attempted")]
    AlreadyAttempted,
    #[error("choice does not belong to this question")]
    ForeignChoice,
}

impl From<AccessError> for ExamError {
    fn from(error: AccessError) -> Self {
        Self::Service(error.into())
    }
}

impl From<RepositoryError> for ExamError {
    fn from(error: RepositoryError) -> Self {
        Self::Service(error.into())
    }
}

impl From<ValidationErrors> for ExamError {
    fn from(error: ValidationErrors) -> Self {
        Self::Service(error.into())
    }
}

impl IntoResponse for ExamError {
    fn into_response(self) -> Response {
        let status = match self {
            ExamError::Service(error) => return error.into_response(),
            ExamError::AlreadyAttempted => StatusCode::CONFLICT,
            ExamError::NoQuestions | ExamError::MalformedQuestions | ExamError::ForeignChoice => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
