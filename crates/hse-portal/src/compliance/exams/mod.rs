//! Knowledge exams: official attempts scored once per employee and repeatable practice quizzes.

pub mod domain;
mod error;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    AnswerDraft, AttemptHandle, AttemptId, Choice, ChoiceDraft, ChoiceId, Exam, ExamAttempt,
    ExamDraft, ExamId, ExamKind, ExamRemoval, ExamResult, PracticeSession, Question,
    QuestionDraft, QuestionId, QuestionStep, QuestionView, StartedAttempt, MAX_QUESTION_SCORE,
};
pub use error::ExamError;
pub use repository::ExamRepository;
pub use router::exam_router;
pub use service::ExamService;
