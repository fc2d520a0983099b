use super::domain::{AttemptId, Exam, ExamAttempt, ExamId, PracticeSession};
use crate::directory::domain::EmployeeId;
use crate::store::RepositoryError;

pub trait ExamRepository: Send + Sync {
    fn exams(&self) -> Result<Vec<Exam>, RepositoryError>;
    fn exam(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError>;
    fn insert_exam(&self, exam: Exam) -> Result<Exam, RepositoryError>;
    fn update_exam(&self, exam: Exam) -> Result<(), RepositoryError>;
    /// Removes the exam together with its attempts.
    fn remove_exam(&self, id: ExamId) -> Result<(), RepositoryError>;

    fn attempts_for_exam(&self, exam: ExamId) -> Result<Vec<ExamAttempt>, RepositoryError>;
    fn attempt(&self, id: AttemptId) -> Result<Option<ExamAttempt>, RepositoryError>;
    /// Fails with `Conflict` when the employee already has an attempt on the exam.
    fn insert_attempt(&self, attempt: ExamAttempt) -> Result<ExamAttempt, RepositoryError>;
    fn update_attempt(&self, attempt: ExamAttempt) -> Result<(), RepositoryError>;
    fn attempt_exists(&self, exam: ExamId, employee: EmployeeId) -> Result<bool, RepositoryError>;

    fn insert_practice_session(&self, session: PracticeSession) -> Result<(), RepositoryError>;
    fn practice_session(&self, token: u64) -> Result<Option<PracticeSession>, RepositoryError>;
    fn update_practice_session(&self, session: PracticeSession) -> Result<(), RepositoryError>;
    fn remove_practice_session(&self, token: u64) -> Result<(), RepositoryError>;
}
