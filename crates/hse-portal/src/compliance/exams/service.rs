use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{
    AnswerDraft, AttemptHandle, AttemptId, Choice, ChoiceId, ChoiceView, Exam, ExamAttempt,
    ExamDraft, ExamId, ExamKind, ExamRemoval, ExamResult, PracticeSession, Question, QuestionDraft,
    QuestionId, QuestionStep, QuestionView, StartedAttempt, MAX_QUESTION_SCORE,
};
use super::error::ExamError;
use super::repository::ExamRepository;
use crate::access::{Caller, Role};
use crate::directory::domain::EmployeeId;
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;
use crate::store::{RepositoryError, Sequence};
use crate::targeting::OrgSnapshot;
use crate::validation::{require_text, ValidationErrors};

static EXAM_IDS: Sequence = Sequence::new();
static QUESTION_IDS: Sequence = Sequence::new();
static CHOICE_IDS: Sequence = Sequence::new();
static ATTEMPT_IDS: Sequence = Sequence::new();
static PRACTICE_TOKENS: Sequence = Sequence::new();

/// Attempt being answered, resolved from a handle and checked against its owner.
enum ActiveAttempt {
    Official(ExamAttempt),
    Practice(PracticeSession),
}

impl ActiveAttempt {
    fn started_at(&self) -> DateTime<Utc> {
        match self {
            ActiveAttempt::Official(attempt) => attempt.started_at,
            ActiveAttempt::Practice(session) => session.started_at,
        }
    }

    fn responses(&self) -> &BTreeMap<QuestionId, ChoiceId> {
        match self {
            ActiveAttempt::Official(attempt) => &attempt.responses,
            ActiveAttempt::Practice(session) => &session.responses,
        }
    }

    fn is_completed(&self) -> bool {
        matches!(self, ActiveAttempt::Official(attempt) if attempt.completed_at.is_some())
    }
}

pub struct ExamService<S> {
    store: Arc<S>,
}

impl<S> ExamService<S>
where
    S: ExamRepository + DirectoryRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list(&self, caller: &Caller) -> Result<Vec<Exam>, ServiceError> {
        caller.require_manager()?;
        let mut exams = self.store.exams()?;
        exams.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(exams)
    }

    pub fn create(
        &self,
        caller: &Caller,
        draft: ExamDraft,
        now: DateTime<Utc>,
    ) -> Result<Exam, ServiceError> {
        caller.require_manager()?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let exam = build_exam(&org, ExamId(EXAM_IDS.next()), draft, caller, now)?;
        let stored = self.store.insert_exam(exam)?;
        info!(exam = stored.id.0, kind = ?stored.kind, "exam created");
        Ok(stored)
    }

    /// Updates exam settings; questions are left untouched.
    pub fn update(
        &self,
        caller: &Caller,
        id: ExamId,
        draft: ExamDraft,
    ) -> Result<Exam, ServiceError> {
        caller.require_manager()?;
        let existing = self.exam(id)?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let mut exam = build_exam(&org, id, draft, caller, existing.created_at)?;
        exam.created_by = existing.created_by;
        exam.questions = existing.questions;
        self.store.update_exam(exam.clone())?;
        Ok(exam)
    }

    pub fn replace_questions(
        &self,
        caller: &Caller,
        id: ExamId,
        drafts: Vec<QuestionDraft>,
    ) -> Result<Exam, ServiceError> {
        caller.require_manager()?;
        let mut exam = self.exam(id)?;
        exam.questions = build_questions(drafts)?;
        self.store.update_exam(exam.clone())?;
        info!(exam = id.0, questions = exam.questions.len(), "exam questions replaced");
        Ok(exam)
    }

    pub fn delete(&self, caller: &Caller, id: ExamId) -> Result<ExamRemoval, ServiceError> {
        caller.require_manager()?;
        let mut exam = self.exam(id)?;
        if exam.kind == ExamKind::Official && !self.store.attempts_for_exam(id)?.is_empty() {
            exam.is_active = false;
            self.store.update_exam(exam)?;
            info!(exam = id.0, "exam with attempts deactivated");
            return Ok(ExamRemoval::Deactivated);
        }
        self.store.remove_exam(id)?;
        info!(exam = id.0, "exam removed");
        Ok(ExamRemoval::Deleted)
    }

    pub fn attempts(&self, caller: &Caller, id: ExamId) -> Result<Vec<ExamAttempt>, ServiceError> {
        caller.require_manager()?;
        self.exam(id)?;
        let mut attempts = self.store.attempts_for_exam(id)?;
        attempts.sort_by_key(|attempt| attempt.started_at);
        Ok(attempts)
    }

    /// Active exams whose audience includes the caller.
    pub fn available(&self, caller: &Caller) -> Result<Vec<Exam>, ServiceError> {
        caller.require(Role::EMPLOYEES)?;
        let Some(employee_id) = caller.employee else {
            return Ok(Vec::new());
        };
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let Some(employee) = org.employee(employee_id) else {
            return Ok(Vec::new());
        };
        let mut exams = self.store.exams()?;
        exams.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(org
            .records_for(employee, &exams)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn start(
        &self,
        caller: &Caller,
        id: ExamId,
        now: DateTime<Utc>,
    ) -> Result<StartedAttempt, ExamError> {
        caller.require(Role::EMPLOYEES)?;
        let employee = caller.employee.ok_or(ServiceError::NotFound("exam"))?;
        let exam = self
            .available(caller)?
            .into_iter()
            .find(|exam| exam.id == id)
            .ok_or(ServiceError::NotFound("exam"))?;

        if exam.questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }
        if !exam.is_ready() {
            return Err(ExamError::MalformedQuestions);
        }

        let handle = match exam.kind {
            ExamKind::Official => {
                if self.store.attempt_exists(exam.id, employee)? {
                    return Err(ExamError::AlreadyAttempted);
                }
                let attempt = ExamAttempt {
                    id: AttemptId(ATTEMPT_IDS.next()),
                    exam: exam.id,
                    employee,
                    started_at: now,
                    completed_at: None,
                    responses: BTreeMap::new(),
                    total_score: 0,
                    is_passed: false,
                };
                let attempt = match self.store.insert_attempt(attempt) {
                    Err(RepositoryError::Conflict) => return Err(ExamError::AlreadyAttempted),
                    other => other?,
                };
                AttemptHandle::Official(attempt.id)
            }
            ExamKind::Practice => {
                let token = PRACTICE_TOKENS.next();
                self.store.insert_practice_session(PracticeSession {
                    token,
                    exam: exam.id,
                    employee,
                    started_at: now,
                    responses: BTreeMap::new(),
                })?;
                AttemptHandle::Practice(token)
            }
        };

        info!(exam = exam.id.0, employee = employee.0, %handle, "exam started");
        Ok(StartedAttempt {
            handle,
            exam: exam.id,
            kind: exam.kind,
            started_at: now,
            expires_at: exam.expires_at(now),
            total_questions: exam.questions.len(),
        })
    }

    /// Question `number` (1-based) of an attempt in progress.
    pub fn question(
        &self,
        caller: &Caller,
        handle: AttemptHandle,
        number: usize,
        now: DateTime<Utc>,
    ) -> Result<QuestionStep, ExamError> {
        caller.require(Role::EMPLOYEES)?;
        let (exam, attempt) = self.load_attempt(caller, handle)?;
        Ok(step(&exam, &attempt, handle, number, now))
    }

    /// Stores (or replaces) the answer to question `number` and moves on to the next one.
    pub fn answer(
        &self,
        caller: &Caller,
        handle: AttemptHandle,
        number: usize,
        answer: AnswerDraft,
        now: DateTime<Utc>,
    ) -> Result<QuestionStep, ExamError> {
        caller.require(Role::EMPLOYEES)?;
        let (exam, attempt) = self.load_attempt(caller, handle)?;
        let Some(question) = open_question(&exam, &attempt, number, now) else {
            return Ok(QuestionStep::FinishRequired { handle });
        };
        if !question.choices.iter().any(|choice| choice.id == answer.choice) {
            return Err(ExamError::ForeignChoice);
        }

        let attempt = match attempt {
            ActiveAttempt::Official(mut attempt) => {
                attempt.responses.insert(question.id, answer.choice);
                self.store.update_attempt(attempt.clone())?;
                ActiveAttempt::Official(attempt)
            }
            ActiveAttempt::Practice(mut session) => {
                session.responses.insert(question.id, answer.choice);
                self.store.update_practice_session(session.clone())?;
                ActiveAttempt::Practice(session)
            }
        };
        debug!(%handle, number, "answer recorded");
        Ok(step(&exam, &attempt, handle, number + 1, now))
    }

    /// Scores the attempt. Official attempts are scored once and later calls return the stored
    /// result; practice sessions are discarded after scoring.
    pub fn finish(
        &self,
        caller: &Caller,
        handle: AttemptHandle,
        now: DateTime<Utc>,
    ) -> Result<ExamResult, ExamError> {
        caller.require(Role::EMPLOYEES)?;
        let (exam, attempt) = self.load_attempt(caller, handle)?;

        match attempt {
            ActiveAttempt::Official(mut attempt) => {
                if attempt.completed_at.is_none() {
                    attempt.total_score = exam.score(&attempt.responses);
                    attempt.is_passed = attempt.total_score >= exam.pass_score;
                    attempt.completed_at = Some(now);
                    self.store.update_attempt(attempt.clone())?;
                    info!(
                        exam = exam.id.0,
                        employee = attempt.employee.0,
                        score = attempt.total_score,
                        passed = attempt.is_passed,
                        "official exam finished"
                    );
                }
                Ok(ExamResult {
                    exam: exam.id,
                    exam_title: exam.title.clone(),
                    total_score: attempt.total_score,
                    max_score: exam.max_score(),
                    pass_score: exam.pass_score,
                    is_passed: attempt.is_passed,
                    is_practice: false,
                    completed_at: attempt.completed_at.unwrap_or(now),
                })
            }
            ActiveAttempt::Practice(session) => {
                let total_score = exam.score(&session.responses);
                self.store.remove_practice_session(session.token)?;
                Ok(ExamResult {
                    exam: exam.id,
                    exam_title: exam.title.clone(),
                    total_score,
                    max_score: exam.max_score(),
                    pass_score: exam.pass_score,
                    is_passed: total_score >= exam.pass_score,
                    is_practice: true,
                    completed_at: now,
                })
            }
        }
    }

    fn exam(&self, id: ExamId) -> Result<Exam, ServiceError> {
        self.store
            .exam(id)?
            .ok_or(ServiceError::NotFound("exam"))
    }

    fn load_attempt(
        &self,
        caller: &Caller,
        handle: AttemptHandle,
    ) -> Result<(Exam, ActiveAttempt), ServiceError> {
        let employee: EmployeeId = caller.employee.ok_or(ServiceError::NotFound("attempt"))?;
        match handle {
            AttemptHandle::Official(id) => {
                let attempt = self
                    .store
                    .attempt(id)?
                    .filter(|attempt| attempt.employee == employee)
                    .ok_or(ServiceError::NotFound("attempt"))?;
                let exam = self.exam(attempt.exam)?;
                Ok((exam, ActiveAttempt::Official(attempt)))
            }
            AttemptHandle::Practice(token) => {
                let session = self
                    .store
                    .practice_session(token)?
                    .filter(|session| session.employee == employee)
                    .ok_or(ServiceError::NotFound("attempt"))?;
                let exam = self
                    .store
                    .exam(session.exam)?
                    .filter(|exam| exam.is_active)
                    .ok_or(ServiceError::NotFound("exam"))?;
                Ok((exam, ActiveAttempt::Practice(session)))
            }
        }
    }
}

/// The question still open for answering, if the number is in range and time remains.
fn open_question<'e>(
    exam: &'e Exam,
    attempt: &ActiveAttempt,
    number: usize,
    now: DateTime<Utc>,
) -> Option<&'e Question> {
    if attempt.is_completed() || now >= exam.expires_at(attempt.started_at()) {
        return None;
    }
    number
        .checked_sub(1)
        .and_then(|index| exam.questions.get(index))
}

fn step(
    exam: &Exam,
    attempt: &ActiveAttempt,
    handle: AttemptHandle,
    number: usize,
    now: DateTime<Utc>,
) -> QuestionStep {
    let Some(question) = open_question(exam, attempt, number, now) else {
        return QuestionStep::FinishRequired { handle };
    };
    let remaining = exam.expires_at(attempt.started_at()) - now;

    QuestionStep::Question(QuestionView {
        handle,
        number,
        total_questions: exam.questions.len(),
        text: question.text.clone(),
        image_key: question.image_key.clone(),
        score: question.score,
        choices: question
            .choices
            .iter()
            .map(|choice| ChoiceView {
                id: choice.id,
                text: choice.text.clone(),
            })
            .collect(),
        selected: attempt.responses().get(&question.id).copied(),
        remaining_seconds: remaining.num_seconds().max(0),
    })
}

fn build_exam(
    org: &OrgSnapshot,
    id: ExamId,
    draft: ExamDraft,
    caller: &Caller,
    created_at: DateTime<Utc>,
) -> Result<Exam, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let title = draft.title.trim().to_string();
    require_text(&mut errors, "title", &title);
    if draft.duration_minutes == 0 {
        errors.add("duration_minutes", "duration must be at least one minute");
    }
    let scope = draft.scope.resolve(org, &mut errors);

    match scope {
        Some(scope) if errors.is_empty() => Ok(Exam {
            id,
            title,
            description: draft.description,
            kind: draft.kind,
            scope,
            duration_minutes: draft.duration_minutes,
            pass_score: draft.pass_score,
            is_active: draft.is_active,
            created_by: caller.identity,
            created_at,
            questions: Vec::new(),
        }),
        _ => Err(errors),
    }
}

fn build_questions(drafts: Vec<QuestionDraft>) -> Result<Vec<Question>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if drafts.is_empty() {
        errors.add("questions", "add at least one question");
    }

    let mut orders = BTreeSet::new();
    let mut questions = Vec::with_capacity(drafts.len());
    for (index, draft) in drafts.into_iter().enumerate() {
        let label = format!("question {}", index + 1);
        if draft.text.trim().is_empty() {
            errors.add("questions", format!("{label}: text is required"));
        }
        if !(1..=MAX_QUESTION_SCORE).contains(&draft.score) {
            errors.add(
                "questions",
                format!("{label}: score must be between 1 and {MAX_QUESTION_SCORE}"),
            );
        }
        if !orders.insert(draft.order) {
            errors.add("questions", format!("{label}: order {} is repeated", draft.order));
        }

        let choices: Vec<_> = draft
            .choices
            .into_iter()
            .filter(|choice| !choice.text.trim().is_empty())
            .collect();
        if !(2..=4).contains(&choices.len()) {
            errors.add("questions", format!("{label}: provide between 2 and 4 choices"));
        }
        if choices.iter().filter(|choice| choice.is_correct).count() != 1 {
            errors.add("questions", format!("{label}: mark exactly one correct choice"));
        }

        questions.push(Question {
            id: QuestionId(QUESTION_IDS.next()),
            text: draft.text.trim().to_string(),
            image_key: draft.image_key.filter(|key| !key.trim().is_empty()),
            score: draft.score,
            order: draft.order,
            choices: choices
                .into_iter()
                .map(|choice| Choice {
                    id: ChoiceId(CHOICE_IDS.next()),
                    text: choice.text.trim().to_string(),
                    is_correct: choice.is_correct,
                })
                .collect(),
        });
    }

    questions.sort_by_key(|question| question.order);
    errors.finish(questions)
}
